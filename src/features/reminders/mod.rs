//! # Reminders Feature
//!
//! Periodic scan for sessions whose last feeding is more than one period
//! old, with a per-session mute window so a reminder is not repeated on
//! every tick.
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 2.0.0: Overdue detection from the event log, atomic mute claims, optional retention purge
//! - 1.0.0: Initial scheduled reminders

pub mod mute;
pub mod scheduler;

pub use mute::MuteTable;
pub use scheduler::{
    overdue_periods, reminder_text, Notification, ReminderScheduler, SchedulerConfig, TickReport,
};
