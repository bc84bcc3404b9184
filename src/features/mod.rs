//! # Features Module
//!
//! Feeding-tracker features: input parsing, the per-session conversation,
//! statistics, reminders and topics.
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.7.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 2.0.0: Feeding tracker feature set
//! - 1.0.0: Initial feature layout

pub mod parsing;
pub mod reminders;
pub mod session;
pub mod statistics;
pub mod topics;

pub use parsing::{
    format_period, parse_calendar_date, parse_feeding, parse_period, parse_quantity,
    parse_quantity_with_offset, ParsedInput, MAX_PERIOD_SECS, MAX_QUANTITY,
};
pub use reminders::{MuteTable, Notification, ReminderScheduler, SchedulerConfig};
pub use session::{ConversationEngine, SessionLocks};
pub use statistics::{
    monthly_histogram, render_histogram, render_report, render_stats, FeedingStats,
};
pub use topics::{render_topic_list, TopicRouter};
