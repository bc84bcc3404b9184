// Core layer - shared types, errors and configuration
pub mod core;

// Features layer - parsing, sessions, statistics, reminders, topics
pub mod features;

// Infrastructure
pub mod database;
pub mod transport;

// Application layer
pub mod command_handler;
pub mod commands;

pub use core::Config;

pub use database::{Database, EventStore};
pub use features::{
    // Reminders
    MuteTable,
    ReminderScheduler,
    // Session
    ConversationEngine,
    SessionLocks,
    // Topics
    TopicRouter,
};
pub use transport::{DiscordTransport, Transport};
