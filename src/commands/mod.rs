//! # Command System
//!
//! Slash command (/) handling, also reachable as `/name arg` text messages.
//!
//! - **Version**: 3.0.0
//! - **Since**: 0.2.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 3.0.0: Feeding tracker commands; handlers return replies for any transport
//! - 2.1.0: Add modular handler infrastructure (handler trait, context, registry)
//! - 1.0.0: Initial reorganization with modular command structure

pub mod context;
pub mod handler;
pub mod handlers;
pub mod registry;
pub mod slash;

// Re-export the CommandHandler from the handler module
pub use crate::command_handler::CommandHandler;

// Re-export handler infrastructure
pub use context::CommandContext;
pub use handler::{CommandInvocation, SlashCommandHandler};
pub use registry::CommandRegistry;

pub use slash::{
    command_argument, create_slash_commands, get_integer_option, get_string_option,
    register_global_commands, register_guild_commands,
};
