//! Per-command handler implementations
//!
//! - **Version**: 3.0.0
//! - **Since**: 3.38.0
//!
//! ## Changelog
//! - 3.0.0: Feeding tracker handlers (session, stats, topics)
//! - 1.0.0: Initial extraction from monolithic command_handler.rs

pub mod session;
pub mod stats;
pub mod topics;

use std::sync::Arc;

use super::handler::SlashCommandHandler;

/// Create all registered command handlers
///
/// Returns a vector of handlers ready to be registered with CommandRegistry.
pub fn create_all_handlers() -> Vec<Arc<dyn SlashCommandHandler>> {
    vec![
        Arc::new(session::SessionHandler),
        Arc::new(stats::StatsHandler),
        Arc::new(topics::TopicsHandler),
    ]
}
