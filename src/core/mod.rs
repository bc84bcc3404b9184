//! # Core Module
//!
//! Domain records, configuration, error taxonomy and message chunking.
//!
//! - **Version**: 1.2.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.2.0: Add error module with store/transport taxonomy
//! - 1.1.0: Add response module with transport message chunking
//! - 1.0.0: Initial creation with config and models

pub mod config;
pub mod error;
pub mod models;
pub mod response;

// Re-export commonly used items
pub use config::Config;
pub use error::{is_not_found, StoreError, StoreResult, TransportError};
pub use models::{
    Event, Message, NewEvent, NewMessage, Session, SessionId, SessionMode, Topic, TopicId,
};
pub use response::{chunk_for_message, chunk_text, MESSAGE_LIMIT};
