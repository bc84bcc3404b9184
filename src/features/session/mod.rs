//! # Session Feature
//!
//! Per-session conversational mode: how inbound text is interpreted, and the
//! locking that keeps one session's messages from racing each other.
//!
//! - **Version**: 1.1.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.1.0: Pure transition function split from the engine
//! - 1.0.0: Initial idle/topic modes

pub mod engine;
pub mod locks;
pub mod machine;

pub use engine::ConversationEngine;
pub use locks::SessionLocks;
pub use machine::{transition, Effect, Input, Transition, RESET_TEXT};
