//! Command handler trait and invocation type
//!
//! - **Version**: 2.0.0
//! - **Since**: 3.38.0
//!
//! ## Changelog
//! - 2.0.0: Transport-neutral invocations; handlers return replies instead of responding directly
//! - 1.0.0: Initial implementation for modular command handling

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use super::context::CommandContext;
use crate::core::SessionId;
use crate::transport::Reply;

/// One command as received from a slash interaction or a `/name arg` text
#[derive(Debug, Clone, PartialEq)]
pub struct CommandInvocation {
    pub session_id: SessionId,
    /// Lowercase command name without the leading slash
    pub name: String,
    /// Trimmed argument text, `None` when absent or blank
    pub arg: Option<String>,
    pub now: DateTime<Utc>,
}

impl CommandInvocation {
    pub fn new(
        session_id: SessionId,
        name: impl Into<String>,
        arg: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        CommandInvocation {
            session_id,
            name: name.into().to_lowercase(),
            arg: arg
                .map(|a| a.trim().to_string())
                .filter(|a| !a.is_empty()),
            now,
        }
    }

    pub fn arg(&self) -> Option<&str> {
        self.arg.as_deref()
    }
}

/// Trait for command handlers
///
/// Each handler processes one or more commands and returns the replies to
/// deliver. Handlers are registered with a CommandRegistry and dispatched
/// by command name. Calls for one session are serialized by the caller.
///
/// # Example
///
/// ```ignore
/// pub struct PingHandler;
///
/// #[async_trait]
/// impl SlashCommandHandler for PingHandler {
///     fn command_names(&self) -> &'static [&'static str] {
///         &["ping"]
///     }
///
///     async fn handle(
///         &self,
///         ctx: Arc<CommandContext>,
///         invocation: &CommandInvocation,
///     ) -> Result<Vec<Reply>> {
///         Ok(vec![Reply::text("Pong!")])
///     }
/// }
/// ```
#[async_trait]
pub trait SlashCommandHandler: Send + Sync {
    /// Command name(s) this handler processes
    ///
    /// A handler can process multiple commands if they share logic.
    fn command_names(&self) -> &'static [&'static str];

    /// Handle the command
    ///
    /// A session that has never run `start` surfaces as `StoreError::NotFound`.
    async fn handle(
        &self,
        ctx: Arc<CommandContext>,
        invocation: &CommandInvocation,
    ) -> Result<Vec<Reply>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Test that the trait is object-safe (can be used with dyn)
    fn _assert_object_safe(_: &dyn SlashCommandHandler) {}

    #[test]
    fn test_invocation_normalizes_name_and_arg() {
        let now = Utc::now();
        let invocation = CommandInvocation::new(1, "Start", Some("  3:00:00 ".into()), now);
        assert_eq!(invocation.name, "start");
        assert_eq!(invocation.arg(), Some("3:00:00"));

        let blank = CommandInvocation::new(1, "stats", Some("   ".into()), now);
        assert_eq!(blank.arg(), None);
    }
}
