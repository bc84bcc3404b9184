//! Session lifecycle command handlers
//!
//! Handles: start, stop, reset, help
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0

use anyhow::Result;
use async_trait::async_trait;
use log::info;
use std::sync::Arc;

use crate::commands::context::CommandContext;
use crate::commands::handler::{CommandInvocation, SlashCommandHandler};
use crate::core::{Session, StoreError};
use crate::features::parsing::{format_period, parse_period, MAX_PERIOD_SECS};
use crate::features::session::Input;
use crate::transport::Reply;

pub const HELP_TEXT: &str = "**Feeding tracker commands:**
`/start H:M:S` - Start tracking here with a feeding period, or change the period
`/stop` - Stop tracking and delete everything recorded here
`/report [Mon Day]` - Feedings of the last 24 hours, or of one calendar day
`/stats` - Daily totals and time since the last feeding
`/month` - Daily totals for the last 31 days
`/newtopic [name]` - Start a topic for free-text notes
`/topics` - List open topics
`/topic <number>` - Write into an existing topic
`/closetopic <number>` - Close a topic
`/forward <number>` - Replay a topic's notes
`/reset` - Go back to logging feedings (same as sending `.`)

Send a number like `120` to log a feeding now, or `-30m 120` to log one 30 minutes ago.";

/// Handler for session lifecycle commands: start, stop, reset, help
pub struct SessionHandler;

#[async_trait]
impl SlashCommandHandler for SessionHandler {
    fn command_names(&self) -> &'static [&'static str] {
        &["start", "stop", "reset", "help"]
    }

    async fn handle(
        &self,
        ctx: Arc<CommandContext>,
        invocation: &CommandInvocation,
    ) -> Result<Vec<Reply>> {
        match invocation.name.as_str() {
            "start" => self.handle_start(&ctx, invocation).await,
            "stop" => self.handle_stop(&ctx, invocation).await,
            "reset" => self.handle_reset(&ctx, invocation).await,
            "help" => Ok(vec![Reply::text(HELP_TEXT)]),
            _ => Ok(Vec::new()),
        }
    }
}

impl SessionHandler {
    /// Handle /start - create the session or change its period
    async fn handle_start(
        &self,
        ctx: &CommandContext,
        invocation: &CommandInvocation,
    ) -> Result<Vec<Reply>> {
        let Some(period) = invocation.arg().and_then(parse_period) else {
            return Ok(vec![Reply::text(
                "Usage: `/start H:M:S`, for example `/start 3:00:00` for a feeding every three hours.",
            )]);
        };
        let period_secs = period.num_seconds();
        if period_secs <= 0 {
            return Ok(vec![Reply::text("The feeding period must be longer than zero.")]);
        }
        if period_secs > MAX_PERIOD_SECS {
            return Ok(vec![Reply::text(format!(
                "The feeding period can be at most {}.",
                format_period(MAX_PERIOD_SECS)
            ))]);
        }

        let mut session = match ctx.store.get_session(invocation.session_id).await {
            Ok(session) => session,
            Err(StoreError::NotFound(_)) => Session::new(invocation.session_id),
            Err(e) => return Err(e.into()),
        };
        session.period_secs = Some(period_secs);
        ctx.store.upsert_session(&session).await?;

        info!(
            "Session {} tracking with period {}s",
            invocation.session_id, period_secs
        );
        Ok(vec![Reply::text(format!(
            "Tracking feedings. I'll remind you when more than {} pass without one.",
            format_period(period_secs)
        ))])
    }

    /// Handle /stop - delete the session and everything under it
    async fn handle_stop(
        &self,
        ctx: &CommandContext,
        invocation: &CommandInvocation,
    ) -> Result<Vec<Reply>> {
        ctx.store.delete_session(invocation.session_id).await?;
        info!("Session {} stopped", invocation.session_id);
        Ok(vec![Reply::text(
            "Tracking stopped. Everything recorded here has been deleted.",
        )])
    }

    /// Handle /reset - back to Idle from any mode
    async fn handle_reset(
        &self,
        ctx: &CommandContext,
        invocation: &CommandInvocation,
    ) -> Result<Vec<Reply>> {
        ctx.conversation
            .apply(invocation.session_id, Input::Reset)
            .await?;
        Ok(vec![Reply::text("Back to logging feedings.")])
    }
}
