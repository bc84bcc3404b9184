//! Statistics command handlers
//!
//! Handles: report, stats, month
//!
//! - **Version**: 1.1.0
//! - **Since**: 1.0.0
//!
//! ## Changelog
//! - 1.1.0: `/report` takes an optional calendar day
//! - 1.0.0: Initial stats and monthly histogram

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Datelike, Duration};
use log::debug;
use std::sync::Arc;

use crate::commands::context::CommandContext;
use crate::commands::handler::{CommandInvocation, SlashCommandHandler};
use crate::features::parsing::parse_calendar_date;
use crate::features::statistics::{
    monthly_histogram, render_histogram, render_report, render_stats, FeedingStats,
};
use crate::transport::Reply;

/// Handler for read-only statistics: report, stats, month
pub struct StatsHandler;

#[async_trait]
impl SlashCommandHandler for StatsHandler {
    fn command_names(&self) -> &'static [&'static str] {
        &["report", "stats", "month"]
    }

    async fn handle(
        &self,
        ctx: Arc<CommandContext>,
        invocation: &CommandInvocation,
    ) -> Result<Vec<Reply>> {
        match invocation.name.as_str() {
            "report" => self.handle_report(&ctx, invocation).await,
            "stats" => self.handle_stats(&ctx, invocation).await,
            "month" => self.handle_month(&ctx, invocation).await,
            _ => Ok(Vec::new()),
        }
    }
}

impl StatsHandler {
    /// Handle /report - last 24 hours, or one calendar day
    async fn handle_report(
        &self,
        ctx: &CommandContext,
        invocation: &CommandInvocation,
    ) -> Result<Vec<Reply>> {
        ctx.require_session(invocation.session_id).await?;

        let (from, to) = match invocation.arg() {
            Some(text) => match parse_calendar_date(text, invocation.now.year())
                .and_then(|day| Some((day, day.checked_add_signed(Duration::days(1))?)))
            {
                Some(range) => range,
                None => {
                    return Ok(vec![Reply::text(
                        "Usage: `/report [Mon Day]`, for example `/report Mar 10`.",
                    )])
                }
            },
            // The window end is exclusive; keep events stamped exactly at `now`
            None => (
                invocation.now - Duration::days(1),
                invocation.now + Duration::seconds(1),
            ),
        };

        let events = ctx.store.list_events(invocation.session_id).await?;
        debug!(
            "Report for session {} over {} events",
            invocation.session_id,
            events.len()
        );
        Ok(vec![Reply::text(render_report(&events, from, to))])
    }

    /// Handle /stats
    async fn handle_stats(
        &self,
        ctx: &CommandContext,
        invocation: &CommandInvocation,
    ) -> Result<Vec<Reply>> {
        let session = ctx.require_session(invocation.session_id).await?;
        let events = ctx.store.list_events(session.id).await?;
        let stats = FeedingStats::compute(&events, session.period(), invocation.now);
        Ok(vec![Reply::text(render_stats(&stats))])
    }

    /// Handle /month
    async fn handle_month(
        &self,
        ctx: &CommandContext,
        invocation: &CommandInvocation,
    ) -> Result<Vec<Reply>> {
        ctx.require_session(invocation.session_id).await?;
        let events = ctx.store.list_events(invocation.session_id).await?;
        let buckets = monthly_histogram(&events, invocation.now);
        Ok(vec![Reply::text(render_histogram(&buckets, invocation.now))])
    }
}
