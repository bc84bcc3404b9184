//! Reminder scheduler
//!
//! Every tick scans the sessions that have a feeding period, finds the ones
//! whose newest event is more than one period old, and notifies each of them
//! at most once per mute window. One bad session or one failed delivery never
//! stops the rest of the tick.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Duration, Utc};
use log::{debug, error, info, warn};
use std::sync::Arc;
use tokio::time::MissedTickBehavior;

use super::mute::MuteTable;
use crate::core::{Config, Session, SessionId};
use crate::database::{EventStore, SessionFilter};
use crate::features::statistics::last_event_time;
use crate::transport::Transport;

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Time between scans
    pub tick: std::time::Duration,
    /// How long a session stays quiet after a reminder
    pub mute_window: Duration,
    /// Events older than this are purged during the scan; `None` keeps them
    pub retention: Option<Duration>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig {
            tick: std::time::Duration::from_secs(60),
            mute_window: Duration::minutes(10),
            retention: None,
        }
    }
}

impl SchedulerConfig {
    pub fn from_config(config: &Config) -> Self {
        SchedulerConfig {
            tick: config.check_interval(),
            mute_window: Duration::try_minutes(config.mute_minutes.max(0))
                .unwrap_or_else(|| Duration::minutes(10)),
            retention: config.retention_days.and_then(Duration::try_days),
        }
    }
}

/// A reminder ready for delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub session_id: SessionId,
    /// Whole periods elapsed since the last feeding
    pub periods_elapsed: i64,
    pub text: String,
}

/// Counters for one tick, logged at the end of it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub scanned: usize,
    pub notified: usize,
    pub muted: usize,
    pub failed_sessions: usize,
    pub purged: usize,
    pub delivery_failures: usize,
}

pub fn reminder_text(periods_elapsed: i64) -> String {
    format!(
        "Time to feed the baby! More than {} feeding period{} have passed.",
        periods_elapsed,
        if periods_elapsed == 1 { "" } else { "s" }
    )
}

/// Whole periods since `last` when `last + period < now`, otherwise `None`
///
/// Fails when the period is not positive or `last + period` leaves the
/// representable time range.
pub fn overdue_periods(
    last: DateTime<Utc>,
    period: Duration,
    now: DateTime<Utc>,
) -> Result<Option<i64>> {
    let period_ms = period.num_milliseconds();
    if period_ms <= 0 {
        return Err(anyhow!("non-positive period {period}"));
    }
    let deadline = last
        .checked_add_signed(period)
        .ok_or_else(|| anyhow!("period {period} overflows from {last}"))?;
    if deadline >= now {
        return Ok(None);
    }
    Ok(Some((now - last).num_milliseconds() / period_ms))
}

pub struct ReminderScheduler {
    store: Arc<dyn EventStore>,
    transport: Arc<dyn Transport>,
    mutes: Arc<MuteTable>,
    config: SchedulerConfig,
}

impl ReminderScheduler {
    pub fn new(
        store: Arc<dyn EventStore>,
        transport: Arc<dyn Transport>,
        mutes: Arc<MuteTable>,
        config: SchedulerConfig,
    ) -> Self {
        ReminderScheduler {
            store,
            transport,
            mutes,
            config,
        }
    }

    pub fn mutes(&self) -> &MuteTable {
        &self.mutes
    }

    /// Run forever, one spawned scan per tick
    ///
    /// A slow scan does not delay the next one; ticks missed while the
    /// runtime is busy are skipped rather than queued.
    pub async fn run(self: Arc<Self>) {
        let mut interval = tokio::time::interval(self.config.tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            "Reminder scheduler started (tick: {:?}, mute: {} min, retention: {})",
            self.config.tick,
            self.config.mute_window.num_minutes(),
            self.config
                .retention
                .map(|r| format!("{} days", r.num_days()))
                .unwrap_or_else(|| "off".to_string())
        );

        loop {
            interval.tick().await;
            let scheduler = Arc::clone(&self);
            tokio::spawn(async move {
                scheduler.tick(Utc::now()).await;
            });
        }
    }

    /// Scan, deliver and prune for one tick at `now`
    pub async fn tick(&self, now: DateTime<Utc>) -> TickReport {
        let (notifications, mut report) = match self.scan(now).await {
            Ok(result) => result,
            Err(e) => {
                error!("Reminder scan failed: {e}");
                return TickReport::default();
            }
        };

        report.delivery_failures = self.deliver(&notifications).await;
        self.mutes.prune(now);

        if report.notified > 0 || report.failed_sessions > 0 || report.purged > 0 {
            info!("Reminder tick: {report:?}");
        } else {
            debug!("Reminder tick: {report:?}");
        }
        report
    }

    /// Find overdue sessions and claim their mute slots
    ///
    /// Fails only when the session list itself cannot be loaded.
    pub async fn scan(&self, now: DateTime<Utc>) -> Result<(Vec<Notification>, TickReport)> {
        let sessions = self.store.list_sessions(SessionFilter::WithPeriod).await?;
        let mut report = TickReport {
            scanned: sessions.len(),
            ..Default::default()
        };
        let mut notifications = Vec::new();

        for session in &sessions {
            match self.check_session(session, now, &mut report).await {
                Ok(Some(notification)) => {
                    report.notified += 1;
                    notifications.push(notification);
                }
                Ok(None) => {}
                Err(e) => {
                    report.failed_sessions += 1;
                    warn!("Skipping session {} in reminder scan: {e}", session.id);
                }
            }
        }

        Ok((notifications, report))
    }

    async fn check_session(
        &self,
        session: &Session,
        now: DateTime<Utc>,
        report: &mut TickReport,
    ) -> Result<Option<Notification>> {
        let period = session
            .period()
            .ok_or_else(|| anyhow!("malformed period {:?}", session.period_secs))?;

        let events = self.store.list_events(session.id).await?;
        let Some(last) = last_event_time(&events) else {
            return Ok(None);
        };

        if let Some(retention) = self.config.retention {
            let expired = events.iter().filter(|e| {
                e.timestamp
                    .checked_add_signed(retention)
                    .is_some_and(|end| end < now)
            });
            for event in expired {
                match self.store.delete_event(event.id).await {
                    Ok(()) => report.purged += 1,
                    Err(e) => warn!("Failed to purge event {}: {e}", event.id),
                }
            }
        }

        let Some(periods_elapsed) = overdue_periods(last, period, now)? else {
            return Ok(None);
        };

        let mute_until = now
            .checked_add_signed(self.config.mute_window)
            .ok_or_else(|| anyhow!("mute window {} overflows", self.config.mute_window))?;
        if !self.mutes.try_mute(session.id, now, mute_until) {
            report.muted += 1;
            return Ok(None);
        }

        Ok(Some(Notification {
            session_id: session.id,
            periods_elapsed,
            text: reminder_text(periods_elapsed),
        }))
    }

    /// Send every notification; returns how many failed
    pub async fn deliver(&self, notifications: &[Notification]) -> usize {
        let mut failures = 0;
        for notification in notifications {
            if let Err(e) = self
                .transport
                .send_text(notification.session_id, &notification.text)
                .await
            {
                failures += 1;
                warn!(
                    "Failed to deliver reminder to session {}: {e}",
                    notification.session_id
                );
            }
        }
        failures
    }
}
