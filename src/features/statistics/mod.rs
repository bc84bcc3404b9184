//! # Statistics Feature
//!
//! Read-only aggregates over a session's events: daily totals, rolling-period
//! total, time since the last feeding and a 31-day histogram.
//!
//! - **Version**: 1.1.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.1.0: Daily totals count every event in the window, not only the newest
//! - 1.0.0: Initial stats and monthly histogram

use chrono::{DateTime, Duration, Utc};

use crate::core::Event;

/// Number of daily buckets in the monthly histogram
pub const HISTOGRAM_DAYS: usize = 31;

/// Summary shown by the stats command
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedingStats {
    /// Sum of amounts in the last 24 hours
    pub daily_total: i64,
    pub daily_count: usize,
    /// Sum of amounts within one period; `None` when no period is configured
    pub period_total: Option<i64>,
    /// Time since the newest event; `None` when there are no events
    pub since_last: Option<Duration>,
}

impl FeedingStats {
    pub fn compute(events: &[Event], period: Option<Duration>, now: DateTime<Utc>) -> Self {
        let (daily_total, daily_count) = daily_total(events, now);
        FeedingStats {
            daily_total,
            daily_count,
            period_total: period.map(|p| period_total(events, p, now)),
            since_last: time_since_last(events, now),
        }
    }
}

/// Sum and count of events with `timestamp + 1 day > now`
pub fn daily_total(events: &[Event], now: DateTime<Utc>) -> (i64, usize) {
    within(events, Duration::days(1), now).fold((0i64, 0usize), |(sum, count), e| {
        (sum.saturating_add(e.amount), count + 1)
    })
}

/// Sum of events with `timestamp + period > now`
pub fn period_total(events: &[Event], period: Duration, now: DateTime<Utc>) -> i64 {
    within(events, period, now).fold(0i64, |sum, e| sum.saturating_add(e.amount))
}

/// A window that runs past the end of representable time covers `now`
fn within(events: &[Event], window: Duration, now: DateTime<Utc>) -> impl Iterator<Item = &Event> {
    events.iter().filter(move |e| {
        e.timestamp
            .checked_add_signed(window)
            .map_or(true, |end| end > now)
    })
}

/// `now - max(timestamp)`, or `None` when there is no data
pub fn time_since_last(events: &[Event], now: DateTime<Utc>) -> Option<Duration> {
    last_event_time(events).map(|last| now - last)
}

/// Newest event timestamp, independent of list order
pub fn last_event_time(events: &[Event]) -> Option<DateTime<Utc>> {
    events.iter().map(|e| e.timestamp).max()
}

/// Amount per day, indexed by whole days before `now` (bucket 0 is the last 24h)
///
/// Events older than 31 days, or dated after `now`, are left out.
pub fn monthly_histogram(events: &[Event], now: DateTime<Utc>) -> [i64; HISTOGRAM_DAYS] {
    let mut buckets = [0i64; HISTOGRAM_DAYS];
    for event in events {
        let age = now - event.timestamp;
        if age < Duration::zero() {
            continue;
        }
        let day = age.num_days() as usize;
        if day < HISTOGRAM_DAYS {
            buckets[day] = buckets[day].saturating_add(event.amount);
        }
    }
    buckets
}

/// `"H hours M minutes"` for a time-since-last value; negative renders as zero
pub fn format_elapsed(elapsed: Duration) -> String {
    let minutes = elapsed.num_minutes().max(0);
    format!("{} hours {} minutes", minutes / 60, minutes % 60)
}

pub fn render_stats(stats: &FeedingStats) -> String {
    let mut lines = vec![format!(
        "Last 24 hours: {} feedings, {} ml in total.",
        stats.daily_count, stats.daily_total
    )];
    if let Some(total) = stats.period_total {
        lines.push(format!("Within the feeding period: {total} ml."));
    }
    match stats.since_last {
        Some(elapsed) => lines.push(format!("Last feeding was {} ago.", format_elapsed(elapsed))),
        None => lines.push("No feedings recorded yet.".to_string()),
    }
    lines.join("\n")
}

/// Histogram lines, oldest day (bucket 30) first down to today (bucket 0)
pub fn render_histogram(buckets: &[i64; HISTOGRAM_DAYS], now: DateTime<Utc>) -> String {
    let peak = buckets.iter().copied().max().unwrap_or(0).max(1);
    let mut out = String::from("Daily totals for the last 31 days:\n```\n");
    for (day, total) in buckets.iter().enumerate().rev() {
        let date = (now - Duration::days(day as i64)).format("%b %d");
        let width = (i128::from(*total) * 30 / i128::from(peak)).clamp(0, 30);
        let bar = "#".repeat(width as usize);
        out.push_str(&format!("{date} {total:>5} ml {bar}\n"));
    }
    out.push_str("```");
    out
}

/// Events in `[from, to)` with the total, newest last
pub fn render_report(events: &[Event], from: DateTime<Utc>, to: DateTime<Utc>) -> String {
    let mut selected: Vec<&Event> = events
        .iter()
        .filter(|e| e.timestamp >= from && e.timestamp < to)
        .collect();
    if selected.is_empty() {
        return format!(
            "No feedings between {} and {}.",
            from.format("%Y-%m-%d %H:%M"),
            to.format("%Y-%m-%d %H:%M")
        );
    }
    selected.sort_by_key(|e| e.timestamp);

    let total = selected
        .iter()
        .fold(0i64, |sum, e| sum.saturating_add(e.amount));
    let mut out = format!(
        "Feedings from {} to {} UTC:\n",
        from.format("%Y-%m-%d %H:%M"),
        to.format("%Y-%m-%d %H:%M")
    );
    for event in &selected {
        out.push_str(&format!("{}  {} ml\n", event.timestamp.format("%H:%M"), event.amount));
    }
    out.push_str(&format!("Total: {} ml in {} feedings", total, selected.len()));
    out
}
