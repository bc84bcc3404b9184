//! # Parsing Feature
//!
//! Total parsers that turn free text into quantities, periods and dates.
//! Every parser returns `None` for "no match"; none of them fail.
//!
//! - **Version**: 1.2.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.2.0: Calendar dates accept full month names and an explicit year
//! - 1.1.0: Signed offsets for quantities (`-30m 120`)
//! - 1.0.0: Quantity, period and offset grammars

use chrono::{DateTime, Duration, NaiveDate, Utc};
use regex::Regex;
use std::sync::OnceLock;

/// What a piece of inbound text was recognised as
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedInput {
    /// A plain quantity, timestamped with the message time
    Quantity(i64),
    /// A quantity with an explicit time derived from an offset
    TimedQuantity { timestamp: DateTime<Utc>, amount: i64 },
    Period(Duration),
    Date(DateTime<Utc>),
    None,
}

/// Recognise feeding input, trying plain quantity first, then offset quantity
pub fn parse_feeding(text: &str, reference: DateTime<Utc>) -> ParsedInput {
    if let Some(amount) = parse_quantity(text) {
        return ParsedInput::Quantity(amount);
    }
    match parse_quantity_with_offset(text, reference) {
        Some((timestamp, amount)) => ParsedInput::TimedQuantity { timestamp, amount },
        None => ParsedInput::None,
    }
}

/// Largest quantity accepted for one feeding, in millilitres
pub const MAX_QUANTITY: i64 = 100_000;

/// Longest feeding period `/start` accepts
pub const MAX_PERIOD_SECS: i64 = 31 * 24 * 3600;

fn bounded_quantity(digits: &str) -> Option<i64> {
    digits.parse().ok().filter(|amount| *amount <= MAX_QUANTITY)
}

/// Non-negative integer literal up to [`MAX_QUANTITY`], in millilitres
pub fn parse_quantity(text: &str) -> Option<i64> {
    let text = text.trim();
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    bounded_quantity(text)
}

fn offset_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^([+-]?\d+)([hm])\s+(\d+)$").ok())
        .as_ref()
}

/// `"<N><h|m> <amount>"`, timestamped at `reference + N units`
pub fn parse_quantity_with_offset(
    text: &str,
    reference: DateTime<Utc>,
) -> Option<(DateTime<Utc>, i64)> {
    let caps = offset_pattern()?.captures(text.trim())?;
    let count: i64 = caps[1].parse().ok()?;
    let amount = bounded_quantity(&caps[3])?;

    let offset = match &caps[2] {
        "h" => Duration::try_hours(count)?,
        "m" => Duration::try_minutes(count)?,
        _ => return None,
    };

    Some((reference.checked_add_signed(offset)?, amount))
}

/// Strict `H:M:S` period literal
pub fn parse_period(text: &str) -> Option<Duration> {
    let parts: Vec<&str> = text.trim().split(':').collect();
    let [h, m, s] = parts.as_slice() else {
        return None;
    };

    let mut total: i64 = 0;
    for (part, unit) in [(h, 3600), (m, 60), (s, 1)] {
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let value: i64 = part.parse().ok()?;
        total = total.checked_add(value.checked_mul(unit)?)?;
    }
    Duration::try_seconds(total)
}

/// Render the non-zero hour/minute/second components, space-joined
pub fn format_period(total_secs: i64) -> String {
    let total_secs = total_secs.max(0);
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    [(hours, "hour"), (minutes, "minute"), (seconds, "second")]
        .into_iter()
        .filter(|(value, _)| *value > 0)
        .map(|(value, unit)| format!("{} {}{}", value, unit, if value == 1 { "" } else { "s" }))
        .collect::<Vec<_>>()
        .join(" ")
}

const MONTHS: [&str; 12] = [
    "january", "february", "march", "april", "may", "june", "july", "august", "september",
    "october", "november", "december",
];

fn parse_month(word: &str) -> Option<u32> {
    let word = word.to_lowercase();
    MONTHS
        .iter()
        .position(|name| *name == word || (word.len() == 3 && name.starts_with(&word)))
        .map(|idx| idx as u32 + 1)
}

/// `"<Month> <Day>"` (in `fallback_year`) or `"<Month> <Day> <Year>"`, at UTC midnight
pub fn parse_calendar_date(text: &str, fallback_year: i32) -> Option<DateTime<Utc>> {
    let words: Vec<&str> = text.split_whitespace().collect();
    let (month, day, year) = match words.as_slice() {
        [month, day] => (*month, *day, fallback_year),
        [month, day, year] => (*month, *day, year.parse().ok()?),
        _ => return None,
    };

    let month = parse_month(month)?;
    let day: u32 = day.parse().ok()?;
    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    Some(date.and_hms_opt(0, 0, 0)?.and_utc())
}
