//! Environment configuration
//!
//! - **Version**: 1.1.0
//! - **Since**: 1.0.0
//!
//! ## Changelog
//! - 1.1.0: Add retention window and store timeout
//! - 1.0.0: Initial environment-driven config

use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

/// Runtime configuration read from the environment (after `.env` is loaded)
#[derive(Debug, Clone)]
pub struct Config {
    pub discord_token: String,
    pub discord_guild_id: Option<String>,
    pub database_path: String,
    pub log_level: String,
    pub check_interval_secs: u64,
    pub mute_minutes: i64,
    /// Events older than this many days are purged; `None` disables the purge
    pub retention_days: Option<i64>,
    pub store_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let discord_token =
            env::var("DISCORD_TOKEN").context("DISCORD_TOKEN must be set in the environment")?;

        Ok(Config {
            discord_token,
            discord_guild_id: env::var("DISCORD_GUILD_ID").ok().filter(|s| !s.is_empty()),
            database_path: env::var("DATABASE_PATH").unwrap_or_else(|_| "feedwatch.db".to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            check_interval_secs: parse_var("CHECK_INTERVAL_SECS", 60)?,
            mute_minutes: parse_var("MUTE_MINUTES", 10)?,
            retention_days: parse_optional_var::<i64>("RETENTION_DAYS")?.filter(|d| *d > 0),
            store_timeout_secs: parse_var("STORE_TIMEOUT_SECS", 5)?,
        })
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs.max(1))
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store_timeout_secs.max(1))
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    Ok(parse_optional_var(name)?.unwrap_or(default))
}

fn parse_optional_var<T>(name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("Invalid value for {}: {} ({})", name, raw, e)),
        _ => Ok(None),
    }
}
