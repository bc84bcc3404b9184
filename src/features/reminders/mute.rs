//! Mute table: per-session "no reminders until" timestamps
//!
//! Process-local and safe to lose; a restart costs at most one duplicate
//! reminder per session.

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::core::SessionId;

#[derive(Debug, Default)]
pub struct MuteTable {
    entries: DashMap<SessionId, DateTime<Utc>>,
}

impl MuteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_muted(&self, session_id: SessionId, now: DateTime<Utc>) -> bool {
        self.entries
            .get(&session_id)
            .map(|until| *until > now)
            .unwrap_or(false)
    }

    /// Atomically mute `session_id` until `until` unless it is muted at `now`
    ///
    /// Returns `true` when the caller won the right to notify.
    pub fn try_mute(&self, session_id: SessionId, now: DateTime<Utc>, until: DateTime<Utc>) -> bool {
        match self.entries.entry(session_id) {
            Entry::Occupied(mut entry) => {
                if *entry.get() > now {
                    false
                } else {
                    entry.insert(until);
                    true
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(until);
                true
            }
        }
    }

    pub fn muted_until(&self, session_id: SessionId) -> Option<DateTime<Utc>> {
        self.entries.get(&session_id).map(|until| *until)
    }

    /// Drop expired entries
    pub fn prune(&self, now: DateTime<Utc>) {
        self.entries.retain(|_, until| *until > now);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
