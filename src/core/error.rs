//! Error taxonomy for store and transport boundaries
//!
//! Parse mismatches are not errors (parsers return `Option`). Everything the
//! callers need to tell apart is an enum variant here; the rest travels as
//! `anyhow::Error`.

use thiserror::Error;

/// Failures of the event store
#[derive(Debug, Error)]
pub enum StoreError {
    /// The referenced session, topic or event does not exist
    #[error("{0} not found")]
    NotFound(String),

    /// Transient infrastructure failure (I/O, lock poisoning, timeout)
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlite::Error> for StoreError {
    fn from(e: sqlite::Error) -> Self {
        StoreError::Unavailable(e.to_string())
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Failures of the messaging transport
#[derive(Debug, Error)]
pub enum TransportError {
    /// The origin message or destination is gone
    #[error("{0} not found on transport")]
    NotFound(String),

    #[error("delivery failed: {0}")]
    Failed(String),
}

/// Whether an `anyhow` error chain is a store "not found"
pub fn is_not_found(error: &anyhow::Error) -> bool {
    matches!(
        error.downcast_ref::<StoreError>(),
        Some(StoreError::NotFound(_))
    )
}
