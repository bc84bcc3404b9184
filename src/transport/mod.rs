//! # Messaging Transport
//!
//! Inbound text arrives as [`InboundText`]; outbound traffic is a list of
//! [`Reply`] values delivered through a [`Transport`].
//!
//! - **Version**: 1.1.0
//! - **Since**: 1.0.0
//!
//! ## Changelog
//! - 1.1.0: Best-effort batch delivery
//! - 1.0.0: Transport trait and Discord implementation

pub mod discord;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::warn;

use crate::core::{SessionId, TransportError};

pub use discord::DiscordTransport;

/// One text message received from a user
#[derive(Debug, Clone, PartialEq)]
pub struct InboundText {
    pub session_id: SessionId,
    pub text: String,
    pub transport_message_id: i64,
    pub timestamp: DateTime<Utc>,
}

/// Something to send back to a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    /// Re-deliver a stored message from `origin`
    Forward {
        origin: SessionId,
        transport_message_id: i64,
    },
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Reply::Text(text.into())
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send_text(&self, session_id: SessionId, text: &str) -> Result<(), TransportError>;

    async fn forward_message(
        &self,
        session_id: SessionId,
        origin: SessionId,
        transport_message_id: i64,
    ) -> Result<(), TransportError>;
}

/// Deliver replies in order; a failed reply is logged and the rest still go out
///
/// Returns the number of replies that failed.
pub async fn deliver(transport: &dyn Transport, session_id: SessionId, replies: &[Reply]) -> usize {
    let mut failed = 0;
    for reply in replies {
        let result = match reply {
            Reply::Text(text) => transport.send_text(session_id, text).await,
            Reply::Forward {
                origin,
                transport_message_id,
            } => {
                transport
                    .forward_message(session_id, *origin, *transport_message_id)
                    .await
            }
        };
        if let Err(e) = result {
            warn!("Failed to deliver reply to session {session_id}: {e}");
            failed += 1;
        }
    }
    failed
}
