//! Discord transport over serenity's HTTP client
//!
//! Sessions are channel ids. Discord has no native forward, so a forwarded
//! message is fetched from its origin channel and re-posted as a quote.

use async_trait::async_trait;
use log::debug;
use serenity::http::{Http, HttpError};
use serenity::model::id::{ChannelId, MessageId};
use std::sync::Arc;

use super::Transport;
use crate::core::{chunk_for_message, SessionId, TransportError};

pub struct DiscordTransport {
    http: Arc<Http>,
}

impl DiscordTransport {
    pub fn new(http: Arc<Http>) -> Self {
        DiscordTransport { http }
    }

    fn channel(session_id: SessionId) -> ChannelId {
        ChannelId(session_id as u64)
    }
}

fn classify(error: serenity::Error, what: String) -> TransportError {
    match &error {
        serenity::Error::Http(http) => match http.as_ref() {
            HttpError::UnsuccessfulRequest(response) if response.status_code.as_u16() == 404 => {
                TransportError::NotFound(what)
            }
            _ => TransportError::Failed(format!("{what}: {error}")),
        },
        _ => TransportError::Failed(format!("{what}: {error}")),
    }
}

/// Prefix every line with `> ` so the re-post reads as a quote
fn quote(content: &str) -> String {
    content
        .lines()
        .map(|line| format!("> {line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl Transport for DiscordTransport {
    async fn send_text(&self, session_id: SessionId, text: &str) -> Result<(), TransportError> {
        let channel = Self::channel(session_id);
        for chunk in chunk_for_message(text) {
            if chunk.is_empty() {
                continue;
            }
            channel
                .say(&self.http, chunk)
                .await
                .map_err(|e| classify(e, format!("channel {session_id}")))?;
        }
        Ok(())
    }

    async fn forward_message(
        &self,
        session_id: SessionId,
        origin: SessionId,
        transport_message_id: i64,
    ) -> Result<(), TransportError> {
        let original = Self::channel(origin)
            .message(&self.http, MessageId(transport_message_id as u64))
            .await
            .map_err(|e| classify(e, format!("message {transport_message_id}")))?;

        debug!(
            "Forwarding message {} from {} to {}",
            transport_message_id, origin, session_id
        );
        self.send_text(session_id, &quote(&original.content)).await
    }
}
