//! Conversation engine
//!
//! Applies the state machine to a stored session and persists the outcome.
//! Callers serialize per session (see [`super::SessionLocks`]).

use anyhow::Result;
use log::debug;
use std::sync::Arc;

use super::machine::{transition, Effect, Input, Transition};
use crate::core::{NewMessage, SessionId, SessionMode, Topic, TopicId};
use crate::database::{EventStore, InboundRecord};
use crate::transport::{InboundText, Reply};

#[derive(Clone)]
pub struct ConversationEngine {
    store: Arc<dyn EventStore>,
}

impl ConversationEngine {
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        ConversationEngine { store }
    }

    /// Route one inbound text according to the session's mode
    ///
    /// The raw text is always logged as a message. Unknown sessions surface
    /// as `StoreError::NotFound`.
    pub async fn handle_text(&self, inbound: &InboundText) -> Result<Vec<Reply>> {
        let session = self.store.get_session(inbound.session_id).await?;
        let Transition { mode, effect } = transition(
            &session.mode,
            Input::Text {
                text: &inbound.text,
                at: inbound.timestamp,
            },
            TopicId::generate,
        );

        let mut record = InboundRecord {
            session_id: session.id,
            message: NewMessage {
                topic_id: None,
                transport_message_id: inbound.transport_message_id,
                content: inbound.text.clone(),
                timestamp: inbound.timestamp,
            },
            event: None,
            topic: None,
            mode: mode.clone(),
        };

        let mut replies = Vec::new();
        match effect {
            Effect::None => {
                if mode == SessionMode::Idle && session.mode != SessionMode::Idle {
                    replies.push(Reply::text("Back to logging feedings."));
                }
            }
            Effect::RecordEvent(event) => {
                replies.push(Reply::text(format!(
                    "Recorded feeding: {} ml at {}",
                    event.amount,
                    event.timestamp.format("%Y-%m-%d %H:%M UTC")
                )));
                record.event = Some(event);
            }
            Effect::CreateTopic { id, name } => {
                replies.push(Reply::text(format!(
                    "Topic \"{name}\" started. Everything you send now is filed there; send \".\" to finish."
                )));
                record.topic = Some(Topic {
                    id,
                    session_id: session.id,
                    name,
                });
            }
            Effect::RecordNote(topic) => {
                record.message.topic_id = Some(topic);
            }
        }

        self.store.commit_inbound(record).await?;
        debug!(
            "Session {} handled text, mode {} -> {}",
            session.id,
            session.mode.encode(),
            mode.encode()
        );
        Ok(replies)
    }

    /// Apply a command-driven input (new topic, select, reset) and persist the mode
    pub async fn apply(&self, session_id: SessionId, input: Input<'_>) -> Result<SessionMode> {
        let mut session = self.store.get_session(session_id).await?;
        let Transition { mode, .. } = transition(&session.mode, input, TopicId::generate);
        if mode != session.mode {
            session.mode = mode.clone();
            self.store.upsert_session(&session).await?;
        }
        Ok(mode)
    }

    pub async fn mode(&self, session_id: SessionId) -> Result<SessionMode> {
        Ok(self.store.get_session(session_id).await?.mode)
    }
}
