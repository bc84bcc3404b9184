//! # Topics Feature
//!
//! Named sub-threads for free-text notes: create, list, close and forward.
//!
//! - **Version**: 1.1.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.1.0: Closing a topic keeps its notes; forwarding a closed topic is empty
//! - 1.0.0: Initial topic lifecycle

use anyhow::Result;
use log::{debug, info};
use std::sync::Arc;

use crate::core::{Message, SessionId, StoreError, Topic, TopicId};
use crate::database::EventStore;

#[derive(Clone)]
pub struct TopicRouter {
    store: Arc<dyn EventStore>,
}

impl TopicRouter {
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        TopicRouter { store }
    }

    /// Persist a new topic under a fresh random id
    pub async fn create_topic(&self, session_id: SessionId, name: &str) -> Result<TopicId> {
        let topic = Topic {
            id: TopicId::generate(),
            session_id,
            name: name.trim().to_string(),
        };
        self.store.add_topic(&topic).await?;
        info!("Created topic {} for session {session_id}", topic.id);
        Ok(topic.id)
    }

    /// Remove a topic; its notes stay in the message log
    pub async fn close_topic(&self, session_id: SessionId, topic_id: &TopicId) -> Result<()> {
        self.store.remove_topic(session_id, topic_id).await?;
        info!("Closed topic {topic_id} for session {session_id}");
        Ok(())
    }

    /// Open topics in insertion order
    pub async fn list_topics(&self, session_id: SessionId) -> Result<Vec<Topic>> {
        Ok(self.store.list_topics(session_id).await?)
    }

    /// 1-based lookup as shown by [`render_topic_list`]
    pub async fn topic_at(&self, session_id: SessionId, position: i64) -> Result<Option<Topic>> {
        if position < 1 {
            return Ok(None);
        }
        let topics = self.list_topics(session_id).await?;
        Ok(topics.into_iter().nth(position as usize - 1))
    }

    /// Notes of an open topic in chronological order
    ///
    /// A closed or unknown topic yields an empty list.
    pub async fn forward_topic(
        &self,
        session_id: SessionId,
        topic_id: &TopicId,
    ) -> Result<Vec<Message>> {
        let open = match self.store.list_topics(session_id).await {
            Ok(topics) => topics.iter().any(|t| &t.id == topic_id),
            Err(StoreError::NotFound(_)) => false,
            Err(e) => return Err(e.into()),
        };
        if !open {
            debug!("Topic {topic_id} unavailable for session {session_id}");
            return Ok(Vec::new());
        }
        Ok(self.store.list_messages_by_topic(session_id, topic_id).await?)
    }
}

/// Numbered list for the topics command
pub fn render_topic_list(topics: &[Topic]) -> String {
    if topics.is_empty() {
        return "No open topics. Use /newtopic to start one.".to_string();
    }
    let mut out = String::from("Open topics:\n");
    for (idx, topic) in topics.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", idx + 1, topic.name));
    }
    out.push_str("Use /topic <number> to write into one, /forward <number> to replay it.");
    out
}
