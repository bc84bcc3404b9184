//! Shared context for command handlers
//!
//! - **Version**: 2.0.0
//! - **Since**: 3.38.0
//!
//! ## Changelog
//! - 2.0.0: Event store, conversation engine and topic router
//! - 1.0.0: Initial implementation with core shared state

use anyhow::Result;
use std::sync::Arc;

use crate::core::{Session, SessionId};
use crate::database::EventStore;
use crate::features::session::ConversationEngine;
use crate::features::topics::TopicRouter;

/// Shared context for all command handlers
///
/// Contains the services most handlers need:
/// - EventStore for sessions and events
/// - ConversationEngine for mode changes
/// - TopicRouter for the topic lifecycle
#[derive(Clone)]
pub struct CommandContext {
    pub store: Arc<dyn EventStore>,
    pub conversation: ConversationEngine,
    pub topics: TopicRouter,
}

impl CommandContext {
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self {
            conversation: ConversationEngine::new(Arc::clone(&store)),
            topics: TopicRouter::new(Arc::clone(&store)),
            store,
        }
    }

    /// Load the session or fail with `StoreError::NotFound`
    pub async fn require_session(&self, session_id: SessionId) -> Result<Session> {
        Ok(self.store.get_session(session_id).await?)
    }
}
