//! Inbound dispatch
//!
//! Every inbound text and slash command for a session passes through
//! [`CommandHandler`], which serializes work per session, routes commands to
//! the registry and plain text to the conversation engine, and turns errors
//! into user-facing replies.

use anyhow::Result;
use log::{debug, error, info, warn};
use std::sync::Arc;
use uuid::Uuid;

use crate::commands::context::CommandContext;
use crate::commands::handler::CommandInvocation;
use crate::commands::registry::CommandRegistry;
use crate::core::{is_not_found, SessionId};
use crate::database::EventStore;
use crate::features::session::SessionLocks;
use crate::transport::{InboundText, Reply};

/// Reply for any command or text on a session that has never run `/start`
pub const NOT_STARTED_REPLY: &str =
    "This chat is not tracking feedings yet. Use `/start H:M:S` first, for example `/start 3:00:00`.";

const FAILURE_REPLY: &str = "Sorry, something went wrong on my side. Please try again in a moment.";

#[derive(Clone)]
pub struct CommandHandler {
    registry: Arc<CommandRegistry>,
    context: Arc<CommandContext>,
    locks: SessionLocks,
}

impl CommandHandler {
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        CommandHandler {
            registry: Arc::new(CommandRegistry::with_all_handlers()),
            context: Arc::new(CommandContext::new(store)),
            locks: SessionLocks::new(),
        }
    }

    /// Handle one inbound text: `/name arg` runs a command, anything else
    /// goes through the session's conversation mode
    pub async fn handle_message(&self, inbound: &InboundText) -> Vec<Reply> {
        if let Some(invocation) = parse_text_command(inbound) {
            return self.handle_command(&invocation).await;
        }

        let request_id = Uuid::new_v4();
        debug!(
            "[{request_id}] Text from session {} ({} chars)",
            inbound.session_id,
            inbound.text.len()
        );

        let _guard = self.locks.acquire(inbound.session_id).await;
        let result = self.context.conversation.handle_text(inbound).await;
        self.finish(request_id, inbound.session_id, "text", result)
    }

    /// Run one command under the session's lock
    pub async fn handle_command(&self, invocation: &CommandInvocation) -> Vec<Reply> {
        let Some(handler) = self.registry.get(&invocation.name) else {
            return vec![Reply::text(format!(
                "Unknown command /{}. Use /help to see what I understand.",
                invocation.name
            ))];
        };

        let request_id = Uuid::new_v4();
        info!(
            "[{request_id}] /{} for session {}",
            invocation.name, invocation.session_id
        );

        let guard = self.locks.acquire(invocation.session_id).await;
        let result = handler.handle(Arc::clone(&self.context), invocation).await;
        drop(guard);

        if invocation.name == "stop" && result.is_ok() {
            self.locks.forget(invocation.session_id);
        }
        self.finish(request_id, invocation.session_id, &invocation.name, result)
    }

    fn finish(
        &self,
        request_id: Uuid,
        session_id: SessionId,
        what: &str,
        result: Result<Vec<Reply>>,
    ) -> Vec<Reply> {
        match result {
            Ok(replies) => replies,
            Err(e) if is_not_found(&e) => {
                debug!("[{request_id}] {what} on untracked session {session_id}: {e}");
                vec![Reply::text(NOT_STARTED_REPLY)]
            }
            Err(e) => {
                error!("[{request_id}] {what} failed for session {session_id}: {e:#}");
                vec![Reply::text(FAILURE_REPLY)]
            }
        }
    }

    /// Number of sessions with a live lock entry
    pub fn active_sessions(&self) -> usize {
        self.locks.len()
    }
}

/// `"/name rest"` as a command invocation; `None` for ordinary text
pub fn parse_text_command(inbound: &InboundText) -> Option<CommandInvocation> {
    let body = inbound.text.trim().strip_prefix('/')?;
    let (name, arg) = match body.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, Some(arg.to_string())),
        None => (body, None),
    };
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        warn!("Ignoring malformed command text from session {}", inbound.session_id);
        return None;
    }
    Some(CommandInvocation::new(
        inbound.session_id,
        name,
        arg,
        inbound.timestamp,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SessionMode;
    use crate::database::testing::FlakyStore;
    use crate::database::Database;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap()
    }

    fn text(session_id: SessionId, body: &str, id: i64) -> InboundText {
        InboundText {
            session_id,
            text: body.to_string(),
            transport_message_id: id,
            timestamp: t0() + Duration::minutes(id),
        }
    }

    async fn handler() -> (CommandHandler, Arc<Database>) {
        let db = Arc::new(Database::in_memory().await.unwrap());
        (CommandHandler::new(db.clone()), db)
    }

    fn single_text(replies: &[Reply]) -> &str {
        match replies {
            [Reply::Text(text)] => text,
            other => panic!("expected one text reply, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_text_command() {
        let invocation = parse_text_command(&text(1, " /Start 3:00:00 ", 0)).unwrap();
        assert_eq!(invocation.name, "start");
        assert_eq!(invocation.arg(), Some("3:00:00"));
        assert_eq!(invocation.now, t0());

        let bare = parse_text_command(&text(1, "/stats", 0)).unwrap();
        assert_eq!(bare.arg(), None);

        assert!(parse_text_command(&text(1, "120", 0)).is_none());
        assert!(parse_text_command(&text(1, "/", 0)).is_none());
        assert!(parse_text_command(&text(1, "/ 120", 0)).is_none());
    }

    #[tokio::test]
    async fn test_untracked_session_gets_start_hint() {
        let (handler, db) = handler().await;
        let replies = handler.handle_message(&text(1, "120", 0)).await;
        assert_eq!(single_text(&replies), NOT_STARTED_REPLY);

        let replies = handler.handle_message(&text(1, "/stats", 1)).await;
        assert_eq!(single_text(&replies), NOT_STARTED_REPLY);
        assert!(db.list_sessions(crate::database::SessionFilter::All).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_full_conversation() {
        let (handler, db) = handler().await;
        handler.handle_message(&text(1, "/start 3:00:00", 0)).await;

        let replies = handler.handle_message(&text(1, "120", 1)).await;
        assert!(single_text(&replies).contains("120 ml"));
        let replies = handler.handle_message(&text(1, "-30m 80", 2)).await;
        assert!(single_text(&replies).contains("80 ml"));

        let events = db.list_events(1).await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].timestamp, t0() + Duration::minutes(2) - Duration::minutes(30));

        handler.handle_message(&text(1, "/newtopic", 3)).await;
        handler.handle_message(&text(1, "sleep", 4)).await;
        let replies = handler.handle_message(&text(1, "napped 2h", 5)).await;
        assert!(replies.is_empty());
        handler.handle_message(&text(1, ".", 6)).await;
        assert_eq!(db.get_session(1).await.unwrap().mode, SessionMode::Idle);

        let replies = handler.handle_message(&text(1, "/forward 1", 7)).await;
        assert_eq!(
            replies[1..],
            [Reply::Forward { origin: 1, transport_message_id: 5 }]
        );
    }

    #[tokio::test]
    async fn test_stop_releases_lock_entry() {
        let (handler, _db) = handler().await;
        handler.handle_message(&text(1, "/start 1:00:00", 0)).await;
        handler.handle_message(&text(1, "90", 1)).await;
        assert_eq!(handler.active_sessions(), 1);

        handler.handle_message(&text(1, "/stop", 2)).await;
        assert_eq!(handler.active_sessions(), 0);

        let replies = handler.handle_message(&text(1, "90", 3)).await;
        assert_eq!(single_text(&replies), NOT_STARTED_REPLY);
    }

    #[tokio::test]
    async fn test_unknown_command() {
        let (handler, _db) = handler().await;
        let replies = handler.handle_message(&text(1, "/dance", 0)).await;
        assert!(single_text(&replies).starts_with("Unknown command /dance"));
    }

    #[tokio::test]
    async fn test_store_failure_gets_generic_reply() {
        let db = Database::in_memory().await.unwrap();
        let store = Arc::new(FlakyStore { inner: db, broken: vec![1] });
        let handler = CommandHandler::new(store);

        let replies = handler.handle_message(&text(1, "120", 0)).await;
        assert_eq!(single_text(&replies), FAILURE_REPLY);
    }

    #[tokio::test]
    async fn test_sessions_are_independent() {
        let (handler, db) = handler().await;
        handler.handle_message(&text(1, "/start 1:00:00", 0)).await;
        handler.handle_message(&text(2, "/start 2:00:00", 0)).await;

        let first = text(1, "100", 1);
        let second = text(2, "200", 1);
        let (a, b) = tokio::join!(
            handler.handle_message(&first),
            handler.handle_message(&second),
        );
        assert_eq!(a.len(), 1);
        assert_eq!(b.len(), 1);
        assert_eq!(db.list_events(1).await.unwrap()[0].amount, 100);
        assert_eq!(db.list_events(2).await.unwrap()[0].amount, 200);
    }
}
