//! Topic command handlers
//!
//! Handles: newtopic, topics, topic, closetopic, forward
//!
//! - **Version**: 1.1.0
//! - **Since**: 1.0.0
//!
//! ## Changelog
//! - 1.1.0: `/newtopic <name>` creates the topic in one step
//! - 1.0.0: Initial topic commands

use anyhow::Result;
use async_trait::async_trait;
use log::info;
use std::sync::Arc;

use crate::commands::context::CommandContext;
use crate::commands::handler::{CommandInvocation, SlashCommandHandler};
use crate::core::Topic;
use crate::features::session::Input;
use crate::features::topics::render_topic_list;
use crate::transport::Reply;

/// Handler for topic commands: newtopic, topics, topic, closetopic, forward
pub struct TopicsHandler;

#[async_trait]
impl SlashCommandHandler for TopicsHandler {
    fn command_names(&self) -> &'static [&'static str] {
        &["newtopic", "topics", "topic", "closetopic", "forward"]
    }

    async fn handle(
        &self,
        ctx: Arc<CommandContext>,
        invocation: &CommandInvocation,
    ) -> Result<Vec<Reply>> {
        ctx.require_session(invocation.session_id).await?;

        match invocation.name.as_str() {
            "newtopic" => self.handle_new_topic(&ctx, invocation).await,
            "topics" => {
                let topics = ctx.topics.list_topics(invocation.session_id).await?;
                Ok(vec![Reply::text(render_topic_list(&topics))])
            }
            "topic" => self.handle_select(&ctx, invocation).await,
            "closetopic" => self.handle_close(&ctx, invocation).await,
            "forward" => self.handle_forward(&ctx, invocation).await,
            _ => Ok(Vec::new()),
        }
    }
}

/// 1-based topic number from the command argument
fn parse_position(arg: Option<&str>) -> Option<i64> {
    arg?.trim().parse().ok()
}

impl TopicsHandler {
    /// Resolve the numbered topic or build the reply explaining why not
    async fn resolve(
        &self,
        ctx: &CommandContext,
        invocation: &CommandInvocation,
    ) -> Result<Result<Topic, Reply>> {
        let Some(position) = parse_position(invocation.arg()) else {
            return Ok(Err(Reply::text(format!(
                "Usage: `/{} <number>`. Use /topics to see the numbers.",
                invocation.name
            ))));
        };
        match ctx.topics.topic_at(invocation.session_id, position).await? {
            Some(topic) => Ok(Ok(topic)),
            None => Ok(Err(Reply::text(format!(
                "There is no topic number {position}. Use /topics to see the open ones."
            )))),
        }
    }

    /// Handle /newtopic - with a name it is created at once, otherwise the next text names it
    async fn handle_new_topic(
        &self,
        ctx: &CommandContext,
        invocation: &CommandInvocation,
    ) -> Result<Vec<Reply>> {
        let session_id = invocation.session_id;
        let Some(name) = invocation.arg() else {
            ctx.conversation.apply(session_id, Input::RequestNewTopic).await?;
            return Ok(vec![Reply::text("Send the name of the new topic.")]);
        };

        let topic_id = ctx.topics.create_topic(session_id, name).await?;
        ctx.conversation
            .apply(session_id, Input::SelectTopic(topic_id))
            .await?;
        Ok(vec![Reply::text(format!(
            "Topic \"{name}\" started. Everything you send now is filed there; send \".\" to finish."
        ))])
    }

    /// Handle /topic - write into an existing topic
    async fn handle_select(
        &self,
        ctx: &CommandContext,
        invocation: &CommandInvocation,
    ) -> Result<Vec<Reply>> {
        let topic = match self.resolve(ctx, invocation).await? {
            Ok(topic) => topic,
            Err(reply) => return Ok(vec![reply]),
        };
        ctx.conversation
            .apply(invocation.session_id, Input::SelectTopic(topic.id))
            .await?;
        Ok(vec![Reply::text(format!(
            "Writing into topic \"{}\". Send \".\" to finish.",
            topic.name
        ))])
    }

    /// Handle /closetopic - close it, leaving topic mode if it was the active one
    async fn handle_close(
        &self,
        ctx: &CommandContext,
        invocation: &CommandInvocation,
    ) -> Result<Vec<Reply>> {
        let topic = match self.resolve(ctx, invocation).await? {
            Ok(topic) => topic,
            Err(reply) => return Ok(vec![reply]),
        };
        ctx.topics.close_topic(invocation.session_id, &topic.id).await?;

        let mode = ctx.conversation.mode(invocation.session_id).await?;
        if mode.active_topic() == Some(&topic.id) {
            ctx.conversation
                .apply(invocation.session_id, Input::Reset)
                .await?;
        }
        Ok(vec![Reply::text(format!("Closed topic \"{}\".", topic.name))])
    }

    /// Handle /forward - replay a topic's notes in order
    async fn handle_forward(
        &self,
        ctx: &CommandContext,
        invocation: &CommandInvocation,
    ) -> Result<Vec<Reply>> {
        let topic = match self.resolve(ctx, invocation).await? {
            Ok(topic) => topic,
            Err(reply) => return Ok(vec![reply]),
        };
        let notes = ctx
            .topics
            .forward_topic(invocation.session_id, &topic.id)
            .await?;
        if notes.is_empty() {
            return Ok(vec![Reply::text(format!(
                "Topic \"{}\" has no notes yet.",
                topic.name
            ))]);
        }

        info!(
            "Forwarding {} notes of topic {} in session {}",
            notes.len(),
            topic.id,
            invocation.session_id
        );
        let mut replies = vec![Reply::text(format!("Notes in topic \"{}\":", topic.name))];
        replies.extend(notes.into_iter().map(|note| Reply::Forward {
            origin: note.session_id,
            transport_message_id: note.transport_message_id,
        }));
        Ok(replies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{is_not_found, NewMessage, Session, SessionMode};
    use crate::database::{Database, EventStore};
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap()
    }

    async fn setup() -> (Arc<CommandContext>, Arc<Database>) {
        let db = Arc::new(Database::in_memory().await.unwrap());
        db.upsert_session(&Session::new(1)).await.unwrap();
        (Arc::new(CommandContext::new(db.clone())), db)
    }

    async fn run(ctx: &Arc<CommandContext>, name: &str, arg: Option<&str>) -> Vec<Reply> {
        let invocation = CommandInvocation::new(1, name, arg.map(str::to_string), now());
        TopicsHandler.handle(ctx.clone(), &invocation).await.unwrap()
    }

    #[test]
    fn test_parse_position() {
        assert_eq!(parse_position(Some("2")), Some(2));
        assert_eq!(parse_position(Some("two")), None);
        assert_eq!(parse_position(None), None);
    }

    #[tokio::test]
    async fn test_newtopic_without_name_awaits_name() {
        let (ctx, db) = setup().await;
        run(&ctx, "newtopic", None).await;
        assert_eq!(db.get_session(1).await.unwrap().mode, SessionMode::AwaitingTopicName);
        assert!(db.list_topics(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_newtopic_with_name_selects_it() {
        let (ctx, db) = setup().await;
        run(&ctx, "newtopic", Some("doctor")).await;

        let topics = db.list_topics(1).await.unwrap();
        assert_eq!(topics.len(), 1);
        assert_eq!(
            db.get_session(1).await.unwrap().mode,
            SessionMode::AwaitingTopicMessage(topics[0].id.clone())
        );
    }

    #[tokio::test]
    async fn test_select_and_close_active_topic() {
        let (ctx, db) = setup().await;
        let sleep = ctx.topics.create_topic(1, "sleep").await.unwrap();
        ctx.topics.create_topic(1, "doctor").await.unwrap();

        run(&ctx, "topic", Some("1")).await;
        assert_eq!(
            db.get_session(1).await.unwrap().mode,
            SessionMode::AwaitingTopicMessage(sleep)
        );

        let replies = run(&ctx, "closetopic", Some("1")).await;
        assert_eq!(replies, vec![Reply::text("Closed topic \"sleep\".")]);
        assert_eq!(db.get_session(1).await.unwrap().mode, SessionMode::Idle);

        let listed = match run(&ctx, "topics", None).await.as_slice() {
            [Reply::Text(text)] => text.clone(),
            other => panic!("unexpected {other:?}"),
        };
        assert!(listed.contains("1. doctor"));
        assert!(!listed.contains("sleep"));
    }

    #[tokio::test]
    async fn test_close_other_topic_keeps_mode() {
        let (ctx, db) = setup().await;
        ctx.topics.create_topic(1, "sleep").await.unwrap();
        let doctor = ctx.topics.create_topic(1, "doctor").await.unwrap();

        run(&ctx, "topic", Some("2")).await;
        run(&ctx, "closetopic", Some("1")).await;
        assert_eq!(
            db.get_session(1).await.unwrap().mode,
            SessionMode::AwaitingTopicMessage(doctor)
        );
    }

    #[tokio::test]
    async fn test_bad_position_replies_with_usage() {
        let (ctx, db) = setup().await;
        let replies = run(&ctx, "topic", Some("3")).await;
        assert_eq!(replies.len(), 1);
        let replies = run(&ctx, "forward", None).await;
        assert_eq!(replies.len(), 1);
        assert_eq!(db.get_session(1).await.unwrap().mode, SessionMode::Idle);
    }

    #[tokio::test]
    async fn test_forward_replays_notes_in_order() {
        let (ctx, db) = setup().await;
        let topic = ctx.topics.create_topic(1, "sleep").await.unwrap();
        for (id, minutes) in [(30, 20), (10, 5)] {
            db.add_message(
                1,
                NewMessage {
                    topic_id: Some(topic.clone()),
                    transport_message_id: id,
                    content: format!("note {id}"),
                    timestamp: now() + Duration::minutes(minutes),
                },
            )
            .await
            .unwrap();
        }

        let replies = run(&ctx, "forward", Some("1")).await;
        assert_eq!(
            replies[1..],
            [
                Reply::Forward { origin: 1, transport_message_id: 10 },
                Reply::Forward { origin: 1, transport_message_id: 30 },
            ]
        );
    }

    #[tokio::test]
    async fn test_forward_empty_topic() {
        let (ctx, _db) = setup().await;
        ctx.topics.create_topic(1, "sleep").await.unwrap();
        let replies = run(&ctx, "forward", Some("1")).await;
        assert_eq!(replies, vec![Reply::text("Topic \"sleep\" has no notes yet.")]);
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let (ctx, _db) = setup().await;
        let invocation = CommandInvocation::new(5, "topics", None, now());
        let err = TopicsHandler.handle(ctx, &invocation).await.unwrap_err();
        assert!(is_not_found(&err));
    }
}
