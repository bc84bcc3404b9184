//! Domain records shared by the store, the features and the transport
//!
//! - **Version**: 1.1.0
//! - **Since**: 1.0.0
//!
//! ## Changelog
//! - 1.1.0: Topic ids are random 128-bit identifiers instead of counters
//! - 1.0.0: Initial session, event, topic and message records

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

/// Transport-level conversation identifier (a Discord channel id, stored signed)
pub type SessionId = i64;

/// Identifier of a topic, unique across sessions and time
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TopicId(String);

impl TopicId {
    /// Generate a fresh random topic id
    pub fn generate() -> Self {
        TopicId(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TopicId {
    fn from(value: &str) -> Self {
        TopicId(value.to_string())
    }
}

impl std::fmt::Display for TopicId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Conversational mode of a session
///
/// Stored as `"<code> [topic]"`: `0` is idle, `1` is topic-related and the
/// presence of a topic id tells "awaiting a message" apart from "awaiting a name".
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionMode {
    /// Quantities and offset quantities are recorded as events
    #[default]
    Idle,
    /// The next text names a new topic
    AwaitingTopicName,
    /// Text is stored as a note under the topic
    AwaitingTopicMessage(TopicId),
}

impl SessionMode {
    /// Encode the mode for the `sessions.mode` column
    pub fn encode(&self) -> String {
        match self {
            SessionMode::Idle => "0".to_string(),
            SessionMode::AwaitingTopicName => "1".to_string(),
            SessionMode::AwaitingTopicMessage(topic) => format!("1 {topic}"),
        }
    }

    /// Decode a stored mode, falling back to `Idle` for anything unrecognised
    pub fn decode(raw: &str) -> Self {
        let mut parts = raw.split_whitespace();
        match (parts.next(), parts.next(), parts.next()) {
            (Some("1"), None, None) => SessionMode::AwaitingTopicName,
            (Some("1"), Some(topic), None) => SessionMode::AwaitingTopicMessage(topic.into()),
            _ => SessionMode::Idle,
        }
    }

    /// Topic the session is currently writing into, if any
    pub fn active_topic(&self) -> Option<&TopicId> {
        match self {
            SessionMode::AwaitingTopicMessage(topic) => Some(topic),
            _ => None,
        }
    }
}

/// A tracked conversation
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub id: SessionId,
    /// Feeding interval in seconds; `None` disables reminders
    pub period_secs: Option<i64>,
    pub mode: SessionMode,
}

impl Session {
    pub fn new(id: SessionId) -> Self {
        Session {
            id,
            period_secs: None,
            mode: SessionMode::Idle,
        }
    }

    /// Configured period, only when it is strictly positive
    pub fn period(&self) -> Option<Duration> {
        self.period_secs
            .filter(|secs| *secs > 0)
            .and_then(Duration::try_seconds)
    }
}

/// One recorded feeding
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub id: i64,
    pub session_id: SessionId,
    /// Quantity in millilitres
    pub amount: i64,
    pub timestamp: DateTime<Utc>,
}

/// Event data before the store assigns an id
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub amount: i64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Topic {
    pub id: TopicId,
    pub session_id: SessionId,
    pub name: String,
}

/// One inbound text, optionally tagged with a topic
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: i64,
    pub session_id: SessionId,
    /// Weak reference: the topic may have been closed since
    pub topic_id: Option<TopicId>,
    pub transport_message_id: i64,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewMessage {
    pub topic_id: Option<TopicId>,
    pub transport_message_id: i64,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_encoding() {
        assert_eq!(SessionMode::Idle.encode(), "0");
        assert_eq!(SessionMode::AwaitingTopicName.encode(), "1");
        let topic = TopicId::from("abc");
        assert_eq!(SessionMode::AwaitingTopicMessage(topic).encode(), "1 abc");
    }

    #[test]
    fn test_mode_decoding() {
        assert_eq!(SessionMode::decode("0"), SessionMode::Idle);
        assert_eq!(SessionMode::decode("1"), SessionMode::AwaitingTopicName);
        assert_eq!(
            SessionMode::decode("1 abc"),
            SessionMode::AwaitingTopicMessage(TopicId::from("abc"))
        );
    }

    #[test]
    fn test_mode_decoding_falls_back_to_idle() {
        assert_eq!(SessionMode::decode(""), SessionMode::Idle);
        assert_eq!(SessionMode::decode("garbage"), SessionMode::Idle);
        assert_eq!(SessionMode::decode("7 abc"), SessionMode::Idle);
        assert_eq!(SessionMode::decode("1 a b"), SessionMode::Idle);
    }

    #[test]
    fn test_mode_survives_encoding() {
        let mode = SessionMode::AwaitingTopicMessage(TopicId::generate());
        assert_eq!(SessionMode::decode(&mode.encode()), mode);
    }

    #[test]
    fn test_generated_topic_ids_differ() {
        let a = TopicId::generate();
        let b = TopicId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 32);
    }

    #[test]
    fn test_period_requires_positive_value() {
        let mut session = Session::new(1);
        assert!(session.period().is_none());
        session.period_secs = Some(0);
        assert!(session.period().is_none());
        session.period_secs = Some(3600);
        assert_eq!(session.period(), Some(Duration::hours(1)));
        session.period_secs = Some(i64::MAX);
        assert!(session.period().is_none());
    }
}
