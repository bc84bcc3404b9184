//! # Event Store
//!
//! Persistence of sessions, events, topics and messages behind the
//! [`EventStore`] trait, with the SQLite implementation used by the bot.
//!
//! - **Version**: 1.2.0
//! - **Since**: 1.0.0
//!
//! ## Changelog
//! - 1.2.0: Single-transaction `commit_inbound` for the conversation path
//! - 1.1.0: Bounded timeouts on every operation
//! - 1.0.0: Initial schema with cascading session deletes

use crate::core::{
    Event, Message, NewEvent, NewMessage, Session, SessionId, SessionMode, StoreError,
    StoreResult, Topic, TopicId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info};
use sqlite::{Connection, State, Statement};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const SCHEMA: &str = "
    PRAGMA foreign_keys = ON;
    CREATE TABLE IF NOT EXISTS sessions (
        id INTEGER PRIMARY KEY,
        period_secs INTEGER,
        mode TEXT NOT NULL DEFAULT '0'
    );
    CREATE TABLE IF NOT EXISTS events (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        session_id INTEGER NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
        amount INTEGER NOT NULL,
        timestamp INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_events_session ON events(session_id, timestamp);
    CREATE TABLE IF NOT EXISTS topics (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        id TEXT NOT NULL UNIQUE,
        session_id INTEGER NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
        name TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS messages (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        session_id INTEGER NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
        topic_id TEXT,
        transport_message_id INTEGER NOT NULL,
        content TEXT NOT NULL,
        timestamp INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_messages_topic ON messages(session_id, topic_id);
";

/// Which sessions a scan should return
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionFilter {
    All,
    /// Only sessions with a configured period (reminder candidates)
    WithPeriod,
}

/// Everything one inbound text writes, committed atomically
#[derive(Debug, Clone)]
pub struct InboundRecord {
    pub session_id: SessionId,
    pub message: NewMessage,
    pub event: Option<NewEvent>,
    pub topic: Option<Topic>,
    pub mode: SessionMode,
}

/// Event Store Adapter
///
/// Every operation is atomic and distinguishes [`StoreError::NotFound`] from
/// [`StoreError::Unavailable`].
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn get_session(&self, id: SessionId) -> StoreResult<Session>;
    async fn upsert_session(&self, session: &Session) -> StoreResult<()>;
    /// Deletes the session and its events, topics and messages
    async fn delete_session(&self, id: SessionId) -> StoreResult<()>;
    async fn list_sessions(&self, filter: SessionFilter) -> StoreResult<Vec<Session>>;

    async fn add_event(&self, session_id: SessionId, event: NewEvent) -> StoreResult<Event>;
    /// Events of a session, oldest first
    async fn list_events(&self, session_id: SessionId) -> StoreResult<Vec<Event>>;
    async fn delete_event(&self, event_id: i64) -> StoreResult<()>;

    async fn add_topic(&self, topic: &Topic) -> StoreResult<()>;
    /// Topics of a session in insertion order
    async fn list_topics(&self, session_id: SessionId) -> StoreResult<Vec<Topic>>;
    /// Removes the topic; messages tagged with it are kept
    async fn remove_topic(&self, session_id: SessionId, topic_id: &TopicId) -> StoreResult<()>;

    async fn add_message(&self, session_id: SessionId, message: NewMessage) -> StoreResult<Message>;
    /// Messages tagged with a topic, in chronological order
    async fn list_messages_by_topic(
        &self,
        session_id: SessionId,
        topic_id: &TopicId,
    ) -> StoreResult<Vec<Message>>;

    /// Write an inbound message with its derived event/topic and the new mode
    async fn commit_inbound(&self, record: InboundRecord) -> StoreResult<Option<Event>>;
}

/// SQLite-backed store
///
/// The connection lives behind a mutex and every call runs on the blocking
/// pool, bounded by `timeout`.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    timeout: Duration,
}

impl Database {
    pub async fn new(path: &str, timeout: Duration) -> anyhow::Result<Self> {
        info!("Opening database at {path}");
        let conn = sqlite::open(path)?;
        conn.execute(SCHEMA)?;
        Ok(Database {
            conn: Arc::new(Mutex::new(conn)),
            timeout,
        })
    }

    /// Fresh in-memory database, used by tests
    pub async fn in_memory() -> anyhow::Result<Self> {
        Self::new(":memory:", Duration::from_secs(5)).await
    }

    async fn run<T, F>(&self, op: &'static str, f: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> StoreResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let task = tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| StoreError::Unavailable("connection lock poisoned".into()))?;
            f(&guard)
        });

        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(StoreError::Unavailable(format!("{op}: {join_err}"))),
            Err(_) => Err(StoreError::Unavailable(format!(
                "{op} timed out after {:?}",
                self.timeout
            ))),
        }
    }
}

/// Run `f` inside BEGIN/COMMIT, rolling back on error
fn in_transaction<T>(
    conn: &Connection,
    f: impl FnOnce(&Connection) -> StoreResult<T>,
) -> StoreResult<T> {
    conn.execute("BEGIN IMMEDIATE")?;
    let result = f(conn).and_then(|value| {
        conn.execute("COMMIT")?;
        Ok(value)
    });
    // A failed COMMIT can leave the transaction open on the shared connection
    if result.is_err() {
        if let Err(rollback) = conn.execute("ROLLBACK") {
            debug!("Rollback failed: {rollback}");
        }
    }
    result
}

fn to_datetime(secs: i64) -> StoreResult<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| StoreError::Unavailable(format!("stored timestamp {secs} is out of range")))
}

fn last_insert_id(conn: &Connection) -> StoreResult<i64> {
    let mut stmt = conn.prepare("SELECT last_insert_rowid()")?;
    match stmt.next()? {
        State::Row => Ok(stmt.read::<i64, _>(0)?),
        State::Done => Err(StoreError::Unavailable("no rowid after insert".into())),
    }
}

fn session_exists(conn: &Connection, id: SessionId) -> StoreResult<bool> {
    let mut stmt = conn.prepare("SELECT 1 FROM sessions WHERE id = ?")?;
    stmt.bind((1, id))?;
    Ok(matches!(stmt.next()?, State::Row))
}

fn require_session(conn: &Connection, id: SessionId) -> StoreResult<()> {
    if session_exists(conn, id)? {
        Ok(())
    } else {
        Err(StoreError::NotFound(format!("session {id}")))
    }
}

fn read_session(stmt: &Statement) -> StoreResult<Session> {
    let mode: String = stmt.read("mode")?;
    Ok(Session {
        id: stmt.read("id")?,
        period_secs: stmt.read::<Option<i64>, _>("period_secs")?,
        mode: SessionMode::decode(&mode),
    })
}

fn read_event(stmt: &Statement) -> StoreResult<Event> {
    Ok(Event {
        id: stmt.read("id")?,
        session_id: stmt.read("session_id")?,
        amount: stmt.read("amount")?,
        timestamp: to_datetime(stmt.read("timestamp")?)?,
    })
}

fn read_message(stmt: &Statement) -> StoreResult<Message> {
    let topic_id: Option<String> = stmt.read("topic_id")?;
    Ok(Message {
        id: stmt.read("id")?,
        session_id: stmt.read("session_id")?,
        topic_id: topic_id.as_deref().map(TopicId::from),
        transport_message_id: stmt.read("transport_message_id")?,
        content: stmt.read("content")?,
        timestamp: to_datetime(stmt.read("timestamp")?)?,
    })
}

fn insert_event(conn: &Connection, session_id: SessionId, event: &NewEvent) -> StoreResult<Event> {
    let mut stmt =
        conn.prepare("INSERT INTO events (session_id, amount, timestamp) VALUES (?, ?, ?)")?;
    stmt.bind((1, session_id))?;
    stmt.bind((2, event.amount))?;
    stmt.bind((3, event.timestamp.timestamp()))?;
    stmt.next()?;
    Ok(Event {
        id: last_insert_id(conn)?,
        session_id,
        amount: event.amount,
        timestamp: event.timestamp,
    })
}

fn insert_topic(conn: &Connection, topic: &Topic) -> StoreResult<()> {
    let mut stmt = conn.prepare("INSERT INTO topics (id, session_id, name) VALUES (?, ?, ?)")?;
    stmt.bind((1, topic.id.as_str()))?;
    stmt.bind((2, topic.session_id))?;
    stmt.bind((3, topic.name.as_str()))?;
    stmt.next()?;
    Ok(())
}

fn insert_message(
    conn: &Connection,
    session_id: SessionId,
    message: &NewMessage,
) -> StoreResult<Message> {
    let mut stmt = conn.prepare(
        "INSERT INTO messages (session_id, topic_id, transport_message_id, content, timestamp)
         VALUES (?, ?, ?, ?, ?)",
    )?;
    stmt.bind((1, session_id))?;
    stmt.bind((2, message.topic_id.as_ref().map(|t| t.as_str())))?;
    stmt.bind((3, message.transport_message_id))?;
    stmt.bind((4, message.content.as_str()))?;
    stmt.bind((5, message.timestamp.timestamp()))?;
    stmt.next()?;
    Ok(Message {
        id: last_insert_id(conn)?,
        session_id,
        topic_id: message.topic_id.clone(),
        transport_message_id: message.transport_message_id,
        content: message.content.clone(),
        timestamp: message.timestamp,
    })
}

fn write_mode(conn: &Connection, session_id: SessionId, mode: &SessionMode) -> StoreResult<()> {
    let mut stmt = conn.prepare("UPDATE sessions SET mode = ? WHERE id = ?")?;
    stmt.bind((1, mode.encode().as_str()))?;
    stmt.bind((2, session_id))?;
    stmt.next()?;
    Ok(())
}

#[async_trait]
impl EventStore for Database {
    async fn get_session(&self, id: SessionId) -> StoreResult<Session> {
        self.run("get_session", move |conn| {
            let mut stmt =
                conn.prepare("SELECT id, period_secs, mode FROM sessions WHERE id = ?")?;
            stmt.bind((1, id))?;
            match stmt.next()? {
                State::Row => read_session(&stmt),
                State::Done => Err(StoreError::NotFound(format!("session {id}"))),
            }
        })
        .await
    }

    async fn upsert_session(&self, session: &Session) -> StoreResult<()> {
        let session = session.clone();
        self.run("upsert_session", move |conn| {
            let mut stmt = conn.prepare(
                "INSERT INTO sessions (id, period_secs, mode) VALUES (?, ?, ?)
                 ON CONFLICT(id) DO UPDATE SET period_secs = excluded.period_secs, mode = excluded.mode",
            )?;
            stmt.bind((1, session.id))?;
            stmt.bind((2, session.period_secs))?;
            stmt.bind((3, session.mode.encode().as_str()))?;
            stmt.next()?;
            Ok(())
        })
        .await
    }

    async fn delete_session(&self, id: SessionId) -> StoreResult<()> {
        self.run("delete_session", move |conn| {
            in_transaction(conn, |conn| {
                require_session(conn, id)?;
                // Explicit deletes keep the cascade intact even if the pragma is off
                for sql in [
                    "DELETE FROM messages WHERE session_id = ?",
                    "DELETE FROM topics WHERE session_id = ?",
                    "DELETE FROM events WHERE session_id = ?",
                    "DELETE FROM sessions WHERE id = ?",
                ] {
                    let mut stmt = conn.prepare(sql)?;
                    stmt.bind((1, id))?;
                    stmt.next()?;
                }
                Ok(())
            })
        })
        .await
    }

    async fn list_sessions(&self, filter: SessionFilter) -> StoreResult<Vec<Session>> {
        self.run("list_sessions", move |conn| {
            let sql = match filter {
                SessionFilter::All => "SELECT id, period_secs, mode FROM sessions ORDER BY id",
                SessionFilter::WithPeriod => {
                    "SELECT id, period_secs, mode FROM sessions WHERE period_secs IS NOT NULL ORDER BY id"
                }
            };
            let mut stmt = conn.prepare(sql)?;
            let mut sessions = Vec::new();
            while let State::Row = stmt.next()? {
                sessions.push(read_session(&stmt)?);
            }
            Ok(sessions)
        })
        .await
    }

    async fn add_event(&self, session_id: SessionId, event: NewEvent) -> StoreResult<Event> {
        self.run("add_event", move |conn| {
            require_session(conn, session_id)?;
            insert_event(conn, session_id, &event)
        })
        .await
    }

    async fn list_events(&self, session_id: SessionId) -> StoreResult<Vec<Event>> {
        self.run("list_events", move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, session_id, amount, timestamp FROM events
                 WHERE session_id = ? ORDER BY timestamp, id",
            )?;
            stmt.bind((1, session_id))?;
            let mut events = Vec::new();
            while let State::Row = stmt.next()? {
                events.push(read_event(&stmt)?);
            }
            Ok(events)
        })
        .await
    }

    async fn delete_event(&self, event_id: i64) -> StoreResult<()> {
        self.run("delete_event", move |conn| {
            let mut stmt = conn.prepare("SELECT 1 FROM events WHERE id = ?")?;
            stmt.bind((1, event_id))?;
            if let State::Done = stmt.next()? {
                return Err(StoreError::NotFound(format!("event {event_id}")));
            }
            let mut stmt = conn.prepare("DELETE FROM events WHERE id = ?")?;
            stmt.bind((1, event_id))?;
            stmt.next()?;
            Ok(())
        })
        .await
    }

    async fn add_topic(&self, topic: &Topic) -> StoreResult<()> {
        let topic = topic.clone();
        self.run("add_topic", move |conn| {
            require_session(conn, topic.session_id)?;
            insert_topic(conn, &topic)
        })
        .await
    }

    async fn list_topics(&self, session_id: SessionId) -> StoreResult<Vec<Topic>> {
        self.run("list_topics", move |conn| {
            let mut stmt = conn
                .prepare("SELECT id, session_id, name FROM topics WHERE session_id = ? ORDER BY seq")?;
            stmt.bind((1, session_id))?;
            let mut topics = Vec::new();
            while let State::Row = stmt.next()? {
                let id: String = stmt.read("id")?;
                topics.push(Topic {
                    id: TopicId::from(id.as_str()),
                    session_id: stmt.read("session_id")?,
                    name: stmt.read("name")?,
                });
            }
            Ok(topics)
        })
        .await
    }

    async fn remove_topic(&self, session_id: SessionId, topic_id: &TopicId) -> StoreResult<()> {
        let topic_id = topic_id.clone();
        self.run("remove_topic", move |conn| {
            let mut stmt = conn.prepare("SELECT 1 FROM topics WHERE id = ? AND session_id = ?")?;
            stmt.bind((1, topic_id.as_str()))?;
            stmt.bind((2, session_id))?;
            if let State::Done = stmt.next()? {
                return Err(StoreError::NotFound(format!("topic {topic_id}")));
            }
            let mut stmt = conn.prepare("DELETE FROM topics WHERE id = ? AND session_id = ?")?;
            stmt.bind((1, topic_id.as_str()))?;
            stmt.bind((2, session_id))?;
            stmt.next()?;
            Ok(())
        })
        .await
    }

    async fn add_message(&self, session_id: SessionId, message: NewMessage) -> StoreResult<Message> {
        self.run("add_message", move |conn| {
            require_session(conn, session_id)?;
            insert_message(conn, session_id, &message)
        })
        .await
    }

    async fn list_messages_by_topic(
        &self,
        session_id: SessionId,
        topic_id: &TopicId,
    ) -> StoreResult<Vec<Message>> {
        let topic_id = topic_id.clone();
        self.run("list_messages_by_topic", move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, session_id, topic_id, transport_message_id, content, timestamp
                 FROM messages WHERE session_id = ? AND topic_id = ? ORDER BY timestamp, id",
            )?;
            stmt.bind((1, session_id))?;
            stmt.bind((2, topic_id.as_str()))?;
            let mut messages = Vec::new();
            while let State::Row = stmt.next()? {
                messages.push(read_message(&stmt)?);
            }
            Ok(messages)
        })
        .await
    }

    async fn commit_inbound(&self, record: InboundRecord) -> StoreResult<Option<Event>> {
        self.run("commit_inbound", move |conn| {
            in_transaction(conn, |conn| {
                require_session(conn, record.session_id)?;
                insert_message(conn, record.session_id, &record.message)?;
                if let Some(topic) = &record.topic {
                    insert_topic(conn, topic)?;
                }
                let event = match &record.event {
                    Some(event) => Some(insert_event(conn, record.session_id, event)?),
                    None => None,
                };
                write_mode(conn, record.session_id, &record.mode)?;
                Ok(event)
            })
        })
        .await
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    fn note(content: &str, topic: Option<&TopicId>, secs: i64) -> NewMessage {
        NewMessage {
            topic_id: topic.cloned(),
            transport_message_id: 100 + secs,
            content: content.to_string(),
            timestamp: at(secs),
        }
    }

    async fn db_with_session(id: SessionId) -> Database {
        let db = Database::in_memory().await.unwrap();
        db.upsert_session(&Session::new(id)).await.unwrap();
        db
    }

    #[tokio::test]
    async fn test_get_missing_session_is_not_found() {
        let db = Database::in_memory().await.unwrap();
        let err = db.get_session(42).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_upsert_updates_period_and_mode() {
        let db = db_with_session(1).await;
        let session = Session {
            id: 1,
            period_secs: Some(3 * 3600),
            mode: SessionMode::AwaitingTopicName,
        };
        db.upsert_session(&session).await.unwrap();

        assert_eq!(db.get_session(1).await.unwrap(), session);
    }

    #[tokio::test]
    async fn test_list_sessions_with_period() {
        let db = db_with_session(1).await;
        let mut timed = Session::new(2);
        timed.period_secs = Some(60);
        db.upsert_session(&timed).await.unwrap();

        let all = db.list_sessions(SessionFilter::All).await.unwrap();
        assert_eq!(all.len(), 2);

        let with_period = db.list_sessions(SessionFilter::WithPeriod).await.unwrap();
        assert_eq!(with_period, vec![timed]);
    }

    #[tokio::test]
    async fn test_events_are_listed_oldest_first() {
        let db = db_with_session(1).await;
        db.add_event(1, NewEvent { amount: 50, timestamp: at(7200) }).await.unwrap();
        db.add_event(1, NewEvent { amount: 100, timestamp: at(0) }).await.unwrap();

        let events = db.list_events(1).await.unwrap();
        assert_eq!(events.iter().map(|e| e.amount).collect::<Vec<_>>(), vec![100, 50]);
        assert_eq!(events[0].timestamp, at(0));
    }

    #[tokio::test]
    async fn test_add_event_requires_session() {
        let db = Database::in_memory().await.unwrap();
        let err = db
            .add_event(9, NewEvent { amount: 10, timestamp: at(0) })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_event() {
        let db = db_with_session(1).await;
        let event = db.add_event(1, NewEvent { amount: 10, timestamp: at(0) }).await.unwrap();

        db.delete_event(event.id).await.unwrap();
        assert!(db.list_events(1).await.unwrap().is_empty());
        assert!(matches!(
            db.delete_event(event.id).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_topics_keep_insertion_order() {
        let db = db_with_session(1).await;
        for name in ["sleep", "doctor", "colic"] {
            let topic = Topic {
                id: TopicId::generate(),
                session_id: 1,
                name: name.to_string(),
            };
            db.add_topic(&topic).await.unwrap();
        }

        let names: Vec<String> = db
            .list_topics(1)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["sleep", "doctor", "colic"]);
    }

    #[tokio::test]
    async fn test_removing_topic_keeps_messages() {
        let db = db_with_session(1).await;
        let topic = Topic {
            id: TopicId::generate(),
            session_id: 1,
            name: "sleep".into(),
        };
        db.add_topic(&topic).await.unwrap();
        db.add_message(1, note("slept 2h", Some(&topic.id), 0)).await.unwrap();

        db.remove_topic(1, &topic.id).await.unwrap();

        assert!(db.list_topics(1).await.unwrap().is_empty());
        let kept = db.list_messages_by_topic(1, &topic.id).await.unwrap();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].topic_id.as_ref(), Some(&topic.id));
        assert!(matches!(
            db.remove_topic(1, &topic.id).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_messages_by_topic_are_chronological() {
        let db = db_with_session(1).await;
        let topic = TopicId::generate();
        db.add_message(1, note("second", Some(&topic), 60)).await.unwrap();
        db.add_message(1, note("first", Some(&topic), 0)).await.unwrap();
        db.add_message(1, note("untagged", None, 30)).await.unwrap();

        let contents: Vec<String> = db
            .list_messages_by_topic(1, &topic)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(contents, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_delete_session_cascades() {
        let db = db_with_session(1).await;
        db.upsert_session(&Session::new(2)).await.unwrap();
        let topic = Topic {
            id: TopicId::generate(),
            session_id: 1,
            name: "sleep".into(),
        };
        db.add_topic(&topic).await.unwrap();
        db.add_event(1, NewEvent { amount: 10, timestamp: at(0) }).await.unwrap();
        db.add_event(2, NewEvent { amount: 20, timestamp: at(0) }).await.unwrap();
        db.add_message(1, note("hi", Some(&topic.id), 0)).await.unwrap();

        db.delete_session(1).await.unwrap();

        assert!(matches!(db.get_session(1).await, Err(StoreError::NotFound(_))));
        assert!(db.list_events(1).await.unwrap().is_empty());
        assert!(db.list_topics(1).await.unwrap().is_empty());
        assert!(db.list_messages_by_topic(1, &topic.id).await.unwrap().is_empty());
        assert_eq!(db.list_events(2).await.unwrap().len(), 1);
        assert!(matches!(db.delete_session(1).await, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_commit_inbound_writes_everything() {
        let db = db_with_session(1).await;
        let topic = Topic {
            id: TopicId::generate(),
            session_id: 1,
            name: "sleep".into(),
        };
        let record = InboundRecord {
            session_id: 1,
            message: note("sleep", None, 0),
            event: Some(NewEvent {
                amount: 120,
                timestamp: at(0) - ChronoDuration::minutes(30),
            }),
            topic: Some(topic.clone()),
            mode: SessionMode::AwaitingTopicMessage(topic.id.clone()),
        };

        let event = db.commit_inbound(record).await.unwrap().unwrap();
        assert_eq!(event.amount, 120);
        assert_eq!(db.list_topics(1).await.unwrap(), vec![topic.clone()]);
        assert_eq!(
            db.get_session(1).await.unwrap().mode,
            SessionMode::AwaitingTopicMessage(topic.id)
        );
    }

    #[tokio::test]
    async fn test_commit_inbound_rolls_back_on_missing_session() {
        let db = Database::in_memory().await.unwrap();
        let record = InboundRecord {
            session_id: 5,
            message: note("250", None, 0),
            event: Some(NewEvent { amount: 250, timestamp: at(0) }),
            topic: None,
            mode: SessionMode::Idle,
        };
        assert!(matches!(
            db.commit_inbound(record).await,
            Err(StoreError::NotFound(_))
        ));
        assert!(db.list_events(5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stalled_store_times_out_then_recovers() {
        let db = db_with_session(1).await;
        let impatient = Database {
            timeout: Duration::from_millis(50),
            ..db.clone()
        };

        let stalled = impatient
            .run("stall", |_| {
                std::thread::sleep(Duration::from_millis(300));
                Ok(())
            })
            .await;
        assert!(matches!(stalled, Err(StoreError::Unavailable(msg)) if msg.contains("timed out")));

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(impatient.get_session(1).await.unwrap().id, 1);
    }

    #[test]
    fn test_failed_commit_leaves_no_open_transaction() {
        let conn = sqlite::open(":memory:").unwrap();
        conn.execute(
            "PRAGMA foreign_keys = ON;
             CREATE TABLE parent (id INTEGER PRIMARY KEY);
             CREATE TABLE child (
                 parent_id INTEGER REFERENCES parent(id) DEFERRABLE INITIALLY DEFERRED
             );",
        )
        .unwrap();

        // The deferred key check only fires at COMMIT
        let orphan = in_transaction(&conn, |conn| {
            conn.execute("INSERT INTO child VALUES (42)")?;
            Ok(())
        });
        assert!(orphan.is_err());

        let next = in_transaction(&conn, |conn| {
            conn.execute("INSERT INTO parent VALUES (1)")?;
            Ok(())
        });
        assert!(next.is_ok());
    }

    #[tokio::test]
    async fn test_out_of_range_timestamp_is_unavailable() {
        assert!(to_datetime(i64::MAX).is_err());

        let db = db_with_session(1).await;
        db.conn
            .lock()
            .unwrap()
            .execute("INSERT INTO events (session_id, amount, timestamp) VALUES (1, 10, 9223372036854775807)")
            .unwrap();
        assert!(matches!(
            db.list_events(1).await,
            Err(StoreError::Unavailable(_))
        ));
    }
}
