//! Conversation state machine
//!
//! Pure transition function: given the current [`SessionMode`] and one
//! [`Input`], returns the next mode and the single [`Effect`] to persist.
//! Nothing here touches the store.

use chrono::{DateTime, Utc};

use crate::core::{NewEvent, SessionMode, TopicId};
use crate::features::parsing::{parse_feeding, ParsedInput};

/// Text that returns any session to `Idle`
pub const RESET_TEXT: &str = ".";

#[derive(Debug, Clone, PartialEq)]
pub enum Input<'a> {
    /// Plain inbound text received at `at`
    Text { text: &'a str, at: DateTime<Utc> },
    RequestNewTopic,
    SelectTopic(TopicId),
    Reset,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Nothing beyond logging the raw message
    None,
    RecordEvent(NewEvent),
    CreateTopic { id: TopicId, name: String },
    /// The raw message is stored tagged with this topic
    RecordNote(TopicId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub mode: SessionMode,
    pub effect: Effect,
}

impl Transition {
    fn stay(mode: &SessionMode, effect: Effect) -> Self {
        Transition {
            mode: mode.clone(),
            effect,
        }
    }

    fn to(mode: SessionMode) -> Self {
        Transition {
            mode,
            effect: Effect::None,
        }
    }
}

/// Apply one input to a mode
///
/// `new_topic_id` is only called when a topic is actually created.
pub fn transition(
    mode: &SessionMode,
    input: Input<'_>,
    new_topic_id: impl FnOnce() -> TopicId,
) -> Transition {
    match input {
        Input::Reset => Transition::to(SessionMode::Idle),
        Input::RequestNewTopic => Transition::to(SessionMode::AwaitingTopicName),
        Input::SelectTopic(topic) => Transition::to(SessionMode::AwaitingTopicMessage(topic)),
        Input::Text { text, .. } if text.trim() == RESET_TEXT => Transition::to(SessionMode::Idle),
        Input::Text { text, at } => match mode {
            SessionMode::Idle => {
                let effect = match parse_feeding(text, at) {
                    ParsedInput::Quantity(amount) => Effect::RecordEvent(NewEvent {
                        amount,
                        timestamp: at,
                    }),
                    ParsedInput::TimedQuantity { timestamp, amount } => {
                        Effect::RecordEvent(NewEvent { amount, timestamp })
                    }
                    _ => Effect::None,
                };
                Transition::stay(mode, effect)
            }
            SessionMode::AwaitingTopicName => {
                let name = text.trim();
                if name.is_empty() {
                    return Transition::stay(mode, Effect::None);
                }
                let id = new_topic_id();
                Transition {
                    mode: SessionMode::AwaitingTopicMessage(id.clone()),
                    effect: Effect::CreateTopic {
                        id,
                        name: name.to_string(),
                    },
                }
            }
            SessionMode::AwaitingTopicMessage(topic) => {
                Transition::stay(mode, Effect::RecordNote(topic.clone()))
            }
        },
    }
}
