use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub u64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub role: Role,
    pub text: String,
}

impl ChatMessage {
    pub fn user(id: MessageId, text: impl Into<String>) -> Self {
        Self {
            id,
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn model(id: MessageId, text: impl Into<String>) -> Self {
        Self {
            id,
            role: Role::Model,
            text: text.into(),
        }
    }
}

/// Hands out strictly increasing message ids for one transcript.
#[derive(Debug, Clone, Default)]
pub struct MessageClock {
    last: u64,
}

impl MessageClock {
    pub fn tick(&mut self) -> MessageId {
        self.last += 1;
        MessageId(self.last)
    }
}
