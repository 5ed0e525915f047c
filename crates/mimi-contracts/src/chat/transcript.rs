use std::path::Path;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One chat bubble. `is_sent` is true for the user, false for the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub text: String,
    pub is_sent: bool,
    pub created_at: String,
}

impl Message {
    pub fn sent(text: impl Into<String>) -> Self {
        Self::new(text.into(), true)
    }

    pub fn received(text: impl Into<String>) -> Self {
        Self::new(text.into(), false)
    }

    fn new(text: String, is_sent: bool) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text,
            is_sent,
            created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, false),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Model,
}

/// A transcript entry in the shape the model expects as conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Model,
            text: text.into(),
        }
    }
}

/// Append-only, ordered message list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: Message) -> &Message {
        self.messages.push(message);
        &self.messages[self.messages.len() - 1]
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Completed exchanges as model history.
    ///
    /// A sent message only counts once a reply follows it, so a failed send
    /// never shows up as a dangling user turn in later requests.
    pub fn exchanges(&self) -> Vec<Turn> {
        let mut turns = Vec::new();
        let mut iter = self.messages.iter().peekable();
        while let Some(message) = iter.next() {
            if !message.is_sent {
                continue;
            }
            if let Some(reply) = iter.peek().filter(|next| !next.is_sent) {
                turns.push(Turn::user(message.text.clone()));
                turns.push(Turn::model(reply.text.clone()));
                iter.next();
            }
        }
        turns
    }

    pub fn write_json(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(&self.messages)?)?;
        Ok(())
    }
}
