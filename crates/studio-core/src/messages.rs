//! Messages and replies.
//!
//! [`Msg`] is the JSON payload persisted in `message_table.msg`. A [`Reply`]
//! groups one or more messages emitted by the same participant during one
//! conversational turn, in chronological (insertion) order.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::content::{ContentBlock, MessageContent};
use crate::errors::CoreError;
use crate::ids::{MessageId, ReplyId, RunId};

/// Participant role.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Human user.
    User,
    /// Agent.
    Assistant,
    /// System prompt or environment.
    System,
}

impl Role {
    /// Wire string.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = CoreError;

    /// Case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            "system" => Ok(Self::System),
            _ => Err(CoreError::UnknownRole(s.to_string())),
        }
    }
}

/// The message payload stored as JSON in `message_table.msg`.
///
/// `role` stays a free-form string: agents are not required to use the
/// three canonical roles and the payload is persisted verbatim.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Msg {
    /// Message ID.
    pub id: MessageId,
    /// Display name of the sender.
    pub name: String,
    /// Sender role.
    pub role: String,
    /// Text or content blocks.
    #[serde(default)]
    pub content: MessageContent,
    /// Arbitrary agent metadata.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub metadata: Value,
    /// Creation timestamp (`YYYY-MM-DD HH:MM:SS.mmm`).
    pub timestamp: String,
}

impl Msg {
    /// Build a message with a fresh ID and the current timestamp.
    pub fn new(name: impl Into<String>, role: Role, content: impl Into<MessageContent>) -> Self {
        Self {
            id: MessageId::new(),
            name: name.into(),
            role: role.as_str().to_string(),
            content: content.into(),
            metadata: Value::Null,
            timestamp: crate::time::now_timestamp(),
        }
    }

    /// Content normalized to blocks.
    pub fn blocks(&self) -> Vec<ContentBlock> {
        self.content.to_blocks()
    }
}

/// One conversational turn: a participant's ordered messages.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    /// Reply ID.
    pub reply_id: ReplyId,
    /// Role of the participant.
    pub reply_role: String,
    /// Display name of the participant.
    pub reply_name: String,
    /// Owning run.
    pub run_id: RunId,
    /// Timestamp of the first message.
    pub created_at: String,
    /// Timestamp of the latest message, if the reply has finished.
    pub finished_at: Option<String>,
    /// Messages in chronological order.
    pub messages: Vec<Msg>,
}

impl Reply {
    /// All content blocks of all messages, in order.
    pub fn blocks(&self) -> Vec<ContentBlock> {
        self.messages.iter().flat_map(Msg::blocks).collect()
    }
}
