//! Content block types.
//!
//! A message's content is either a plain string or an ordered list of typed
//! blocks. Blocks are immutable once created; the UI renders them in order.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Where a media block's bytes come from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MediaSource {
    /// Remote or local URL.
    Url {
        /// The URL.
        url: String,
    },
    /// Inline base64 data.
    Base64 {
        /// MIME type (e.g. `image/png`).
        media_type: String,
        /// Base64-encoded payload.
        data: String,
    },
}

impl MediaSource {
    /// Render as something an `<img src>`-style consumer can load.
    pub fn to_src(&self) -> String {
        match self {
            Self::Url { url } => url.clone(),
            Self::Base64 { media_type, data } => format!("data:{media_type};base64,{data}"),
        }
    }
}

/// A single renderable unit of message content.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Plain or markdown text.
    Text {
        /// The text.
        text: String,
    },
    /// Model reasoning shown collapsed.
    Thinking {
        /// The reasoning text.
        thinking: String,
    },
    /// Image attachment.
    Image {
        /// Image source.
        source: MediaSource,
    },
    /// Audio attachment.
    Audio {
        /// Audio source.
        source: MediaSource,
    },
    /// Video attachment.
    Video {
        /// Video source.
        source: MediaSource,
    },
    /// Tool invocation issued by an agent.
    ToolUse {
        /// Tool call ID.
        id: String,
        /// Tool name.
        name: String,
        /// Tool arguments.
        #[serde(default)]
        input: Value,
    },
    /// Result of a tool invocation.
    ToolResult {
        /// Tool call ID this result answers.
        id: String,
        /// Tool name.
        name: String,
        /// Either a string or a list of blocks.
        #[serde(default)]
        output: Value,
    },
}

impl ContentBlock {
    /// Convenience constructor for a text block.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// The block's `type` tag as it appears on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Thinking { .. } => "thinking",
            Self::Image { .. } => "image",
            Self::Audio { .. } => "audio",
            Self::Video { .. } => "video",
            Self::ToolUse { .. } => "tool_use",
            Self::ToolResult { .. } => "tool_result",
        }
    }
}

/// Message content as stored in the `msg` payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    /// Bare string content.
    Text(String),
    /// Ordered content blocks.
    Blocks(Vec<ContentBlock>),
}

impl Default for MessageContent {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl MessageContent {
    /// Normalize to a block list. A bare string becomes a single text block;
    /// an empty string becomes no blocks.
    pub fn to_blocks(&self) -> Vec<ContentBlock> {
        match self {
            Self::Text(s) if s.is_empty() => Vec::new(),
            Self::Text(s) => vec![ContentBlock::text(s.clone())],
            Self::Blocks(blocks) => blocks.clone(),
        }
    }
}

impl From<&str> for MessageContent {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<Vec<ContentBlock>> for MessageContent {
    fn from(blocks: Vec<ContentBlock>) -> Self {
        Self::Blocks(blocks)
    }
}
