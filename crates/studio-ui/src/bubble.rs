//! Chat bubble view model.
//!
//! A bubble is either one whole reply (grouped layout) or one message
//! (flattened layout). Its content is a list of segments the renderer draws
//! in order.

use serde_json::Value;

use studio_core::{ContentBlock, Msg, Reply};

use crate::avatar::AvatarKey;

/// Rendering switches that affect bubble content.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BubbleOptions {
    /// Render text as markdown.
    pub render_markdown: bool,
    /// Use decorative avatars.
    pub random_avatar: bool,
    /// Avatar hash seed.
    pub avatar_seed: i32,
}

impl Default for BubbleOptions {
    fn default() -> Self {
        Self {
            render_markdown: true,
            random_avatar: true,
            avatar_seed: 0,
        }
    }
}

/// One drawable piece of bubble content.
#[derive(Clone, Debug, PartialEq)]
pub enum Segment {
    /// Text to be rendered as markdown.
    Markdown(String),
    /// Text shown verbatim.
    Text(String),
    /// Collapsed reasoning.
    Thinking(String),
    /// Image source.
    Image(String),
    /// Audio source.
    Audio(String),
    /// Video source.
    Video(String),
    /// A tool call, with its result once one has arrived.
    ToolCall {
        /// Tool call ID.
        id: String,
        /// Tool name.
        name: String,
        /// Pretty-printed arguments.
        input: String,
        /// Pretty-printed result.
        output: Option<String>,
    },
}

/// Everything needed to draw one bubble.
#[derive(Clone, Debug, PartialEq)]
pub struct BubbleView {
    /// Reply ID (grouped) or message ID (flattened).
    pub key: String,
    /// Display name.
    pub name: String,
    /// Participant role.
    pub role: String,
    /// Timestamp shown in the header.
    pub timestamp: String,
    /// Inputs for avatar resolution.
    pub avatar: AvatarKey,
    /// Content in draw order.
    pub segments: Vec<Segment>,
}

impl BubbleView {
    /// One bubble for a whole reply.
    pub fn for_reply(reply: &Reply, options: BubbleOptions) -> Self {
        let blocks = reply.blocks();
        Self {
            key: reply.reply_id.to_string(),
            name: reply.reply_name.clone(),
            role: reply.reply_role.clone(),
            timestamp: reply.created_at.clone(),
            avatar: AvatarKey::new(
                reply.reply_name.clone(),
                reply.reply_role.clone(),
                options.random_avatar,
                options.avatar_seed,
            ),
            segments: segments(&blocks, options.render_markdown),
        }
    }

    /// One bubble for a single message.
    pub fn for_message(msg: &Msg, options: BubbleOptions) -> Self {
        Self {
            key: msg.id.to_string(),
            name: msg.name.clone(),
            role: msg.role.clone(),
            timestamp: msg.timestamp.clone(),
            avatar: AvatarKey::new(
                msg.name.clone(),
                msg.role.clone(),
                options.random_avatar,
                options.avatar_seed,
            ),
            segments: segments(&msg.blocks(), options.render_markdown),
        }
    }

    /// Whether the bubble belongs to the local user (drawn on the right).
    pub fn is_user(&self) -> bool {
        self.role.eq_ignore_ascii_case("user")
    }
}

/// Convert blocks to segments. Tool results fold into the matching earlier
/// tool call; a result with no call becomes a call with empty input.
pub fn segments(blocks: &[ContentBlock], render_markdown: bool) -> Vec<Segment> {
    let mut out: Vec<Segment> = Vec::with_capacity(blocks.len());
    for block in blocks {
        match block {
            ContentBlock::Text { text } if render_markdown => {
                out.push(Segment::Markdown(text.clone()));
            }
            ContentBlock::Text { text } => out.push(Segment::Text(text.clone())),
            ContentBlock::Thinking { thinking } => out.push(Segment::Thinking(thinking.clone())),
            ContentBlock::Image { source } => out.push(Segment::Image(source.to_src())),
            ContentBlock::Audio { source } => out.push(Segment::Audio(source.to_src())),
            ContentBlock::Video { source } => out.push(Segment::Video(source.to_src())),
            ContentBlock::ToolUse { id, name, input } => out.push(Segment::ToolCall {
                id: id.clone(),
                name: name.clone(),
                input: pretty(input),
                output: None,
            }),
            ContentBlock::ToolResult { id, name, output } => {
                let call = out.iter_mut().rev().find_map(|segment| match segment {
                    Segment::ToolCall {
                        id: call_id,
                        output: slot,
                        ..
                    } if *call_id == *id => Some(slot),
                    _ => None,
                });
                match call {
                    Some(slot) => *slot = Some(pretty(output)),
                    None => out.push(Segment::ToolCall {
                        id: id.clone(),
                        name: name.clone(),
                        input: String::new(),
                        output: Some(pretty(output)),
                    }),
                }
            }
        }
    }
    out
}

fn pretty(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use studio_core::{MediaSource, MessageContent, Role};

    fn reply(messages: Vec<Msg>) -> Reply {
        Reply {
            reply_id: "reply-1".into(),
            reply_role: "assistant".into(),
            reply_name: "Friday".into(),
            run_id: "run".into(),
            created_at: "2025-01-01 09:00:00.000".into(),
            finished_at: None,
            messages,
        }
    }

    #[test]
    fn string_content_is_a_single_text_block() {
        let msg = Msg::new("Friday", Role::Assistant, "**hi**");
        let markdown = BubbleView::for_message(&msg, BubbleOptions::default());
        assert_eq!(markdown.segments, vec![Segment::Markdown("**hi**".into())]);

        let plain = BubbleView::for_message(
            &msg,
            BubbleOptions {
                render_markdown: false,
                ..BubbleOptions::default()
            },
        );
        assert_eq!(plain.segments, vec![Segment::Text("**hi**".into())]);
    }

    #[test]
    fn empty_string_content_has_no_segments() {
        let msg = Msg::new("u", Role::User, "");
        assert!(BubbleView::for_message(&msg, BubbleOptions::default()).segments.is_empty());
    }

    #[test]
    fn reply_bubble_concatenates_messages() {
        let first = Msg::new("Friday", Role::Assistant, "one");
        let mut second = Msg::new("Friday", Role::Assistant, "");
        second.content = MessageContent::Blocks(vec![ContentBlock::Image {
            source: MediaSource::Url {
                url: "https://x/y.png".into(),
            },
        }]);

        let view = BubbleView::for_reply(&reply(vec![first, second]), BubbleOptions::default());
        assert_eq!(view.key, "reply-1");
        assert_eq!(view.timestamp, "2025-01-01 09:00:00.000");
        assert_eq!(
            view.segments,
            vec![
                Segment::Markdown("one".into()),
                Segment::Image("https://x/y.png".into())
            ]
        );
        assert!(!view.is_user());
    }

    #[test]
    fn tool_result_folds_into_its_call() {
        let blocks = vec![
            ContentBlock::ToolUse {
                id: "c1".into(),
                name: "search".into(),
                input: json!({"q": "rust"}),
            },
            ContentBlock::text("thinking out loud"),
            ContentBlock::ToolResult {
                id: "c1".into(),
                name: "search".into(),
                output: json!("3 hits"),
            },
        ];

        let segs = segments(&blocks, false);
        assert_eq!(segs.len(), 2);
        assert_eq!(
            segs[0],
            Segment::ToolCall {
                id: "c1".into(),
                name: "search".into(),
                input: "{\n  \"q\": \"rust\"\n}".into(),
                output: Some("3 hits".into()),
            }
        );
    }

    #[test]
    fn orphan_tool_result_is_shown_alone() {
        let blocks = vec![ContentBlock::ToolResult {
            id: "c9".into(),
            name: "read".into(),
            output: json!(null),
        }];
        assert_eq!(
            segments(&blocks, true),
            vec![Segment::ToolCall {
                id: "c9".into(),
                name: "read".into(),
                input: String::new(),
                output: Some(String::new()),
            }]
        );
    }

    #[test]
    fn avatar_key_carries_options() {
        let msg = Msg::new("Friday", Role::Assistant, "x");
        let view = BubbleView::for_message(
            &msg,
            BubbleOptions {
                random_avatar: false,
                avatar_seed: 9,
                ..BubbleOptions::default()
            },
        );
        assert_eq!(view.avatar, AvatarKey::new("Friday", "assistant", false, 9));
    }
}
