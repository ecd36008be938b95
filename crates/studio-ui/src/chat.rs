//! Chat transcript state.
//!
//! [`ChatState::reduce`] is the whole transcript component: every UI event is
//! a pure `(state, event) -> state` transition, and [`ChatState::bubbles`]
//! derives what to draw. Side effects (sending, interrupting, reporting
//! attachment errors) go through a caller-supplied [`ChatActions`] via
//! [`ChatController`].

use tracing::debug;

use studio_core::{ContentBlock, MediaSource, Reply};
use studio_settings::{DisplayMode, UiSettings};

use crate::bubble::{BubbleOptions, BubbleView};
use crate::errors::UiError;

/// Distance from the bottom, in pixels, that still counts as "at bottom".
pub const AT_BOTTOM_THRESHOLD: f64 = 50.0;

/// Scroll geometry of the transcript viewport.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ScrollMetrics {
    /// Current scroll offset.
    pub scroll_top: f64,
    /// Total content height.
    pub scroll_height: f64,
    /// Visible height.
    pub client_height: f64,
}

impl ScrollMetrics {
    /// Pixels between the bottom of the viewport and the end of the content.
    pub fn distance_from_bottom(&self) -> f64 {
        self.scroll_height - self.scroll_top - self.client_height
    }

    /// Within [`AT_BOTTOM_THRESHOLD`] of the end.
    pub fn is_at_bottom(&self) -> bool {
        self.distance_from_bottom() <= AT_BOTTOM_THRESHOLD
    }

    /// Offset that shows the end of the content.
    pub fn bottom_offset(&self) -> f64 {
        (self.scroll_height - self.client_height).max(0.0)
    }
}

/// A file staged for sending.
#[derive(Clone, Debug, PartialEq)]
pub struct Attachment {
    /// File name shown in the input area.
    pub name: String,
    /// MIME type.
    pub media_type: String,
    /// Where the bytes are.
    pub source: MediaSource,
}

impl Attachment {
    /// Content block for this attachment, or `None` if the MIME type is not
    /// image, audio or video.
    pub fn to_block(&self) -> Option<ContentBlock> {
        let source = self.source.clone();
        match self.media_type.split('/').next()? {
            "image" => Some(ContentBlock::Image { source }),
            "audio" => Some(ContentBlock::Audio { source }),
            "video" => Some(ContentBlock::Video { source }),
            _ => None,
        }
    }
}

/// Transcript state.
#[derive(Clone, Debug, PartialEq)]
pub struct ChatState {
    /// Replies in chronological order.
    pub replies: Vec<Reply>,
    /// Grouped or flattened layout.
    pub display_mode: DisplayMode,
    /// Render text as markdown.
    pub render_markdown: bool,
    /// Use decorative avatars.
    pub random_avatar: bool,
    /// Avatar hash seed.
    pub avatar_seed: i32,
    /// Viewport geometry.
    pub scroll: ScrollMetrics,
    /// Whether new replies should keep the view pinned to the bottom.
    pub is_at_bottom: bool,
    /// Text in the input box.
    pub input: String,
    /// Staged attachments.
    pub attachments: Vec<Attachment>,
    /// An agent is currently replying; sending is disabled.
    pub is_replying: bool,
}

impl Default for ChatState {
    fn default() -> Self {
        Self::from_settings(&UiSettings::default())
    }
}

/// Transcript events.
#[derive(Clone, Debug, PartialEq)]
pub enum ChatEvent {
    /// New reply list; `scroll_height` is the content height after layout.
    RepliesUpdated {
        /// Replies in chronological order.
        replies: Vec<Reply>,
        /// Content height after the new replies are laid out.
        scroll_height: f64,
    },
    /// The user scrolled or the viewport resized.
    Scrolled(ScrollMetrics),
    /// Flip between grouped and flattened layout.
    ToggleDisplayMode,
    /// Flip markdown rendering.
    ToggleMarkdown,
    /// Flip decorative avatars.
    ToggleRandomAvatar,
    /// Input text changed.
    InputChanged(String),
    /// An attachment was staged.
    AttachmentAdded(Attachment),
    /// The attachment at this position was removed.
    AttachmentRemoved(usize),
    /// The agent started or stopped replying.
    ReplyingChanged(bool),
    /// Input and attachments were handed off for sending.
    Sent,
}

impl ChatState {
    /// Initial state from UI preferences.
    pub fn from_settings(settings: &UiSettings) -> Self {
        Self {
            replies: Vec::new(),
            display_mode: settings.display_mode,
            render_markdown: settings.render_markdown,
            random_avatar: settings.random_avatar,
            avatar_seed: settings.avatar_seed,
            scroll: ScrollMetrics::default(),
            is_at_bottom: true,
            input: String::new(),
            attachments: Vec::new(),
            is_replying: false,
        }
    }

    /// Apply one event.
    #[must_use]
    pub fn reduce(mut self, event: ChatEvent) -> Self {
        match event {
            ChatEvent::RepliesUpdated {
                replies,
                scroll_height,
            } => {
                self.replies = replies;
                self.scroll.scroll_height = scroll_height;
                if self.is_at_bottom {
                    self.scroll.scroll_top = self.scroll.bottom_offset();
                }
            }
            ChatEvent::Scrolled(metrics) => {
                self.scroll = metrics;
                self.is_at_bottom = metrics.is_at_bottom();
            }
            ChatEvent::ToggleDisplayMode => {
                self.display_mode = match self.display_mode {
                    DisplayMode::ByReply => DisplayMode::ByMessage,
                    DisplayMode::ByMessage => DisplayMode::ByReply,
                };
            }
            ChatEvent::ToggleMarkdown => self.render_markdown = !self.render_markdown,
            ChatEvent::ToggleRandomAvatar => self.random_avatar = !self.random_avatar,
            ChatEvent::InputChanged(text) => self.input = text,
            ChatEvent::AttachmentAdded(attachment) => self.attachments.push(attachment),
            ChatEvent::AttachmentRemoved(index) => {
                if index < self.attachments.len() {
                    let _ = self.attachments.remove(index);
                }
            }
            ChatEvent::ReplyingChanged(replying) => self.is_replying = replying,
            ChatEvent::Sent => {
                self.input.clear();
                self.attachments.clear();
            }
        }
        self
    }

    /// Something to send and nobody is replying.
    pub fn can_send(&self) -> bool {
        !self.is_replying && (!self.input.trim().is_empty() || !self.attachments.is_empty())
    }

    /// Bubble rendering options from the current toggles.
    pub fn bubble_options(&self) -> BubbleOptions {
        BubbleOptions {
            render_markdown: self.render_markdown,
            random_avatar: self.random_avatar,
            avatar_seed: self.avatar_seed,
        }
    }

    /// Bubbles to draw, top to bottom.
    pub fn bubbles(&self) -> Vec<BubbleView> {
        let options = self.bubble_options();
        match self.display_mode {
            DisplayMode::ByReply => self
                .replies
                .iter()
                .map(|reply| BubbleView::for_reply(reply, options))
                .collect(),
            DisplayMode::ByMessage => self
                .replies
                .iter()
                .flat_map(|reply| reply.messages.iter())
                .map(|msg| BubbleView::for_message(msg, options))
                .collect(),
        }
    }

    /// Content the current input would send.
    pub fn outgoing_blocks(&self) -> Vec<ContentBlock> {
        let mut blocks = Vec::with_capacity(self.attachments.len() + 1);
        if !self.input.trim().is_empty() {
            blocks.push(ContentBlock::text(self.input.clone()));
        }
        blocks.extend(self.attachments.iter().filter_map(Attachment::to_block));
        blocks
    }
}

/// Side effects the transcript delegates to its host.
#[cfg_attr(test, mockall::automock)]
pub trait ChatActions: Send + Sync {
    /// Send user content to the running agent.
    fn send(&self, blocks: Vec<ContentBlock>);
    /// Ask the replying agent to stop.
    fn interrupt(&self);
    /// Report a failure the user should see.
    fn on_error(&self, error: &UiError);
}

/// Owns a [`ChatState`] and routes user actions through [`ChatActions`].
pub struct ChatController<A> {
    state: ChatState,
    actions: A,
}

impl<A: ChatActions> ChatController<A> {
    /// Controller starting from `state`.
    pub fn new(state: ChatState, actions: A) -> Self {
        Self { state, actions }
    }

    /// Current state.
    pub fn state(&self) -> &ChatState {
        &self.state
    }

    /// Apply an event.
    pub fn dispatch(&mut self, event: ChatEvent) {
        self.state = std::mem::take(&mut self.state).reduce(event);
    }

    /// Stage an attachment. Unsupported types are reported through
    /// `on_error` and not staged.
    pub fn attach(&mut self, attachment: Attachment) -> bool {
        if attachment.to_block().is_none() {
            self.actions.on_error(&UiError::UnsupportedAttachment {
                name: attachment.name,
                media_type: attachment.media_type,
            });
            return false;
        }
        self.dispatch(ChatEvent::AttachmentAdded(attachment));
        true
    }

    /// Remove a staged attachment.
    pub fn detach(&mut self, index: usize) -> bool {
        if index >= self.state.attachments.len() {
            self.actions.on_error(&UiError::AttachmentIndex(index));
            return false;
        }
        self.dispatch(ChatEvent::AttachmentRemoved(index));
        true
    }

    /// Send the current input. Returns whether anything was sent.
    pub fn send(&mut self) -> bool {
        if !self.state.can_send() {
            return false;
        }
        let blocks = self.state.outgoing_blocks();
        debug!(blocks = blocks.len(), "sending user input");
        self.actions.send(blocks);
        self.dispatch(ChatEvent::Sent);
        true
    }

    /// Interrupt the replying agent. No-op when nobody is replying.
    pub fn interrupt(&mut self) -> bool {
        if !self.state.is_replying {
            return false;
        }
        self.actions.interrupt();
        true
    }
}
