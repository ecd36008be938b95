//! # studio-ui
//!
//! Presentation logic for AgentScope Studio as plain state machines.
//!
//! Each component is a state type with a `reduce(event) -> state` transition
//! and derived view models; no rendering engine is needed to drive or test
//! them.
//!
//! - **[`avatar`]**: hash-based avatar selection, precedence, and keyed
//!   cancellable asset loading
//! - **[`bubble`]**: chat bubble view model and content segments
//! - **[`chat`]**: transcript state, auto-scroll, and the [`chat::ChatActions`]
//!   host interface
//! - **[`sidebar`]**: navigation layout and active-route matching
//! - **[`language`]**: language switch and label table

#![deny(unsafe_code)]

pub mod avatar;
pub mod bubble;
pub mod chat;
pub mod errors;
pub mod language;
pub mod sidebar;

pub use avatar::{AssetFetcher, AvatarCatalog, AvatarKey, AvatarLoader, AvatarView, FsAssetFetcher};
pub use bubble::{BubbleOptions, BubbleView, Segment};
pub use chat::{ChatActions, ChatController, ChatEvent, ChatState, ScrollMetrics};
pub use errors::{Result, UiError};
pub use language::{LanguageEvent, LanguageSwitch, translate};
pub use sidebar::{SidebarEvent, SidebarState, active_item};
