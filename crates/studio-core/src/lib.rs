//! # studio-core
//!
//! Foundation types shared by every AgentScope Studio crate.
//!
//! - **Branded IDs**: `RunId`, `ReplyId`, `MessageId`, ... as newtypes
//! - **Content blocks**: [`ContentBlock`] covering text, thinking, media and tool calls
//! - **Messages and replies**: the persisted `msg` payload and the reply grouping
//! - **Runs**: [`RunStatus`] and the run record
//! - **Logging**: [`logging::init_subscriber`] for the `tracing` subscriber

#![deny(unsafe_code)]

pub mod content;
pub mod errors;
pub mod ids;
pub mod logging;
pub mod messages;
pub mod run;
pub mod time;

pub use content::{ContentBlock, MediaSource, MessageContent};
pub use errors::{CoreError, Result};
pub use ids::{InputRequestId, MessageId, ReplyId, RunId, SpanId};
pub use messages::{Msg, Reply, Role};
pub use run::{Run, RunStatus};
