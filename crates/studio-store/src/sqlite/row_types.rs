//! Database row types for mapping between `SQLite` rows and Rust structs.
//!
//! These mirror the table shapes. Conversion to domain types from
//! `studio-core` happens in the repository and [`Database`] layers.
//!
//! [`Database`]: crate::Database

use serde::{Deserialize, Serialize};
use studio_core::{Run, RunStatus};

/// Raw row from `run_table`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunRow {
    /// Run ID.
    pub id: String,
    /// Project name.
    pub project: String,
    /// Run name.
    pub name: String,
    /// Start timestamp.
    pub timestamp: String,
    /// Working directory.
    pub run_dir: String,
    /// Agent process ID.
    pub pid: i64,
    /// Status string (see [`RunStatus::as_sql`]).
    pub status: String,
}

impl TryFrom<RunRow> for Run {
    type Error = studio_core::CoreError;

    fn try_from(row: RunRow) -> Result<Self, Self::Error> {
        Ok(Run {
            id: row.id.into(),
            project: row.project,
            name: row.name,
            timestamp: row.timestamp,
            run_dir: row.run_dir,
            pid: row.pid,
            status: RunStatus::from_sql(&row.status)?,
        })
    }
}

impl From<&Run> for RunRow {
    fn from(run: &Run) -> Self {
        Self {
            id: run.id.to_string(),
            project: run.project.clone(),
            name: run.name.clone(),
            timestamp: run.timestamp.clone(),
            run_dir: run.run_dir.clone(),
            pid: run.pid,
            status: run.status.as_sql().to_string(),
        }
    }
}

/// Raw row from `reply_table`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReplyRow {
    /// Reply ID.
    pub reply_id: String,
    /// Participant role.
    pub reply_role: String,
    /// Participant display name.
    pub reply_name: String,
    /// Owning run.
    pub run_id: String,
    /// Creation timestamp.
    pub created_at: String,
    /// Finish timestamp (null while the reply is streaming).
    pub finished_at: Option<String>,
}

/// Raw row from `message_table`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MessageRow {
    /// Message ID.
    pub id: String,
    /// Owning run.
    pub run_id: String,
    /// Owning reply.
    pub reply_id: String,
    /// JSON-encoded [`studio_core::Msg`].
    pub msg: String,
}

/// Raw row from `span_table`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpanRow {
    /// Span ID.
    pub id: String,
    /// Owning run.
    pub run_id: String,
    /// Trace ID.
    pub trace_id: String,
    /// Parent span, if nested.
    pub parent_span_id: Option<String>,
    /// Operation name.
    pub name: String,
    /// Start timestamp.
    pub start_time: String,
    /// End timestamp (null while open).
    pub end_time: Option<String>,
    /// `unset`, `ok` or `error`.
    pub status_code: String,
    /// JSON object of span attributes.
    pub attributes: String,
}

/// Raw row from `input_request_table`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InputRequestRow {
    /// Request ID.
    pub request_id: String,
    /// Owning run.
    pub run_id: String,
    /// Requesting agent ID.
    pub agent_id: String,
    /// Requesting agent name.
    pub agent_name: String,
    /// Optional JSON schema of the expected structured input.
    pub structured_input: Option<String>,
    /// Creation timestamp.
    pub created_at: String,
    /// Whether the user has answered.
    pub resolved: bool,
}
