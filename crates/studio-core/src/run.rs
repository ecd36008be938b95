//! Runs: one execution instance of an agent.

use serde::{Deserialize, Serialize};

use crate::errors::CoreError;
use crate::ids::RunId;

/// Lifecycle status of a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Registered but not yet producing output.
    Pending,
    /// Agent process is attached and running.
    Running,
    /// Finished normally (or reconciled after a restart).
    Done,
    /// Finished with an error.
    Error,
}

impl RunStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [Self; 4] = [Self::Pending, Self::Running, Self::Done, Self::Error];

    /// Value stored in `run_table.status`.
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Done => "done",
            Self::Error => "error",
        }
    }

    /// Parse a stored status value.
    pub fn from_sql(s: &str) -> Result<Self, CoreError> {
        match s {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "done" => Ok(Self::Done),
            "error" => Ok(Self::Error),
            other => Err(CoreError::UnknownStatus(other.to_string())),
        }
    }

    /// No further transitions are expected.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Error)
    }
}

/// A registered agent run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Run {
    /// Run ID.
    pub id: RunId,
    /// Project the run belongs to.
    pub project: String,
    /// Human-readable run name.
    pub name: String,
    /// Start timestamp.
    pub timestamp: String,
    /// Working directory of the agent process.
    pub run_dir: String,
    /// OS process ID of the agent.
    pub pid: i64,
    /// Current status.
    pub status: RunStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sql_round_trip_for_every_status() {
        for status in [
            RunStatus::Pending,
            RunStatus::Running,
            RunStatus::Done,
            RunStatus::Error,
        ] {
            assert_eq!(RunStatus::from_sql(status.as_sql()).unwrap(), status);
        }
    }

    #[test]
    fn unknown_status_rejected() {
        let err = RunStatus::from_sql("zombie").unwrap_err();
        assert_eq!(err.to_string(), "unknown run status: zombie");
    }

    #[test]
    fn terminal_states() {
        assert!(RunStatus::Done.is_terminal());
        assert!(RunStatus::Error.is_terminal());
        assert!(!RunStatus::Running.is_terminal());
        assert!(!RunStatus::Pending.is_terminal());
    }
}
