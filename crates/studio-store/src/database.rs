//! Explicitly owned database handle.
//!
//! [`Database`] wraps the connection pool and composes repository calls into
//! domain-level operations. Writes that touch more than one table run inside
//! a single transaction, so callers never observe a message without its
//! reply.

use std::path::Path;

use rusqlite::Connection;
use tracing::{debug, info};

use studio_core::{Msg, Reply, ReplyId, Run, RunId, RunStatus};

use crate::errors::{Result, StoreError};
use crate::sqlite::connection::{
    ConnectionConfig, ConnectionPool, PooledConnection, new_file, new_in_memory,
};
use crate::sqlite::migrations::current_version;
use crate::sqlite::repositories::input_request::InputRequestRepo;
use crate::sqlite::repositories::message::MessageRepo;
use crate::sqlite::repositories::reply::ReplyRepo;
use crate::sqlite::repositories::run::{ListRunsOptions, ProjectSummary, RunRepo};
use crate::sqlite::repositories::span::SpanRepo;
use crate::sqlite::row_types::{InputRequestRow, MessageRow, ReplyRow, RunRow, SpanRow};

/// What [`Database::append_message`] did with the reply.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppendOutcome {
    /// The reply did not exist and was created from the message.
    CreatedReply,
    /// The message joined an existing reply.
    AppendedToReply,
}

/// Handle owning the connection pool.
pub struct Database {
    pool: ConnectionPool,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.pool.state();
        f.debug_struct("Database")
            .field("connections", &state.connections)
            .field("idle_connections", &state.idle_connections)
            .finish()
    }
}

impl Database {
    /// Wrap an already configured pool.
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }

    /// Open a file-backed database. The schema is left as found.
    pub fn open(path: &Path, config: &ConnectionConfig) -> Result<Self> {
        Ok(Self::new(new_file(path, config)?))
    }

    /// Open a private in-memory database.
    pub fn open_in_memory(config: &ConnectionConfig) -> Result<Self> {
        Ok(Self::new(new_in_memory(config)?))
    }

    /// The underlying pool.
    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    /// Get a connection from the pool.
    pub fn conn(&self) -> Result<PooledConnection> {
        Ok(self.pool.get()?)
    }

    /// Release every pooled connection.
    pub fn close(self) {
        let state = self.pool.state();
        debug!(
            connections = state.connections,
            idle = state.idle_connections,
            "closing database"
        );
        drop(self.pool);
    }

    /// Highest applied migration version.
    pub fn schema_version(&self) -> Result<u32> {
        current_version(&*self.conn()?)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Runs
    // ─────────────────────────────────────────────────────────────────────

    /// Register a new run.
    pub fn register_run(&self, run: &Run) -> Result<()> {
        RunRepo::insert(&*self.conn()?, &RunRow::from(run))
    }

    /// Fetch a run.
    pub fn get_run(&self, id: &RunId) -> Result<Run> {
        let row = RunRepo::get_by_id(&*self.conn()?, id)?
            .ok_or_else(|| StoreError::RunNotFound(id.to_string()))?;
        Ok(Run::try_from(row)?)
    }

    /// Runs of a project (or all runs), newest first.
    pub fn list_runs(&self, project: Option<&str>) -> Result<Vec<Run>> {
        let rows = RunRepo::list(
            &*self.conn()?,
            &ListRunsOptions {
                project,
                ..Default::default()
            },
        )?;
        rows.into_iter()
            .map(|row| Run::try_from(row).map_err(StoreError::from))
            .collect()
    }

    /// Projects with run counts.
    pub fn list_projects(&self) -> Result<Vec<ProjectSummary>> {
        RunRepo::list_projects(&*self.conn()?)
    }

    /// Update a run's status.
    pub fn set_run_status(&self, id: &RunId, status: RunStatus) -> Result<()> {
        if RunRepo::update_status(&*self.conn()?, id, status.as_sql())? {
            Ok(())
        } else {
            Err(StoreError::RunNotFound(id.to_string()))
        }
    }

    /// Delete a run and everything it owns.
    pub fn delete_run(&self, id: &RunId) -> Result<bool> {
        RunRepo::delete(&*self.conn()?, id)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Replies and messages
    // ─────────────────────────────────────────────────────────────────────

    /// Persist a message under `reply_id`, creating the reply on first use.
    ///
    /// A new reply takes its role, name and `createdAt` from the message and
    /// stays unfinished until [`Database::finish_reply`].
    pub fn append_message(
        &self,
        run_id: &RunId,
        reply_id: &ReplyId,
        msg: &Msg,
    ) -> Result<AppendOutcome> {
        let conn = self.conn()?;
        let tx = conn.unchecked_transaction()?;

        if RunRepo::get_by_id(&tx, run_id)?.is_none() {
            return Err(StoreError::RunNotFound(run_id.to_string()));
        }

        let outcome = match ReplyRepo::get_by_id(&tx, reply_id)? {
            Some(existing) if existing.run_id != run_id.as_str() => {
                return Err(StoreError::InvalidOperation(format!(
                    "reply {reply_id} belongs to run {}, not {run_id}",
                    existing.run_id
                )));
            }
            Some(_) => AppendOutcome::AppendedToReply,
            None => {
                ReplyRepo::insert(
                    &tx,
                    &ReplyRow {
                        reply_id: reply_id.to_string(),
                        reply_role: msg.role.clone(),
                        reply_name: msg.name.clone(),
                        run_id: run_id.to_string(),
                        created_at: msg.timestamp.clone(),
                        finished_at: None,
                    },
                )?;
                AppendOutcome::CreatedReply
            }
        };

        MessageRepo::insert(
            &tx,
            &MessageRow {
                id: msg.id.to_string(),
                run_id: run_id.to_string(),
                reply_id: reply_id.to_string(),
                msg: serde_json::to_string(msg)?,
            },
        )?;

        tx.commit()?;
        debug!(%run_id, %reply_id, message_id = %msg.id, ?outcome, "message appended");
        Ok(outcome)
    }

    /// Mark a reply finished.
    pub fn finish_reply(&self, reply_id: &ReplyId, finished_at: &str) -> Result<()> {
        if ReplyRepo::mark_finished(&*self.conn()?, reply_id, finished_at)? {
            Ok(())
        } else {
            Err(StoreError::ReplyNotFound(reply_id.to_string()))
        }
    }

    /// All replies of a run with their messages, in chronological order.
    pub fn load_replies(&self, run_id: &RunId) -> Result<Vec<Reply>> {
        let conn = self.conn()?;
        ReplyRepo::list_by_run(&conn, run_id)?
            .into_iter()
            .map(|row| assemble_reply(&conn, row))
            .collect()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Spans and input requests
    // ─────────────────────────────────────────────────────────────────────

    /// Record (or update) a span.
    pub fn record_span(&self, span: &SpanRow) -> Result<()> {
        SpanRepo::upsert(&*self.conn()?, span)
    }

    /// Spans of a run.
    pub fn spans(&self, run_id: &RunId) -> Result<Vec<SpanRow>> {
        SpanRepo::list_by_run(&*self.conn()?, run_id)
    }

    /// Record a pending input request.
    pub fn request_input(&self, request: &InputRequestRow) -> Result<()> {
        InputRequestRepo::insert(&*self.conn()?, request)
    }

    /// Unanswered input requests of a run.
    pub fn pending_input_requests(&self, run_id: &RunId) -> Result<Vec<InputRequestRow>> {
        InputRequestRepo::list_unresolved(&*self.conn()?, run_id)
    }

    /// Mark an input request answered.
    pub fn resolve_input_request(&self, request_id: &str) -> Result<bool> {
        InputRequestRepo::resolve(&*self.conn()?, request_id)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Startup repair
    // ─────────────────────────────────────────────────────────────────────

    /// Runs left in a non-terminal status by a previous process cannot
    /// still be attached; mark them `done`.
    pub fn reconcile_run_status(&self) -> Result<usize> {
        let stale: Vec<&str> = RunStatus::ALL
            .into_iter()
            .filter(|status| !status.is_terminal())
            .map(RunStatus::as_sql)
            .collect();
        let moved = RunRepo::update_status_where(&*self.conn()?, &stale, RunStatus::Done.as_sql())?;
        if moved > 0 {
            info!(runs = moved, "marked stale runs as done");
        }
        Ok(moved)
    }

    /// Drop input requests whose requesting agent is gone.
    pub fn reconcile_input_requests(&self) -> Result<usize> {
        let deleted = InputRequestRepo::delete_unresolved(&*self.conn()?)?;
        if deleted > 0 {
            info!(requests = deleted, "discarded stale input requests");
        }
        Ok(deleted)
    }
}

fn assemble_reply(conn: &Connection, row: ReplyRow) -> Result<Reply> {
    let messages = MessageRepo::list_by_reply(conn, &row.reply_id)?
        .into_iter()
        .map(|m| serde_json::from_str::<Msg>(&m.msg).map_err(StoreError::from))
        .collect::<Result<Vec<_>>>()?;
    Ok(Reply {
        reply_id: row.reply_id.into(),
        reply_role: row.reply_role,
        reply_name: row.reply_name,
        run_id: row.run_id.into(),
        created_at: row.created_at,
        finished_at: row.finished_at,
        messages,
    })
}
