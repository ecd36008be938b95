//! Messages, the atomic content units grouped under replies.
//!
//! Insertion order is chronological order; listing uses `rowid`.

use rusqlite::{Connection, Row, params};

use crate::errors::Result;
use crate::sqlite::row_types::MessageRow;

/// Message queries. Inserts require the reply to exist.
pub struct MessageRepo;

impl MessageRepo {
    /// Insert a message. Both the run and the reply must exist.
    pub fn insert(conn: &Connection, message: &MessageRow) -> Result<()> {
        let _ = conn.execute(
            "INSERT INTO message_table (id, run_id, replyId, msg) VALUES (?1, ?2, ?3, ?4)",
            params![message.id, message.run_id, message.reply_id, message.msg],
        )?;
        Ok(())
    }

    /// Messages of one reply in insertion order.
    pub fn list_by_reply(conn: &Connection, reply_id: &str) -> Result<Vec<MessageRow>> {
        let mut stmt = conn.prepare(
            "SELECT id, run_id, replyId, msg FROM message_table WHERE replyId = ?1 ORDER BY rowid",
        )?;
        let rows = stmt
            .query_map(params![reply_id], Self::map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Messages of one run in insertion order.
    pub fn list_by_run(conn: &Connection, run_id: &str) -> Result<Vec<MessageRow>> {
        let mut stmt = conn.prepare(
            "SELECT id, run_id, replyId, msg FROM message_table WHERE run_id = ?1 ORDER BY rowid",
        )?;
        let rows = stmt
            .query_map(params![run_id], Self::map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Number of messages recorded for a run.
    pub fn count_by_run(conn: &Connection, run_id: &str) -> Result<i64> {
        let count = conn.query_row(
            "SELECT COUNT(*) FROM message_table WHERE run_id = ?1",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn map_row(row: &Row<'_>) -> rusqlite::Result<MessageRow> {
        Ok(MessageRow {
            id: row.get(0)?,
            run_id: row.get(1)?,
            reply_id: row.get(2)?,
            msg: row.get(3)?,
        })
    }
}
