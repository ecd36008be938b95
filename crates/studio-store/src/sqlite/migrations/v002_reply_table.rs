//! v2: introduce `reply_table` and make `message_table.replyId` a required
//! foreign key.
//!
//! Forward:
//! 1. create `reply_table`
//! 2. scan every message (primary-key order) and fold them into replies,
//!    keyed by the existing `replyId` or, when unset, the message's own id
//! 3. insert the accumulated replies
//! 4. point ungrouped messages at their synthesized singleton reply
//! 5. refuse to continue if any message is still ungrouped
//! 6. rebuild `message_table` with `replyId NOT NULL REFERENCES reply_table`
//!
//! Backward drops the foreign key, relaxes the column, clears every
//! `replyId` and drops `reply_table`. The grouping is not recoverable.
//!
//! The scan holds all messages in memory; this runs once at boot with no
//! concurrent writers.

use std::collections::HashMap;

use rusqlite::{Connection, params};
use serde::Deserialize;
use tracing::{info, warn};

use crate::errors::{Result, StoreError};
use crate::sqlite::row_types::ReplyRow;

const CREATE_REPLY_TABLE: &str = "
CREATE TABLE reply_table (
    replyId    TEXT PRIMARY KEY,
    replyRole  TEXT NOT NULL,
    replyName  TEXT NOT NULL,
    run_id     TEXT NOT NULL REFERENCES run_table(id) ON DELETE CASCADE,
    createdAt  TEXT NOT NULL,
    finishedAt TEXT
);
CREATE INDEX idx_reply_run ON reply_table(run_id, createdAt);
";

const REBUILD_MESSAGE_TABLE_STRICT: &str = "
CREATE TABLE message_table_new (
    id      TEXT PRIMARY KEY,
    run_id  TEXT NOT NULL REFERENCES run_table(id) ON DELETE CASCADE,
    replyId TEXT NOT NULL REFERENCES reply_table(replyId) ON DELETE CASCADE,
    msg     TEXT NOT NULL
);
INSERT INTO message_table_new (id, run_id, replyId, msg)
    SELECT id, run_id, replyId, msg FROM message_table ORDER BY rowid;
DROP TABLE message_table;
ALTER TABLE message_table_new RENAME TO message_table;
CREATE INDEX idx_message_run   ON message_table(run_id);
CREATE INDEX idx_message_reply ON message_table(replyId);
";

const REBUILD_MESSAGE_TABLE_LOOSE: &str = "
CREATE TABLE message_table_new (
    id      TEXT PRIMARY KEY,
    run_id  TEXT NOT NULL REFERENCES run_table(id) ON DELETE CASCADE,
    replyId TEXT,
    msg     TEXT NOT NULL
);
INSERT INTO message_table_new (id, run_id, replyId, msg)
    SELECT id, run_id, replyId, msg FROM message_table ORDER BY rowid;
DROP TABLE message_table;
ALTER TABLE message_table_new RENAME TO message_table;
CREATE INDEX idx_message_run   ON message_table(run_id);
CREATE INDEX idx_message_reply ON message_table(replyId);
";

/// A message row as it exists before this migration.
#[derive(Clone, Debug)]
pub struct LegacyMessage {
    /// Message primary key.
    pub id: String,
    /// Owning run.
    pub run_id: String,
    /// Grouping key, if one was ever assigned.
    pub reply_id: Option<String>,
    /// Raw JSON payload.
    pub msg: String,
}

impl LegacyMessage {
    /// Grouping key: the assigned `replyId`, or the message's own id when
    /// unset or empty.
    pub fn grouping_key(&self) -> &str {
        match self.reply_id.as_deref() {
            Some(reply_id) if !reply_id.is_empty() => reply_id,
            _ => &self.id,
        }
    }
}

/// Fields of the `msg` payload the backfill needs.
#[derive(Deserialize)]
struct PayloadHeader {
    role: String,
    name: String,
    timestamp: String,
}

/// Fold messages (already in scan order) into replies, in first-seen order.
///
/// The first message of a group fixes `createdAt`, the owning run, and the
/// initial `finishedAt`. Each later message extends `finishedAt` when its
/// timestamp sorts after the current value, and overwrites role and name
/// unconditionally, so the last message in scan order wins those.
///
/// # Errors
///
/// Any payload that is not valid JSON with `role`, `name` and `timestamp`
/// aborts the fold.
pub fn group_replies(messages: &[LegacyMessage]) -> Result<Vec<ReplyRow>> {
    let mut replies: Vec<ReplyRow> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for message in messages {
        let header: PayloadHeader = serde_json::from_str(&message.msg).map_err(|e| {
            StoreError::Migration {
                message: format!("message {} has an unreadable payload: {e}", message.id),
            }
        })?;
        let key = message.grouping_key();

        if let Some(&slot) = index.get(key) {
            let reply = &mut replies[slot];
            if reply
                .finished_at
                .as_deref()
                .is_none_or(|finished| header.timestamp.as_str() > finished)
            {
                reply.finished_at = Some(header.timestamp);
            }
            reply.reply_role = header.role;
            reply.reply_name = header.name;
        } else {
            let _ = index.insert(key, replies.len());
            replies.push(ReplyRow {
                reply_id: key.to_string(),
                reply_role: header.role,
                reply_name: header.name,
                run_id: message.run_id.clone(),
                created_at: header.timestamp.clone(),
                finished_at: Some(header.timestamp),
            });
        }
    }

    Ok(replies)
}

pub(super) fn up(conn: &Connection) -> Result<()> {
    conn.execute_batch(CREATE_REPLY_TABLE)?;

    let messages = load_legacy_messages(conn)?;
    let replies = group_replies(&messages)?;

    {
        let mut insert = conn.prepare(
            "INSERT INTO reply_table (replyId, replyRole, replyName, run_id, createdAt, finishedAt)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?;
        for reply in &replies {
            let _ = insert.execute(params![
                reply.reply_id,
                reply.reply_role,
                reply.reply_name,
                reply.run_id,
                reply.created_at,
                reply.finished_at,
            ])?;
        }
    }

    let regrouped = conn.execute(
        "UPDATE message_table SET replyId = id WHERE replyId IS NULL OR replyId = ''",
        [],
    )?;

    ensure_all_grouped(conn)?;
    conn.execute_batch(REBUILD_MESSAGE_TABLE_STRICT)?;

    info!(
        messages = messages.len(),
        replies = replies.len(),
        regrouped,
        "backfilled reply_table"
    );
    Ok(())
}

/// Fail if any message still lacks a `replyId`. Runs after the backfill and
/// before the column becomes `NOT NULL`.
fn ensure_all_grouped(conn: &Connection) -> Result<()> {
    let remaining: i64 = conn.query_row(
        "SELECT COUNT(*) FROM message_table WHERE replyId IS NULL OR replyId = ''",
        [],
        |row| row.get(0),
    )?;
    if remaining > 0 {
        return Err(StoreError::Migration {
            message: format!("{remaining} messages still have no replyId after backfill"),
        });
    }
    Ok(())
}

pub(super) fn down(conn: &Connection) -> Result<()> {
    conn.execute_batch(REBUILD_MESSAGE_TABLE_LOOSE)?;
    let cleared = conn.execute("UPDATE message_table SET replyId = NULL", [])?;
    conn.execute_batch("DROP TABLE reply_table;")?;
    warn!(cleared, "dropped reply_table; message grouping discarded");
    Ok(())
}

fn load_legacy_messages(conn: &Connection) -> Result<Vec<LegacyMessage>> {
    let mut stmt = conn.prepare("SELECT id, run_id, replyId, msg FROM message_table ORDER BY id")?;
    let rows = stmt
        .query_map([], |row| {
            Ok(LegacyMessage {
                id: row.get(0)?,
                run_id: row.get(1)?,
                reply_id: row.get(2)?,
                msg: row.get(3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn legacy(id: &str, reply_id: Option<&str>, role: &str, name: &str, ts: &str) -> LegacyMessage {
        LegacyMessage {
            id: id.to_string(),
            run_id: "run-1".to_string(),
            reply_id: reply_id.map(String::from),
            msg: json!({
                "id": id,
                "name": name,
                "role": role,
                "content": "x",
                "timestamp": ts,
            })
            .to_string(),
        }
    }

    #[test]
    fn grouping_key_falls_back_to_own_id() {
        assert_eq!(legacy("m1", None, "user", "u", "t").grouping_key(), "m1");
        assert_eq!(legacy("m1", Some(""), "user", "u", "t").grouping_key(), "m1");
        assert_eq!(legacy("m1", Some("r"), "user", "u", "t").grouping_key(), "r");
    }

    #[test]
    fn groups_by_reply_and_extends_finished_at() {
        let replies = group_replies(&[
            legacy("1", None, "user", "alice", "09:00"),
            legacy("2", Some("A"), "assistant", "bot", "09:05"),
            legacy("3", Some("A"), "assistant", "bot", "09:10"),
        ])
        .unwrap();

        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0].reply_id, "1");
        assert_eq!(replies[0].created_at, "09:00");
        assert_eq!(replies[0].finished_at.as_deref(), Some("09:00"));
        assert_eq!(replies[1].reply_id, "A");
        assert_eq!(replies[1].created_at, "09:05");
        assert_eq!(replies[1].finished_at.as_deref(), Some("09:10"));
    }

    #[test]
    fn earlier_timestamp_does_not_shrink_finished_at() {
        let replies = group_replies(&[
            legacy("1", Some("A"), "assistant", "bot", "09:10"),
            legacy("2", Some("A"), "assistant", "bot", "09:05"),
        ])
        .unwrap();
        assert_eq!(replies[0].created_at, "09:10");
        assert_eq!(replies[0].finished_at.as_deref(), Some("09:10"));
    }

    #[test]
    fn role_and_name_follow_scan_order_not_timestamp() {
        let replies = group_replies(&[
            legacy("1", Some("A"), "assistant", "late", "09:10"),
            legacy("2", Some("A"), "system", "early", "09:00"),
        ])
        .unwrap();
        assert_eq!(replies[0].reply_role, "system");
        assert_eq!(replies[0].reply_name, "early");
        assert_eq!(replies[0].finished_at.as_deref(), Some("09:10"));
    }

    #[test]
    fn integrity_gate_rejects_ungrouped_messages() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE message_table (id TEXT PRIMARY KEY, run_id TEXT, replyId TEXT, msg TEXT);
             INSERT INTO message_table VALUES ('1', 'run', 'A', '{}');",
        )
        .unwrap();
        ensure_all_grouped(&conn).unwrap();

        let _ = conn
            .execute("INSERT INTO message_table VALUES ('2', 'run', NULL, '{}')", [])
            .unwrap();
        let _ = conn
            .execute("INSERT INTO message_table VALUES ('3', 'run', '', '{}')", [])
            .unwrap();
        let err = ensure_all_grouped(&conn).unwrap_err();
        assert!(matches!(err, StoreError::Migration { .. }));
        assert!(err.to_string().contains("2 messages"));
    }

    #[test]
    fn malformed_payload_aborts() {
        let mut bad = legacy("1", None, "user", "u", "t");
        bad.msg = "{not json".into();
        let err = group_replies(&[bad]).unwrap_err();
        assert!(err.to_string().contains("message 1"));
    }

    #[test]
    fn payload_missing_timestamp_aborts() {
        let mut bad = legacy("1", None, "user", "u", "t");
        bad.msg = json!({"role": "user", "name": "u"}).to_string();
        assert!(group_replies(&[bad]).is_err());
    }

    #[test]
    fn empty_input_yields_no_replies() {
        assert!(group_replies(&[]).unwrap().is_empty());
    }
}
