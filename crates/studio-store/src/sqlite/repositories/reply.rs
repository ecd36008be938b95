//! Replies: one row per conversational turn.

use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::errors::Result;
use crate::sqlite::row_types::ReplyRow;

/// Reply repository.
pub struct ReplyRepo;

impl ReplyRepo {
    /// Insert a reply. The owning run must exist.
    pub fn insert(conn: &Connection, reply: &ReplyRow) -> Result<()> {
        let _ = conn.execute(
            "INSERT INTO reply_table (replyId, replyRole, replyName, run_id, createdAt, finishedAt)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                reply.reply_id,
                reply.reply_role,
                reply.reply_name,
                reply.run_id,
                reply.created_at,
                reply.finished_at
            ],
        )?;
        Ok(())
    }

    /// Get reply by ID.
    pub fn get_by_id(conn: &Connection, reply_id: &str) -> Result<Option<ReplyRow>> {
        let row = conn
            .query_row(
                "SELECT replyId, replyRole, replyName, run_id, createdAt, finishedAt
                 FROM reply_table WHERE replyId = ?1",
                params![reply_id],
                Self::map_row,
            )
            .optional()?;
        Ok(row)
    }

    /// Replies of a run in chronological order.
    pub fn list_by_run(conn: &Connection, run_id: &str) -> Result<Vec<ReplyRow>> {
        let mut stmt = conn.prepare(
            "SELECT replyId, replyRole, replyName, run_id, createdAt, finishedAt
             FROM reply_table WHERE run_id = ?1 ORDER BY createdAt, rowid",
        )?;
        let rows = stmt
            .query_map(params![run_id], Self::map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Record when the reply finished. Returns whether the reply existed.
    pub fn mark_finished(conn: &Connection, reply_id: &str, finished_at: &str) -> Result<bool> {
        let changed = conn.execute(
            "UPDATE reply_table SET finishedAt = ?1 WHERE replyId = ?2",
            params![finished_at, reply_id],
        )?;
        Ok(changed > 0)
    }

    fn map_row(row: &Row<'_>) -> rusqlite::Result<ReplyRow> {
        Ok(ReplyRow {
            reply_id: row.get(0)?,
            reply_role: row.get(1)?,
            reply_name: row.get(2)?,
            run_id: row.get(3)?,
            created_at: row.get(4)?,
            finished_at: row.get(5)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::repositories::test_support::{insert_run, migrated};

    fn reply(id: &str, run_id: &str, created_at: &str) -> ReplyRow {
        ReplyRow {
            reply_id: id.into(),
            reply_role: "assistant".into(),
            reply_name: "Friday".into(),
            run_id: run_id.into(),
            created_at: created_at.into(),
            finished_at: None,
        }
    }

    #[test]
    fn insert_requires_existing_run() {
        let conn = migrated();
        assert!(ReplyRepo::insert(&conn, &reply("r1", "ghost", "t")).is_err());
    }

    #[test]
    fn list_by_run_is_chronological() {
        let conn = migrated();
        insert_run(&conn, "run");
        ReplyRepo::insert(&conn, &reply("late", "run", "2025-01-01 10:00:00.000")).unwrap();
        ReplyRepo::insert(&conn, &reply("early", "run", "2025-01-01 09:00:00.000")).unwrap();

        let ids: Vec<_> = ReplyRepo::list_by_run(&conn, "run")
            .unwrap()
            .into_iter()
            .map(|r| r.reply_id)
            .collect();
        assert_eq!(ids, ["early", "late"]);
    }

    #[test]
    fn mark_finished_sets_timestamp() {
        let conn = migrated();
        insert_run(&conn, "run");
        ReplyRepo::insert(&conn, &reply("r1", "run", "t0")).unwrap();

        assert!(ReplyRepo::mark_finished(&conn, "r1", "t1").unwrap());
        let row = ReplyRepo::get_by_id(&conn, "r1").unwrap().unwrap();
        assert_eq!(row.finished_at.as_deref(), Some("t1"));
        assert!(!ReplyRepo::mark_finished(&conn, "nope", "t1").unwrap());
    }

    #[test]
    fn deleting_run_cascades_to_replies() {
        let conn = migrated();
        insert_run(&conn, "run");
        ReplyRepo::insert(&conn, &reply("r1", "run", "t0")).unwrap();

        let _ = conn.execute("DELETE FROM run_table WHERE id = 'run'", []).unwrap();
        assert!(ReplyRepo::get_by_id(&conn, "r1").unwrap().is_none());
    }
}
