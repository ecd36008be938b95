//! Input requests from agents waiting on the user.

use rusqlite::{Connection, Row, params};

use crate::errors::Result;
use crate::sqlite::row_types::InputRequestRow;

/// Input request queries.
pub struct InputRequestRepo;

impl InputRequestRepo {
    /// Record a new request.
    pub fn insert(conn: &Connection, request: &InputRequestRow) -> Result<()> {
        let _ = conn.execute(
            "INSERT INTO input_request_table (request_id, run_id, agent_id, agent_name,
                                              structured_input, created_at, resolved)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                request.request_id,
                request.run_id,
                request.agent_id,
                request.agent_name,
                request.structured_input,
                request.created_at,
                request.resolved
            ],
        )?;
        Ok(())
    }

    /// Unresolved requests of a run, oldest first.
    pub fn list_unresolved(conn: &Connection, run_id: &str) -> Result<Vec<InputRequestRow>> {
        let mut stmt = conn.prepare(
            "SELECT request_id, run_id, agent_id, agent_name, structured_input, created_at, resolved
             FROM input_request_table WHERE run_id = ?1 AND resolved = 0
             ORDER BY created_at, rowid",
        )?;
        let rows = stmt
            .query_map(params![run_id], Self::map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Mark a request answered. Returns whether an open request was found.
    pub fn resolve(conn: &Connection, request_id: &str) -> Result<bool> {
        let changed = conn.execute(
            "UPDATE input_request_table SET resolved = 1 WHERE request_id = ?1 AND resolved = 0",
            params![request_id],
        )?;
        Ok(changed > 0)
    }

    /// Delete every unresolved request in the database. Returns the count.
    pub fn delete_unresolved(conn: &Connection) -> Result<usize> {
        let deleted = conn.execute("DELETE FROM input_request_table WHERE resolved = 0", [])?;
        Ok(deleted)
    }

    fn map_row(row: &Row<'_>) -> rusqlite::Result<InputRequestRow> {
        Ok(InputRequestRow {
            request_id: row.get(0)?,
            run_id: row.get(1)?,
            agent_id: row.get(2)?,
            agent_name: row.get(3)?,
            structured_input: row.get(4)?,
            created_at: row.get(5)?,
            resolved: row.get(6)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::repositories::test_support::{insert_run, migrated};

    fn request(id: &str) -> InputRequestRow {
        InputRequestRow {
            request_id: id.into(),
            run_id: "run".into(),
            agent_id: "agent-1".into(),
            agent_name: "Friday".into(),
            structured_input: None,
            created_at: "t0".into(),
            resolved: false,
        }
    }

    #[test]
    fn resolve_removes_from_unresolved() {
        let conn = migrated();
        insert_run(&conn, "run");
        InputRequestRepo::insert(&conn, &request("q1")).unwrap();
        InputRequestRepo::insert(&conn, &request("q2")).unwrap();

        assert!(InputRequestRepo::resolve(&conn, "q1").unwrap());
        assert!(!InputRequestRepo::resolve(&conn, "q1").unwrap());

        let open = InputRequestRepo::list_unresolved(&conn, "run").unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].request_id, "q2");
    }

    #[test]
    fn delete_unresolved_keeps_resolved() {
        let conn = migrated();
        insert_run(&conn, "run");
        InputRequestRepo::insert(&conn, &request("q1")).unwrap();
        InputRequestRepo::insert(&conn, &request("q2")).unwrap();
        let _ = InputRequestRepo::resolve(&conn, "q1").unwrap();

        assert_eq!(InputRequestRepo::delete_unresolved(&conn).unwrap(), 1);
        let total: i64 = conn
            .query_row("SELECT COUNT(*) FROM input_request_table", [], |r| r.get(0))
            .unwrap();
        assert_eq!(total, 1);
    }
}
