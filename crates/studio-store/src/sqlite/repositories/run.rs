//! Run registration, status updates and project listing.

use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::errors::Result;
use crate::sqlite::row_types::RunRow;

/// Options for listing runs.
#[derive(Default)]
pub struct ListRunsOptions<'a> {
    /// Filter by project.
    pub project: Option<&'a str>,
    /// Filter by status string.
    pub status: Option<&'a str>,
    /// Maximum results.
    pub limit: Option<i64>,
}

/// Per-project aggregate for the project overview.
#[derive(Clone, Debug, PartialEq)]
pub struct ProjectSummary {
    /// Project name.
    pub project: String,
    /// Number of runs recorded.
    pub run_count: i64,
    /// Timestamp of the newest run.
    pub last_run_at: String,
}

/// Run repository. Stateless; every method takes `&Connection`.
pub struct RunRepo;

impl RunRepo {
    /// Register a run. Fails if the ID already exists.
    pub fn insert(conn: &Connection, run: &RunRow) -> Result<()> {
        let _ = conn.execute(
            "INSERT INTO run_table (id, project, name, timestamp, run_dir, pid, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                run.id,
                run.project,
                run.name,
                run.timestamp,
                run.run_dir,
                run.pid,
                run.status
            ],
        )?;
        Ok(())
    }

    /// Get run by ID.
    pub fn get_by_id(conn: &Connection, id: &str) -> Result<Option<RunRow>> {
        let row = conn
            .query_row(
                "SELECT id, project, name, timestamp, run_dir, pid, status FROM run_table WHERE id = ?1",
                params![id],
                Self::map_row,
            )
            .optional()?;
        Ok(row)
    }

    /// List runs, newest first.
    pub fn list(conn: &Connection, opts: &ListRunsOptions<'_>) -> Result<Vec<RunRow>> {
        use std::fmt::Write;
        let mut sql = String::from(
            "SELECT id, project, name, timestamp, run_dir, pid, status FROM run_table WHERE 1=1",
        );
        let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(project) = opts.project {
            let _ = write!(sql, " AND project = ?{}", param_values.len() + 1);
            param_values.push(Box::new(project.to_string()));
        }
        if let Some(status) = opts.status {
            let _ = write!(sql, " AND status = ?{}", param_values.len() + 1);
            param_values.push(Box::new(status.to_string()));
        }
        sql.push_str(" ORDER BY timestamp DESC, id DESC");
        if let Some(limit) = opts.limit {
            let _ = write!(sql, " LIMIT {limit}");
        }

        let mut stmt = conn.prepare(&sql)?;
        let params_refs: Vec<&dyn rusqlite::types::ToSql> =
            param_values.iter().map(Box::as_ref).collect();
        let rows = stmt
            .query_map(params_refs.as_slice(), Self::map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Set a run's status. Returns whether the run existed.
    pub fn update_status(conn: &Connection, id: &str, status: &str) -> Result<bool> {
        let changed = conn.execute(
            "UPDATE run_table SET status = ?1 WHERE id = ?2",
            params![status, id],
        )?;
        Ok(changed > 0)
    }

    /// Move every run in one of `from` statuses to `to`. Returns the count.
    pub fn update_status_where(conn: &Connection, from: &[&str], to: &str) -> Result<usize> {
        let mut total = 0;
        let mut stmt = conn.prepare("UPDATE run_table SET status = ?1 WHERE status = ?2")?;
        for status in from {
            total += stmt.execute(params![to, status])?;
        }
        Ok(total)
    }

    /// Delete a run; replies, messages, spans and input requests cascade.
    pub fn delete(conn: &Connection, id: &str) -> Result<bool> {
        let changed = conn.execute("DELETE FROM run_table WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    /// Projects with run counts, most recently active first.
    pub fn list_projects(conn: &Connection) -> Result<Vec<ProjectSummary>> {
        let mut stmt = conn.prepare(
            "SELECT project, COUNT(*), MAX(timestamp) FROM run_table
             GROUP BY project ORDER BY MAX(timestamp) DESC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(ProjectSummary {
                    project: row.get(0)?,
                    run_count: row.get(1)?,
                    last_run_at: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn map_row(row: &Row<'_>) -> rusqlite::Result<RunRow> {
        Ok(RunRow {
            id: row.get(0)?,
            project: row.get(1)?,
            name: row.get(2)?,
            timestamp: row.get(3)?,
            run_dir: row.get(4)?,
            pid: row.get(5)?,
            status: row.get(6)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::repositories::test_support::{migrated, run_row};

    #[test]
    fn insert_and_get() {
        let conn = migrated();
        RunRepo::insert(&conn, &run_row("r1", "demo", "running")).unwrap();

        let row = RunRepo::get_by_id(&conn, "r1").unwrap().unwrap();
        assert_eq!(row.project, "demo");
        assert_eq!(row.pid, 1000);
        assert!(RunRepo::get_by_id(&conn, "missing").unwrap().is_none());
    }

    #[test]
    fn duplicate_id_rejected() {
        let conn = migrated();
        RunRepo::insert(&conn, &run_row("r1", "demo", "running")).unwrap();
        assert!(RunRepo::insert(&conn, &run_row("r1", "demo", "running")).is_err());
    }

    #[test]
    fn list_filters_by_project_and_status() {
        let conn = migrated();
        RunRepo::insert(&conn, &run_row("a", "p1", "running")).unwrap();
        RunRepo::insert(&conn, &run_row("b", "p1", "done")).unwrap();
        RunRepo::insert(&conn, &run_row("c", "p2", "running")).unwrap();

        let p1 = RunRepo::list(
            &conn,
            &ListRunsOptions {
                project: Some("p1"),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(p1.len(), 2);

        let running = RunRepo::list(
            &conn,
            &ListRunsOptions {
                status: Some("running"),
                limit: Some(1),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(running.len(), 1);
    }

    #[test]
    fn update_status_where_moves_only_matching() {
        let conn = migrated();
        RunRepo::insert(&conn, &run_row("a", "p", "running")).unwrap();
        RunRepo::insert(&conn, &run_row("b", "p", "pending")).unwrap();
        RunRepo::insert(&conn, &run_row("c", "p", "error")).unwrap();

        let moved = RunRepo::update_status_where(&conn, &["running", "pending"], "done").unwrap();
        assert_eq!(moved, 2);
        assert_eq!(RunRepo::get_by_id(&conn, "c").unwrap().unwrap().status, "error");
    }

    #[test]
    fn list_projects_counts_runs() {
        let conn = migrated();
        RunRepo::insert(&conn, &run_row("a", "p1", "done")).unwrap();
        RunRepo::insert(&conn, &run_row("b", "p1", "done")).unwrap();
        RunRepo::insert(&conn, &run_row("c", "p2", "done")).unwrap();

        let projects = RunRepo::list_projects(&conn).unwrap();
        let p1 = projects.iter().find(|p| p.project == "p1").unwrap();
        assert_eq!(p1.run_count, 2);
        assert_eq!(projects.len(), 2);
    }

    #[test]
    fn delete_reports_existence() {
        let conn = migrated();
        RunRepo::insert(&conn, &run_row("a", "p", "done")).unwrap();
        assert!(RunRepo::delete(&conn, "a").unwrap());
        assert!(!RunRepo::delete(&conn, "a").unwrap());
    }
}
