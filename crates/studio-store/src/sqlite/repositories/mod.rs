//! Repository implementations for `SQLite` database operations.
//!
//! Each repository is a stateless struct whose methods take a `&Connection`
//! parameter, so every operation is a plain function of
//! (connection, input) → output and can run inside any transaction.

pub mod input_request;
pub mod message;
pub mod reply;
pub mod run;
pub mod span;

#[cfg(test)]
pub(crate) mod test_support {
    use rusqlite::Connection;

    use crate::sqlite::migrations::run_migrations;
    use crate::sqlite::repositories::run::RunRepo;
    use crate::sqlite::row_types::RunRow;

    /// Fully migrated in-memory database.
    pub fn migrated() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        let _ = run_migrations(&conn).unwrap();
        conn
    }

    pub fn run_row(id: &str, project: &str, status: &str) -> RunRow {
        RunRow {
            id: id.into(),
            project: project.into(),
            name: format!("{id}-name"),
            timestamp: "2025-01-01 00:00:00.000".into(),
            run_dir: format!("/tmp/{project}"),
            pid: 1000,
            status: status.into(),
        }
    }

    pub fn insert_run(conn: &Connection, id: &str) {
        RunRepo::insert(conn, &run_row(id, "demo", "running")).unwrap();
    }
}
