//! Schema migration runner.
//!
//! Migrations are executed in version order. A step is either SQL embedded at
//! compile time via [`include_str!`] or a Rust function for data migrations
//! that cannot be expressed as a static script (the reply backfill). Each
//! step runs inside its own transaction, so a failure rolls back with no
//! partial schema state.
//!
//! The `schema_version` table tracks applied versions. Running the migrator
//! is idempotent: already-applied versions are skipped. The individual steps
//! are not: re-applying v2 to a schema that already has `reply_table` fails.

mod v002_reply_table;

use rusqlite::Connection;
use tracing::{debug, info};

use crate::errors::{Result, StoreError};

pub use v002_reply_table::{LegacyMessage, group_replies};

/// One direction of a migration.
enum Step {
    /// Static SQL script.
    Sql(&'static str),
    /// Imperative migration over the open transaction.
    Code(fn(&Connection) -> Result<()>),
}

impl Step {
    fn run(&self, conn: &Connection) -> Result<()> {
        match self {
            Self::Sql(sql) => Ok(conn.execute_batch(sql)?),
            Self::Code(f) => f(conn),
        }
    }
}

/// A single migration with a version number, forward and backward steps.
struct Migration {
    version: u32,
    description: &'static str,
    up: Step,
    down: Step,
}

/// All migrations in version order.
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "Initial schema: runs, messages, spans, input requests",
        up: Step::Sql(include_str!("v001_schema.sql")),
        down: Step::Sql(include_str!("v001_schema_down.sql")),
    },
    Migration {
        version: 2,
        description: "Add reply table and message.replyId foreign key",
        up: Step::Code(v002_reply_table::up),
        down: Step::Code(v002_reply_table::down),
    },
];

/// Run all pending migrations on the given connection.
///
/// Creates the `schema_version` table if it doesn't exist, then applies
/// each migration whose version exceeds the current maximum.
///
/// # Errors
///
/// Returns [`StoreError::Migration`] if any migration fails.
pub fn run_migrations(conn: &Connection) -> Result<u32> {
    ensure_version_table(conn)?;
    let current = current_version(conn)?;
    let mut applied = 0;

    for migration in MIGRATIONS {
        if migration.version <= current {
            debug!(
                version = migration.version,
                description = migration.description,
                "migration already applied, skipping"
            );
            continue;
        }

        info!(
            version = migration.version,
            description = migration.description,
            "applying migration"
        );

        apply_migration(conn, migration)?;
        applied += 1;
    }

    if applied > 0 {
        info!(applied, "migrations complete");
    }

    Ok(applied)
}

/// Revert applied migrations newer than `target`, newest first.
///
/// Returns the number of migrations reverted. Reverting is lossy where the
/// `down` step discards data (v2 drops reply groupings).
pub fn rollback_to(conn: &Connection, target: u32) -> Result<u32> {
    ensure_version_table(conn)?;
    let current = current_version(conn)?;
    let mut reverted = 0;

    for migration in MIGRATIONS.iter().rev() {
        if migration.version <= target || migration.version > current {
            continue;
        }

        info!(
            version = migration.version,
            description = migration.description,
            "reverting migration"
        );

        revert_migration(conn, migration)?;
        reverted += 1;
    }

    Ok(reverted)
}

/// Return the highest applied migration version, or 0 if none.
pub fn current_version(conn: &Connection) -> Result<u32> {
    let version: u32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        )
        .map_err(|e| StoreError::Migration {
            message: format!("failed to read schema_version: {e}"),
        })?;
    Ok(version)
}

/// Return the latest migration version defined in code.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |m| m.version)
}

// ─────────────────────────────────────────────────────────────────────────────
// Internal
// ─────────────────────────────────────────────────────────────────────────────

fn ensure_version_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
           version     INTEGER PRIMARY KEY,
           applied_at  TEXT    NOT NULL,
           description TEXT
         );",
    )
    .map_err(|e| StoreError::Migration {
        message: format!("failed to create schema_version table: {e}"),
    })?;
    Ok(())
}

fn apply_migration(conn: &Connection, migration: &Migration) -> Result<()> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| StoreError::Migration {
            message: format!("failed to begin transaction for v{}: {e}", migration.version),
        })?;

    migration.up.run(&tx).map_err(|e| match e {
        // The integrity gate already carries a full message.
        StoreError::Migration { message } => StoreError::Migration {
            message: format!("v{} ({}): {message}", migration.version, migration.description),
        },
        other => StoreError::Migration {
            message: format!(
                "migration v{} ({}) failed: {other}",
                migration.version, migration.description
            ),
        },
    })?;

    let _ = tx
        .execute(
            "INSERT INTO schema_version (version, applied_at, description) VALUES (?1, datetime('now'), ?2)",
            rusqlite::params![migration.version, migration.description],
        )
        .map_err(|e| StoreError::Migration {
            message: format!("failed to record v{} in schema_version: {e}", migration.version),
        })?;

    tx.commit().map_err(|e| StoreError::Migration {
        message: format!("failed to commit v{}: {e}", migration.version),
    })?;

    Ok(())
}

fn revert_migration(conn: &Connection, migration: &Migration) -> Result<()> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| StoreError::Migration {
            message: format!("failed to begin rollback of v{}: {e}", migration.version),
        })?;

    migration.down.run(&tx).map_err(|e| StoreError::Migration {
        message: format!(
            "rollback of v{} ({}) failed: {e}",
            migration.version, migration.description
        ),
    })?;

    let _ = tx.execute(
        "DELETE FROM schema_version WHERE version = ?1",
        rusqlite::params![migration.version],
    )?;

    tx.commit().map_err(|e| StoreError::Migration {
        message: format!("failed to commit rollback of v{}: {e}", migration.version),
    })?;

    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(unused_results)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn open_memory() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        conn
    }

    fn table_names(conn: &Connection) -> Vec<String> {
        conn.prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect()
    }

    fn column_notnull(conn: &Connection, table: &str, column: &str) -> bool {
        conn.prepare(&format!("PRAGMA table_info({table})"))
            .unwrap()
            .query_map([], |row| Ok((row.get::<_, String>(1)?, row.get::<_, i64>(3)?)))
            .unwrap()
            .filter_map(|r| r.ok())
            .find(|(name, _)| name == column)
            .map(|(_, notnull)| notnull == 1)
            .unwrap()
    }

    #[test]
    fn run_migrations_creates_all_tables() {
        let conn = open_memory();
        let applied = run_migrations(&conn).unwrap();
        assert_eq!(applied, 2);

        let tables = table_names(&conn);
        for table in [
            "input_request_table",
            "message_table",
            "reply_table",
            "run_table",
            "schema_version",
            "span_table",
        ] {
            assert!(tables.contains(&table.to_string()), "missing table: {table}");
        }
    }

    #[test]
    fn run_migrations_is_idempotent() {
        let conn = open_memory();
        assert_eq!(run_migrations(&conn).unwrap(), 2);
        assert_eq!(run_migrations(&conn).unwrap(), 0);
    }

    #[test]
    fn current_version_tracks_migrations() {
        let conn = open_memory();
        ensure_version_table(&conn).unwrap();
        assert_eq!(current_version(&conn).unwrap(), 0);
        run_migrations(&conn).unwrap();
        assert_eq!(current_version(&conn).unwrap(), latest_version());
    }

    #[test]
    fn latest_version_matches_migrations() {
        assert_eq!(latest_version(), 2);
    }

    #[test]
    fn schema_version_records_description() {
        let conn = open_memory();
        run_migrations(&conn).unwrap();

        let desc: String = conn
            .query_row(
                "SELECT description FROM schema_version WHERE version = 2",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert!(desc.contains("reply table"));
    }

    #[test]
    fn reply_id_is_not_null_after_v2() {
        let conn = open_memory();
        run_migrations(&conn).unwrap();
        assert!(column_notnull(&conn, "message_table", "replyId"));
    }

    #[test]
    fn message_indexes_survive_rebuild() {
        let conn = open_memory();
        run_migrations(&conn).unwrap();

        let indexes: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'index' AND tbl_name = 'message_table'")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();
        assert!(indexes.contains(&"idx_message_run".to_string()));
        assert!(indexes.contains(&"idx_message_reply".to_string()));
    }

    #[test]
    fn rollback_to_v1_relaxes_reply_id() {
        let conn = open_memory();
        run_migrations(&conn).unwrap();

        let reverted = rollback_to(&conn, 1).unwrap();
        assert_eq!(reverted, 1);
        assert_eq!(current_version(&conn).unwrap(), 1);
        assert!(!table_names(&conn).contains(&"reply_table".to_string()));
        assert!(!column_notnull(&conn, "message_table", "replyId"));
    }

    #[test]
    fn rollback_to_zero_drops_everything() {
        let conn = open_memory();
        run_migrations(&conn).unwrap();

        assert_eq!(rollback_to(&conn, 0).unwrap(), 2);
        assert_eq!(table_names(&conn), vec!["schema_version".to_string()]);

        // Forward again from scratch
        assert_eq!(run_migrations(&conn).unwrap(), 2);
    }

    #[test]
    fn rollback_beyond_current_is_noop() {
        let conn = open_memory();
        run_migrations(&conn).unwrap();
        assert_eq!(rollback_to(&conn, 5).unwrap(), 0);
    }

    #[test]
    fn foreign_keys_enforced_on_replies() {
        let conn = open_memory();
        run_migrations(&conn).unwrap();

        let result = conn.execute(
            "INSERT INTO reply_table (replyId, replyRole, replyName, run_id, createdAt)
             VALUES ('r1', 'user', 'u', 'no-such-run', '2025-01-01 00:00:00.000')",
            [],
        );
        assert!(result.is_err());
    }
}
