//! Startup sequence: open the pool, converge the schema, repair stale state.
//!
//! [`initialize_database`] is safe to call on every start. Each pass is
//! idempotent, and a failure in any of them is fatal: the error is logged
//! and returned, and no half-initialized handle escapes.

use std::path::{Path, PathBuf};

use tracing::{error, info};

use crate::database::Database;
use crate::errors::Result;
use crate::sqlite::connection::ConnectionConfig;
use crate::sqlite::migrations::{latest_version, run_migrations};

/// Where and how to open the database.
#[derive(Clone, Debug, Default)]
pub struct DatabaseConfig {
    /// Database file. `None` opens a private in-memory database.
    pub path: Option<PathBuf>,
    /// Pool and pragma settings.
    pub connection: ConnectionConfig,
}

impl DatabaseConfig {
    /// File-backed database with default pool settings.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            connection: ConnectionConfig::default(),
        }
    }

    /// In-memory database with default pool settings.
    pub fn in_memory() -> Self {
        Self::default()
    }
}

/// Summary of what a bootstrap changed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BootstrapReport {
    /// Migrations applied by this start.
    pub migrations_applied: u32,
    /// Runs moved from `running`/`pending` to `done`.
    pub runs_reconciled: usize,
    /// Unresolved input requests deleted.
    pub input_requests_discarded: usize,
}

/// Open the database, apply pending migrations, and reconcile leftovers.
///
/// Order matters: migrations first, so the reconcile passes always see the
/// latest schema.
pub fn initialize_database(config: &DatabaseConfig) -> Result<Database> {
    initialize_with_report(config).map(|(db, _)| db)
}

/// Like [`initialize_database`], also returning what was changed.
pub fn initialize_with_report(config: &DatabaseConfig) -> Result<(Database, BootstrapReport)> {
    bootstrap(config).inspect_err(|e| error!(error = %e, "database initialization failed"))
}

fn bootstrap(config: &DatabaseConfig) -> Result<(Database, BootstrapReport)> {
    let db = match &config.path {
        Some(path) => {
            ensure_parent_dir(path)?;
            Database::open(path, &config.connection)?
        }
        None => Database::open_in_memory(&config.connection)?,
    };

    let migrations_applied = {
        let conn = db.conn()?;
        run_migrations(&conn)?
    };
    let runs_reconciled = db.reconcile_run_status()?;
    let input_requests_discarded = db.reconcile_input_requests()?;

    let report = BootstrapReport {
        migrations_applied,
        runs_reconciled,
        input_requests_discarded,
    };
    info!(
        path = %config.path.as_deref().map_or_else(|| ":memory:".into(), |p| p.display().to_string()),
        schema_version = latest_version(),
        migrations_applied,
        runs_reconciled,
        input_requests_discarded,
        "database ready"
    );
    Ok((db, report))
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}
