//! Pooled `SQLite` connections.
//!
//! Every connection handed out by the pool has foreign keys switched on;
//! the reply migration and the run cascade both depend on it.

use std::path::Path;
use std::time::Duration;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;

use crate::errors::Result;

/// Pool of studio database connections.
pub type ConnectionPool = Pool<SqliteConnectionManager>;

/// A connection checked out of a [`ConnectionPool`].
pub type PooledConnection = r2d2::PooledConnection<SqliteConnectionManager>;

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Pool sizing and per-connection pragmas.
#[derive(Clone, Debug)]
pub struct ConnectionConfig {
    /// Upper bound on open connections for file databases.
    pub pool_size: u32,
    /// How long a writer waits on a locked database, in milliseconds.
    pub busy_timeout_ms: u32,
    /// Page cache per connection, in KiB.
    pub cache_size_kib: i64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            pool_size: 4,
            busy_timeout_ms: 5_000,
            cache_size_kib: 4096,
        }
    }
}

#[derive(Debug)]
struct StudioPragmas {
    busy_timeout_ms: u32,
    cache_size_kib: i64,
}

impl StudioPragmas {
    fn apply(&self, conn: &Connection) -> rusqlite::Result<()> {
        // journal_mode answers with a row
        let _mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
        conn.pragma_update(None, "foreign_keys", true)?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "cache_size", -self.cache_size_kib)?;
        conn.busy_timeout(Duration::from_millis(u64::from(self.busy_timeout_ms)))
    }
}

impl r2d2::CustomizeConnection<Connection, rusqlite::Error> for StudioPragmas {
    fn on_acquire(&self, conn: &mut Connection) -> std::result::Result<(), rusqlite::Error> {
        self.apply(conn)
    }
}

fn pool(
    manager: SqliteConnectionManager,
    max_size: u32,
    config: &ConnectionConfig,
) -> Result<ConnectionPool> {
    let pragmas = StudioPragmas {
        busy_timeout_ms: config.busy_timeout_ms,
        cache_size_kib: config.cache_size_kib,
    };
    Ok(Pool::builder()
        .max_size(max_size)
        .connection_timeout(ACQUIRE_TIMEOUT)
        .connection_customizer(Box::new(pragmas))
        .build(manager)?)
}

/// Pool over a private in-memory database.
///
/// Each in-memory connection would be a separate database, so the pool
/// holds exactly one connection whatever `config.pool_size` says.
pub fn new_in_memory(config: &ConnectionConfig) -> Result<ConnectionPool> {
    pool(SqliteConnectionManager::memory(), 1, config)
}

/// Pool over the database file at `path`, created if missing.
pub fn new_file(path: &Path, config: &ConnectionConfig) -> Result<ConnectionPool> {
    pool(SqliteConnectionManager::file(path), config.pool_size, config)
}

/// Pragmas as observed on a live connection.
#[derive(Debug, PartialEq, Eq)]
pub struct PragmaState {
    /// `wal` for files, `memory` for in-memory databases.
    pub journal_mode: String,
    /// Foreign key enforcement.
    pub foreign_keys_enabled: bool,
    /// Busy timeout in milliseconds.
    pub busy_timeout_ms: i64,
}

/// Read back the pragmas the pool is expected to have set.
pub fn verify_pragmas(conn: &Connection) -> Result<PragmaState> {
    let journal_mode: String = conn.pragma_query_value(None, "journal_mode", |row| row.get(0))?;
    let foreign_keys: i64 = conn.pragma_query_value(None, "foreign_keys", |row| row.get(0))?;
    let busy_timeout_ms: i64 = conn.pragma_query_value(None, "busy_timeout", |row| row.get(0))?;
    Ok(PragmaState {
        journal_mode,
        foreign_keys_enabled: foreign_keys == 1,
        busy_timeout_ms,
    })
}
