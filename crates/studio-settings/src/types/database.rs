//! Database settings.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Where the database lives and how the pool is tuned.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DatabaseSettings {
    /// `SQLite` file path. Empty means `~/.agentscope-studio/database/studio.db`.
    pub path: String,
    /// Maximum pooled connections.
    pub pool_size: u32,
    /// Busy timeout in milliseconds.
    pub busy_timeout_ms: u32,
    /// Page cache size in KiB.
    pub cache_size_kib: i64,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: String::new(),
            pool_size: 4,
            busy_timeout_ms: 5_000,
            cache_size_kib: 4096,
        }
    }
}

impl DatabaseSettings {
    /// Resolve the configured path, falling back to the per-user default.
    pub fn resolved_path(&self) -> PathBuf {
        if self.path.is_empty() {
            crate::loader::studio_home().join("database").join("studio.db")
        } else {
            PathBuf::from(&self.path)
        }
    }
}
