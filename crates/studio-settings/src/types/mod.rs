//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]` and `#[serde(default)]`
//! so a partial settings file only needs the keys it overrides.

mod database;
mod ui;

pub use database::*;
pub use ui::*;

use serde::{Deserialize, Serialize};

/// Root settings type.
///
/// ```json
/// {
///   "database": { "path": "/var/lib/studio/studio.db" },
///   "ui": { "language": "zh" }
/// }
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StudioSettings {
    /// Settings schema version.
    pub version: String,
    /// Application name.
    pub name: String,
    /// Database location and pool tuning.
    pub database: DatabaseSettings,
    /// Chat and navigation preferences.
    pub ui: UiSettings,
    /// Logging configuration.
    pub logging: LoggingSettings,
}

impl Default for StudioSettings {
    fn default() -> Self {
        Self {
            version: "0.1.0".to_string(),
            name: "agentscope-studio".to_string(),
            database: DatabaseSettings::default(),
            ui: UiSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

/// Logging configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Minimum level (`trace`..`error`); `RUST_LOG` wins when set.
    pub level: String,
    /// Emit JSON lines instead of compact text.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}
