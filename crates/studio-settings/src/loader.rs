//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`StudioSettings::default()`]
//! 2. If `~/.agentscope-studio/settings.json` exists, deep-merge user values over defaults
//! 3. Apply `STUDIO_*` environment variable overrides (highest priority)
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::{Result, SettingsError};
use crate::types::{DisplayMode, Language, StudioSettings};

/// Root directory for per-user Studio state (`~/.agentscope-studio`).
pub fn studio_home() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".agentscope-studio")
}

/// Resolve the path to the settings file.
pub fn settings_path() -> PathBuf {
    studio_home().join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<StudioSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// If the file does not exist, returns defaults. If the file contains
/// invalid JSON or invalid values, returns an error.
pub fn load_settings_from_path(path: &Path) -> Result<StudioSettings> {
    let defaults = serde_json::to_value(StudioSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let user: Value = serde_json::from_str(&content).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: StudioSettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings);
    validate(&settings)?;
    Ok(settings)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply environment variable overrides to loaded settings.
///
/// Invalid values are logged and ignored (fall back to file/default).
pub fn apply_env_overrides(settings: &mut StudioSettings) {
    // ── Database ────────────────────────────────────────────────────
    if let Some(v) = read_env_string("STUDIO_DB_PATH") {
        settings.database.path = v;
    }
    if let Some(v) = read_env_u32("STUDIO_DB_POOL_SIZE", 1, 256) {
        settings.database.pool_size = v;
    }
    if let Some(v) = read_env_u32("STUDIO_DB_BUSY_TIMEOUT_MS", 0, 600_000) {
        settings.database.busy_timeout_ms = v;
    }

    // ── UI ──────────────────────────────────────────────────────────
    if let Some(v) = read_env_string("STUDIO_LANGUAGE") {
        match v.parse::<Language>() {
            Ok(lang) => settings.ui.language = lang,
            Err(_) => tracing::warn!(key = "STUDIO_LANGUAGE", value = %v, "unsupported language, ignoring"),
        }
    }
    if let Some(v) = read_env_bool("STUDIO_RANDOM_AVATAR") {
        settings.ui.random_avatar = v;
    }
    if let Some(v) = read_env_i32("STUDIO_AVATAR_SEED") {
        settings.ui.avatar_seed = v;
    }
    if let Some(v) = read_env_string("STUDIO_AVATAR_DIR") {
        settings.ui.avatar_dir = v;
    }
    if let Some(v) = read_env_string("STUDIO_DISPLAY_MODE") {
        match parse_display_mode(&v) {
            Some(mode) => settings.ui.display_mode = mode,
            None => tracing::warn!(key = "STUDIO_DISPLAY_MODE", value = %v, "unknown display mode, ignoring"),
        }
    }
    if let Some(v) = read_env_bool("STUDIO_RENDER_MARKDOWN") {
        settings.ui.render_markdown = v;
    }

    // ── Logging ─────────────────────────────────────────────────────
    if let Some(v) = read_env_string("STUDIO_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = read_env_bool("STUDIO_LOG_JSON") {
        settings.logging.json = v;
    }
}

fn validate(settings: &StudioSettings) -> Result<()> {
    if settings.database.pool_size == 0 {
        return Err(SettingsError::InvalidValue(
            "database.poolSize must be at least 1".to_string(),
        ));
    }
    Ok(())
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u32` within a range.
pub fn parse_u32_range(val: &str, min: u32, max: u32) -> Option<u32> {
    let n: u32 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a display mode as written in the settings file (`byReply`, `byMessage`).
pub fn parse_display_mode(val: &str) -> Option<DisplayMode> {
    serde_json::from_value(Value::String(val.to_string())).ok()
}

// ── Env var readers (thin wrappers) ─────────────────────────────────────────

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn read_env_bool(name: &str) -> Option<bool> {
    let val = std::env::var(name).ok()?;
    let result = parse_bool(&val);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid boolean env var, ignoring");
    }
    result
}

fn read_env_u32(name: &str, min: u32, max: u32) -> Option<u32> {
    let val = std::env::var(name).ok()?;
    let result = parse_u32_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid u32 env var, ignoring");
    }
    result
}

fn read_env_i32(name: &str) -> Option<i32> {
    let val = std::env::var(name).ok()?;
    let result = val.trim().parse().ok();
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid i32 env var, ignoring");
    }
    result
}
