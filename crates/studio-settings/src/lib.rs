//! # studio-settings
//!
//! Configuration for AgentScope Studio, loaded from three layers (in
//! priority order):
//! 1. **Compiled defaults**: [`StudioSettings::default()`]
//! 2. **User file**: `~/.agentscope-studio/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `STUDIO_*` overrides (highest priority)
//!
//! Settings are loaded once by the binary and passed down explicitly; there
//! is no global instance.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;
