//! # studio
//!
//! AgentScope Studio command-line entry point. Loads settings, installs the
//! log subscriber, and runs one database or inspection command.

#![deny(unsafe_code)]

mod commands;
mod render;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use studio_settings::{StudioSettings, load_settings, load_settings_from_path};
use studio_store::{ConnectionConfig, DatabaseConfig};

/// AgentScope Studio.
#[derive(Parser, Debug)]
#[command(name = "studio", about = "AgentScope Studio database and transcript tools")]
struct Cli {
    /// Path to the `SQLite` database (overrides settings).
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    /// Log level (overrides settings; `RUST_LOG` wins over both).
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Settings file to use instead of `~/.agentscope-studio/settings.json`.
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// Open the database, apply migrations, and repair state left by a
    /// previous process.
    Init,
    /// Apply pending migrations only.
    Migrate,
    /// Revert migrations newer than `--to` (lossy for the reply table).
    Rollback {
        /// Target schema version.
        #[arg(long)]
        to: u32,
    },
    /// Show schema version and run counts.
    Status,
    /// Print the transcript of a run.
    Show {
        /// Run ID.
        run_id: String,
        /// One entry per message instead of per reply.
        #[arg(long)]
        by_message: bool,
        /// Print text verbatim instead of as markdown source.
        #[arg(long)]
        plain: bool,
    },
}

impl Cli {
    fn load_settings(&self) -> Result<StudioSettings> {
        match &self.settings {
            Some(path) => load_settings_from_path(path)
                .with_context(|| format!("failed to load settings from {}", path.display())),
            None => load_settings().context("failed to load settings"),
        }
    }
}

/// Database configuration from settings, with the CLI path taking priority.
fn database_config(settings: &StudioSettings, db_path: Option<PathBuf>) -> DatabaseConfig {
    let db = &settings.database;
    DatabaseConfig {
        path: Some(db_path.unwrap_or_else(|| db.resolved_path())),
        connection: ConnectionConfig {
            pool_size: db.pool_size,
            busy_timeout_ms: db.busy_timeout_ms,
            cache_size_kib: db.cache_size_kib,
        },
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = cli.load_settings()?;

    let level = cli.log_level.as_deref().unwrap_or(&settings.logging.level);
    if settings.logging.json {
        studio_core::logging::init_json_subscriber(level);
    } else {
        studio_core::logging::init_subscriber(level);
    }

    let config = database_config(&settings, cli.db_path.clone());
    let mut out = std::io::stdout().lock();
    commands::run(&cli.command, &config, &settings, &mut out)
}
