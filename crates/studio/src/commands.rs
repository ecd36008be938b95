//! Subcommand implementations.

use std::io::Write;

use anyhow::{Context, Result, bail};
use tracing::{info, warn};

use studio_settings::{DisplayMode, StudioSettings};
use studio_store::sqlite::{latest_version, rollback_to, run_migrations};
use studio_store::{Database, DatabaseConfig, initialize_with_report};
use studio_ui::{AvatarCatalog, ChatEvent, ChatState};

use crate::Command;
use crate::render;

/// Run `command` against the configured database, writing results to `out`.
pub(crate) fn run(
    command: &Command,
    config: &DatabaseConfig,
    settings: &StudioSettings,
    out: &mut impl Write,
) -> Result<()> {
    match command {
        Command::Init => init(config, out),
        Command::Migrate => migrate(config, out),
        Command::Rollback { to } => rollback(config, *to, out),
        Command::Status => status(config, out),
        Command::Show {
            run_id,
            by_message,
            plain,
        } => show(config, settings, run_id, *by_message, *plain, out),
    }
}

fn open(config: &DatabaseConfig) -> Result<Database> {
    let Some(path) = config.path.as_deref() else {
        return Database::open_in_memory(&config.connection).context("failed to open database");
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory: {}", parent.display()))?;
    }
    Database::open(path, &config.connection)
        .with_context(|| format!("failed to open database: {}", path.display()))
}

fn init(config: &DatabaseConfig, out: &mut impl Write) -> Result<()> {
    let (db, report) = initialize_with_report(config).context("database initialization failed")?;
    writeln!(out, "schema version: {}", db.schema_version()?)?;
    writeln!(out, "migrations applied: {}", report.migrations_applied)?;
    writeln!(out, "runs marked done: {}", report.runs_reconciled)?;
    writeln!(
        out,
        "input requests discarded: {}",
        report.input_requests_discarded
    )?;
    db.close();
    Ok(())
}

fn migrate(config: &DatabaseConfig, out: &mut impl Write) -> Result<()> {
    let db = open(config)?;
    let applied = {
        let conn = db.conn()?;
        run_migrations(&conn).context("migration failed")?
    };
    writeln!(
        out,
        "applied {applied} migration(s); schema version {}",
        db.schema_version()?
    )?;
    db.close();
    Ok(())
}

fn rollback(config: &DatabaseConfig, target: u32, out: &mut impl Write) -> Result<()> {
    let latest = latest_version();
    if target > latest {
        bail!("cannot roll back to v{target}: latest schema version is v{latest}");
    }
    let db = open(config)?;
    let reverted = {
        let conn = db.conn()?;
        rollback_to(&conn, target).with_context(|| format!("rollback to v{target} failed"))?
    };
    info!(target_version = target, reverted, "rollback complete");
    writeln!(
        out,
        "reverted {reverted} migration(s); schema version {}",
        db.schema_version()?
    )?;
    db.close();
    Ok(())
}

fn status(config: &DatabaseConfig, out: &mut impl Write) -> Result<()> {
    let db = open(config)?;
    let current = db.schema_version()?;
    let latest = latest_version();
    writeln!(out, "schema version: {current} (latest {latest})")?;
    if current < latest {
        writeln!(out, "pending migrations: {}", latest - current)?;
        db.close();
        return Ok(());
    }

    let projects = db.list_projects().context("failed to list projects")?;
    if projects.is_empty() {
        writeln!(out, "no runs recorded")?;
    }
    for project in projects {
        writeln!(
            out,
            "{}: {} run(s), last at {}",
            project.project, project.run_count, project.last_run_at
        )?;
    }
    db.close();
    Ok(())
}

fn show(
    config: &DatabaseConfig,
    settings: &StudioSettings,
    run_id: &str,
    by_message: bool,
    plain: bool,
    out: &mut impl Write,
) -> Result<()> {
    let db = open(config)?;
    if db.schema_version()? < latest_version() {
        bail!("database schema is out of date; run `studio migrate` first");
    }

    let run = db
        .get_run(&run_id.into())
        .with_context(|| format!("failed to load run {run_id}"))?;
    let replies = db
        .load_replies(&run.id)
        .with_context(|| format!("failed to load replies for run {run_id}"))?;

    let mut ui = settings.ui.clone();
    if by_message {
        ui.display_mode = DisplayMode::ByMessage;
    }
    if plain {
        ui.render_markdown = false;
    }
    let state = ChatState::from_settings(&ui).reduce(ChatEvent::RepliesUpdated {
        replies,
        scroll_height: 0.0,
    });

    let avatars = AvatarCatalog::from_settings(&ui).unwrap_or_else(|e| {
        warn!(dir = %ui.avatar_dir, error = %e, "avatar directory unreadable, using initials");
        AvatarCatalog::default()
    });
    render::transcript(out, &run, &state.bubbles(), &avatars, ui.language)?;
    db.close();
    Ok(())
}
