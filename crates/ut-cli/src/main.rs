use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use ut_cli::commands::{ingest, report, status, streak};
use ut_cli::{Cli, Commands, Config, IngestSource};
use ut_core::WindowPreset;

/// Load config and open database, ensuring the parent directory exists.
///
/// An access-denied store is surfaced separately: it needs a one-time
/// authorization fix, not a retry.
fn open_database(config_path: Option<&Path>) -> Result<(ut_db::Database, Config)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let db = match ut_db::Database::open(&config.database_path) {
        Ok(db) => db,
        Err(err @ ut_db::DbError::AccessDenied { .. }) => {
            return Err(anyhow::Error::new(err).context(
                "usage store access denied; grant read access once, then rerun",
            ));
        }
        Err(err) => return Err(anyhow::Error::new(err).context("failed to open database")),
    };
    Ok((db, config))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match &cli.command {
        Some(Commands::Ingest { source }) => {
            let (mut db, _config) = open_database(cli.config.as_deref())?;
            match source {
                IngestSource::Events { file } => {
                    ingest::events(&mut out, &mut db, file.as_deref())?;
                }
                IngestSource::Apps { file } => {
                    ingest::apps(&mut out, &mut db, file.as_deref())?;
                }
                IngestSource::Fallback { file } => {
                    ingest::fallback(&mut out, &mut db, file.as_deref())?;
                }
            }
        }
        Some(Commands::Report {
            day: _,
            last_24h,
            week,
            json,
        }) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            let preset = if *week {
                WindowPreset::TrailingWeek
            } else if *last_24h {
                WindowPreset::Trailing24h
            } else {
                WindowPreset::CalendarDay
            };
            report::run(&mut out, &db, &config, preset, *json)?;
        }
        Some(Commands::Status) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            status::run(&mut out, &db, &config.database_path)?;
        }
        Some(Commands::Streak) => {
            let (mut db, config) = open_database(cli.config.as_deref())?;
            streak::run(&mut out, &mut db, &config)?;
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            writeln!(out)?;
        }
    }

    Ok(())
}
