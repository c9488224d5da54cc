//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Personal device-usage tracker.
///
/// Turns the platform's app transition log into per-app screen-time totals,
/// categorized usage, and a mood summary.
#[derive(Debug, Parser)]
#[command(name = "ut", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Ingest usage data into the local store.
    Ingest {
        #[command(subcommand)]
        source: IngestSource,
    },

    /// Produce a usage report for a query window.
    Report {
        /// Current calendar day from local midnight (default).
        #[arg(long)]
        day: bool,

        /// The trailing 24 hours.
        #[arg(long = "last-24h")]
        last_24h: bool,

        /// The trailing 7 days, with a per-day breakdown.
        #[arg(long)]
        week: bool,

        /// Output as JSON instead of the human-readable report.
        #[arg(long)]
        json: bool,
    },

    /// Show store health and streak counters.
    Status,

    /// Evaluate yesterday's usage against the streak.
    Streak,
}

/// Data sources that can be ingested.
#[derive(Debug, Subcommand)]
pub enum IngestSource {
    /// Transition events as JSONL, from a file or stdin.
    Events {
        /// Read from this file instead of stdin.
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// App-directory entries as JSONL, from a file or stdin.
    Apps {
        /// Read from this file instead of stdin.
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Coarse fallback-usage snapshot as JSONL, from a file or stdin.
    Fallback {
        /// Read from this file instead of stdin.
        #[arg(long)]
        file: Option<PathBuf>,
    },
}
