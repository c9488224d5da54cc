//! Ingest commands for loading usage data into the store.
//!
//! All three sources arrive as JSONL, one record per line, from a file or
//! stdin. Malformed lines are skipped with a warning rather than aborting the
//! batch; a partially usable log still produces usable screen-time numbers.

use std::collections::BTreeMap;
use std::io::{BufRead, Write};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use ut_core::{AppId, TransitionEvent, TransitionKind};
use ut_db::{AppRow, Database, TransitionRow};

/// A transition event as it appears on the wire.
#[derive(Debug, Deserialize)]
struct RawTransition {
    app_id: String,
    /// Canonical (`resumed`/`paused`) or legacy
    /// (`moved_to_foreground`/`moved_to_background`) kind string.
    kind: String,
    timestamp: String,
}

/// An app-directory entry as it appears on the wire.
#[derive(Debug, Deserialize)]
struct RawApp {
    app_id: String,
    display_name: String,
    #[serde(default)]
    system: bool,
    #[serde(default = "default_true")]
    launchable: bool,
}

/// A coarse usage bucket as it appears on the wire.
#[derive(Debug, Deserialize)]
struct RawFallback {
    app_id: String,
    foreground_ms: i64,
}

const fn default_true() -> bool {
    true
}

/// Reads input lines from a file, or stdin when no file is given.
fn read_lines(file: Option<&Path>) -> Result<Vec<String>> {
    match file {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            Ok(content.lines().map(String::from).collect())
        }
        None => {
            let stdin = std::io::stdin();
            let mut lines = Vec::new();
            for line in stdin.lock().lines() {
                lines.push(line.context("failed to read stdin")?);
            }
            Ok(lines)
        }
    }
}

fn parse_transition(line: &str) -> Result<TransitionEvent, String> {
    let raw: RawTransition = serde_json::from_str(line).map_err(|e| e.to_string())?;
    let app = AppId::new(raw.app_id).map_err(|e| e.to_string())?;
    let kind: TransitionKind = raw.kind.parse().map_err(|e: ut_core::UnknownTransitionKind| e.to_string())?;
    let timestamp = DateTime::parse_from_rfc3339(&raw.timestamp)
        .map_err(|e| e.to_string())?
        .with_timezone(&Utc);
    Ok(TransitionEvent::new(app, kind, timestamp))
}

/// Ingests transition events.
pub fn events<W: Write>(writer: &mut W, db: &mut Database, file: Option<&Path>) -> Result<()> {
    let lines = read_lines(file)?;

    let mut rows = Vec::new();
    let mut malformed = 0usize;
    for (index, line) in lines.iter().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match parse_transition(line) {
            Ok(event) => rows.push(TransitionRow::from_event(&event)),
            Err(reason) => {
                malformed += 1;
                tracing::warn!(line = index + 1, %reason, "skipping malformed event");
            }
        }
    }

    let inserted = db.insert_transitions(&rows)?;
    let duplicates = rows.len() - inserted;
    writeln!(
        writer,
        "Ingested {inserted} events ({duplicates} duplicates, {malformed} malformed)"
    )?;
    Ok(())
}

/// Ingests app-directory entries.
pub fn apps<W: Write>(writer: &mut W, db: &mut Database, file: Option<&Path>) -> Result<()> {
    let lines = read_lines(file)?;

    let mut rows = Vec::new();
    let mut malformed = 0usize;
    for (index, line) in lines.iter().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<RawApp>(line) {
            Ok(raw) if !raw.app_id.is_empty() => rows.push(AppRow {
                app_id: raw.app_id,
                display_name: raw.display_name,
                system_flagged: raw.system,
                launchable: raw.launchable,
            }),
            Ok(_) => {
                malformed += 1;
                tracing::warn!(line = index + 1, "skipping app entry with empty app ID");
            }
            Err(err) => {
                malformed += 1;
                tracing::warn!(line = index + 1, %err, "skipping malformed app entry");
            }
        }
    }

    let written = db.upsert_apps(&rows)?;
    writeln!(writer, "Recorded {written} apps ({malformed} malformed)")?;
    Ok(())
}

/// Ingests the coarse fallback-usage snapshot, replacing the previous one.
pub fn fallback<W: Write>(writer: &mut W, db: &mut Database, file: Option<&Path>) -> Result<()> {
    let lines = read_lines(file)?;

    let mut usage = BTreeMap::new();
    let mut malformed = 0usize;
    for (index, line) in lines.iter().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<RawFallback>(line) {
            Ok(raw) => match AppId::new(raw.app_id) {
                Ok(app) => {
                    usage.insert(app, raw.foreground_ms);
                }
                Err(err) => {
                    malformed += 1;
                    tracing::warn!(line = index + 1, %err, "skipping fallback entry");
                }
            },
            Err(err) => {
                malformed += 1;
                tracing::warn!(line = index + 1, %err, "skipping malformed fallback entry");
            }
        }
    }

    db.replace_fallback_usage(&usage)?;
    writeln!(
        writer,
        "Recorded fallback usage for {} apps ({malformed} malformed)",
        usage.len()
    )?;
    Ok(())
}
