//! Report command running the full usage pipeline.
//!
//! Fetches the event slice for the requested window (plus guard buffer),
//! aggregates, merges the coarse fallback where the preset allows it,
//! classifies, and renders either a human-readable report or JSON.

use std::io::Write;

use anyhow::Result;
use chrono::{DateTime, Duration, Local, NaiveDate, Utc};
use serde::Serialize;

use ut_core::{
    AppEntry, FallbackUsage, ProviderError, UsageEventSource, UsageSummary, UsageWindow,
    WindowPreset, aggregate_windows, fallback_applies, format_duration, local_midnight_to_utc,
    summarize,
};
use ut_db::Database;

use crate::Config;

/// Total foreground time for one day of the weekly breakdown.
#[derive(Debug, Clone, Serialize)]
pub struct DayTotal {
    pub date: NaiveDate,
    pub foreground_ms: i64,
    pub short_form: String,
}

/// Computed report data.
#[derive(Debug, Serialize)]
pub struct ReportData {
    pub generated_at: DateTime<Utc>,
    pub preset: WindowPreset,
    pub window: UsageWindow,
    pub timezone: String,
    pub mood: ut_core::Mood,
    pub social_ms: i64,
    pub entries: Vec<AppEntry>,
    /// Per-day totals, present only for the weekly preset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days: Option<Vec<DayTotal>>,
}

/// Maps provider failures to actionable CLI errors.
///
/// Authorization failures get routed to the one-time authorization flow
/// instead of a bare retry suggestion.
fn provider_context(err: ProviderError) -> anyhow::Error {
    match err {
        ProviderError::AuthorizationDenied => anyhow::Error::new(err).context(
            "usage data access not authorized; grant read access to the usage store once, then rerun",
        ),
        other => anyhow::Error::new(other).context("failed to read the event log"),
    }
}

/// Builds the report for `preset` as evaluated at `now`.
pub fn build_report(
    db: &Database,
    config: &Config,
    preset: WindowPreset,
    now: DateTime<Utc>,
) -> Result<ReportData> {
    let window = preset.window(now)?;
    let (from, to) = config.aggregator().slice_bounds(&window);
    let events = db.events_between(from, to).map_err(provider_context)?;

    let fallback = if fallback_applies(preset) {
        db.fallback_usage()?
    } else {
        FallbackUsage::new()
    };

    let UsageSummary {
        entries,
        social_ms,
        mood,
    } = summarize(&events, &fallback, &window, preset, now, db);

    let days = (preset == WindowPreset::TrailingWeek)
        .then(|| daily_breakdown(&events, now))
        .transpose()?;

    Ok(ReportData {
        generated_at: now,
        preset,
        window,
        timezone: iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string()),
        mood,
        social_ms,
        entries,
        days,
    })
}

/// Per-local-day totals for the 7 days ending today.
fn daily_breakdown(
    events: &[ut_core::TransitionEvent],
    now: DateTime<Utc>,
) -> Result<Vec<DayTotal>> {
    let today = now.with_timezone(&Local).date_naive();
    let mut dates = Vec::with_capacity(7);
    let mut windows = Vec::with_capacity(7);
    for offset in (0..7).rev() {
        let date = today - Duration::days(offset);
        let start = local_midnight_to_utc(date);
        let end = local_midnight_to_utc(date + Duration::days(1));
        dates.push(date);
        windows.push(UsageWindow::new(start, end)?);
    }

    let per_day = aggregate_windows(events, &windows, now);
    Ok(dates
        .into_iter()
        .zip(per_day)
        .map(|(date, usage)| {
            let foreground_ms = usage.values().map(|r| r.foreground_ms).sum();
            DayTotal {
                date,
                foreground_ms,
                short_form: format_duration(foreground_ms),
            }
        })
        .collect())
}

// ========== Rendering ==========

/// Generates a 10-character progress bar.
/// Values <5% of max get a single block for visibility.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn progress_bar(value: i64, max: i64) -> String {
    if max == 0 {
        return "░░░░░░░░░░".to_string();
    }

    let ratio = value as f64 / max as f64;
    let filled = if ratio < 0.05 && value > 0 {
        1
    } else {
        (ratio * 10.0).round().min(10.0) as usize
    };

    let empty = 10 - filled;
    format!("{}{}", "█".repeat(filled), "░".repeat(empty))
}

fn period_description(data: &ReportData) -> String {
    match data.preset {
        WindowPreset::CalendarDay => {
            let local_start = data.window.start.with_timezone(&Local);
            // "Wednesday, Mar 4, 2026"
            format!("{}", local_start.date_naive().format("%A, %b %-d, %Y"))
        }
        WindowPreset::Trailing24h => "Last 24 hours".to_string(),
        WindowPreset::TrailingWeek => "Last 7 days".to_string(),
    }
}

fn launches_label(count: u32) -> String {
    if count == 1 {
        "1 launch".to_string()
    } else {
        format!("{count} launches")
    }
}

/// Formats the human-readable report.
pub fn format_report(data: &ReportData) -> String {
    use std::fmt::Write as _;

    let mut output = String::new();
    writeln!(output, "USAGE REPORT: {}", period_description(data)).unwrap();

    if data.entries.is_empty() {
        writeln!(output).unwrap();
        writeln!(output, "No usage recorded in this window.").unwrap();
        writeln!(output).unwrap();
        writeln!(output, "Hint: Run 'ut status' to check the event store.").unwrap();
        return output;
    }

    writeln!(
        output,
        "Mood: {} (social {})",
        data.mood,
        format_duration(data.social_ms)
    )
    .unwrap();

    let max_ms = data
        .entries
        .iter()
        .map(|e| e.foreground_ms)
        .max()
        .unwrap_or(0);

    writeln!(output).unwrap();
    writeln!(output, "APPS").unwrap();
    writeln!(output, "────").unwrap();
    for entry in &data.entries {
        writeln!(
            output,
            "{:<24} {:>9}  {}  {:<13} {}",
            entry.display_name,
            entry.short_form,
            progress_bar(entry.foreground_ms, max_ms),
            entry.category,
            launches_label(entry.launch_count),
        )
        .unwrap();
    }

    if let Some(days) = &data.days {
        let max_day = days.iter().map(|d| d.foreground_ms).max().unwrap_or(0);
        writeln!(output).unwrap();
        writeln!(output, "BY DAY").unwrap();
        writeln!(output, "──────").unwrap();
        for day in days {
            writeln!(
                output,
                "{:<12} {:>9}  {}",
                day.date.format("%a %b %-d").to_string(),
                day.short_form,
                progress_bar(day.foreground_ms, max_day),
            )
            .unwrap();
        }
    }

    output
}

/// Runs the report command.
pub fn run<W: Write>(
    writer: &mut W,
    db: &Database,
    config: &Config,
    preset: WindowPreset,
    json: bool,
) -> Result<()> {
    let data = build_report(db, config, preset, Utc::now())?;
    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&data)?)?;
    } else {
        write!(writer, "{}", format_report(&data))?;
    }
    Ok(())
}
