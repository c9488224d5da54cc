//! Classification and presentation mapping.
//!
//! Turns the merged usage map into the ordered, decorated entry list the
//! presentation layer renders: noise filtered, metadata resolved, categorized,
//! formatted, and sorted.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::aggregate::{AppUsageRecord, aggregate_usage};
use crate::classify::{AppDirectory, Category};
use crate::event::TransitionEvent;
use crate::format::DurationParts;
use crate::merge::{FallbackUsage, fallback_applies, merge_with_fallback};
use crate::mood::Mood;
use crate::types::AppId;
use crate::window::{UsageWindow, WindowPreset};

/// Records below this foreground total are presentation noise (1 second).
pub const NOISE_FLOOR_MS: i64 = 1000;

/// One decorated row of the usage list.
#[derive(Debug, Clone, Serialize)]
pub struct AppEntry {
    pub app: AppId,
    pub display_name: String,
    pub category: Category,
    pub foreground_ms: i64,
    pub breakdown: DurationParts,
    pub short_form: String,
    pub launch_count: u32,
    pub last_used_at: Option<DateTime<Utc>>,
}

/// Decorates and orders the merged usage map.
///
/// Drops sub-second noise, records without resolvable metadata (the app was
/// uninstalled after generating events), and true system apps. The result is
/// sorted descending by foreground time; the sort is stable, so ties keep the
/// map's deterministic key order.
pub fn decorate_usage(
    usage: BTreeMap<AppId, AppUsageRecord>,
    directory: &dyn AppDirectory,
) -> Vec<AppEntry> {
    let mut entries: Vec<AppEntry> = Vec::new();

    for (app, record) in usage {
        if record.foreground_ms < NOISE_FLOOR_MS {
            continue;
        }
        let Some(info) = directory.lookup(&app) else {
            tracing::warn!(app = %app, "dropping usage for unresolvable app");
            continue;
        };
        if info.is_true_system() {
            continue;
        }

        let label = format!("{} {}", info.display_name, app);
        let breakdown = DurationParts::from_ms(record.foreground_ms);
        entries.push(AppEntry {
            app,
            category: Category::classify(&label),
            display_name: info.display_name,
            foreground_ms: record.foreground_ms,
            breakdown,
            short_form: breakdown.short_form(),
            launch_count: record.launch_count,
            last_used_at: record.last_used_at,
        });
    }

    entries.sort_by(|a, b| b.foreground_ms.cmp(&a.foreground_ms));
    entries
}

/// The full result of one usage query.
#[derive(Debug, Clone, Serialize)]
pub struct UsageSummary {
    pub entries: Vec<AppEntry>,
    /// Total foreground time of apps classified social.
    pub social_ms: i64,
    pub mood: Mood,
}

/// Runs the whole pipeline for one window: aggregate, merge the fallback
/// source where the preset allows it, decorate, and derive the mood.
pub fn summarize(
    events: &[TransitionEvent],
    fallback: &FallbackUsage,
    window: &UsageWindow,
    preset: WindowPreset,
    now: DateTime<Utc>,
    directory: &dyn AppDirectory,
) -> UsageSummary {
    let usage = aggregate_usage(events, window, now);
    let merged = if fallback_applies(preset) {
        merge_with_fallback(usage, fallback)
    } else {
        usage
    };
    let entries = decorate_usage(merged, directory);

    let social_ms = entries
        .iter()
        .filter(|entry| entry.category == Category::Social)
        .map(|entry| entry.foreground_ms)
        .sum();

    UsageSummary {
        entries,
        social_ms,
        mood: Mood::from_social_ms(social_ms),
    }
}
