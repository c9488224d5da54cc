//! Event-window foreground-time aggregation.
//!
//! Turns an ordered log of foreground/background transitions and a query
//! window `[start, end)` into per-app foreground totals, launch counts, and
//! last-used timestamps.
//!
//! # Algorithm Summary
//!
//! 1. Process events once, in timestamp order
//! 2. Track per-app resume anchors in two tables: `active` (resumed inside
//!    the window) and `pre_window` (resumed strictly before the window)
//! 3. On pause, attribute the session: an in-window anchor is used as-is, a
//!    pre-window anchor is clipped to the window start, anything else is an
//!    orphan and contributes nothing
//! 4. Close still-open sessions at `query_end = min(now, window.end)`
//!
//! Each call recomputes from the raw log; no state survives between calls.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;

use crate::event::{TransitionEvent, TransitionKind};
use crate::types::AppId;
use crate::window::UsageWindow;

/// Configuration for usage aggregation.
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// Look-back before the window start used only to discover apps that were
    /// already foregrounded when the window opened. Sessions that began more
    /// than this long before the window with no event inside the buffer are
    /// invisible to clipping and simply absent from the output; widening the
    /// buffer trades query cost for accuracy on very long sessions.
    /// Default: 3600000 (1 hour).
    pub guard_buffer_ms: i64,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            guard_buffer_ms: 3_600_000, // 1 hour
        }
    }
}

impl AggregatorConfig {
    /// The event-log range to request for a window: `[start - guard, end)`.
    #[must_use]
    pub fn slice_bounds(&self, window: &UsageWindow) -> (DateTime<Utc>, DateTime<Utc>) {
        (
            window.start - chrono::Duration::milliseconds(self.guard_buffer_ms),
            window.end,
        )
    }
}

/// Per-app usage computed for one query window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AppUsageRecord {
    /// Total window-clipped foreground time in milliseconds.
    pub foreground_ms: i64,

    /// Most recent in-window activity. `None` when the only contribution came
    /// from a session that never produced an in-window resume or pause.
    pub last_used_at: Option<DateTime<Utc>>,

    /// Number of launches observed inside the window. Clipped sessions do not
    /// count; their launch predates the window.
    pub launch_count: u32,
}

impl AppUsageRecord {
    fn touch(&mut self, at: DateTime<Utc>) {
        self.last_used_at = Some(self.last_used_at.map_or(at, |prev| prev.max(at)));
    }
}

/// Aggregates clipped foreground usage per app over `window`.
///
/// Events must be sorted by timestamp ascending; the caller supplies the slice
/// `[window.start - guard_buffer, window.end)` (see
/// [`AggregatorConfig::slice_bounds`]). The computation is a pure single pass,
/// so identical inputs always produce identical output.
pub fn aggregate_usage(
    events: &[TransitionEvent],
    window: &UsageWindow,
    now: DateTime<Utc>,
) -> BTreeMap<AppId, AppUsageRecord> {
    let query_end = window.query_end(now);

    let mut records: BTreeMap<AppId, AppUsageRecord> = BTreeMap::new();
    // Resume anchors for sessions that started inside the window.
    let mut active: HashMap<AppId, DateTime<Utc>> = HashMap::new();
    // Most recent resume strictly before the window start, not yet paused.
    let mut pre_window: HashMap<AppId, DateTime<Utc>> = HashMap::new();

    for event in events {
        // The contract asks for the slice [start - guard, end); enforce the
        // upper bound anyway so a wider slice (shared across several windows)
        // or a clock-skewed future event cannot leak time past the query end.
        if event.timestamp >= query_end {
            continue;
        }
        match event.kind {
            TransitionKind::Resumed => {
                if event.timestamp < window.start {
                    // Only the latest pre-window resume matters.
                    pre_window.insert(event.app.clone(), event.timestamp);
                } else if active.contains_key(&event.app) {
                    // Duplicate resume without an intervening pause: keep the
                    // earliest anchor so the session is not under-counted.
                    tracing::trace!(app = %event.app, "ignoring duplicate resume");
                } else {
                    // A fresh in-window session supersedes any dangling
                    // pre-window anchor for the same app; counting both would
                    // overrun the window span.
                    pre_window.remove(&event.app);
                    active.insert(event.app.clone(), event.timestamp);
                    let record = records.entry(event.app.clone()).or_default();
                    record.launch_count += 1;
                    record.touch(event.timestamp);
                }
            }
            TransitionKind::Paused => {
                if event.timestamp < window.start {
                    continue;
                }
                // Anchor precedence: in-window resume, then clipped
                // pre-window resume, then orphan.
                let resumed_at = if let Some(at) = active.remove(&event.app) {
                    at
                } else if pre_window.remove(&event.app).is_some() {
                    window.start
                } else {
                    continue;
                };

                let duration_ms = (event.timestamp - resumed_at).num_milliseconds();
                if duration_ms > 0 {
                    let record = records.entry(event.app.clone()).or_default();
                    record.foreground_ms += duration_ms;
                    record.touch(event.timestamp);
                }
            }
        }
    }

    // Sessions still open at the query instant.
    for (app, resumed_at) in active {
        let duration_ms = (query_end - resumed_at).num_milliseconds();
        if duration_ms > 0 {
            records.entry(app).or_default().foreground_ms += duration_ms;
        }
    }

    // Sessions opened before the window and never paused: clipped to the
    // window start, launch stays uncounted.
    for app in pre_window.into_keys() {
        let duration_ms = (query_end - window.start).num_milliseconds();
        if duration_ms > 0 {
            records.entry(app).or_default().foreground_ms += duration_ms;
        }
    }

    records
}

/// Aggregates usage for several windows in one call, in parallel.
///
/// Used for per-day breakdowns where each day is its own window over a shared
/// event slice. Output order matches `windows`.
pub fn aggregate_windows(
    events: &[TransitionEvent],
    windows: &[UsageWindow],
    now: DateTime<Utc>,
) -> Vec<BTreeMap<AppId, AppUsageRecord>> {
    windows
        .par_iter()
        .map(|window| aggregate_usage(events, window, now))
        .collect()
}
