//! Fallback merge layer.
//!
//! Combines the event-derived usage map with a coarser, platform-aggregated
//! source for apps the event log never mentioned. The coarse source reports
//! daily/weekly buckets that bleed outside arbitrary windows, so it only ever
//! fills gaps; where both sources know an app, the event-derived value wins
//! unconditionally. Blending (max or average) was found to inflate totals.

use std::collections::BTreeMap;

use crate::aggregate::AppUsageRecord;
use crate::types::AppId;
use crate::window::WindowPreset;

/// Coarse per-app foreground totals in milliseconds.
pub type FallbackUsage = BTreeMap<AppId, i64>;

/// Whether the fallback source should be consulted for a preset.
///
/// For a strict calendar-day-from-midnight query the coarse source is known
/// to be unreliable and is skipped entirely.
#[must_use]
pub const fn fallback_applies(preset: WindowPreset) -> bool {
    !matches!(preset, WindowPreset::CalendarDay)
}

/// Merges fallback usage into the aggregator output.
///
/// Apps present only in the fallback gain a record with the fallback duration,
/// zero launches, and an unknown last-used instant. Apps present in both keep
/// the event-derived record untouched: strict preference, never blend.
pub fn merge_with_fallback(
    mut primary: BTreeMap<AppId, AppUsageRecord>,
    fallback: &FallbackUsage,
) -> BTreeMap<AppId, AppUsageRecord> {
    for (app, &foreground_ms) in fallback {
        if foreground_ms <= 0 {
            continue;
        }
        primary.entry(app.clone()).or_insert(AppUsageRecord {
            foreground_ms,
            last_used_at: None,
            launch_count: 0,
        });
    }
    primary
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app(id: &str) -> AppId {
        AppId::new(id).unwrap()
    }

    const MINUTE_MS: i64 = 60_000;

    #[test]
    fn event_derived_value_always_wins() {
        let mut primary = BTreeMap::new();
        primary.insert(
            app("e"),
            AppUsageRecord {
                foreground_ms: 5 * MINUTE_MS,
                last_used_at: None,
                launch_count: 2,
            },
        );
        let mut fallback = FallbackUsage::new();
        fallback.insert(app("e"), 40 * MINUTE_MS);

        let merged = merge_with_fallback(primary, &fallback);
        // Never 40 minutes, never an average or max.
        assert_eq!(merged[&app("e")].foreground_ms, 5 * MINUTE_MS);
        assert_eq!(merged[&app("e")].launch_count, 2);
    }

    #[test]
    fn fallback_fills_missing_apps() {
        let mut fallback = FallbackUsage::new();
        fallback.insert(app("f"), 12 * MINUTE_MS);

        let merged = merge_with_fallback(BTreeMap::new(), &fallback);
        let record = &merged[&app("f")];
        assert_eq!(record.foreground_ms, 12 * MINUTE_MS);
        assert_eq!(record.launch_count, 0);
        assert_eq!(record.last_used_at, None);
    }

    #[test]
    fn non_positive_fallback_entries_skipped() {
        let mut fallback = FallbackUsage::new();
        fallback.insert(app("z"), 0);
        fallback.insert(app("n"), -5);

        let merged = merge_with_fallback(BTreeMap::new(), &fallback);
        assert!(merged.is_empty());
    }

    #[test]
    fn calendar_day_skips_fallback() {
        assert!(!fallback_applies(WindowPreset::CalendarDay));
        assert!(fallback_applies(WindowPreset::Trailing24h));
        assert!(fallback_applies(WindowPreset::TrailingWeek));
    }
}
