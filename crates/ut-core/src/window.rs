//! Query windows and the canonical period presets.

use chrono::{DateTime, Duration, Local, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Serialize;
use thiserror::Error;

/// Errors constructing a query window.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WindowError {
    /// The window start was not strictly before the end.
    #[error("window start {start} must be before end {end}")]
    EmptyWindow {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

/// A half-open query interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UsageWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl UsageWindow {
    /// Creates a window after validating `start < end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, WindowError> {
        if start >= end {
            return Err(WindowError::EmptyWindow { start, end });
        }
        Ok(Self { start, end })
    }

    /// The instant aggregation stops counting: `min(now, end)`.
    #[must_use]
    pub fn query_end(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.min(self.end)
    }

    /// Window length in milliseconds.
    #[must_use]
    pub fn span_ms(&self) -> i64 {
        (self.end - self.start).num_milliseconds()
    }
}

/// The canonical query presets.
///
/// The aggregator itself is preset-agnostic; the preset only drives window
/// construction and the fallback-merge policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowPreset {
    /// Local midnight through the end of the current calendar day.
    CalendarDay,
    /// The 24 hours ending at the query instant.
    #[serde(rename = "trailing_24h")]
    Trailing24h,
    /// The 7 days ending at the query instant.
    TrailingWeek,
}

impl WindowPreset {
    /// Builds the window for this preset, evaluated at `now`.
    pub fn window(self, now: DateTime<Utc>) -> Result<UsageWindow, WindowError> {
        match self {
            Self::CalendarDay => {
                let today = now.with_timezone(&Local).date_naive();
                let start = local_midnight_to_utc(today);
                let end = local_midnight_to_utc(today + Duration::days(1));
                UsageWindow::new(start, end)
            }
            Self::Trailing24h => UsageWindow::new(now - Duration::hours(24), now),
            Self::TrailingWeek => UsageWindow::new(now - Duration::days(7), now),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CalendarDay => "calendar_day",
            Self::Trailing24h => "trailing_24h",
            Self::TrailingWeek => "trailing_week",
        }
    }
}

/// Converts a local date at midnight to UTC.
/// Handles DST ambiguity by picking the earlier time.
pub fn local_midnight_to_utc(local_date: NaiveDate) -> DateTime<Utc> {
    let midnight = local_date.and_time(NaiveTime::MIN);
    match Local.from_local_datetime(&midnight) {
        // Single or ambiguous (DST fall-back): use the earlier time
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.with_timezone(&Utc),
        LocalResult::None => {
            // DST spring-forward gap at midnight is rare but possible
            // Use 1am local which is guaranteed to exist
            let one_am = local_date.and_time(NaiveTime::from_hms_opt(1, 0, 0).unwrap());
            Local
                .from_local_datetime(&one_am)
                .unwrap()
                .with_timezone(&Utc)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn window_rejects_empty_interval() {
        let t = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        assert!(UsageWindow::new(t, t).is_err());
        assert!(UsageWindow::new(t + Duration::hours(1), t).is_err());
        assert!(UsageWindow::new(t, t + Duration::hours(1)).is_ok());
    }

    #[test]
    fn query_end_caps_at_now() {
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap();
        let window = UsageWindow::new(start, end).unwrap();

        let mid = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        assert_eq!(window.query_end(mid), mid);

        let later = Utc.with_ymd_and_hms(2026, 3, 3, 0, 0, 0).unwrap();
        assert_eq!(window.query_end(later), end);
    }

    #[test]
    fn trailing_presets_span_exactly() {
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 15, 30, 0).unwrap();

        let day = WindowPreset::Trailing24h.window(now).unwrap();
        assert_eq!(day.end, now);
        assert_eq!(day.span_ms(), 24 * 3_600_000);

        let week = WindowPreset::TrailingWeek.window(now).unwrap();
        assert_eq!(week.end, now);
        assert_eq!(week.span_ms(), 7 * 24 * 3_600_000);
    }

    #[test]
    fn preset_serde_matches_as_str() {
        // JSON output and display strings must agree.
        for preset in [
            WindowPreset::CalendarDay,
            WindowPreset::Trailing24h,
            WindowPreset::TrailingWeek,
        ] {
            let serde_value = serde_json::to_value(preset).unwrap();
            assert_eq!(serde_value.as_str().unwrap(), preset.as_str());
        }
    }

    #[test]
    fn calendar_day_window_contains_now() {
        let now = Utc::now();
        let window = WindowPreset::CalendarDay.window(now).unwrap();
        assert!(window.start <= now);
        assert!(now < window.end);
        // A local calendar day is 24h plus/minus a DST shift.
        let span_hours = window.span_ms() / 3_600_000;
        assert!((23..=25).contains(&span_hours));
    }
}
