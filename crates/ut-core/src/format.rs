//! Duration breakdown and display formatting.

use serde::Serialize;

/// An hours/minutes/seconds breakdown of a duration.
///
/// Built with truncating integer division; never rounds up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DurationParts {
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

impl DurationParts {
    /// Breaks a millisecond duration into parts.
    /// Negative durations are treated as zero (defensive).
    #[must_use]
    pub const fn from_ms(ms: i64) -> Self {
        let total_seconds = if ms < 0 { 0 } else { ms / 1000 };
        Self {
            hours: total_seconds / 3600,
            minutes: (total_seconds % 3600) / 60,
            seconds: total_seconds % 60,
        }
    }

    /// Human-readable short form: `"1h 30m"`, `"45m 10s"`, or `"12s"`.
    #[must_use]
    pub fn short_form(&self) -> String {
        if self.hours > 0 {
            format!("{}h {}m", self.hours, self.minutes)
        } else if self.minutes > 0 {
            format!("{}m {}s", self.minutes, self.seconds)
        } else {
            format!("{}s", self.seconds)
        }
    }
}

/// Formats a millisecond duration in the short form.
#[must_use]
pub fn format_duration(ms: i64) -> String {
    DurationParts::from_ms(ms).short_form()
}
