//! Mood indicator derived from social usage.

use std::fmt;

use serde::Serialize;

/// Social time below this keeps the mood sunny (30 minutes).
pub const SOCIAL_RELAXED_LIMIT_MS: i64 = 30 * 60 * 1000;

/// Social time above this drains the mood (2 hours).
pub const SOCIAL_HEAVY_LIMIT_MS: i64 = 2 * 60 * 60 * 1000;

/// The three discrete mood states shown by the companion character,
/// keyed on total foreground time of apps classified social.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    /// Below 30 minutes of social time.
    Sunny,
    /// Between 30 minutes and 2 hours.
    Weary,
    /// Above 2 hours.
    Drained,
}

impl Mood {
    #[must_use]
    pub const fn from_social_ms(ms: i64) -> Self {
        if ms < SOCIAL_RELAXED_LIMIT_MS {
            Self::Sunny
        } else if ms <= SOCIAL_HEAVY_LIMIT_MS {
            Self::Weary
        } else {
            Self::Drained
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sunny => "sunny",
            Self::Weary => "weary",
            Self::Drained => "drained",
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
