//! Transition events supplied by the platform event log.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::AppId;

/// Lifecycle transition kinds, the single source of truth for kind strings.
///
/// Two legacy kinds (`moved_to_foreground`, `moved_to_background`) are
/// semantically identical to `resumed`/`paused` and are normalized at parse
/// time so the aggregator only ever sees the canonical pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransitionKind {
    Resumed,
    Paused,
}

impl fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Resumed => "resumed",
            Self::Paused => "paused",
        };
        write!(f, "{s}")
    }
}

impl FromStr for TransitionKind {
    type Err = UnknownTransitionKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "resumed" | "moved_to_foreground" => Ok(Self::Resumed),
            "paused" | "moved_to_background" => Ok(Self::Paused),
            _ => Err(UnknownTransitionKind(s.to_string())),
        }
    }
}

impl Serialize for TransitionKind {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for TransitionKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Error type for unrecognized transition kind strings.
#[derive(Debug, Clone)]
pub struct UnknownTransitionKind(String);

impl fmt::Display for UnknownTransitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown transition kind: {}", self.0)
    }
}

impl std::error::Error for UnknownTransitionKind {}

/// A foreground/background transition for one application.
///
/// Events are externally supplied and immutable; the log is ordered by
/// timestamp (not guaranteed unique per app).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionEvent {
    /// The application the transition belongs to.
    pub app: AppId,
    /// Whether the app came to the foreground or left it.
    pub kind: TransitionKind,
    /// When the transition occurred.
    pub timestamp: DateTime<Utc>,
}

impl TransitionEvent {
    pub fn new(app: AppId, kind: TransitionKind, timestamp: DateTime<Utc>) -> Self {
        Self {
            app,
            kind,
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn roundtrip_canonical_kinds() {
        for kind in [TransitionKind::Resumed, TransitionKind::Paused] {
            let s = kind.to_string();
            let parsed: TransitionKind = s.parse().expect("should parse");
            assert_eq!(parsed, kind, "roundtrip failed for {kind:?}");
        }
    }

    #[test]
    fn legacy_kinds_normalize() {
        let fg: TransitionKind = "moved_to_foreground".parse().expect("should parse");
        assert_eq!(fg, TransitionKind::Resumed);

        let bg: TransitionKind = "moved_to_background".parse().expect("should parse");
        assert_eq!(bg, TransitionKind::Paused);
    }

    #[test]
    fn unknown_kind_errors() {
        let result: Result<TransitionKind, _> = "crashed".parse();
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert_eq!(err.to_string(), "unknown transition kind: crashed");
    }

    #[test]
    fn legacy_kind_serializes_canonically() {
        // A normalized legacy kind must serialize as the canonical string,
        // never round-trip back to the legacy spelling.
        let kind: TransitionKind = "moved_to_foreground".parse().unwrap();
        assert_eq!(serde_json::to_string(&kind).unwrap(), "\"resumed\"");
    }

    #[test]
    fn event_serde_roundtrip() {
        let event = TransitionEvent::new(
            AppId::new("com.example.mail").unwrap(),
            TransitionKind::Resumed,
            Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap(),
        );
        let json = serde_json::to_string(&event).unwrap();
        let parsed: TransitionEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
    }
}
