//! Daily streak evaluation.
//!
//! The achievement engine consumes one authoritative social-usage number per
//! day and maintains rolling counters. State is an explicit value passed into
//! and returned from a pure function; the caller persists it between days.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Rolling streak counters, persisted by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyEvaluationState {
    /// Consecutive qualifying days ending at `last_evaluated`.
    pub current_streak: u32,
    /// Longest streak ever achieved.
    pub best_streak: u32,
    /// The most recent day that has been evaluated.
    pub last_evaluated: Option<NaiveDate>,
}

/// Configuration for daily evaluation.
#[derive(Debug, Clone)]
pub struct StreakConfig {
    /// Local hour of day after which a day's data is considered complete.
    /// Evaluation requests before the cutoff are ignored.
    pub cutoff_hour: u8,
    /// A day qualifies when its social foreground time is at most this.
    pub social_limit_ms: i64,
}

impl Default for StreakConfig {
    fn default() -> Self {
        Self {
            cutoff_hour: 21,
            social_limit_ms: 2 * 60 * 60 * 1000, // 2 hours
        }
    }
}

/// Evaluates one day's social usage against the streak.
///
/// Pure: returns the next state, leaving the input untouched. A call before
/// the day's cutoff hour, or for an already-evaluated day, returns the state
/// unchanged so repeated invocations are harmless. A qualifying day extends
/// the streak only when it directly follows the previously evaluated day;
/// after a gap the streak restarts at one.
#[must_use]
pub fn evaluate_day(
    state: DailyEvaluationState,
    day: NaiveDate,
    social_ms: i64,
    now_local: NaiveDateTime,
    config: &StreakConfig,
) -> DailyEvaluationState {
    let cutoff_hour = u32::from(config.cutoff_hour.min(23));
    let Some(cutoff) = day.and_hms_opt(cutoff_hour, 0, 0) else {
        return state;
    };
    if now_local < cutoff {
        tracing::debug!(%day, "day not complete yet, skipping evaluation");
        return state;
    }
    if state.last_evaluated.is_some_and(|prev| prev >= day) {
        return state;
    }

    let qualified = social_ms <= config.social_limit_ms;
    let consecutive = state
        .last_evaluated
        .is_some_and(|prev| prev.succ_opt() == Some(day));

    let current_streak = if !qualified {
        0
    } else if consecutive {
        state.current_streak + 1
    } else {
        1
    };

    DailyEvaluationState {
        current_streak,
        best_streak: state.best_streak.max(current_streak),
        last_evaluated: Some(day),
    }
}
