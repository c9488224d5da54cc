//! Core domain logic for the usage tracker.
//!
//! This crate contains the fundamental types and logic for:
//! - Aggregation: window-clipped foreground time per app from transition events
//! - Fallback merge: filling gaps from a coarser usage source
//! - Presentation mapping: classification, formatting, ordering, mood
//! - Streak evaluation: pure daily rollup of social usage
//! - Launch delivery: bounded-queue fan-out of real-time launch notices

mod aggregate;
pub mod classify;
pub mod event;
pub mod format;
pub mod launch;
mod merge;
pub mod mood;
pub mod present;
pub mod provider;
pub mod streak;
pub mod types;
pub mod window;

pub use aggregate::{AggregatorConfig, AppUsageRecord, aggregate_usage, aggregate_windows};
pub use classify::{AppDirectory, AppInfo, Category, StaticDirectory};
pub use event::{TransitionEvent, TransitionKind, UnknownTransitionKind};
pub use format::{DurationParts, format_duration};
pub use launch::{AttemptStore, LaunchNotice, LaunchPublisher, launch_channel};
pub use merge::{FallbackUsage, fallback_applies, merge_with_fallback};
pub use mood::Mood;
pub use present::{AppEntry, NOISE_FLOOR_MS, UsageSummary, decorate_usage, summarize};
pub use provider::{ProviderError, UsageEventSource};
pub use streak::{DailyEvaluationState, StreakConfig, evaluate_day};
pub use types::{AppId, ValidationError};
pub use window::{UsageWindow, WindowError, WindowPreset, local_midnight_to_utc};
