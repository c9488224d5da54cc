//! The event-log provider boundary.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::event::TransitionEvent;

/// Failures at the event-log boundary.
///
/// None of these are retried automatically; each is terminal for the current
/// query.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The platform refused to hand out usage data. Callers route the user to
    /// a one-time authorization flow instead of retrying silently.
    #[error("usage data access not authorized")]
    AuthorizationDenied,

    /// Any other failure reading the event log.
    #[error("event source failure: {0}")]
    Source(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Supplies the ordered transition-event slice for a `[from, to)` range.
///
/// Implementations return events sorted by timestamp ascending. Reading the
/// log is treated as an expensive operation; callers bound cost by bounding
/// the requested range, not by cancelling mid-read.
pub trait UsageEventSource {
    fn events_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<TransitionEvent>, ProviderError>;
}
