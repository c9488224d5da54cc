//! Launch-detection delivery channel.
//!
//! The real-time detection subsystem publishes "app just opened" notices over
//! a bounded queue; the presentation layer consumes them as they arrive. Every
//! publish also bumps a counter in a shared store, which a secondary consumer
//! may poll instead of (or in addition to) draining the queue, so a slow or
//! absent queue consumer never loses counts.

use std::collections::BTreeMap;
use std::sync::mpsc::{Receiver, SyncSender, sync_channel};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};

use crate::types::AppId;

/// A near-instant "app just opened" notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchNotice {
    pub app: AppId,
    pub at: DateTime<Utc>,
}

/// Shared launch-attempt counters, the underlying state store.
#[derive(Debug, Default)]
pub struct AttemptStore {
    counts: Mutex<BTreeMap<AppId, u64>>,
}

impl AttemptStore {
    fn record(&self, app: &AppId) {
        let mut counts = self
            .counts
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *counts.entry(app.clone()).or_insert(0) += 1;
    }

    /// Attempts recorded for one app.
    #[must_use]
    pub fn count(&self, app: &AppId) -> u64 {
        self.counts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(app)
            .copied()
            .unwrap_or(0)
    }

    /// Snapshot of all counters, the polling fallback for consumers that do
    /// not drain the queue.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<AppId, u64> {
        self.counts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Producer half handed to the detection subsystem.
#[derive(Debug, Clone)]
pub struct LaunchPublisher {
    tx: SyncSender<LaunchNotice>,
    store: Arc<AttemptStore>,
}

impl LaunchPublisher {
    /// Publishes a launch notice.
    ///
    /// The counter store is always updated. The queue send is non-blocking:
    /// when the consumer lags and the queue is full the notice is dropped and
    /// `false` is returned; the poll path still observes the attempt.
    pub fn publish(&self, app: AppId, at: DateTime<Utc>) -> bool {
        self.store.record(&app);
        match self.tx.try_send(LaunchNotice { app, at }) {
            Ok(()) => true,
            Err(err) => {
                tracing::debug!(%err, "launch queue full or closed, notice dropped");
                false
            }
        }
    }
}

/// Creates a bounded launch channel plus its shared counter store.
#[must_use]
pub fn launch_channel(
    capacity: usize,
) -> (LaunchPublisher, Receiver<LaunchNotice>, Arc<AttemptStore>) {
    let (tx, rx) = sync_channel(capacity);
    let store = Arc::new(AttemptStore::default());
    (
        LaunchPublisher {
            tx,
            store: Arc::clone(&store),
        },
        rx,
        store,
    )
}
