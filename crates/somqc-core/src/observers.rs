//! Concrete observer implementations.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crossbeam_channel::Sender;
use tracing::{debug, info};

use crate::observer::StatusObserver;
use crate::progress::StatusUpdate;

/// Observer that forwards every update through a channel.
///
/// Status updates are low-frequency (one per sheet), so nothing is dropped.
/// Once the receiver is dropped the observer reports itself closed.
pub struct ChannelObserver {
    sender: Sender<StatusUpdate>,
    closed: AtomicBool,
}

impl ChannelObserver {
    /// Create a new channel observer.
    #[must_use]
    pub fn new(sender: Sender<StatusUpdate>) -> Self {
        Self {
            sender,
            closed: AtomicBool::new(false),
        }
    }
}

impl StatusObserver for ChannelObserver {
    fn on_status(&self, update: &StatusUpdate) {
        if self.sender.send(update.clone()).is_err() {
            self.closed.store(true, Ordering::Relaxed);
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Relaxed)
    }
}

/// Observer that logs status updates with temporal throttling.
pub struct LoggingObserver {
    min_interval_ms: u64,
    last_time: AtomicU64,
}

impl LoggingObserver {
    /// Create a new logging observer with the given minimum interval.
    #[must_use]
    pub fn new(min_interval_ms: u64) -> Self {
        Self {
            min_interval_ms,
            last_time: AtomicU64::new(0),
        }
    }
}

impl StatusObserver for LoggingObserver {
    #[allow(clippy::cast_possible_truncation)]
    fn on_status(&self, update: &StatusUpdate) {
        if update.complete {
            info!(summary = %update.message, "Batch complete");
            return;
        }

        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        let last_time = self.last_time.load(Ordering::Relaxed);
        if now.saturating_sub(last_time) < self.min_interval_ms {
            return;
        }

        match update.percent {
            Some(percent) => debug!(
                progress = format!("{percent:.1}%"),
                status = %update.message,
                "Batch progress"
            ),
            None => debug!(status = %update.message, "Batch status"),
        }
        self.last_time.store(now, Ordering::Relaxed);
    }
}

/// Null object pattern; discards all updates.
pub struct NoOpObserver;

impl NoOpObserver {
    /// Create a new no-op observer.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for NoOpObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusObserver for NoOpObserver {
    fn on_status(&self, _update: &StatusUpdate) {}
}
