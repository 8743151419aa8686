//! Status updates and cooperative cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Status message published by a batch run.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    /// Human-readable status line.
    pub message: String,
    /// Overall progress as a percentage in [0, 100], when known.
    pub percent: Option<f64>,
    /// Whether this is the final update of the run.
    pub complete: bool,
}

impl StatusUpdate {
    /// Intermediate progress update.
    #[must_use]
    pub fn progress(message: impl Into<String>, percent: f64) -> Self {
        Self {
            message: message.into(),
            percent: Some(percent.clamp(0.0, 100.0)),
            complete: false,
        }
    }

    /// Message without a progress value.
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            percent: None,
            complete: false,
        }
    }

    /// Final update of a run that reached the end.
    #[must_use]
    pub fn complete(message: impl Into<String>) -> Self {
        Self::complete_at(message, 100.0)
    }

    /// Final update of a run that stopped at `percent`, such as a cancelled one.
    #[must_use]
    pub fn complete_at(message: impl Into<String>, percent: f64) -> Self {
        Self {
            message: message.into(),
            percent: Some(percent.clamp(0.0, 100.0)),
            complete: true,
        }
    }
}

/// Cooperative cancellation flag shared between the host and a batch worker.
///
/// # Example
/// ```
/// use somqc_core::progress::CancellationToken;
///
/// let token = CancellationToken::new();
/// assert!(!token.is_cancelled());
///
/// token.cancel();
/// assert!(token.is_cancelled());
///
/// token.reset();
/// assert!(!token.is_cancelled());
/// ```
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a new, uncancelled token.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Check if cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Clear the flag. Only called at the start of a run.
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::Release);
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}
