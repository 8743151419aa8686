//! Observer pattern for batch status updates.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::progress::StatusUpdate;

/// Observer trait for receiving status updates.
pub trait StatusObserver: Send + Sync {
    /// Receive a status update.
    fn on_status(&self, update: &StatusUpdate);

    /// Whether the observer can no longer receive updates.
    fn is_closed(&self) -> bool {
        false
    }
}

/// Subject that fans status updates out to registered observers.
pub struct StatusSubject {
    observers: RwLock<Vec<Arc<dyn StatusObserver>>>,
}

impl StatusSubject {
    /// Create a new subject with no observers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            observers: RwLock::new(Vec::new()),
        }
    }

    /// Register an observer.
    pub fn register(&self, observer: Arc<dyn StatusObserver>) {
        self.observers.write().push(observer);
    }

    /// Drop observers that report themselves closed; returns how many went.
    pub fn prune_closed(&self) -> usize {
        let mut observers = self.observers.write();
        let before = observers.len();
        observers.retain(|o| !o.is_closed());
        before - observers.len()
    }

    /// Notify all observers of a status update.
    pub fn notify(&self, update: &StatusUpdate) {
        let observers = self.observers.read();
        for observer in observers.iter() {
            observer.on_status(update);
        }
    }

    /// Get the number of registered observers.
    #[must_use]
    pub fn count(&self) -> usize {
        self.observers.read().len()
    }
}

impl Default for StatusSubject {
    fn default() -> Self {
        Self::new()
    }
}
