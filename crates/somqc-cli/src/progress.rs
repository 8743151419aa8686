//! Progress bar driven by batch status updates.

use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;

use somqc_core::progress::StatusUpdate;

const TICK: Duration = Duration::from_millis(100);

/// Renders status updates on a progress bar scaled to 0-100.
pub struct StatusProgress {
    bar: ProgressBar,
}

impl StatusProgress {
    /// Create a visible bar, or a hidden one when `quiet`.
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        let bar = if quiet {
            ProgressBar::hidden()
        } else {
            ProgressBar::new(100)
        };
        if let Ok(style) =
            ProgressStyle::default_bar().template("{spinner} [{bar:40.cyan/blue}] {pos:>3}% {msg}")
        {
            bar.set_style(style.progress_chars("=> "));
        }
        Self { bar }
    }

    /// Apply one update.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn apply(&self, update: &StatusUpdate) {
        if let Some(percent) = update.percent {
            self.bar.set_position(percent.round().clamp(0.0, 100.0) as u64);
        }
        self.bar.set_message(update.message.clone());
    }

    /// Consume updates until the final one arrives or the sender goes away.
    ///
    /// `on_idle` runs on every quiet tick; returning `true` from it stops the
    /// wait (used to give up after an interrupt). Returns the final update.
    pub fn drain(
        &self,
        rx: &Receiver<StatusUpdate>,
        mut on_idle: impl FnMut() -> bool,
    ) -> Option<StatusUpdate> {
        loop {
            match rx.recv_timeout(TICK) {
                Ok(update) => {
                    self.apply(&update);
                    if update.complete {
                        self.bar.finish_with_message(update.message.clone());
                        return Some(update);
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    self.bar.tick();
                    if on_idle() {
                        debug!("Stopped waiting for batch status");
                        self.bar.abandon();
                        return None;
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    self.bar.abandon();
                    return None;
                }
            }
        }
    }

    /// Current bar position.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.bar.position()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_stops_at_complete() {
        let (tx, rx) = crossbeam_channel::unbounded();
        tx.send(StatusUpdate::progress("a", 10.0)).unwrap();
        tx.send(StatusUpdate::progress("b", 47.5)).unwrap();
        tx.send(StatusUpdate::complete("Processed 2, skipped 0")).unwrap();
        tx.send(StatusUpdate::message("after")).unwrap();

        let progress = StatusProgress::new(true);
        let last = progress.drain(&rx, || false).unwrap();
        assert_eq!(last.message, "Processed 2, skipped 0");
        assert_eq!(progress.position(), 100);
        assert_eq!(rx.try_recv().unwrap().message, "after");
    }

    #[test]
    fn drain_returns_none_on_disconnect() {
        let (tx, rx) = crossbeam_channel::unbounded();
        tx.send(StatusUpdate::progress("a", 30.0)).unwrap();
        drop(tx);
        let progress = StatusProgress::new(true);
        assert!(progress.drain(&rx, || false).is_none());
        assert_eq!(progress.position(), 30);
    }

    #[test]
    fn drain_gives_up_when_idle_says_so() {
        let (_tx, rx) = crossbeam_channel::unbounded::<StatusUpdate>();
        let progress = StatusProgress::new(true);
        let mut ticks = 0;
        let last = progress.drain(&rx, || {
            ticks += 1;
            ticks >= 2
        });
        assert!(last.is_none());
        assert_eq!(ticks, 2);
    }
}
