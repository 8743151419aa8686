//! Batch orchestration: runs the transform and grader over a list of sheets
//! on a background worker while the host stays responsive.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;
use parking_lot::{Condvar, Mutex};
use tracing::{debug, error, info, warn};

use somqc_core::constants::{MAX_WORKERS, PROGRESS_FINALIZE_PERCENT, PROGRESS_SETUP_PERCENT};
use somqc_core::error::QcError;
use somqc_core::grade::QualityGrader;
use somqc_core::observer::{StatusObserver, StatusSubject};
use somqc_core::observers::ChannelObserver;
use somqc_core::options::TransformOptions;
use somqc_core::progress::{CancellationToken, StatusUpdate};
use somqc_core::rank::{ComparisonRanker, ComparisonSummary, ResultsMap};
use somqc_core::transform::SheetTransform;

use crate::interfaces::{BatchOutcome, BatchPhase, SheetSource, SkippedSheet};
use crate::pool::WorkerPool;

struct BatchState {
    phase: BatchPhase,
    results: ResultsMap,
    summary: ComparisonSummary,
    outcome: Option<BatchOutcome>,
}

struct Shared {
    state: Mutex<BatchState>,
    finished: Condvar,
}

impl Shared {
    fn finish(&self, phase: BatchPhase, outcome: BatchOutcome) {
        let mut state = self.state.lock();
        state.phase = phase;
        state.outcome = Some(outcome);
        self.finished.notify_all();
    }
}

/// Consistent copy of the orchestrator's shared state.
#[derive(Debug, Clone)]
pub struct BatchSnapshot {
    pub phase: BatchPhase,
    pub results: ResultsMap,
    pub summary: ComparisonSummary,
    /// Present once a run has ended.
    pub outcome: Option<BatchOutcome>,
}

/// Drives one batch run at a time on a background worker.
pub struct BatchOrchestrator {
    shared: Arc<Shared>,
    cancel: CancellationToken,
    status: Arc<StatusSubject>,
    transform: SheetTransform,
    grader: QualityGrader,
    pool: WorkerPool,
}

impl BatchOrchestrator {
    /// Create an orchestrator with its own worker pool.
    #[must_use]
    pub fn new(opts: TransformOptions) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(BatchState {
                    phase: BatchPhase::Idle,
                    results: ResultsMap::new(),
                    summary: ComparisonSummary::default(),
                    outcome: None,
                }),
                finished: Condvar::new(),
            }),
            cancel: CancellationToken::new(),
            status: Arc::new(StatusSubject::new()),
            transform: SheetTransform::new(opts),
            grader: QualityGrader::new(),
            pool: WorkerPool::named("somqc-batch", MAX_WORKERS),
        }
    }

    /// Register a status observer.
    pub fn subscribe(&self, observer: Arc<dyn StatusObserver>) {
        self.status.register(observer);
    }

    /// Open a channel that receives every status update.
    ///
    /// Channels whose receiver has been dropped are unregistered here.
    #[must_use]
    pub fn status_channel(&self) -> Receiver<StatusUpdate> {
        let pruned = self.status.prune_closed();
        let (tx, rx) = crossbeam_channel::unbounded();
        self.status.register(Arc::new(ChannelObserver::new(tx)));
        debug!(observers = self.status.count(), pruned, "Status channel opened");
        rx
    }

    /// Token observed by the running batch.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Start a batch over `sheet_names` and return immediately.
    ///
    /// Fails with [`QcError::Busy`] while a run is in flight and with
    /// [`QcError::Pool`] when the worker pool rejects the job; in both cases
    /// the previous state is left untouched.
    pub fn run(
        &self,
        sheet_names: Vec<String>,
        source: Arc<dyn SheetSource>,
    ) -> Result<(), QcError> {
        let previous = {
            let mut state = self.shared.state.lock();
            if state.phase == BatchPhase::Running {
                return Err(QcError::Busy);
            }
            let previous = std::mem::replace(
                &mut *state,
                BatchState {
                    phase: BatchPhase::Running,
                    results: ResultsMap::new(),
                    summary: ComparisonSummary::default(),
                    outcome: None,
                },
            );
            self.cancel.reset();
            previous
        };

        let job = BatchJob {
            sheet_names,
            source,
            shared: Arc::clone(&self.shared),
            cancel: self.cancel.clone(),
            status: Arc::clone(&self.status),
            transform: self.transform.clone(),
            grader: self.grader,
        };

        match self.pool.submit(move || job.execute()) {
            Ok(handle) => {
                debug!(task = handle.id(), "Batch submitted");
                Ok(())
            }
            Err(e) => {
                *self.shared.state.lock() = previous;
                Err(e)
            }
        }
    }

    /// Request cooperative cancellation. A no-op when nothing is running.
    pub fn cancel(&self) {
        let state = self.shared.state.lock();
        if state.phase == BatchPhase::Running {
            info!("Cancellation requested");
            self.cancel.cancel();
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.phase() == BatchPhase::Running
    }

    #[must_use]
    pub fn phase(&self) -> BatchPhase {
        self.shared.state.lock().phase
    }

    /// Outcome of the last finished run.
    #[must_use]
    pub fn outcome(&self) -> Option<BatchOutcome> {
        self.shared.state.lock().outcome.clone()
    }

    /// Copy of the results, leaderboard and phase taken under one lock.
    #[must_use]
    pub fn snapshot(&self) -> BatchSnapshot {
        let state = self.shared.state.lock();
        BatchSnapshot {
            phase: state.phase,
            results: state.results.clone(),
            summary: state.summary.clone(),
            outcome: state.outcome.clone(),
        }
    }

    /// Block until no run is in flight or `timeout` elapses. Returns whether
    /// the orchestrator is idle.
    pub fn wait(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.state.lock();
        while state.phase == BatchPhase::Running {
            if self.shared.finished.wait_until(&mut state, deadline).timed_out() {
                return state.phase != BatchPhase::Running;
            }
        }
        true
    }

    /// Cancel any run and stop the worker pool. Returns whether every worker exited.
    pub fn shutdown(&self, timeout: Duration) -> bool {
        self.cancel();
        self.pool.shutdown(true, timeout)
    }
}

impl Drop for BatchOrchestrator {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

struct BatchJob {
    sheet_names: Vec<String>,
    source: Arc<dyn SheetSource>,
    shared: Arc<Shared>,
    cancel: CancellationToken,
    status: Arc<StatusSubject>,
    transform: SheetTransform,
    grader: QualityGrader,
}

impl BatchJob {
    fn execute(self) {
        let shared = Arc::clone(&self.shared);
        let status = Arc::clone(&self.status);
        let requested = self.sheet_names.len();
        if catch_unwind(AssertUnwindSafe(|| self.run_sheets())).is_err() {
            error!("Batch run panicked");
            let outcome = BatchOutcome {
                requested,
                ..BatchOutcome::default()
            };
            status.notify(&StatusUpdate::complete("Batch failed: internal error"));
            shared.finish(BatchPhase::Failed, outcome);
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn run_sheets(&self) {
        let total = self.sheet_names.len();
        let span = 100.0 - PROGRESS_SETUP_PERCENT - PROGRESS_FINALIZE_PERCENT;
        let started = Instant::now();
        let mut outcome = BatchOutcome {
            requested: total,
            ..BatchOutcome::default()
        };

        info!(sheets = total, "Batch started");
        self.status.notify(&StatusUpdate::progress(
            format!("Starting analysis of {total} sheets"),
            PROGRESS_SETUP_PERCENT,
        ));
        let mut last_percent = PROGRESS_SETUP_PERCENT;

        for (i, name) in self.sheet_names.iter().enumerate() {
            if self.cancel.is_cancelled() {
                outcome.cancelled = true;
                break;
            }

            let analysed = self
                .source
                .read_sheet(name)
                .and_then(|table| self.transform.transform(name, &table));
            match analysed {
                Ok(result) => {
                    let graded = Arc::new(self.grader.assess(result));
                    debug!(sheet = %name, grade = %graded.grade.letter, "Sheet graded");
                    self.shared.state.lock().results.insert(graded);
                    outcome.processed += 1;
                }
                Err(e) => {
                    warn!(sheet = %name, error = %e, "Sheet skipped");
                    outcome.skipped.push(SkippedSheet {
                        sheet: name.clone(),
                        reason: e.to_string(),
                    });
                }
            }

            last_percent = PROGRESS_SETUP_PERCENT + (i + 1) as f64 / total as f64 * span;
            self.status.notify(&StatusUpdate::progress(
                format!("Analysed {name} ({}/{total})", i + 1),
                last_percent,
            ));
        }

        if outcome.cancelled {
            info!(
                processed = outcome.processed,
                skipped = outcome.skipped_count(),
                "Batch cancelled"
            );
            // Final update before the phase leaves Running: a host woken by
            // `wait` may start the next run right away.
            self.status
                .notify(&StatusUpdate::complete_at(outcome.summary(), last_percent));
            self.shared.finish(BatchPhase::Cancelled, outcome);
            return;
        }

        if outcome.processed > 1 {
            self.status.notify(&StatusUpdate::progress(
                "Ranking results",
                100.0 - PROGRESS_FINALIZE_PERCENT,
            ));
            let results = self.shared.state.lock().results.clone();
            let summary = ComparisonRanker::new().rank(&results);
            self.shared.state.lock().summary = summary;
        }

        let phase = if total > 0 && outcome.processed == 0 {
            BatchPhase::Failed
        } else {
            BatchPhase::Completed
        };
        info!(
            processed = outcome.processed,
            skipped = outcome.skipped_count(),
            elapsed = format!("{:.3?}", started.elapsed()),
            "Batch finished"
        );
        self.status.notify(&StatusUpdate::complete(outcome.summary()));
        self.shared.finish(phase, outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interfaces::InMemorySource;
    use somqc_core::table::RawTable;

    fn good_table() -> RawTable {
        RawTable::from_counts(&[
            vec![40, 2],
            vec![35, 1],
            vec![1, 50],
            vec![0, 45],
            vec![3, 30],
        ])
    }

    fn drain(rx: &Receiver<StatusUpdate>) -> Vec<StatusUpdate> {
        let mut updates = Vec::new();
        while let Ok(update) = rx.recv_timeout(Duration::from_secs(10)) {
            let complete = update.complete;
            updates.push(update);
            if complete {
                break;
            }
        }
        updates
    }

    #[test]
    fn single_sheet_run_is_not_ranked() {
        let orch = BatchOrchestrator::new(TransformOptions::default());
        let rx = orch.status_channel();
        let source = Arc::new(InMemorySource::new().with_sheet("only", good_table()));
        orch.run(vec!["only".into()], source).unwrap();
        let updates = drain(&rx);
        assert!(orch.wait(Duration::from_secs(10)));

        let snap = orch.snapshot();
        assert_eq!(snap.phase, BatchPhase::Completed);
        assert_eq!(snap.results.len(), 1);
        assert!(snap.summary.is_empty());
        assert_eq!(updates.last().unwrap().message, "Processed 1, skipped 0");
    }

    #[test]
    fn progress_reserves_setup_and_finalize() {
        let orch = BatchOrchestrator::new(TransformOptions::default());
        let rx = orch.status_channel();
        let source = InMemorySource::new()
            .with_sheet("a", good_table())
            .with_sheet("b", good_table());
        orch.run(vec!["a".into(), "b".into()], Arc::new(source))
            .unwrap();
        let percents: Vec<f64> = drain(&rx).iter().filter_map(|u| u.percent).collect();
        assert!((percents[0] - 10.0).abs() < 1e-9);
        assert!((percents[1] - 47.5).abs() < 1e-9);
        assert!((percents[2] - 85.0).abs() < 1e-9);
        assert!((percents[3] - 85.0).abs() < 1e-9);
        assert!((percents[4] - 100.0).abs() < 1e-9);
        assert!(percents.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn all_skipped_run_fails() {
        let orch = BatchOrchestrator::new(TransformOptions::default());
        let rx = orch.status_channel();
        orch.run(vec!["missing".into()], Arc::new(InMemorySource::new()))
            .unwrap();
        drain(&rx);
        assert!(orch.wait(Duration::from_secs(10)));
        assert_eq!(orch.phase(), BatchPhase::Failed);
        let outcome = orch.outcome().unwrap();
        assert_eq!(outcome.skipped_count(), 1);
        assert!(outcome.skipped[0].reason.contains("no such sheet"));
    }

    #[test]
    fn panicking_source_fails_the_run() {
        let orch = BatchOrchestrator::new(TransformOptions::default());
        let rx = orch.status_channel();
        let source = |_: &str| -> Result<RawTable, QcError> { panic!("driver bug") };
        orch.run(vec!["x".into()], Arc::new(source)).unwrap();
        let updates = drain(&rx);
        assert!(orch.wait(Duration::from_secs(10)));
        assert_eq!(orch.phase(), BatchPhase::Failed);
        assert!(updates.last().unwrap().complete);
        assert!(!orch.is_running());
    }

    #[test]
    fn batches_run_on_named_workers() {
        let orch = BatchOrchestrator::new(TransformOptions::default());
        let (tx, rx) = crossbeam_channel::unbounded();
        let source = move |_: &str| -> Result<RawTable, QcError> {
            let _ = tx.send(std::thread::current().name().map(str::to_string));
            Ok(good_table())
        };
        orch.run(vec!["x".into()], Arc::new(source)).unwrap();
        assert!(orch.wait(Duration::from_secs(10)));
        let name = rx.try_recv().unwrap().unwrap();
        assert!(name.starts_with("somqc-batch-"), "{name}");
    }

    #[test]
    fn dropped_status_channels_are_unregistered() {
        let orch = BatchOrchestrator::new(TransformOptions::default());
        drop(orch.status_channel());
        let rx = orch.status_channel();
        assert_eq!(orch.status.count(), 2);

        let source = Arc::new(InMemorySource::new().with_sheet("only", good_table()));
        orch.run(vec!["only".into()], source).unwrap();
        drain(&rx);
        assert!(orch.wait(Duration::from_secs(10)));

        let _rx2 = orch.status_channel();
        assert_eq!(orch.status.count(), 2);
    }

    #[test]
    fn empty_run_completes() {
        let orch = BatchOrchestrator::new(TransformOptions::default());
        orch.run(Vec::new(), Arc::new(InMemorySource::new())).unwrap();
        assert!(orch.wait(Duration::from_secs(10)));
        assert_eq!(orch.phase(), BatchPhase::Completed);
    }

    #[test]
    fn run_after_shutdown_is_a_pool_error() {
        let orch = BatchOrchestrator::new(TransformOptions::default());
        assert!(orch.shutdown(Duration::from_secs(1)));
        let err = orch
            .run(vec!["a".into()], Arc::new(InMemorySource::new()))
            .unwrap_err();
        assert!(matches!(err, QcError::Pool(_)));
        assert_eq!(orch.phase(), BatchPhase::Idle);
    }
}
