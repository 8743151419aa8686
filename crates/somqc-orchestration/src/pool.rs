//! Bounded background worker pool with idempotent, never-blocking-forever shutdown.
//!
//! Threads are spawned lazily on the first submission. Jobs are delivered
//! through a crossbeam channel; every job runs under `catch_unwind`, so a
//! panicking job marks its handle as panicked instead of killing the worker.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use parking_lot::{Condvar, Mutex};
use tracing::{debug, error, info, warn};

use somqc_core::constants::{EMERGENCY_SHUTDOWN_TIMEOUT, JOIN_GRACE, MAX_WORKERS};
use somqc_core::error::QcError;

const PENDING: u8 = 0;
const RUNNING: u8 = 1;
const FINISHED: u8 = 2;
const CANCELLED: u8 = 3;
const PANICKED: u8 = 4;

/// Lifecycle of a submitted job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    /// Queued, not yet picked up by a worker.
    Pending,
    Running,
    Finished,
    /// Cancelled before it started.
    Cancelled,
    /// The job panicked.
    Panicked,
}

struct TaskState {
    id: u64,
    status: AtomicU8,
    lock: Mutex<()>,
    done: Condvar,
}

impl TaskState {
    fn new(id: u64) -> Self {
        Self {
            id,
            status: AtomicU8::new(PENDING),
            lock: Mutex::new(()),
            done: Condvar::new(),
        }
    }

    fn status(&self) -> TaskStatus {
        match self.status.load(Ordering::Acquire) {
            PENDING => TaskStatus::Pending,
            RUNNING => TaskStatus::Running,
            FINISHED => TaskStatus::Finished,
            CANCELLED => TaskStatus::Cancelled,
            _ => TaskStatus::Panicked,
        }
    }

    fn is_finished(&self) -> bool {
        self.status.load(Ordering::Acquire) >= FINISHED
    }

    /// PENDING -> RUNNING. False when the task was cancelled first.
    fn start(&self) -> bool {
        self.status
            .compare_exchange(PENDING, RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn cancel(&self) -> bool {
        let _guard = self.lock.lock();
        let cancelled = self
            .status
            .compare_exchange(PENDING, CANCELLED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if cancelled {
            self.done.notify_all();
        }
        cancelled
    }

    fn finish(&self, status: u8) {
        let _guard = self.lock.lock();
        self.status.store(status, Ordering::Release);
        self.done.notify_all();
    }
}

/// Handle to a submitted job.
#[derive(Clone)]
pub struct TaskHandle {
    state: Arc<TaskState>,
}

impl TaskHandle {
    /// Pool-unique task id.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.state.id
    }

    #[must_use]
    pub fn status(&self) -> TaskStatus {
        self.state.status()
    }

    /// Whether the job finished, panicked or was cancelled.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state.is_finished()
    }

    /// Cancel the job if it has not started yet. Running jobs are unaffected.
    pub fn cancel(&self) -> bool {
        self.state.cancel()
    }

    /// Block until the job is finished or `timeout` elapses.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut guard = self.state.lock.lock();
        while !self.state.is_finished() {
            if self.state.done.wait_until(&mut guard, deadline).timed_out() {
                return self.state.is_finished();
            }
        }
        true
    }
}

impl std::fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskHandle")
            .field("id", &self.state.id)
            .field("status", &self.status())
            .finish()
    }
}

type Job = Box<dyn FnOnce() + Send + 'static>;

struct Queued {
    state: Arc<TaskState>,
    job: Job,
}

struct WorkerThread {
    name: String,
    join: Option<JoinHandle<()>>,
    /// Disconnects when the worker thread exits.
    exited: Receiver<()>,
}

impl WorkerThread {
    fn join(&mut self) {
        if let Some(join) = self.join.take() {
            if join.join().is_err() {
                warn!(worker = %self.name, "Worker thread panicked");
            }
        }
    }
}

struct PoolInner {
    sender: Option<Sender<Queued>>,
    workers: Vec<WorkerThread>,
}

/// Small fixed-size pool of background threads.
pub struct WorkerPool {
    size: usize,
    name: String,
    inner: Mutex<Option<PoolInner>>,
    handles: Mutex<Vec<TaskHandle>>,
    stop: Arc<AtomicBool>,
    shutdown_outcome: Mutex<Option<bool>>,
    next_id: AtomicU64,
}

impl WorkerPool {
    /// Create a pool of at most `size` workers (clamped to `1..=MAX_WORKERS`).
    #[must_use]
    pub fn new(size: usize) -> Self {
        Self::named("somqc-worker", size)
    }

    /// Create a pool whose threads are named `{name}-{i}`.
    #[must_use]
    pub fn named(name: &str, size: usize) -> Self {
        Self {
            size: size.clamp(1, MAX_WORKERS),
            name: name.to_string(),
            inner: Mutex::new(None),
            handles: Mutex::new(Vec::new()),
            stop: Arc::new(AtomicBool::new(false)),
            shutdown_outcome: Mutex::new(None),
            next_id: AtomicU64::new(0),
        }
    }

    /// Configured number of worker threads.
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of threads currently spawned (0 before the first submission).
    #[must_use]
    pub fn spawned_workers(&self) -> usize {
        self.inner.lock().as_ref().map_or(0, |inner| inner.workers.len())
    }

    /// Tracked handles that have not finished.
    #[must_use]
    pub fn active_tasks(&self) -> usize {
        self.handles.lock().iter().filter(|h| !h.is_finished()).count()
    }

    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    /// Queue a job. Fails with [`QcError::Pool`] after shutdown or when the
    /// worker threads cannot be spawned.
    pub fn submit<F>(&self, job: F) -> Result<TaskHandle, QcError>
    where
        F: FnOnce() + Send + 'static,
    {
        let mut inner = self.inner.lock();
        if self.is_shut_down() {
            return Err(QcError::Pool("worker pool has been shut down".into()));
        }
        if inner.is_none() {
            *inner = Some(self.spawn_workers()?);
        }
        let sender = inner
            .as_ref()
            .and_then(|i| i.sender.as_ref())
            .ok_or_else(|| QcError::Pool("worker pool has no job queue".into()))?;

        let state = Arc::new(TaskState::new(self.next_id.fetch_add(1, Ordering::Relaxed)));
        let handle = TaskHandle {
            state: Arc::clone(&state),
        };
        {
            let mut handles = self.handles.lock();
            handles.retain(|h| !h.is_finished());
            handles.push(handle.clone());
        }

        sender
            .send(Queued {
                state,
                job: Box::new(job),
            })
            .map_err(|_| QcError::Pool("worker threads have exited".into()))?;
        debug!(task = handle.id(), "Job submitted");
        Ok(handle)
    }

    fn spawn_workers(&self) -> Result<PoolInner, QcError> {
        let (tx, rx) = crossbeam_channel::unbounded::<Queued>();
        let mut workers = Vec::with_capacity(self.size);
        for i in 0..self.size {
            let name = format!("{}-{i}", self.name);
            let (exit_tx, exit_rx) = crossbeam_channel::bounded::<()>(0);
            let rx = rx.clone();
            let stop = Arc::clone(&self.stop);
            let join = thread::Builder::new()
                .name(name.clone())
                .spawn(move || {
                    let _exit = exit_tx;
                    worker_loop(&rx, &stop);
                })
                .map_err(|e| QcError::Pool(format!("cannot spawn worker thread: {e}")))?;
            workers.push(WorkerThread {
                name,
                join: Some(join),
                exited: exit_rx,
            });
        }
        debug!(workers = self.size, "Worker pool started");
        Ok(PoolInner {
            sender: Some(tx),
            workers,
        })
    }

    /// Stop the pool.
    ///
    /// Cancels jobs that have not started, closes the queue and, when `wait`
    /// is set, waits up to `timeout` for the workers to exit, then gives each
    /// remaining worker a short grace join. Returns whether every worker
    /// exited. Never panics; repeated calls return the first outcome.
    pub fn shutdown(&self, wait: bool, timeout: Duration) -> bool {
        let mut outcome = self.shutdown_outcome.lock();
        if let Some(done) = *outcome {
            debug!(clean = done, "Worker pool already shut down");
            return done;
        }
        let clean = match catch_unwind(AssertUnwindSafe(|| self.shutdown_inner(wait, timeout))) {
            Ok(clean) => clean,
            Err(_) => {
                error!("Worker pool shutdown panicked");
                false
            }
        };
        *outcome = Some(clean);
        clean
    }

    fn shutdown_inner(&self, wait: bool, timeout: Duration) -> bool {
        self.stop.store(true, Ordering::Release);

        let cancelled = self
            .handles
            .lock()
            .drain(..)
            .filter(|h| h.cancel())
            .count();
        if cancelled > 0 {
            debug!(cancelled, "Pending jobs cancelled");
        }

        let Some(mut inner) = self.inner.lock().take() else {
            return true;
        };
        drop(inner.sender.take());

        if !wait {
            info!("Worker pool stop requested");
            return true;
        }

        let deadline = Instant::now() + timeout;
        let mut stragglers = Vec::new();
        for mut worker in inner.workers {
            match worker.exited.recv_deadline(deadline) {
                Err(RecvTimeoutError::Timeout) => stragglers.push(worker),
                _ => worker.join(),
            }
        }

        let mut clean = true;
        for mut worker in stragglers {
            match worker.exited.recv_timeout(JOIN_GRACE) {
                Err(RecvTimeoutError::Timeout) => {
                    warn!(worker = %worker.name, "Worker did not stop in time; detaching");
                    clean = false;
                }
                _ => worker.join(),
            }
        }
        if clean {
            info!("Worker pool stopped");
        }
        clean
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if !self.shutdown(true, EMERGENCY_SHUTDOWN_TIMEOUT) {
            warn!("Worker pool dropped with running workers");
        }
    }
}

fn worker_loop(rx: &Receiver<Queued>, stop: &AtomicBool) {
    while let Ok(Queued { state, job }) = rx.recv() {
        if stop.load(Ordering::Acquire) {
            state.cancel();
            continue;
        }
        if !state.start() {
            continue;
        }
        match catch_unwind(AssertUnwindSafe(job)) {
            Ok(()) => state.finish(FINISHED),
            Err(_) => {
                error!(task = state.id, "Job panicked");
                state.finish(PANICKED);
            }
        }
    }
}
