//! # somqc-orchestration
//!
//! Bounded worker pool and the batch orchestrator that runs the sheet
//! transform over many sheets with progress reporting and cancellation.

pub mod interfaces;
pub mod orchestrator;
pub mod pool;

pub use interfaces::{
    BatchOutcome, BatchPhase, InMemorySource, ResultPresenter, SheetSource, SkippedSheet,
};
pub use orchestrator::{BatchOrchestrator, BatchSnapshot};
pub use pool::{TaskHandle, TaskStatus, WorkerPool};
