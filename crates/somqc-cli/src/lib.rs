//! # somqc-cli
//!
//! CLI output, progress display, report export and shell completion.

pub mod completion;
pub mod export;
pub mod output;
pub mod presenter;
pub mod progress;
pub mod ui;

pub use export::{ExportError, ExportFormat};
pub use presenter::CliResultPresenter;
pub use progress::StatusProgress;
