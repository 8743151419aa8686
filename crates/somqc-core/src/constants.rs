//! Constants for sheet validation, grading, progress and pool lifecycle.

use std::time::Duration;

/// Minimum number of category columns after cleaning.
pub const MIN_CATEGORIES: usize = 2;

/// Default minimum number of neuron rows after cleaning.
pub const DEFAULT_MIN_NEURONS: usize = 5;

/// Largest accepted cell magnitude; anything above is rejected as corrupt.
pub const MAX_CELL_MAGNITUDE: f64 = 1e10;

/// Fraction of non-numeric cells above which a data-quality warning is recorded.
pub const NON_NUMERIC_WARN_FRACTION: f64 = 0.20;

/// Fraction of non-numeric cells above which the warning is marked severe.
pub const NON_NUMERIC_SEVERE_FRACTION: f64 = 0.50;

/// Expected cell count below which a chi-square cell is considered sparse.
pub const MIN_EXPECTED_FREQUENCY: f64 = 5.0;

/// Maximum fraction of sparse expected cells for the chi-square assumption to hold.
pub const MAX_LOW_EXPECTED_FRACTION: f64 = 0.20;

/// Maximum number of points on the letter-grade rubric.
pub const GRADE_MAX_POINTS: f64 = 15.0;

/// Maximum number of background workers. Kept small so the host stays responsive.
pub const MAX_WORKERS: usize = 2;

/// Share of the progress range reserved for batch setup (percent).
pub const PROGRESS_SETUP_PERCENT: f64 = 10.0;

/// Share of the progress range reserved for finalisation (percent).
pub const PROGRESS_FINALIZE_PERCENT: f64 = 15.0;

/// Timeout for an interactive pool shutdown.
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for shutdown at process exit or on interrupt.
pub const EMERGENCY_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Best-effort join budget per straggling worker thread.
pub const JOIN_GRACE: Duration = Duration::from_secs(1);

/// Minimum interval between log lines emitted by the logging observer.
pub const LOG_THROTTLE_MS: u64 = 250;

/// Process exit codes.
pub mod exit_codes {
    /// Successful execution.
    pub const SUCCESS: i32 = 0;
    /// Generic error.
    pub const ERROR_GENERIC: i32 = 1;
    /// No sheet could be analysed.
    pub const ERROR_NO_RESULTS: i32 = 2;
    /// Invalid configuration.
    pub const ERROR_CONFIG: i32 = 4;
    /// Batch cancelled by user (Ctrl+C).
    pub const ERROR_CANCELED: i32 = 130;
}
