//! # somqc-core
//!
//! Core library for SOM classification quality control. Collapses a
//! neuron-level observation matrix into a confusion matrix, derives accuracy,
//! chi-square significance and Cramer's V, grades the result and ranks sheets
//! against each other.

pub mod clean;
pub mod constants;
pub mod error;
pub mod grade;
pub mod matrix;
pub mod observer;
pub mod observers;
pub mod options;
pub mod progress;
pub mod rank;
pub mod report;
pub mod result;
pub mod stats;
pub mod table;
pub mod transform;

// Re-exports
pub use constants::{exit_codes, DEFAULT_MIN_NEURONS, MAX_WORKERS};
pub use error::QcError;
pub use grade::{GradedSheet, Letter, OverallQuality, QcGrade, QualityDescriptor, QualityGrader};
pub use matrix::{ConfusionMatrix, NeuronWinner, ObservationMatrix};
pub use observer::{StatusObserver, StatusSubject};
pub use options::TransformOptions;
pub use progress::{CancellationToken, StatusUpdate};
pub use rank::{ComparisonRanker, ComparisonSummary, RankedSheet, ResultsMap};
pub use report::ReportRow;
pub use result::SheetResult;
pub use table::{RawCell, RawTable};
pub use transform::SheetTransform;

/// Transform and grade one sheet with default options.
///
/// # Example
/// ```
/// use somqc_core::RawTable;
///
/// let table = RawTable::from_counts(&[
///     vec![40, 2],
///     vec![35, 1],
///     vec![1, 50],
///     vec![0, 45],
///     vec![3, 30],
/// ]);
/// let graded = somqc_core::analyze("demo", &table).unwrap();
/// assert!(graded.result.accuracy > 90.0);
/// ```
pub fn analyze(sheet_name: &str, table: &RawTable) -> Result<GradedSheet, QcError> {
    let result = SheetTransform::default().transform(sheet_name, table)?;
    Ok(QualityGrader::new().assess(result))
}
