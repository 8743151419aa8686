//! Sheet transform: raw observation table to [`SheetResult`].
//!
//! The transform is a pure function of its input and holds no shared mutable
//! state, so any number of sheets can be transformed concurrently.

use tracing::{debug, warn};

use crate::clean::{clean_table, DataQuality};
use crate::error::QcError;
use crate::matrix::{ConfusionMatrix, ObservationMatrix};
use crate::options::TransformOptions;
use crate::result::{current_timestamp, CategoryStats, SheetResult};
use crate::stats::{chi_square_test, cramers_v, MatrixBalance};
use crate::table::RawTable;

/// Turns raw sheets into validated statistics.
#[derive(Debug, Clone, Default)]
pub struct SheetTransform {
    opts: TransformOptions,
}

impl SheetTransform {
    /// Create a transform with the given options (normalized).
    #[must_use]
    pub fn new(opts: TransformOptions) -> Self {
        Self {
            opts: opts.normalize(),
        }
    }

    /// Options in effect.
    #[must_use]
    pub fn options(&self) -> &TransformOptions {
        &self.opts
    }

    /// Clean, validate and analyse one sheet.
    ///
    /// Fails with [`QcError::Data`] when the sheet has too few usable rows or
    /// columns, no observations, or an out-of-bounds value.
    pub fn transform(&self, sheet_name: &str, table: &RawTable) -> Result<SheetResult, QcError> {
        let cleaned = clean_table(table, &self.opts)?;
        Ok(analyze(sheet_name, &cleaned.matrix, cleaned.quality))
    }
}

/// Analyse an already validated matrix.
#[must_use]
pub fn analyze_matrix(sheet_name: &str, matrix: &ObservationMatrix) -> SheetResult {
    analyze(sheet_name, matrix, DataQuality::default())
}

#[allow(clippy::cast_precision_loss)]
fn analyze(sheet_name: &str, matrix: &ObservationMatrix, quality: DataQuality) -> SheetResult {
    let confusion = ConfusionMatrix::from_observations(matrix);
    let total = matrix.total();
    let total_neurons = matrix.neurons().len();
    let active_neurons = matrix.active_neurons();
    let accuracy = confusion.accuracy(total);
    let inactive_ratio = if total_neurons == 0 {
        0.0
    } else {
        ((total_neurons - active_neurons) as f64 / total_neurons as f64 * 100.0).clamp(0.0, 100.0)
    };

    let mut warnings = quality.warnings.clone();
    let (significance, p_value, association_strength) = match chi_square_test(&confusion) {
        Ok(test) => {
            let (rows, cols) = test.tested_dims;
            let v = cramers_v(test.chi_square, total, rows, cols);
            if !test.expected_frequency_valid {
                warnings.push(format!(
                    "{:.0}% of expected counts are below 5; chi-square p-value may be unreliable",
                    test.low_expected_fraction * 100.0
                ));
            }
            let p = test.p_value;
            (Some(test), p, v)
        }
        Err(e) => {
            warn!(sheet = %sheet_name, error = %e, "Significance test degraded");
            warnings.push(format!("significance test unavailable: {e}"));
            (None, 1.0, 0.0)
        }
    };

    debug!(
        sheet = %sheet_name,
        accuracy = format!("{accuracy:.2}%"),
        association = format!("{association_strength:.3}"),
        p_value,
        "Sheet analysed"
    );

    SheetResult {
        sheet_name: sheet_name.to_string(),
        total_observations: total,
        total_neurons,
        active_neurons,
        accuracy,
        association_strength,
        inactive_ratio,
        p_value,
        significance,
        balance: MatrixBalance::of(matrix),
        category_stats: CategoryStats::from_confusion(&confusion),
        neuron_winners: matrix.winners(),
        confusion_matrix: confusion,
        data_quality: quality,
        warnings,
        timestamp: current_timestamp(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::RawCell;

    fn labels(prefix: &str, n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("{prefix}{i}")).collect()
    }

    #[test]
    fn three_neurons_with_a_tie() {
        let m = ObservationMatrix::new(
            labels("n", 3),
            vec!["cat1".into(), "cat2".into()],
            vec![vec![10, 0], vec![0, 10], vec![5, 5]],
        )
        .unwrap();
        let result = analyze_matrix("A", &m);
        assert_eq!(result.confusion_matrix.cells(), &[vec![15, 5], vec![0, 10]]);
        assert!((result.accuracy - 83.333_333).abs() < 1e-3);
        assert!(result.inactive_ratio.abs() < f64::EPSILON);
        assert_eq!(result.neuron_winners.len(), 3);
        assert_eq!(result.neuron_winners[2].category, "cat1");
        assert_eq!(result.total_observations, 30);
    }

    #[test]
    fn transform_full_sheet() {
        let table = RawTable::from_counts(&[
            vec![40, 2, 1],
            vec![35, 1, 0],
            vec![1, 50, 3],
            vec![0, 45, 2],
            vec![2, 1, 60],
            vec![0, 0, 0],
        ]);
        let result = SheetTransform::default().transform("S1", &table).unwrap();
        assert_eq!(result.total_neurons, 6);
        assert_eq!(result.active_neurons, 5);
        assert!((result.inactive_ratio - 100.0 / 6.0).abs() < 1e-9);
        assert!(result.accuracy > 90.0);
        assert!(result.p_value < 0.001);
        assert!(result.association_strength > 0.7);
        assert!(result.significance.is_some());
        assert_eq!(
            result.confusion_matrix.total(),
            result.total_observations
        );
    }

    #[test]
    fn degenerate_test_degrades() {
        // Every neuron predicts C1, so the confusion matrix has one non-empty row.
        let table = RawTable::from_counts(&[
            vec![5, 1],
            vec![6, 2],
            vec![7, 3],
            vec![8, 4],
            vec![9, 5],
        ]);
        let result = SheetTransform::default().transform("flat", &table).unwrap();
        assert!(result.significance.is_none());
        assert!((result.p_value - 1.0).abs() < f64::EPSILON);
        assert!(result.association_strength.abs() < f64::EPSILON);
        assert!(result
            .warnings
            .iter()
            .any(|w| w.contains("significance test unavailable")));
    }

    #[test]
    fn all_zero_sheet_is_a_data_error() {
        let table = RawTable::from_counts(&vec![vec![0, 0, 0]; 5]);
        let err = SheetTransform::default().transform("zero", &table).unwrap_err();
        assert!(matches!(err, QcError::Data(_)));
        assert!(err.to_string().contains("All observation values are zero"));
    }

    #[test]
    fn data_quality_warnings_are_carried() {
        let mut table = RawTable::from_counts(&[
            vec![40, 2],
            vec![35, 1],
            vec![1, 50],
            vec![0, 45],
            vec![3, 30],
        ]);
        table.cells[0][1] = RawCell::Number(-2.0);
        let result = SheetTransform::default().transform("neg", &table).unwrap();
        assert_eq!(result.data_quality.sign_corrected_cells, 1);
        assert!(result.warnings.iter().any(|w| w.contains("negative")));
    }

    #[test]
    fn transform_respects_min_neurons() {
        let table = RawTable::from_counts(&[vec![4, 1], vec![1, 4], vec![3, 3]]);
        let strict = SheetTransform::default();
        assert!(strict.transform("small", &table).is_err());
        let lenient = SheetTransform::new(TransformOptions::default().with_min_neurons(3));
        assert!(lenient.transform("small", &table).is_ok());
    }
}
