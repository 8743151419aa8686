//! Chi-square test of independence, Cramer's V and matrix balance diagnostics.

use serde::{Deserialize, Serialize};
use statrs::distribution::{ChiSquared, ContinuousCDF};

use crate::constants::{MAX_LOW_EXPECTED_FRACTION, MIN_EXPECTED_FREQUENCY};
use crate::error::QcError;
use crate::matrix::{ConfusionMatrix, ObservationMatrix};

/// Result of a chi-square test of independence on a confusion matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignificanceTest {
    /// Test statistic.
    pub chi_square: f64,
    /// Degrees of freedom, `(rows - 1) * (columns - 1)` of the tested table.
    pub dof: usize,
    /// Probability of a statistic at least this large under independence.
    pub p_value: f64,
    /// Whether at most 20% of expected counts fall below 5.
    pub expected_frequency_valid: bool,
    /// Fraction of expected counts below 5.
    pub low_expected_fraction: f64,
    /// Whether Yates' continuity correction was applied (2x2 tables).
    pub yates_corrected: bool,
    /// `(rows, columns)` of the tested table after dropping empty rows and columns.
    pub tested_dims: (usize, usize),
}

/// Run a chi-square test of independence.
///
/// Rows and columns with a zero total carry no information and are removed
/// first; fewer than two of either is a [`QcError::Statistical`].
#[allow(clippy::cast_precision_loss)]
pub fn chi_square_test(cm: &ConfusionMatrix) -> Result<SignificanceTest, QcError> {
    let row_totals = cm.row_totals();
    let col_totals = cm.column_totals();
    let rows: Vec<usize> = (0..row_totals.len()).filter(|&i| row_totals[i] > 0).collect();
    let cols: Vec<usize> = (0..col_totals.len()).filter(|&j| col_totals[j] > 0).collect();

    if rows.len() < 2 || cols.len() < 2 {
        return Err(QcError::Statistical(format!(
            "confusion matrix has {} non-empty rows and {} non-empty columns; need at least 2 of each",
            rows.len(),
            cols.len()
        )));
    }

    let n = cm.total() as f64;
    let dof = (rows.len() - 1) * (cols.len() - 1);
    let yates = dof == 1;

    let mut chi_square = 0.0;
    let mut low_expected = 0usize;
    for &i in &rows {
        for &j in &cols {
            let expected = row_totals[i] as f64 * col_totals[j] as f64 / n;
            if expected < MIN_EXPECTED_FREQUENCY {
                low_expected += 1;
            }
            let mut diff = (cm.get(i, j) as f64 - expected).abs();
            if yates {
                diff = (diff - diff.min(0.5)).max(0.0);
            }
            chi_square += diff * diff / expected;
        }
    }

    if !chi_square.is_finite() {
        return Err(QcError::Statistical(
            "chi-square statistic is not finite".into(),
        ));
    }

    let dist = ChiSquared::new(dof as f64)
        .map_err(|e| QcError::Statistical(format!("invalid chi-square distribution: {e}")))?;
    let p_value = dist.sf(chi_square);
    if p_value.is_nan() {
        return Err(QcError::Statistical("p-value is undefined".into()));
    }

    let cells = (rows.len() * cols.len()) as f64;
    let low_expected_fraction = low_expected as f64 / cells;

    Ok(SignificanceTest {
        chi_square,
        dof,
        p_value: p_value.clamp(0.0, 1.0),
        expected_frequency_valid: low_expected_fraction <= MAX_LOW_EXPECTED_FRACTION,
        low_expected_fraction,
        yates_corrected: yates,
        tested_dims: (rows.len(), cols.len()),
    })
}

/// Cramer's V = sqrt(chi2 / (N * (min(r, c) - 1))), clamped to [0, 1].
///
/// Returns 0 when the smaller dimension is 1 or there are no observations.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn cramers_v(chi_square: f64, n: u64, rows: usize, cols: usize) -> f64 {
    let k = rows.min(cols);
    if k <= 1 || n == 0 {
        return 0.0;
    }
    let v = (chi_square / (n as f64 * (k - 1) as f64)).sqrt();
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

/// Balance diagnostics of an observation matrix.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MatrixBalance {
    /// Fraction of non-zero cells.
    pub density: f64,
    /// Coefficient of variation of neuron totals.
    pub row_cv: f64,
    /// Coefficient of variation of category totals.
    pub column_cv: f64,
}

impl MatrixBalance {
    /// Compute balance diagnostics.
    #[must_use]
    pub fn of(obs: &ObservationMatrix) -> Self {
        Self {
            density: obs.density(),
            row_cv: coefficient_of_variation(&obs.row_totals()),
            column_cv: coefficient_of_variation(&obs.column_totals()),
        }
    }

    /// The worse of the two coefficients of variation.
    #[must_use]
    pub fn worst_cv(&self) -> f64 {
        self.row_cv.max(self.column_cv)
    }
}

/// Population standard deviation divided by the mean; 0 for an empty or zero-mean slice.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn coefficient_of_variation(values: &[u64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let len = values.len() as f64;
    let mean = values.iter().map(|&v| v as f64).sum::<f64>() / len;
    if mean == 0.0 {
        return 0.0;
    }
    let variance = values
        .iter()
        .map(|&v| {
            let d = v as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / len;
    variance.sqrt() / mean
}
