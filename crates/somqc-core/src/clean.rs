//! Validation and coercion of raw sheet tables.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::QcError;
use crate::matrix::ObservationMatrix;
use crate::options::TransformOptions;
use crate::table::{CellValue, RawTable};

/// What cleaning had to change to make a sheet usable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataQuality {
    /// Rows dropped because every cell was empty.
    pub dropped_rows: usize,
    /// Columns dropped because every cell was empty.
    pub dropped_columns: usize,
    /// Cells holding text that is not a number (counted as zero).
    pub non_numeric_cells: usize,
    /// Empty cells inside kept rows and columns (counted as zero).
    pub missing_cells: usize,
    /// Negative values replaced by their absolute value.
    pub sign_corrected_cells: usize,
    /// Fractional values rounded to the nearest integer.
    pub rounded_cells: usize,
    /// Number of cells inspected after dropping empty rows and columns.
    pub total_cells: usize,
    /// Human-readable data-quality warnings.
    pub warnings: Vec<String>,
}

impl DataQuality {
    /// Fraction of inspected cells that were non-numeric.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn non_numeric_fraction(&self) -> f64 {
        if self.total_cells == 0 {
            0.0
        } else {
            self.non_numeric_cells as f64 / self.total_cells as f64
        }
    }
}

/// A cleaned sheet ready for analysis.
#[derive(Debug, Clone)]
pub struct CleanedSheet {
    /// The validated matrix.
    pub matrix: ObservationMatrix,
    /// What cleaning changed.
    pub quality: DataQuality,
}

/// Validate and coerce a raw table into an [`ObservationMatrix`].
///
/// Fully empty rows and columns are dropped. Remaining cells become
/// non-negative integers: negatives are sign-corrected, fractions rounded,
/// empty and non-numeric cells count as zero. Values beyond
/// `max_cell_magnitude` reject the whole sheet.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn clean_table(table: &RawTable, opts: &TransformOptions) -> Result<CleanedSheet, QcError> {
    let rows: Vec<usize> = (0..table.height())
        .filter(|&i| (0..table.width()).any(|j| !table.cell(i, j).is_empty()))
        .collect();
    let cols: Vec<usize> = (0..table.width())
        .filter(|&j| rows.iter().any(|&i| !table.cell(i, j).is_empty()))
        .collect();

    let mut quality = DataQuality {
        dropped_rows: table.height() - rows.len(),
        dropped_columns: table.width() - cols.len(),
        total_cells: rows.len() * cols.len(),
        ..DataQuality::default()
    };

    if rows.is_empty() || cols.is_empty() {
        return Err(QcError::data("sheet contains no data"));
    }
    if cols.len() < opts.min_categories {
        return Err(QcError::data(format!(
            "need at least {} category columns, found {}",
            opts.min_categories,
            cols.len()
        )));
    }

    let mut counts = Vec::with_capacity(rows.len());
    for &i in &rows {
        let mut row = Vec::with_capacity(cols.len());
        for &j in &cols {
            let count = match table.cell(i, j).value() {
                CellValue::Value(v) => {
                    if !v.is_finite() || v.abs() > opts.max_cell_magnitude {
                        return Err(QcError::data(format!(
                            "value {v} at neuron '{}', category '{}' exceeds the sanity bound of {:e}",
                            label_or(&table.neurons, i, "row"),
                            label_or(&table.categories, j, "column"),
                            opts.max_cell_magnitude
                        )));
                    }
                    if v < 0.0 {
                        quality.sign_corrected_cells += 1;
                    }
                    let magnitude = v.abs();
                    if magnitude.fract() != 0.0 {
                        quality.rounded_cells += 1;
                    }
                    magnitude.round() as u64
                }
                CellValue::NonNumeric => {
                    quality.non_numeric_cells += 1;
                    0
                }
                CellValue::Empty => {
                    quality.missing_cells += 1;
                    0
                }
            };
            row.push(count);
        }
        counts.push(row);
    }

    let total: u64 = counts.iter().flatten().sum();
    if total == 0 {
        return Err(QcError::data("All observation values are zero"));
    }
    if rows.len() < opts.min_neurons {
        return Err(QcError::data(format!(
            "need at least {} neuron rows, found {}",
            opts.min_neurons,
            rows.len()
        )));
    }

    record_warnings(&mut quality, opts);

    let neurons = rows
        .iter()
        .map(|&i| label_or(&table.neurons, i, "row"))
        .collect();
    let categories = cols
        .iter()
        .map(|&j| label_or(&table.categories, j, "column"))
        .collect();
    let matrix = ObservationMatrix::new(neurons, categories, counts)?;

    debug!(
        neurons = matrix.neurons().len(),
        categories = matrix.categories().len(),
        dropped_rows = quality.dropped_rows,
        dropped_columns = quality.dropped_columns,
        "Sheet cleaned"
    );

    Ok(CleanedSheet { matrix, quality })
}

fn record_warnings(quality: &mut DataQuality, opts: &TransformOptions) {
    let fraction = quality.non_numeric_fraction();
    if fraction > opts.non_numeric_severe_fraction {
        quality.warnings.push(format!(
            "severe: {:.1}% of cells are non-numeric and were counted as zero",
            fraction * 100.0
        ));
    } else if fraction > opts.non_numeric_warn_fraction {
        quality.warnings.push(format!(
            "{:.1}% of cells are non-numeric and were counted as zero",
            fraction * 100.0
        ));
    }
    if quality.sign_corrected_cells > 0 {
        quality.warnings.push(format!(
            "{} negative values were replaced by their absolute value",
            quality.sign_corrected_cells
        ));
    }
    if quality.rounded_cells > 0 {
        quality.warnings.push(format!(
            "{} fractional values were rounded to whole counts",
            quality.rounded_cells
        ));
    }
    if quality.dropped_rows > 0 || quality.dropped_columns > 0 {
        quality.warnings.push(format!(
            "dropped {} empty rows and {} empty columns",
            quality.dropped_rows, quality.dropped_columns
        ));
    }
}

/// Trimmed label at `idx`, or a positional name when blank or absent.
fn label_or(labels: &[String], idx: usize, kind: &str) -> String {
    match labels.get(idx).map(|s| s.trim()) {
        Some(label) if !label.is_empty() => label.to_string(),
        _ => format!("{kind}{}", idx + 1),
    }
}
