//! Raw, unvalidated sheet tables as delivered by a data source.

use serde::{Deserialize, Serialize};

/// A single cell as read from a spreadsheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawCell {
    /// A numeric value.
    Number(f64),
    /// Free text; coerced to a number when it parses as one.
    Text(String),
    /// An empty cell.
    Missing,
}

/// Numeric interpretation of a [`RawCell`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CellValue {
    /// The cell holds a number.
    Value(f64),
    /// The cell holds text that is not a number.
    NonNumeric,
    /// The cell is empty.
    Empty,
}

impl RawCell {
    /// Build a cell from spreadsheet text: blank is missing, numeric text is a number.
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Self::Missing;
        }
        match trimmed.parse::<f64>() {
            Ok(v) => Self::Number(v),
            Err(_) => Self::Text(trimmed.to_string()),
        }
    }

    /// Interpret the cell numerically.
    #[must_use]
    pub fn value(&self) -> CellValue {
        match self {
            Self::Number(v) if v.is_nan() => CellValue::NonNumeric,
            Self::Number(v) => CellValue::Value(*v),
            Self::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    CellValue::Empty
                } else {
                    match trimmed.parse::<f64>() {
                        Ok(v) if !v.is_nan() => CellValue::Value(v),
                        _ => CellValue::NonNumeric,
                    }
                }
            }
            Self::Missing => CellValue::Empty,
        }
    }

    /// Whether the cell carries no content at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self.value(), CellValue::Empty)
    }
}

impl From<u64> for RawCell {
    #[allow(clippy::cast_precision_loss)]
    fn from(v: u64) -> Self {
        Self::Number(v as f64)
    }
}

impl From<f64> for RawCell {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<&str> for RawCell {
    fn from(s: &str) -> Self {
        Self::from_text(s)
    }
}

/// A neuron x category table before validation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawTable {
    /// Row labels (neuron identifiers).
    pub neurons: Vec<String>,
    /// Column labels (category names).
    pub categories: Vec<String>,
    /// Row-major cells; `cells[i][j]` is neuron `i`, category `j`.
    pub cells: Vec<Vec<RawCell>>,
}

impl RawTable {
    /// Create a table, padding ragged rows with [`RawCell::Missing`] and
    /// truncating rows longer than the header.
    #[must_use]
    pub fn new(neurons: Vec<String>, categories: Vec<String>, cells: Vec<Vec<RawCell>>) -> Self {
        let width = categories.len();
        let mut cells = cells;
        cells.resize_with(neurons.len(), Vec::new);
        for row in &mut cells {
            row.resize(width, RawCell::Missing);
        }
        Self {
            neurons,
            categories,
            cells,
        }
    }

    /// Create a table from integer counts with generated labels `N1..` and `C1..`.
    #[must_use]
    pub fn from_counts(counts: &[Vec<u64>]) -> Self {
        let width = counts.iter().map(Vec::len).max().unwrap_or(0);
        let neurons = (1..=counts.len()).map(|i| format!("N{i}")).collect();
        let categories = (1..=width).map(|j| format!("C{j}")).collect();
        let cells = counts
            .iter()
            .map(|row| row.iter().map(|&v| RawCell::from(v)).collect())
            .collect();
        Self::new(neurons, categories, cells)
    }

    /// Number of neuron rows.
    #[must_use]
    pub fn height(&self) -> usize {
        self.neurons.len()
    }

    /// Number of category columns.
    #[must_use]
    pub fn width(&self) -> usize {
        self.categories.len()
    }

    /// Get a cell, treating out-of-range positions as missing.
    #[must_use]
    pub fn cell(&self, row: usize, col: usize) -> &RawCell {
        static MISSING: RawCell = RawCell::Missing;
        self.cells
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&MISSING)
    }
}
