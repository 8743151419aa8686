//! Observation and confusion matrices.
//!
//! An [`ObservationMatrix`] holds the validated neuron x category counts of one
//! sheet. Every neuron is assigned the category with its largest count (its
//! winner) and its whole count distribution is then booked under that
//! predicted category, which collapses the sheet into a [`ConfusionMatrix`].

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::QcError;

/// Validated neuron x category count table.
///
/// Invariants: at least two neurons and two categories, unique labels on both
/// axes, rectangular counts, and a positive total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationMatrix {
    neurons: Vec<String>,
    categories: Vec<String>,
    counts: Vec<Vec<u64>>,
}

impl ObservationMatrix {
    /// Create a validated observation matrix.
    pub fn new(
        neurons: Vec<String>,
        categories: Vec<String>,
        counts: Vec<Vec<u64>>,
    ) -> Result<Self, QcError> {
        if neurons.len() < 2 {
            return Err(QcError::data(format!(
                "need at least 2 neurons, found {}",
                neurons.len()
            )));
        }
        if categories.len() < 2 {
            return Err(QcError::data(format!(
                "need at least 2 categories, found {}",
                categories.len()
            )));
        }
        if counts.len() != neurons.len() {
            return Err(QcError::data(format!(
                "{} neuron labels but {} count rows",
                neurons.len(),
                counts.len()
            )));
        }
        if let Some((i, row)) = counts
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != categories.len())
        {
            return Err(QcError::data(format!(
                "row '{}' has {} values, expected {}",
                neurons[i],
                row.len(),
                categories.len()
            )));
        }
        check_unique("neuron", &neurons)?;
        check_unique("category", &categories)?;

        let matrix = Self {
            neurons,
            categories,
            counts,
        };
        if matrix.total() == 0 {
            return Err(QcError::data("All observation values are zero"));
        }
        Ok(matrix)
    }

    /// Neuron identifiers in row order.
    #[must_use]
    pub fn neurons(&self) -> &[String] {
        &self.neurons
    }

    /// Category labels in declared column order.
    #[must_use]
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Row-major counts.
    #[must_use]
    pub fn counts(&self) -> &[Vec<u64>] {
        &self.counts
    }

    /// Total number of observations.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.counts.iter().map(|row| row.iter().sum::<u64>()).sum()
    }

    /// Observation count of each neuron.
    #[must_use]
    pub fn row_totals(&self) -> Vec<u64> {
        self.counts.iter().map(|row| row.iter().sum()).collect()
    }

    /// Observation count of each category.
    #[must_use]
    pub fn column_totals(&self) -> Vec<u64> {
        let mut totals = vec![0u64; self.categories.len()];
        for row in &self.counts {
            for (t, &v) in totals.iter_mut().zip(row) {
                *t += v;
            }
        }
        totals
    }

    /// Winning category index per neuron, `None` for neurons with no observations.
    ///
    /// Ties go to the first category in declared column order.
    #[must_use]
    pub fn winner_indices(&self) -> Vec<Option<usize>> {
        self.counts.iter().map(|row| winner_of(row)).collect()
    }

    /// Neuron -> winning category mapping; inactive neurons are left out.
    #[must_use]
    pub fn winners(&self) -> Vec<NeuronWinner> {
        self.winner_indices()
            .into_iter()
            .zip(&self.neurons)
            .filter_map(|(w, neuron)| {
                w.map(|j| NeuronWinner {
                    neuron: neuron.clone(),
                    category: self.categories[j].clone(),
                })
            })
            .collect()
    }

    /// Number of neurons with at least one observation.
    #[must_use]
    pub fn active_neurons(&self) -> usize {
        self.counts
            .iter()
            .filter(|row| row.iter().any(|&v| v > 0))
            .count()
    }

    /// Fraction of non-zero cells.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn density(&self) -> f64 {
        let cells = self.neurons.len() * self.categories.len();
        let nonzero = self.counts.iter().flatten().filter(|&&v| v > 0).count();
        nonzero as f64 / cells as f64
    }
}

fn check_unique(axis: &str, labels: &[String]) -> Result<(), QcError> {
    let mut seen = HashSet::with_capacity(labels.len());
    for label in labels {
        if !seen.insert(label.as_str()) {
            return Err(QcError::data(format!("duplicate {axis} label '{label}'")));
        }
    }
    Ok(())
}

/// Index of the maximum count, first occurrence wins; `None` when the row is all zero.
fn winner_of(row: &[u64]) -> Option<usize> {
    let mut best: Option<(usize, u64)> = None;
    for (j, &v) in row.iter().enumerate() {
        if best.map_or(true, |(_, max)| v > max) {
            best = Some((j, v));
        }
    }
    best.filter(|&(_, max)| max > 0).map(|(j, _)| j)
}

/// A neuron and the category it predicts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeuronWinner {
    /// Neuron identifier.
    pub neuron: String,
    /// Winning category label.
    pub category: String,
}

/// Predicted-category x actual-category count table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    predicted: Vec<String>,
    actual: Vec<String>,
    cells: Vec<Vec<u64>>,
}

impl ConfusionMatrix {
    /// Collapse an observation matrix by winner-take-all per neuron.
    ///
    /// For every active neuron, each category count of its row is added to
    /// `[winner, category]`, so one neuron can feed several actual
    /// categories, always under its single predicted category.
    #[must_use]
    pub fn from_observations(obs: &ObservationMatrix) -> Self {
        let k = obs.categories.len();
        let mut cells = vec![vec![0u64; k]; k];
        for (row, winner) in obs.counts.iter().zip(obs.winner_indices()) {
            let Some(w) = winner else { continue };
            for (cell, &v) in cells[w].iter_mut().zip(row) {
                *cell += v;
            }
        }
        Self {
            predicted: obs.categories.clone(),
            actual: obs.categories.clone(),
            cells,
        }
    }

    /// Create a confusion matrix from explicit labels and cells.
    pub fn from_parts(
        predicted: Vec<String>,
        actual: Vec<String>,
        cells: Vec<Vec<u64>>,
    ) -> Result<Self, QcError> {
        if cells.len() != predicted.len() || cells.iter().any(|r| r.len() != actual.len()) {
            return Err(QcError::data("confusion matrix shape does not match its labels"));
        }
        Ok(Self {
            predicted,
            actual,
            cells,
        })
    }

    /// Predicted-category labels (rows).
    #[must_use]
    pub fn predicted(&self) -> &[String] {
        &self.predicted
    }

    /// Actual-category labels (columns).
    #[must_use]
    pub fn actual(&self) -> &[String] {
        &self.actual
    }

    /// Row-major cells.
    #[must_use]
    pub fn cells(&self) -> &[Vec<u64>] {
        &self.cells
    }

    /// Cell at `[predicted, actual]`.
    #[must_use]
    pub fn get(&self, predicted: usize, actual: usize) -> u64 {
        self.cells
            .get(predicted)
            .and_then(|r| r.get(actual))
            .copied()
            .unwrap_or(0)
    }

    /// `(rows, columns)`.
    #[must_use]
    pub fn dims(&self) -> (usize, usize) {
        (self.predicted.len(), self.actual.len())
    }

    /// Sum of all cells.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.cells.iter().flatten().sum()
    }

    /// Sum of the (partial, when rectangular) main diagonal.
    #[must_use]
    pub fn diagonal(&self) -> u64 {
        let (r, c) = self.dims();
        (0..r.min(c)).map(|i| self.cells[i][i]).sum()
    }

    /// Per predicted category totals.
    #[must_use]
    pub fn row_totals(&self) -> Vec<u64> {
        self.cells.iter().map(|r| r.iter().sum()).collect()
    }

    /// Per actual category totals.
    #[must_use]
    pub fn column_totals(&self) -> Vec<u64> {
        let mut totals = vec![0u64; self.actual.len()];
        for row in &self.cells {
            for (t, &v) in totals.iter_mut().zip(row) {
                *t += v;
            }
        }
        totals
    }

    /// Diagonal mass as a percentage of `total_observations`, in [0, 100].
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn accuracy(&self, total_observations: u64) -> f64 {
        if total_observations == 0 {
            return 0.0;
        }
        (self.diagonal() as f64 / total_observations as f64 * 100.0).clamp(0.0, 100.0)
    }
}
