//! Per-sheet analysis results.

use serde::{Deserialize, Serialize};

use crate::clean::DataQuality;
use crate::matrix::{ConfusionMatrix, NeuronWinner};
use crate::stats::{MatrixBalance, SignificanceTest};

/// Statistics of one sheet, created once by the sheet transform and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetResult {
    /// Sheet identifier.
    pub sheet_name: String,
    /// Sum of all observation counts.
    pub total_observations: u64,
    /// Number of neurons after cleaning.
    pub total_neurons: usize,
    /// Neurons with at least one observation.
    pub active_neurons: usize,
    /// Diagonal mass of the confusion matrix, percent in [0, 100].
    pub accuracy: f64,
    /// Cramer's V in [0, 1]; 0 when the significance test degenerated.
    pub association_strength: f64,
    /// Neurons without observations, percent in [0, 100].
    pub inactive_ratio: f64,
    /// p-value of the significance test; 1.0 when the test degenerated.
    pub p_value: f64,
    /// Full significance test, `None` when it could not be computed.
    pub significance: Option<SignificanceTest>,
    /// Density and balance diagnostics of the observation matrix.
    pub balance: MatrixBalance,
    /// Predicted x actual category counts.
    pub confusion_matrix: ConfusionMatrix,
    /// Winning category of each active neuron.
    pub neuron_winners: Vec<NeuronWinner>,
    /// Per-category recall and precision.
    pub category_stats: Vec<CategoryStats>,
    /// What cleaning changed.
    pub data_quality: DataQuality,
    /// Data-quality and statistical warnings.
    pub warnings: Vec<String>,
    /// Analysis timestamp.
    pub timestamp: String,
}

impl SheetResult {
    /// Whether the chi-square expected-frequency assumption holds.
    #[must_use]
    pub fn expected_frequency_valid(&self) -> bool {
        self.significance
            .as_ref()
            .is_some_and(|s| s.expected_frequency_valid)
    }

    /// Number of neurons without observations.
    #[must_use]
    pub fn inactive_neurons(&self) -> usize {
        self.total_neurons - self.active_neurons
    }
}

/// Classification statistics of one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryStats {
    /// Category label.
    pub category: String,
    /// Observations whose actual category is this one.
    pub observations: u64,
    /// Observations predicted as this category.
    pub predicted: u64,
    /// Observations both actual and predicted as this category.
    pub correct: u64,
    /// `correct / observations`, percent.
    pub recall: f64,
    /// `correct / predicted`, percent.
    pub precision: f64,
}

impl CategoryStats {
    /// Per-category statistics of a square confusion matrix.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_confusion(cm: &ConfusionMatrix) -> Vec<Self> {
        let predicted = cm.row_totals();
        let actual = cm.column_totals();
        let pct = |num: u64, den: u64| {
            if den == 0 {
                0.0
            } else {
                num as f64 / den as f64 * 100.0
            }
        };
        cm.actual()
            .iter()
            .enumerate()
            .map(|(j, label)| {
                let correct = if j < predicted.len() { cm.get(j, j) } else { 0 };
                let predicted = predicted.get(j).copied().unwrap_or(0);
                Self {
                    category: label.clone(),
                    observations: actual[j],
                    predicted,
                    correct,
                    recall: pct(correct, actual[j]),
                    precision: pct(correct, predicted),
                }
            })
            .collect()
    }
}

/// Current timestamp as seconds since the Unix epoch.
#[must_use]
pub fn current_timestamp() -> String {
    let dur = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    format!("unix:{}", dur.as_secs())
}
