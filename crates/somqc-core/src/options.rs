//! Sheet transform options.

use crate::constants::{
    DEFAULT_MIN_NEURONS, MAX_CELL_MAGNITUDE, MIN_CATEGORIES, NON_NUMERIC_SEVERE_FRACTION,
    NON_NUMERIC_WARN_FRACTION,
};

/// Options controlling how raw sheets are validated and cleaned.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformOptions {
    /// Minimum number of neuron rows after cleaning.
    pub min_neurons: usize,
    /// Minimum number of category columns after cleaning.
    pub min_categories: usize,
    /// Largest accepted absolute cell value.
    pub max_cell_magnitude: f64,
    /// Fraction of non-numeric cells that triggers a warning.
    pub non_numeric_warn_fraction: f64,
    /// Fraction of non-numeric cells that makes the warning severe.
    pub non_numeric_severe_fraction: f64,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            min_neurons: DEFAULT_MIN_NEURONS,
            min_categories: MIN_CATEGORIES,
            max_cell_magnitude: MAX_CELL_MAGNITUDE,
            non_numeric_warn_fraction: NON_NUMERIC_WARN_FRACTION,
            non_numeric_severe_fraction: NON_NUMERIC_SEVERE_FRACTION,
        }
    }
}

impl TransformOptions {
    /// Normalize options, restoring defaults for out-of-range values.
    ///
    /// A confusion matrix needs at least two neurons and two categories, so
    /// smaller minimums are raised.
    #[must_use]
    pub fn normalize(mut self) -> Self {
        if self.min_neurons < 2 {
            self.min_neurons = 2;
        }
        if self.min_categories < MIN_CATEGORIES {
            self.min_categories = MIN_CATEGORIES;
        }
        if !(self.max_cell_magnitude.is_finite() && self.max_cell_magnitude > 0.0) {
            self.max_cell_magnitude = MAX_CELL_MAGNITUDE;
        }
        if !(0.0..=1.0).contains(&self.non_numeric_warn_fraction) {
            self.non_numeric_warn_fraction = NON_NUMERIC_WARN_FRACTION;
        }
        if !(0.0..=1.0).contains(&self.non_numeric_severe_fraction)
            || self.non_numeric_severe_fraction < self.non_numeric_warn_fraction
        {
            self.non_numeric_severe_fraction = NON_NUMERIC_SEVERE_FRACTION;
        }
        self
    }

    /// Builder-style override for the minimum neuron count.
    #[must_use]
    pub fn with_min_neurons(mut self, min_neurons: usize) -> Self {
        self.min_neurons = min_neurons;
        self
    }
}
