//! Flat tabular report rows for exporters.

use serde::{Deserialize, Serialize};

use crate::grade::GradedSheet;
use crate::rank::{ComparisonSummary, ResultsMap};

/// Separator used when flattening the warning list into one field.
pub const WARNING_SEPARATOR: &str = "; ";

/// One row of the exported report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    /// 1-based leaderboard position; `None` when the row is not ranked.
    pub rank: Option<usize>,
    pub sheet_name: String,
    pub grade: String,
    pub grade_score: f64,
    pub overall_quality: String,
    pub accuracy: f64,
    pub association_strength: f64,
    pub p_value: f64,
    pub inactive_ratio: f64,
    pub sample_size: u64,
    pub neurons: usize,
    /// Warnings joined with [`WARNING_SEPARATOR`].
    pub warnings: String,
}

impl ReportRow {
    /// Flatten one graded sheet.
    #[must_use]
    pub fn from_sheet(rank: Option<usize>, sheet: &GradedSheet) -> Self {
        let r = &sheet.result;
        let mut warnings = r.warnings.clone();
        if let Some(diag) = &sheet.grade.diagnostic {
            warnings.push(format!("grade: {diag}"));
        }
        Self {
            rank,
            sheet_name: r.sheet_name.clone(),
            grade: sheet.grade.letter.to_string(),
            grade_score: sheet.grade.score,
            overall_quality: sheet.quality.descriptor.to_string(),
            accuracy: r.accuracy,
            association_strength: r.association_strength,
            p_value: r.p_value,
            inactive_ratio: r.inactive_ratio,
            sample_size: r.total_observations,
            neurons: r.total_neurons,
            warnings: warnings.join(WARNING_SEPARATOR),
        }
    }

    /// Rows of a leaderboard, in rank order.
    #[must_use]
    pub fn from_summary(summary: &ComparisonSummary) -> Vec<Self> {
        summary
            .entries
            .iter()
            .map(|e| Self::from_sheet(Some(e.rank), &e.sheet))
            .collect()
    }

    /// Unranked rows of a results map, in insertion order.
    #[must_use]
    pub fn from_results(results: &ResultsMap) -> Vec<Self> {
        results.iter().map(|s| Self::from_sheet(None, s)).collect()
    }

    /// Column names, in field order.
    #[must_use]
    pub fn headers() -> [&'static str; 12] {
        [
            "rank",
            "sheet_name",
            "grade",
            "grade_score",
            "overall_quality",
            "accuracy",
            "association_strength",
            "p_value",
            "inactive_ratio",
            "sample_size",
            "neurons",
            "warnings",
        ]
    }
}
