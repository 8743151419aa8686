//! Quality grading of sheet results.
//!
//! Two independent scores are produced from the same [`SheetResult`]:
//!
//! - a letter grade from a 15-point rubric (significance, association,
//!   accuracy, expected-frequency validity), and
//! - an advisory overall-quality descriptor from a 100-point rubric that also
//!   weighs matrix density and row/column balance.
//!
//! Neither is derived from the other. Both are pure functions of the result.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::GRADE_MAX_POINTS;
use crate::result::SheetResult;

/// Letter grade, A (best) to F.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Letter {
    A,
    B,
    C,
    D,
    F,
}

impl Letter {
    /// Bucket a 0-100 percentage.
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            Self::A
        } else if score >= 80.0 {
            Self::B
        } else if score >= 70.0 {
            Self::C
        } else if score >= 60.0 {
            Self::D
        } else {
            Self::F
        }
    }

    /// Single-character form.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
            Self::F => "F",
        }
    }
}

impl fmt::Display for Letter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rubric criteria.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Criterion {
    Significance,
    Association,
    Accuracy,
    ExpectedFrequency,
    Density,
    Balance,
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Significance => "significance",
            Self::Association => "association strength",
            Self::Accuracy => "accuracy",
            Self::ExpectedFrequency => "expected-frequency validity",
            Self::Density => "matrix density",
            Self::Balance => "row/column balance",
        };
        f.write_str(name)
    }
}

/// Points awarded for one criterion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeFactor {
    /// Criterion scored.
    pub criterion: Criterion,
    /// Points awarded.
    pub points: f64,
    /// Maximum attainable points.
    pub max_points: f64,
    /// Why these points were awarded.
    pub rationale: String,
}

/// Letter grade with its explanation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QcGrade {
    /// Letter grade.
    pub letter: Letter,
    /// Rubric score as a percentage in [0, 100].
    pub score: f64,
    /// Rubric points awarded.
    pub points: f64,
    /// Rubric points attainable.
    pub max_points: f64,
    /// Per-criterion breakdown, in rubric order. Empty on the fast-fail path.
    pub factors: Vec<GradeFactor>,
    /// Reason for an immediate F when the input was unusable.
    pub diagnostic: Option<String>,
}

impl QcGrade {
    /// Grade F with a diagnostic, without running the rubric.
    #[must_use]
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            letter: Letter::F,
            score: 0.0,
            points: 0.0,
            max_points: GRADE_MAX_POINTS,
            factors: Vec::new(),
            diagnostic: Some(reason.into()),
        }
    }
}

/// Advisory overall-quality descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum QualityDescriptor {
    Excellent,
    Good,
    Fair,
    Poor,
    VeryPoor,
}

impl QualityDescriptor {
    /// Bucket a 0-100 score.
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score >= 85.0 {
            Self::Excellent
        } else if score >= 70.0 {
            Self::Good
        } else if score >= 50.0 {
            Self::Fair
        } else if score >= 30.0 {
            Self::Poor
        } else {
            Self::VeryPoor
        }
    }
}

impl fmt::Display for QualityDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Excellent => "Excellent",
            Self::Good => "Good",
            Self::Fair => "Fair",
            Self::Poor => "Poor",
            Self::VeryPoor => "Very Poor",
        };
        f.write_str(name)
    }
}

/// Overall quality on the 100-point rubric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverallQuality {
    /// Descriptor bucket.
    pub descriptor: QualityDescriptor,
    /// Score in [0, 100].
    pub score: f64,
    /// Per-criterion breakdown.
    pub factors: Vec<GradeFactor>,
}

/// A sheet result with both of its grades.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradedSheet {
    pub result: SheetResult,
    pub grade: QcGrade,
    pub quality: OverallQuality,
}

impl GradedSheet {
    /// Sheet identifier.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.result.sheet_name
    }
}

/// Deterministic grader; stateless.
#[derive(Debug, Clone, Copy, Default)]
pub struct QualityGrader;

impl QualityGrader {
    /// Create a grader.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Compute both grades and bundle them with the result.
    #[must_use]
    pub fn assess(&self, result: SheetResult) -> GradedSheet {
        let grade = self.grade(&result);
        let quality = self.overall_quality(&result);
        GradedSheet {
            result,
            grade,
            quality,
        }
    }

    /// Letter grade on the 15-point rubric. Never fails: unusable input is an F
    /// with a diagnostic.
    #[must_use]
    pub fn grade(&self, result: &SheetResult) -> QcGrade {
        if let Some(reason) = degenerate_reason(result) {
            return QcGrade::failed(reason);
        }

        let factors = vec![
            significance_points(result.p_value),
            association_points(result.association_strength),
            accuracy_points(result.accuracy),
            expected_frequency_points(result),
        ];
        let points: f64 = factors.iter().map(|f| f.points).sum();
        let score = (points / GRADE_MAX_POINTS * 100.0).clamp(0.0, 100.0);

        QcGrade {
            letter: Letter::from_score(score),
            score,
            points,
            max_points: GRADE_MAX_POINTS,
            factors,
            diagnostic: None,
        }
    }

    /// Advisory descriptor on the 100-point rubric.
    #[must_use]
    pub fn overall_quality(&self, result: &SheetResult) -> OverallQuality {
        let factors = vec![
            broad_significance(result.p_value),
            broad_association(result.association_strength),
            broad_accuracy(result.accuracy),
            broad_density(result.balance.density),
            broad_balance(result.balance.row_cv, result.balance.column_cv),
        ];
        let score = factors
            .iter()
            .map(|f| f.points)
            .sum::<f64>()
            .clamp(0.0, 100.0);
        OverallQuality {
            descriptor: QualityDescriptor::from_score(score),
            score,
            factors,
        }
    }
}

fn degenerate_reason(result: &SheetResult) -> Option<String> {
    let (rows, cols) = result.confusion_matrix.dims();
    if rows < 2 || cols < 2 {
        return Some(format!(
            "confusion matrix is {rows}x{cols}; at least 2x2 is required"
        ));
    }
    if result.total_neurons < 2 {
        return Some(format!(
            "only {} neuron(s); at least 2 are required",
            result.total_neurons
        ));
    }
    if result.total_observations == 0 {
        return Some("no observations".to_string());
    }
    if result.significance.is_none() {
        return Some("significance test could not be computed".to_string());
    }
    let bounded = |v: f64, hi: f64| v.is_finite() && (0.0..=hi).contains(&v);
    if !bounded(result.p_value, 1.0)
        || !bounded(result.association_strength, 1.0)
        || !bounded(result.accuracy, 100.0)
    {
        return Some("statistics are out of range".to_string());
    }
    None
}

fn factor(criterion: Criterion, points: f64, max_points: f64, rationale: String) -> GradeFactor {
    GradeFactor {
        criterion,
        points,
        max_points,
        rationale,
    }
}

fn significance_points(p: f64) -> GradeFactor {
    let points = if p < 0.001 {
        5.0
    } else if p < 0.01 {
        4.0
    } else if p < 0.05 {
        3.0
    } else if p < 0.1 {
        2.0
    } else if p < 0.2 {
        1.0
    } else {
        0.0
    };
    factor(Criterion::Significance, points, 5.0, format!("p-value {p:.4}"))
}

fn association_points(v: f64) -> GradeFactor {
    let points = if v >= 0.7 {
        5.0
    } else if v >= 0.5 {
        4.0
    } else if v >= 0.3 {
        3.0
    } else if v >= 0.1 {
        2.0
    } else if v > 0.0 {
        1.0
    } else {
        0.0
    };
    factor(Criterion::Association, points, 5.0, format!("Cramer's V {v:.3}"))
}

fn accuracy_points(acc: f64) -> GradeFactor {
    let points = if acc >= 90.0 {
        3.0
    } else if acc >= 80.0 {
        2.5
    } else if acc >= 70.0 {
        2.0
    } else if acc >= 60.0 {
        1.5
    } else if acc >= 50.0 {
        1.0
    } else {
        0.0
    };
    factor(Criterion::Accuracy, points, 3.0, format!("accuracy {acc:.1}%"))
}

fn expected_frequency_points(result: &SheetResult) -> GradeFactor {
    let low = result
        .significance
        .as_ref()
        .map_or(1.0, |s| s.low_expected_fraction);
    let (points, rationale) = if result.expected_frequency_valid() {
        (2.0, format!("{:.0}% of expected counts below 5", low * 100.0))
    } else {
        (
            0.0,
            format!("{:.0}% of expected counts below 5 (limit 20%)", low * 100.0),
        )
    };
    factor(Criterion::ExpectedFrequency, points, 2.0, rationale)
}

fn broad_significance(p: f64) -> GradeFactor {
    let points = if p < 0.001 {
        25.0
    } else if p < 0.01 {
        20.0
    } else if p < 0.05 {
        15.0
    } else if p < 0.1 {
        8.0
    } else {
        0.0
    };
    factor(Criterion::Significance, points, 25.0, format!("p-value {p:.4}"))
}

fn broad_association(v: f64) -> GradeFactor {
    let points = if v >= 0.5 {
        25.0
    } else if v >= 0.3 {
        18.0
    } else if v >= 0.1 {
        10.0
    } else if v > 0.0 {
        4.0
    } else {
        0.0
    };
    factor(Criterion::Association, points, 25.0, format!("Cramer's V {v:.3}"))
}

fn broad_accuracy(acc: f64) -> GradeFactor {
    let points = if acc >= 90.0 {
        20.0
    } else if acc >= 80.0 {
        16.0
    } else if acc >= 70.0 {
        12.0
    } else if acc >= 60.0 {
        8.0
    } else if acc >= 50.0 {
        4.0
    } else {
        0.0
    };
    factor(Criterion::Accuracy, points, 20.0, format!("accuracy {acc:.1}%"))
}

fn broad_density(density: f64) -> GradeFactor {
    let points = if density >= 0.5 {
        15.0
    } else if density >= 0.3 {
        10.0
    } else if density >= 0.1 {
        5.0
    } else {
        0.0
    };
    factor(
        Criterion::Density,
        points,
        15.0,
        format!("{:.0}% of cells non-zero", density * 100.0),
    )
}

fn broad_balance(row_cv: f64, column_cv: f64) -> GradeFactor {
    let worst = row_cv.max(column_cv);
    let points = if worst <= 0.5 {
        15.0
    } else if worst <= 1.0 {
        10.0
    } else if worst <= 2.0 {
        5.0
    } else {
        0.0
    };
    factor(
        Criterion::Balance,
        points,
        15.0,
        format!("CV rows {row_cv:.2}, columns {column_cv:.2}"),
    )
}
