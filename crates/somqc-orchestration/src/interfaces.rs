//! Orchestration interfaces.

use std::collections::HashMap;
use std::fmt;

use somqc_core::error::QcError;
use somqc_core::grade::GradedSheet;
use somqc_core::rank::{ComparisonSummary, ResultsMap};
use somqc_core::table::RawTable;

/// Supplies raw sheet data by name. Called from a worker thread.
pub trait SheetSource: Send + Sync {
    /// Read one sheet. Errors skip the sheet; they never abort the batch.
    fn read_sheet(&self, sheet: &str) -> Result<RawTable, QcError>;
}

impl<F> SheetSource for F
where
    F: Fn(&str) -> Result<RawTable, QcError> + Send + Sync,
{
    fn read_sheet(&self, sheet: &str) -> Result<RawTable, QcError> {
        self(sheet)
    }
}

/// Sheets held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    sheets: HashMap<String, RawTable>,
}

impl InMemorySource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a sheet.
    pub fn insert(&mut self, name: impl Into<String>, table: RawTable) {
        self.sheets.insert(name.into(), table);
    }

    /// Builder-style [`insert`](Self::insert).
    #[must_use]
    pub fn with_sheet(mut self, name: impl Into<String>, table: RawTable) -> Self {
        self.insert(name, table);
        self
    }
}

impl SheetSource for InMemorySource {
    fn read_sheet(&self, sheet: &str) -> Result<RawTable, QcError> {
        self.sheets.get(sheet).cloned().ok_or_else(|| QcError::Source {
            sheet: sheet.to_string(),
            reason: "no such sheet".into(),
        })
    }
}

/// Lifecycle of the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchPhase {
    /// No run has started yet.
    Idle,
    Running,
    Completed,
    /// Stopped early by a cancel request; the results map is partial.
    Cancelled,
    /// Every sheet was skipped, or the run hit an internal fault.
    Failed,
}

impl BatchPhase {
    /// Whether a run has ended, successfully or not.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }
}

impl fmt::Display for BatchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// A sheet that could not be analysed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedSheet {
    pub sheet: String,
    pub reason: String,
}

/// Counts of a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Sheets analysed and stored in the results map.
    pub processed: usize,
    /// Sheets that failed to load or transform, in list order.
    pub skipped: Vec<SkippedSheet>,
    /// Sheets requested.
    pub requested: usize,
    pub cancelled: bool,
}

impl BatchOutcome {
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    /// One-line summary shown to the user.
    #[must_use]
    pub fn summary(&self) -> String {
        if self.cancelled {
            format!(
                "Cancelled after {} of {} sheets",
                self.processed + self.skipped.len(),
                self.requested
            )
        } else {
            format!(
                "Processed {}, skipped {}",
                self.processed,
                self.skipped.len()
            )
        }
    }
}

/// Trait for presenting batch results to the user.
pub trait ResultPresenter: Send + Sync {
    /// Present one graded sheet.
    fn present_sheet(&self, sheet: &GradedSheet, details: bool);

    /// Present the leaderboard.
    fn present_ranking(&self, summary: &ComparisonSummary);

    /// Present the end-of-run summary.
    fn present_outcome(&self, outcome: &BatchOutcome);

    /// Present an error.
    fn present_error(&self, error: &str);

    /// Present every sheet of a results map, then the ranking when there is one.
    fn present_all(&self, results: &ResultsMap, summary: &ComparisonSummary, details: bool) {
        for sheet in results.iter() {
            self.present_sheet(sheet, details);
        }
        if !summary.is_empty() {
            self.present_ranking(summary);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closure_is_a_source() {
        let source = |name: &str| -> Result<RawTable, QcError> {
            if name == "ok" {
                Ok(RawTable::from_counts(&[vec![1, 2]]))
            } else {
                Err(QcError::data("nope"))
            }
        };
        assert!(source.read_sheet("ok").is_ok());
        assert!(source.read_sheet("bad").is_err());
    }

    #[test]
    fn in_memory_source_reports_missing_sheets() {
        let source = InMemorySource::new().with_sheet("a", RawTable::default());
        assert!(source.read_sheet("a").is_ok());
        let err = source.read_sheet("b").unwrap_err();
        assert_eq!(err.to_string(), "cannot read sheet 'b': no such sheet");
    }

    #[test]
    fn outcome_summaries() {
        let outcome = BatchOutcome {
            processed: 4,
            skipped: vec![SkippedSheet {
                sheet: "S3".into(),
                reason: "bad".into(),
            }],
            requested: 5,
            cancelled: false,
        };
        assert_eq!(outcome.summary(), "Processed 4, skipped 1");
        assert_eq!(outcome.skipped_count(), 1);

        let cancelled = BatchOutcome {
            processed: 2,
            skipped: Vec::new(),
            requested: 5,
            cancelled: true,
        };
        assert_eq!(cancelled.summary(), "Cancelled after 2 of 5 sheets");
    }

    #[test]
    fn phases() {
        assert!(!BatchPhase::Idle.is_terminal());
        assert!(!BatchPhase::Running.is_terminal());
        assert!(BatchPhase::Cancelled.is_terminal());
        assert_eq!(BatchPhase::Failed.to_string(), "failed");
    }
}
