//! CLI result presenter.

use somqc_core::grade::GradedSheet;
use somqc_core::rank::ComparisonSummary;
use somqc_orchestration::interfaces::{BatchOutcome, ResultPresenter};

use crate::output::{format_number, format_p_value, format_percent};
use crate::ui::{print_error, print_header, print_success, print_warning, styled_grade};

/// CLI result presenter.
pub struct CliResultPresenter {
    verbose: bool,
    quiet: bool,
}

impl CliResultPresenter {
    #[must_use]
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self { verbose, quiet }
    }
}

impl ResultPresenter for CliResultPresenter {
    fn present_sheet(&self, sheet: &GradedSheet, details: bool) {
        let r = &sheet.result;
        if self.quiet {
            println!("{}\t{}\t{:.2}", r.sheet_name, sheet.grade.letter, r.accuracy);
            return;
        }

        print_header(&r.sheet_name);
        println!(
            "Grade: {} ({:.1}%, {:.1}/{:.0} points)",
            styled_grade(sheet.grade.letter),
            sheet.grade.score,
            sheet.grade.points,
            sheet.grade.max_points
        );
        println!(
            "Overall quality: {} ({:.0}/100)",
            sheet.quality.descriptor, sheet.quality.score
        );
        println!("Accuracy: {}", format_percent(r.accuracy));
        println!("Association (Cramer's V): {:.3}", r.association_strength);
        println!("p-value: {}", format_p_value(r.p_value));
        println!(
            "Neurons: {} ({} inactive, {})",
            r.total_neurons,
            r.inactive_neurons(),
            format_percent(r.inactive_ratio)
        );
        println!("Observations: {}", format_number(r.total_observations));
        if let Some(diag) = &sheet.grade.diagnostic {
            println!("Diagnostic: {diag}");
        }

        if details || self.verbose {
            println!("Rubric:");
            for f in &sheet.grade.factors {
                println!(
                    "  {:<28} {:>4.1}/{:<3} {}",
                    f.criterion.to_string(),
                    f.points,
                    f.max_points,
                    f.rationale
                );
            }
            println!("Confusion matrix (rows predicted, columns actual):");
            let cm = &r.confusion_matrix;
            println!("  {:>12} {}", "", cm.actual().join("\t"));
            for (label, row) in cm.predicted().iter().zip(cm.cells()) {
                let cells: Vec<String> = row.iter().map(u64::to_string).collect();
                println!("  {label:>12} {}", cells.join("\t"));
            }
            for stats in &r.category_stats {
                println!(
                    "  {:<12} recall {} precision {}",
                    stats.category,
                    format_percent(stats.recall),
                    format_percent(stats.precision)
                );
            }
        }

        for warning in &r.warnings {
            print_warning(warning);
        }
        println!();
    }

    fn present_ranking(&self, summary: &ComparisonSummary) {
        if self.quiet {
            return;
        }
        print_header("Ranking by accuracy");
        for entry in &summary.entries {
            println!(
                "  {:>3}. {:<24} {:>7}  {}",
                entry.rank,
                entry.sheet.name(),
                format_percent(entry.sheet.result.accuracy),
                styled_grade(entry.sheet.grade.letter)
            );
        }
    }

    fn present_outcome(&self, outcome: &BatchOutcome) {
        if !self.quiet {
            for skipped in &outcome.skipped {
                print_warning(&format!("skipped {}: {}", skipped.sheet, skipped.reason));
            }
        }
        if outcome.cancelled || outcome.processed == 0 {
            print_error(&outcome.summary());
        } else if !self.quiet {
            print_success(&outcome.summary());
        }
    }

    fn present_error(&self, error: &str) {
        print_error(error);
    }
}
