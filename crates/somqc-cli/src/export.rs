//! Report rendering in text, CSV and JSON.

use std::fmt::Write as _;

use clap::ValueEnum;

use somqc_core::report::ReportRow;

use crate::output::{format_p_value, format_percent};

/// Errors raised while rendering a report.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("formatting failed: {0}")]
    Format(#[from] std::fmt::Error),
}

/// Output format of the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ExportFormat {
    /// Aligned plain-text table.
    #[default]
    Text,
    /// Comma-separated values with a header row.
    Csv,
    /// Pretty-printed JSON array.
    Json,
}

/// Render report rows in the requested format.
pub fn render(rows: &[ReportRow], format: ExportFormat) -> Result<String, ExportError> {
    match format {
        ExportFormat::Text => render_text(rows),
        ExportFormat::Csv => render_csv(rows),
        ExportFormat::Json => Ok(serde_json::to_string_pretty(rows)? + "\n"),
    }
}

fn render_csv(rows: &[ReportRow]) -> Result<String, ExportError> {
    let mut out = ReportRow::headers().join(",");
    out.push('\n');
    for row in rows {
        let fields = [
            row.rank.map(|r| r.to_string()).unwrap_or_default(),
            csv_escape(&row.sheet_name),
            row.grade.clone(),
            format!("{:.1}", row.grade_score),
            csv_escape(&row.overall_quality),
            format!("{:.2}", row.accuracy),
            format!("{:.4}", row.association_strength),
            format!("{:.6}", row.p_value),
            format!("{:.2}", row.inactive_ratio),
            row.sample_size.to_string(),
            row.neurons.to_string(),
            csv_escape(&row.warnings),
        ];
        writeln!(out, "{}", fields.join(","))?;
    }
    Ok(out)
}

/// Quote a field when it contains a delimiter, quote or line break.
fn csv_escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn render_text(rows: &[ReportRow]) -> Result<String, ExportError> {
    let name_width = rows
        .iter()
        .map(|r| r.sheet_name.chars().count())
        .max()
        .unwrap_or(0)
        .max("Sheet".len());

    let mut out = String::new();
    writeln!(
        out,
        "{:>4}  {:<name_width$}  {:>5}  {:>9}  {:>9}  {:>7}  {:>8}  {:>8}  {:<10}",
        "Rank", "Sheet", "Grade", "Accuracy", "Cramer V", "p", "Inactive", "N", "Quality"
    )?;
    writeln!(out, "{:-<1$}", "", 4 + name_width + 5 + 9 + 9 + 7 + 8 + 8 + 10 + 16)?;
    for row in rows {
        writeln!(
            out,
            "{:>4}  {:<name_width$}  {:>5}  {:>9}  {:>9.3}  {:>7}  {:>8}  {:>8}  {:<10}",
            row.rank.map(|r| r.to_string()).unwrap_or_else(|| "-".into()),
            row.sheet_name,
            row.grade,
            format_percent(row.accuracy),
            row.association_strength,
            format_p_value(row.p_value),
            format_percent(row.inactive_ratio),
            row.sample_size,
            row.overall_quality,
        )?;
    }

    let warned: Vec<&ReportRow> = rows.iter().filter(|r| !r.warnings.is_empty()).collect();
    if !warned.is_empty() {
        writeln!(out, "\nWarnings:")?;
        for row in warned {
            writeln!(out, "  {}: {}", row.sheet_name, row.warnings)?;
        }
    }
    Ok(out)
}
