//! Application configuration from CLI flags and environment.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use somqc_cli::export::ExportFormat;
use somqc_core::constants::{DEFAULT_MIN_NEURONS, SHUTDOWN_TIMEOUT};
use somqc_core::options::TransformOptions;

/// somqc: quality control for SOM neuron-by-category sheets.
#[derive(Parser, Debug)]
#[command(name = "somqc", version, about)]
#[allow(clippy::struct_excessive_bools)]
pub struct AppConfig {
    /// Workbook to analyse: a JSON workbook, a CSV/TSV file, or a directory of them.
    #[arg(env = "SOMQC_INPUT", required_unless_present = "completion")]
    pub input: Option<PathBuf>,

    /// Analyse only these sheets (repeatable). Defaults to every sheet.
    #[arg(short, long = "sheet", value_name = "NAME")]
    pub sheets: Vec<String>,

    /// Minimum neuron rows a sheet must keep after cleaning.
    #[arg(long, default_value_t = DEFAULT_MIN_NEURONS, env = "SOMQC_MIN_NEURONS")]
    pub min_neurons: usize,

    /// Report format.
    #[arg(short, long, value_enum, default_value_t = ExportFormat::Text)]
    pub format: ExportFormat,

    /// Write the report to a file instead of stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// How long to wait for workers on exit (e.g., "30s", "2m", "500ms").
    #[arg(long, default_value = "30s", value_parser = parse_duration)]
    pub shutdown_timeout: Duration,

    /// Verbose output.
    #[arg(short, long)]
    pub verbose: bool,

    /// Show rubric breakdown, confusion matrix and per-category statistics.
    #[arg(short, long)]
    pub details: bool,

    /// Quiet mode (one line per sheet, no progress bar).
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate shell completion.
    #[arg(long, value_enum)]
    pub completion: Option<clap_complete::Shell>,
}

impl AppConfig {
    /// Parse CLI arguments.
    #[must_use]
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    /// Transform options derived from the flags.
    #[must_use]
    pub fn transform_options(&self) -> TransformOptions {
        TransformOptions::default()
            .with_min_neurons(self.min_neurons)
            .normalize()
    }
}

/// Parse a duration string like "5m", "1h", "30s", "500ms" or plain seconds.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    let number = |digits: &str| -> Result<u64, String> {
        digits
            .trim()
            .parse()
            .map_err(|_| format!("invalid duration '{s}'"))
    };
    if let Some(ms) = s.strip_suffix("ms") {
        Ok(Duration::from_millis(number(ms)?))
    } else if let Some(mins) = s.strip_suffix('m') {
        Ok(Duration::from_secs(number(mins)? * 60))
    } else if let Some(hours) = s.strip_suffix('h') {
        Ok(Duration::from_secs(number(hours)? * 3600))
    } else if let Some(secs) = s.strip_suffix('s') {
        Ok(Duration::from_secs(number(secs)?))
    } else {
        Ok(Duration::from_secs(number(s)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_formats() {
        assert_eq!(parse_duration("5m"), Ok(Duration::from_secs(300)));
        assert_eq!(parse_duration("1h"), Ok(Duration::from_secs(3600)));
        assert_eq!(parse_duration("30s"), Ok(Duration::from_secs(30)));
        assert_eq!(parse_duration("500ms"), Ok(Duration::from_millis(500)));
        assert_eq!(parse_duration("60"), Ok(Duration::from_secs(60)));
        assert!(parse_duration("abc").is_err());
        assert!(parse_duration("ms").is_err());
    }

    #[test]
    fn defaults() {
        let config = AppConfig::try_parse_from(["somqc", "book.json"]).unwrap();
        assert_eq!(config.input, Some(PathBuf::from("book.json")));
        assert!(config.sheets.is_empty());
        assert_eq!(config.min_neurons, DEFAULT_MIN_NEURONS);
        assert_eq!(config.format, ExportFormat::Text);
        assert_eq!(config.shutdown_timeout, SHUTDOWN_TIMEOUT);
        assert!(!config.verbose && !config.quiet && !config.details);
    }

    #[test]
    fn flags() {
        let config = AppConfig::try_parse_from([
            "somqc",
            "dir",
            "--sheet",
            "S1",
            "-s",
            "S2",
            "--min-neurons",
            "3",
            "--format",
            "csv",
            "--shutdown-timeout",
            "2m",
            "-q",
        ])
        .unwrap();
        assert_eq!(config.sheets, vec!["S1", "S2"]);
        assert_eq!(config.transform_options().min_neurons, 3);
        assert_eq!(config.format, ExportFormat::Csv);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(120));
        assert!(config.quiet);
    }

    #[test]
    fn completion_needs_no_input() {
        let config = AppConfig::try_parse_from(["somqc", "--completion", "bash"]).unwrap();
        assert!(config.input.is_none());
        assert!(config.completion.is_some());
    }

    #[test]
    fn bad_duration_is_rejected() {
        assert!(AppConfig::try_parse_from(["somqc", "x", "--shutdown-timeout", "soon"]).is_err());
    }
}
