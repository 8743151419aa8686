//! Application entry point and dispatch.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use tracing::{debug, warn};

use somqc_cli::export::{render, ExportFormat};
use somqc_cli::output::{format_duration, write_to_file};
use somqc_cli::presenter::CliResultPresenter;
use somqc_cli::progress::StatusProgress;
use somqc_cli::ui::print_success;
use somqc_core::constants::{exit_codes, EMERGENCY_SHUTDOWN_TIMEOUT, LOG_THROTTLE_MS};
use somqc_core::error::QcError;
use somqc_core::observers::LoggingObserver;
use somqc_core::progress::CancellationToken;
use somqc_core::report::ReportRow;
use somqc_orchestration::interfaces::{BatchPhase, ResultPresenter};
use somqc_orchestration::orchestrator::{BatchOrchestrator, BatchSnapshot};

use crate::config::AppConfig;
use crate::loader::Workbook;

/// Run the application and return the process exit code.
pub fn run(config: &AppConfig) -> Result<i32> {
    if let Some(shell) = config.completion {
        let mut cmd = <AppConfig as clap::CommandFactory>::command();
        somqc_cli::completion::generate_completion(&mut cmd, shell, &mut std::io::stdout());
        return Ok(exit_codes::SUCCESS);
    }

    let input = config
        .input
        .as_deref()
        .ok_or_else(|| QcError::Config("no input workbook given".into()))?;
    let workbook = Workbook::open(input)?;
    let sheets = if config.sheets.is_empty() {
        workbook.sheet_names().to_vec()
    } else {
        config.sheets.clone()
    };
    debug!(input = %input.display(), sheets = sheets.len(), "Workbook loaded");

    let orch = BatchOrchestrator::new(config.transform_options());
    if config.verbose {
        orch.subscribe(Arc::new(LoggingObserver::new(LOG_THROTTLE_MS)));
    }
    let rx = orch.status_channel();

    let interrupted = Arc::new(AtomicBool::new(false));
    ctrlc_handler(Arc::clone(&interrupted), orch.cancellation_token());

    let started = Instant::now();
    orch.run(sheets, Arc::new(workbook))?;
    if interrupted.load(Ordering::SeqCst) {
        orch.cancel();
    }

    let progress = StatusProgress::new(config.quiet);
    let mut interrupted_at: Option<Instant> = None;
    progress.drain(&rx, || {
        if !interrupted.load(Ordering::SeqCst) {
            return false;
        }
        let since = *interrupted_at.get_or_insert_with(|| {
            orch.cancel();
            Instant::now()
        });
        since.elapsed() >= shutdown_budget(true, config)
    });

    let budget = shutdown_budget(interrupted.load(Ordering::SeqCst), config);
    if !orch.wait(budget) {
        warn!("Batch still running after {budget:?}");
    }
    let snapshot = orch.snapshot();
    report(config, &snapshot, started.elapsed())?;

    let budget = shutdown_budget(interrupted.load(Ordering::SeqCst), config);
    if !orch.shutdown(budget) {
        let err = QcError::Shutdown(format!("workers did not stop within {budget:?}"));
        warn!("{err}");
    }

    Ok(exit_code(&snapshot, interrupted.load(Ordering::SeqCst)))
}

/// Print the per-sheet results and write the report in the requested format.
fn report(config: &AppConfig, snapshot: &BatchSnapshot, elapsed: Duration) -> Result<()> {
    let machine_stdout = config.output.is_none() && config.format != ExportFormat::Text;
    let presenter = CliResultPresenter::new(config.verbose, config.quiet || machine_stdout);
    let rows = if snapshot.summary.is_empty() {
        ReportRow::from_results(&snapshot.results)
    } else {
        ReportRow::from_summary(&snapshot.summary)
    };

    if !machine_stdout {
        presenter.present_all(&snapshot.results, &snapshot.summary, config.details);
    }
    match &config.output {
        Some(path) => {
            write_to_file(path, &render(&rows, config.format)?)?;
            if !config.quiet {
                print_success(&format!("Report written to {}", path.display()));
            }
        }
        None if machine_stdout => print!("{}", render(&rows, config.format)?),
        None => {}
    }

    if let Some(outcome) = &snapshot.outcome {
        presenter.present_outcome(outcome);
    }
    if !(config.quiet || machine_stdout) {
        println!("Elapsed: {}", format_duration(elapsed));
    }
    Ok(())
}

/// Time allowed for the batch and the pool to stop; an interrupt gets the
/// shorter emergency budget.
fn shutdown_budget(interrupted: bool, config: &AppConfig) -> Duration {
    if interrupted {
        EMERGENCY_SHUTDOWN_TIMEOUT.min(config.shutdown_timeout)
    } else {
        config.shutdown_timeout
    }
}

fn exit_code(snapshot: &BatchSnapshot, interrupted: bool) -> i32 {
    if interrupted || snapshot.phase == BatchPhase::Cancelled {
        exit_codes::ERROR_CANCELED
    } else if snapshot.results.is_empty() {
        exit_codes::ERROR_NO_RESULTS
    } else {
        exit_codes::SUCCESS
    }
}

fn ctrlc_handler(interrupted: Arc<AtomicBool>, cancel: CancellationToken) {
    let installed = ctrlc::set_handler(move || {
        interrupted.store(true, Ordering::SeqCst);
        cancel.cancel();
    });
    if let Err(e) = installed {
        warn!("Could not install Ctrl+C handler: {e}");
    }
}
