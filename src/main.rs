// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Read the PIPE manifest into a set of identifiers
// 3. Hand them to the dispatcher, which probes them all concurrently
// 4. Print the summary and exit with a code describing how the run ended
//
// Exit codes:
//   0   = every identifier was checked before the deadline
//   100 = the command line could not be parsed
//   404 = the manifest file does not exist
//   500 = the manifest could not be read (or setup failed otherwise)
//   503 = the global timeout elapsed with work outstanding
// =============================================================================

mod checker;
mod cli;
mod config;
mod dispatch;
mod error;
mod manifest;
mod report;

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use checker::{Aggregator, HttpProbe};
use cli::Cli;
use config::Config;
use dispatch::{Dispatcher, RunOutcome};
use error::ManifestError;
use report::{ReportOptions, Reporter};

/// Process exit codes.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExitCode {
    Success = 0,
    ParseError = 100,
    ManifestMissing = 404,
    ManifestIo = 500,
    Timeout = 503,
}

impl From<RunOutcome> for ExitCode {
    fn from(outcome: RunOutcome) -> Self {
        match outcome {
            RunOutcome::Completed => ExitCode::Success,
            RunOutcome::TimedOut => ExitCode::Timeout,
        }
    }
}

// Logs go to stderr so they never mix with the report on stdout
fn setup_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("status_sweep=debug")
        } else {
            EnvFilter::new("status_sweep=warn")
        }
    });

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version come through here too, on stdout
            let code = if e.use_stderr() {
                ExitCode::ParseError
            } else {
                ExitCode::Success
            };
            let _ = e.print();
            std::process::exit(code as i32);
        }
    };

    setup_logging(cli.verbose);

    let exit_code = match run(&cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            exit_code_for(&e)
        }
    };

    std::process::exit(exit_code as i32);
}

// The application logic, everything after argument parsing
//
// Errors returned from here happen before any request is sent.
async fn run(cli: &Cli) -> Result<ExitCode> {
    // A missing or unreadable manifest stops us before any request is sent
    let identifiers = manifest::read_identifiers(&cli.file)?;
    let config = Config::from(cli);

    // These are shared by every task, hence the Arcs
    let reporter = Arc::new(Reporter::stdio(ReportOptions::from(&config)));
    let aggregator = Arc::new(Aggregator::default());
    let probe = Arc::new(HttpProbe::new(&config, Arc::clone(&reporter))?);
    let dispatcher = Dispatcher::new(
        probe,
        &config,
        Arc::clone(&aggregator),
        Arc::clone(&reporter),
    );

    let start = Instant::now();
    let outcome = dispatcher.run(identifiers).await;
    let elapsed = start.elapsed();

    // On timeout this is a partial view; detached probes may still be running
    reporter.summary(
        &aggregator.snapshot(),
        elapsed,
        outcome == RunOutcome::TimedOut,
    );

    Ok(ExitCode::from(outcome))
}

// Maps a setup error onto the documented exit codes
fn exit_code_for(error: &anyhow::Error) -> ExitCode {
    match error.downcast_ref::<ManifestError>() {
        Some(ManifestError::NotFound { .. }) => ExitCode::ManifestMissing,
        _ => ExitCode::ManifestIo,
    }
}
