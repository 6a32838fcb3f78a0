// src/report.rs
// =============================================================================
// Everything that ends up on stdout or stderr during a run goes through the
// Reporter:
//
// - One line per reported result (failures only, or everything with --list)
// - Diagnostic lines (retry limit exceeded, invalid targets, transport errors)
// - The final statistics block (--verbose) or JSON summary (--json)
//
// Both streams sit behind a Mutex. Many probe tasks report at once, and each
// line is written while holding the lock, so lines never tear.
// =============================================================================

use crate::checker::RunStatistics;
use crate::config::Config;
use percent_encoding::percent_decode_str;
use serde::Serialize;
use std::borrow::Cow;
use std::io::{self, Write};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::warn;

type Sink = Mutex<Box<dyn Write + Send>>;

/// The subset of the configuration that shapes output.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportOptions {
    pub decode: bool,
    pub verbose: bool,
    pub list: bool,
    pub json: bool,
}

impl From<&Config> for ReportOptions {
    fn from(config: &Config) -> Self {
        Self {
            decode: config.decode,
            verbose: config.verbose,
            list: config.list,
            json: config.json,
        }
    }
}

pub struct Reporter {
    options: ReportOptions,
    out: Sink,
    err: Sink,
}

impl Reporter {
    /// Reporter writing to the process' stdout and stderr.
    pub fn stdio(options: ReportOptions) -> Self {
        Self::with_writers(options, Box::new(io::stdout()), Box::new(io::stderr()))
    }

    pub fn with_writers(
        options: ReportOptions,
        out: Box<dyn Write + Send>,
        err: Box<dyn Write + Send>,
    ) -> Self {
        Self {
            options,
            out: Mutex::new(out),
            err: Mutex::new(err),
        }
    }

    // True when a response with this status should produce an output line
    pub fn qualifies(&self, status: u16) -> bool {
        self.options.list || !(200..300).contains(&status)
    }

    // Reports one HTTP response, if it qualifies
    //
    // Plain mode prints the identifier as it appeared in the manifest.
    // Verbose mode prints "<status>\t<resolved url>".
    pub fn result(&self, identifier: &str, url: &str, status: u16) {
        if !self.qualifies(status) {
            return;
        }

        let line = if self.options.verbose {
            format!("{}\t{}", status, self.display(url))
        } else {
            self.display(identifier).into_owned()
        };
        write_line(&self.out, &line);
    }

    /// Diagnostic emitted when an identifier used up its retry budget.
    pub fn retry_exhausted(&self, identifier: &str) {
        write_line(&self.err, &format!("Retry limit exceeded for {}", identifier));
    }

    /// Any other per-identifier diagnostic.
    pub fn diagnostic(&self, message: &str) {
        write_line(&self.err, message);
    }

    // Prints the end-of-run summary
    //
    // --json wins over --verbose; without either flag nothing is printed.
    pub fn summary(&self, stats: &RunStatistics, wall_clock: Duration, timed_out: bool) {
        if self.options.json {
            let summary = JsonSummary {
                statistics: stats,
                elapsed_seconds: wall_clock.as_secs_f64(),
                timed_out,
            };
            match serde_json::to_string_pretty(&summary) {
                Ok(json) => write_line(&self.out, &json),
                Err(e) => warn!(error = %e, "Failed to serialize statistics"),
            }
        } else if self.options.verbose {
            // One write, so late output from detached probes can't split the block
            write_line(&self.out, &stats_block(stats, wall_clock).join("\n"));
        }
    }

    fn display<'a>(&self, text: &'a str) -> Cow<'a, str> {
        if self.options.decode {
            Cow::Owned(decode(text))
        } else {
            Cow::Borrowed(text)
        }
    }
}

#[derive(Serialize)]
struct JsonSummary<'a> {
    #[serde(flatten)]
    statistics: &'a RunStatistics,
    elapsed_seconds: f64,
    timed_out: bool,
}

// Form-style decoding: '+' is a space, then %XX sequences are decoded.
// Malformed escapes are kept verbatim, invalid UTF-8 is replaced.
pub fn decode(text: &str) -> String {
    let spaced = text.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}

// Builds the lines of the verbose statistics block
fn stats_block(stats: &RunStatistics, wall_clock: Duration) -> Vec<String> {
    let mut lines = vec![
        String::new(),
        "// STATS".to_string(),
        format!(
            "Executed {} requests in {:.6} seconds, with an average of {} seconds per request.",
            stats.requests,
            wall_clock.as_secs_f64(),
            format_ratio(stats.average_request_seconds()),
        ),
        format!(
            "{} succeeded (after {} retries) and {} failed (after {} retries) for a success rate of {}.",
            stats.successes,
            stats.success_retries,
            stats.failures,
            stats.failure_retries,
            format_ratio(stats.success_rate()),
        ),
    ];
    if stats.skipped > 0 {
        lines.push(format!("{} skipped (invalid target).", stats.skipped));
    }
    lines
}

// Six decimals for finite values; named spellings for the division-by-zero cases
pub fn format_ratio(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "Infinity".to_string()
    } else if value == f64::NEG_INFINITY {
        "-Infinity".to_string()
    } else {
        format!("{:.6}", value)
    }
}

fn lock(sink: &Sink) -> MutexGuard<'_, Box<dyn Write + Send>> {
    // A panicking writer can't leave a half-written line behind, so a
    // poisoned lock is still usable
    sink.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write_line(sink: &Sink, line: &str) {
    let mut writer = lock(sink);
    if let Err(e) = writeln!(writer, "{}", line).and_then(|_| writer.flush()) {
        warn!(error = %e, "Failed to write report line");
    }
}

// -----------------------------------------------------------------------------
// NOTES:
//
// 1. Why Box<dyn Write + Send>?
//    - The real binary writes to stdout/stderr
//    - Tests hand in an in-memory buffer and read back what was printed
//    - Send is required because probe tasks report from any runtime thread
//
// 2. Why Cow<str> in display()?
//    - Without --decode the text is printed as-is, no allocation needed
//    - With --decode we have to build a new String
// -----------------------------------------------------------------------------
