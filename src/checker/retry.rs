// src/checker/retry.rs
// =============================================================================
// Bounded retries for a single identifier.
//
// The loop is an explicit state machine:
//
//   Attempting --non-transient--> Succeeded
//   Attempting --transient, budget left--> Retrying --> Attempting
//   Attempting --transient, budget spent--> FailedExhausted
//
// Retries fire immediately, there is no back-off. Every attempt that reached
// the network is counted in the shared Aggregator as it happens, so partial
// statistics stay accurate even if the run times out mid-task.
// =============================================================================

use super::probe::Probe;
use super::stats::Aggregator;
use crate::error::ProbeError;
use crate::report::Reporter;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Final classification of an identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminal {
    /// A non-transient outcome was reached (any HTTP status counts).
    Success,
    /// Every attempt failed transiently.
    Failure,
}

/// Result of running the retry loop for one identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskResult {
    pub identifier: String,
    pub terminal: Terminal,
    /// Attempts beyond the first.
    pub retries: u32,
    /// Sum of all attempt durations.
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RetryState {
    Attempting,
    Retrying,
    Succeeded,
    FailedExhausted,
}

pub struct RetryPolicy<P: ?Sized> {
    probe: Arc<P>,
    max_retries: u32,
    aggregator: Arc<Aggregator>,
    reporter: Arc<Reporter>,
}

impl<P: Probe + ?Sized> RetryPolicy<P> {
    pub fn new(
        probe: Arc<P>,
        max_retries: u32,
        aggregator: Arc<Aggregator>,
        reporter: Arc<Reporter>,
    ) -> Self {
        Self {
            probe,
            max_retries,
            aggregator,
            reporter,
        }
    }

    // Runs the state machine to a terminal state
    //
    // Err is returned only for identifiers that can't be requested at all;
    // those end the machine on the spot, whatever the retry budget.
    pub async fn execute(&self, identifier: &str) -> Result<TaskResult, ProbeError> {
        let mut state = RetryState::Attempting;
        let mut retries = 0;
        let mut elapsed = Duration::ZERO;

        // Each pass through the loop moves the machine one step
        loop {
            state = match state {
                RetryState::Attempting => {
                    // `?` ends the task right here for an unusable identifier
                    let outcome = self.probe.probe(identifier).await?;

                    // Count the request now, not at the end, so a timeout
                    // mid-task still leaves it in the statistics
                    self.aggregator.record_attempt(outcome.elapsed);
                    elapsed += outcome.elapsed;

                    debug!(
                        identifier,
                        attempt = retries + 1,
                        status = ?outcome.status,
                        transient = outcome.transient,
                        "Attempt finished"
                    );

                    // Any answer (even a 404) or a permanent error ends the loop
                    if !outcome.transient {
                        RetryState::Succeeded
                    } else if retries < self.max_retries {
                        RetryState::Retrying
                    } else {
                        RetryState::FailedExhausted
                    }
                }
                RetryState::Retrying => {
                    // No back-off: the next attempt goes out straight away
                    retries += 1;
                    RetryState::Attempting
                }
                RetryState::Succeeded => {
                    return Ok(self.finish(identifier, Terminal::Success, retries, elapsed));
                }
                RetryState::FailedExhausted => {
                    self.reporter.retry_exhausted(identifier);
                    return Ok(self.finish(identifier, Terminal::Failure, retries, elapsed));
                }
            };
        }
    }

    fn finish(
        &self,
        identifier: &str,
        terminal: Terminal,
        retries: u32,
        elapsed: Duration,
    ) -> TaskResult {
        TaskResult {
            identifier: identifier.to_string(),
            terminal,
            retries,
            elapsed,
        }
    }
}
