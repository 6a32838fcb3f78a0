// src/checker/stats.rs
// =============================================================================
// Run-wide counters, updated concurrently by every probe task.
//
// Each counter is its own AtomicU64, so an update is a single fetch_add and
// no update can be lost. Durations are accumulated as whole nanoseconds to
// stay in integer arithmetic.
//
// The counters are only read as a whole through snapshot(), after the pool
// has drained or the deadline has passed.
// =============================================================================

use super::retry::{TaskResult, Terminal};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Shared accumulator for one run.
#[derive(Debug, Default)]
pub struct Aggregator {
    successes: AtomicU64,
    failures: AtomicU64,
    requests: AtomicU64,
    success_retries: AtomicU64,
    failure_retries: AtomicU64,
    request_nanos: AtomicU64,
    skipped: AtomicU64,
}

impl Aggregator {
    // Records the terminal result of one identifier
    pub fn record(&self, result: &TaskResult) {
        let retries = u64::from(result.retries);
        match result.terminal {
            Terminal::Success => {
                self.successes.fetch_add(1, Ordering::Relaxed);
                self.success_retries.fetch_add(retries, Ordering::Relaxed);
            }
            Terminal::Failure => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                self.failure_retries.fetch_add(retries, Ordering::Relaxed);
            }
        }
    }

    // Records one request attempt, retries included
    pub fn record_attempt(&self, elapsed: Duration) {
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.request_nanos.fetch_add(nanos, Ordering::Relaxed);
    }

    /// Records an identifier that could not be turned into a request.
    pub fn record_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> RunStatistics {
        RunStatistics {
            successes: self.successes.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            requests: self.requests.load(Ordering::Relaxed),
            success_retries: self.success_retries.load(Ordering::Relaxed),
            failure_retries: self.failure_retries.load(Ordering::Relaxed),
            total_request_seconds: Duration::from_nanos(self.request_nanos.load(Ordering::Relaxed))
                .as_secs_f64(),
            skipped: self.skipped.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunStatistics {
    pub successes: u64,
    pub failures: u64,
    /// Every attempt, retries included.
    pub requests: u64,
    pub success_retries: u64,
    pub failure_retries: u64,
    /// Sum of per-attempt durations (not wall-clock).
    pub total_request_seconds: f64,
    pub skipped: u64,
}

impl RunStatistics {
    // successes / failures, exactly. Yields +inf when nothing failed and
    // NaN when nothing finished at all.
    pub fn success_rate(&self) -> f64 {
        self.successes as f64 / self.failures as f64
    }

    pub fn average_request_seconds(&self) -> f64 {
        self.total_request_seconds / self.requests as f64
    }
}
