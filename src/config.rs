// src/config.rs
// =============================================================================
// The run configuration: built once from the parsed CLI, then shared
// read-only (behind an Arc) by every probe task.
//
// Tests build it directly with Config::new(base) and the with_* setters
// instead of going through clap.
// =============================================================================

use crate::cli::{Cli, DEFAULT_RETRIES, DEFAULT_THREADS, DEFAULT_TIMEOUT_SECS};
use std::num::NonZeroUsize;
use std::time::Duration;

/// How many probe tasks may run at the same time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerPool {
    /// At most this many tasks in flight; the rest wait their turn.
    Fixed(NonZeroUsize),
    /// No upper bound, every task starts as soon as it is submitted.
    Elastic,
}

impl WorkerPool {
    /// Maps the `--threads` value: 0 selects the elastic pool.
    pub fn from_threads(threads: usize) -> Self {
        match NonZeroUsize::new(threads) {
            Some(n) => WorkerPool::Fixed(n),
            None => WorkerPool::Elastic,
        }
    }

    /// Concurrency limit in the form `for_each_concurrent` expects.
    pub fn limit(&self) -> Option<usize> {
        match self {
            WorkerPool::Fixed(n) => Some(n.get()),
            WorkerPool::Elastic => None,
        }
    }
}

/// Immutable settings for one run.
#[derive(Debug, Clone)]
pub struct Config {
    /// Prefix every identifier is appended to.
    pub base: String,
    /// Deadline for the whole run, not for individual requests.
    pub timeout: Duration,
    /// Retries allowed per identifier after the first attempt.
    pub max_retries: u32,
    pub pool: WorkerPool,
    /// Percent-decode identifiers and URLs before printing them.
    pub decode: bool,
    pub verbose: bool,
    /// Report every result, not only non-2xx ones.
    pub list: bool,
    /// Emit the final statistics as JSON.
    pub json: bool,
}

impl Config {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: DEFAULT_RETRIES,
            pool: WorkerPool::from_threads(DEFAULT_THREADS),
            decode: false,
            verbose: false,
            list: false,
            json: false,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.pool = WorkerPool::from_threads(threads);
        self
    }

    pub fn with_decode(mut self, decode: bool) -> Self {
        self.decode = decode;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_list(mut self, list: bool) -> Self {
        self.list = list;
        self
    }
}

impl From<&Cli> for Config {
    fn from(cli: &Cli) -> Self {
        Self {
            base: cli.base.clone(),
            timeout: Duration::from_secs(cli.timeout),
            max_retries: cli.retries,
            pool: WorkerPool::from_threads(cli.threads),
            decode: cli.decode,
            verbose: cli.verbose,
            list: cli.list,
            json: cli.json,
        }
    }
}
