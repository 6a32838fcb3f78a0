// src/checker/mod.rs
// =============================================================================
// This module contains the per-identifier checking logic.
//
// Submodules:
// - probe: The Probe trait and the outcome of a single attempt
// - http: The real probe, one HTTPS GET per attempt
// - retry: Turns repeated probe attempts into one terminal result
// - stats: Thread-safe counters shared by every task
//
// The dispatcher only sees the re-exports below; it never needs to know that
// the probe speaks HTTP.
// =============================================================================

mod http;
mod probe;
mod retry;
mod stats;

#[cfg(test)]
pub(crate) mod scripted;

pub use http::HttpProbe;
pub use probe::Probe;
pub use retry::RetryPolicy;
pub use stats::{Aggregator, RunStatistics};
