// src/dispatch/mod.rs
// =============================================================================
// This module fans the identifier set out over the worker pool.
//
// Features:
// - Fixed pool (at most N probes in flight) or elastic pool (no cap)
// - One independent task per identifier, run on the multi-threaded runtime
// - A single global deadline for the whole run
//
// The dispatcher knows nothing about HTTP; it drives whatever Probe it is
// given through the retry policy and records the results.
// =============================================================================

mod pool;

pub use pool::{Dispatcher, RunOutcome};
