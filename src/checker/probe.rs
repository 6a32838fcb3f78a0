// src/checker/probe.rs
// =============================================================================
// The seam between the retry engine and the network.
//
// A Probe performs exactly one attempt for one identifier. The engine only
// cares about three things from that attempt: the status code (if any),
// how long it took, and whether it is worth trying again.
// =============================================================================

use crate::error::ProbeError;
use async_trait::async_trait;
use std::time::Duration;

/// A single availability check.
///
/// `Err(ProbeError::InvalidTarget)` means the identifier can never be
/// requested; the engine gives up on it without retrying.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn probe(&self, identifier: &str) -> Result<ProbeOutcome, ProbeError>;
}

/// What one attempt produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeOutcome {
    /// HTTP status, absent when no response was received.
    pub status: Option<u16>,
    /// Wall-clock time of the attempt.
    pub elapsed: Duration,
    /// The attempt failed in a way that a retry might fix.
    pub transient: bool,
}

impl ProbeOutcome {
    /// A response arrived, whatever its status.
    pub fn responded(status: u16, elapsed: Duration) -> Self {
        Self { status: Some(status), elapsed, transient: false }
    }

    /// The connection dropped before a response arrived.
    pub fn transient(elapsed: Duration) -> Self {
        Self { status: None, elapsed, transient: true }
    }

    /// The request failed for good (TLS, protocol, ...).
    pub fn failed(elapsed: Duration) -> Self {
        Self { status: None, elapsed, transient: false }
    }
}
