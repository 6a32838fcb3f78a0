// src/error.rs
// =============================================================================
// Typed errors for the two layers that can fail in a well-defined way:
//
// - ManifestError: reading the PIPE manifest before anything is dispatched
// - ProbeError: turning one identifier into a request it can never make
//
// Everything above these layers (main.rs) works with anyhow::Result and maps
// these variants onto process exit codes.
// =============================================================================

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading the manifest file.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The manifest file does not exist.
    #[error("manifest not found: {}", path.display())]
    NotFound {
        /// Path that was looked up.
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The manifest exists but could not be read.
    #[error("failed to read manifest {}: {source}", path.display())]
    Io {
        /// Path being read.
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ManifestError {
    // Classifies an io::Error by kind so the caller gets NotFound vs Io
    pub fn from_io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        if source.kind() == io::ErrorKind::NotFound {
            ManifestError::NotFound { path, source }
        } else {
            ManifestError::Io { path, source }
        }
    }
}

/// Errors that end a probe before any request is sent.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The identifier does not form a valid HTTPS URL with the configured base.
    #[error("invalid target '{target}': {reason}")]
    InvalidTarget {
        /// The unparseable base + identifier string.
        target: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The shared HTTP client could not be created.
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}
