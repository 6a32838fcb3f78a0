// src/checker/http.rs
// =============================================================================
// This module checks if one manifest file is reachable over HTTPS.
//
// Key functionality:
// - Resolves an identifier against the configured base URL
// - Makes one GET request per attempt and looks only at the status code
// - Reports qualifying responses (non-2xx, or everything with --list)
// - Tells the retry engine whether a failed attempt is worth repeating
//
// Rust concepts:
// - async/await: For network I/O
// - Traits: HttpProbe is one implementation of the Probe trait
// - Error source chains: To find the io::Error buried inside reqwest errors
// =============================================================================

use super::probe::{Probe, ProbeOutcome};
use crate::config::Config;
use crate::error::ProbeError;
use crate::report::Reporter;
use async_trait::async_trait;
use reqwest::{redirect, Client};
use std::error::Error as StdError;
use std::io;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;
use url::Url;

const USER_AGENT: &str = concat!("status-sweep/", env!("CARGO_PKG_VERSION"));
const MAX_REDIRECTS: usize = 20;

// The production probe
//
// One Client is shared by every attempt of every task so connections are
// pooled. No per-request timeout is set; the dispatcher's global deadline
// is the only one.
pub struct HttpProbe {
    client: Client,
    base: String,
    reporter: Arc<Reporter>,
}

impl HttpProbe {
    pub fn new(config: &Config, reporter: Arc<Reporter>) -> Result<Self, ProbeError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(redirect::Policy::limited(MAX_REDIRECTS))
            .build()?;

        Ok(Self {
            client,
            base: config.base.clone(),
            reporter,
        })
    }
}

#[async_trait]
impl Probe for HttpProbe {
    async fn probe(&self, identifier: &str) -> Result<ProbeOutcome, ProbeError> {
        let url = resolve_target(&self.base, identifier)?;

        let start = Instant::now();
        let result = self.client.get(url.clone()).send().await;
        let elapsed = start.elapsed();

        match result {
            Ok(response) => {
                // The body is never read; dropping the response closes it
                let status = response.status().as_u16();
                debug!(%url, status, ?elapsed, "Probe answered");
                self.reporter.result(identifier, url.as_str(), status);
                Ok(ProbeOutcome::responded(status, elapsed))
            }
            Err(e) if is_transient(&e) => {
                debug!(%url, error = %e, "Transient probe failure");
                Ok(ProbeOutcome::transient(elapsed))
            }
            Err(e) => {
                self.reporter
                    .diagnostic(&format!("Request failed for {}: {}", identifier, e));
                Ok(ProbeOutcome::failed(elapsed))
            }
        }
    }
}

// Characters that may not appear raw in a URL path. Url::parse would
// quietly encode or rewrite them, requesting a different resource.
const ILLEGAL_PATH_CHARS: &[char] = &['\\', '{', '}', '"', '<', '>', '^', '`', '|'];

// Builds the request URL for an identifier
//
// Only spaces are encoded here. Manifest paths are already percent-encoded
// otherwise, and encoding them again would turn %20 into %2520.
pub fn resolve_target(base: &str, identifier: &str) -> Result<Url, ProbeError> {
    let encoded = identifier.replace(' ', "%20");
    let target = format!("{}{}", base, encoded);

    // Reject what can't be sent as-is before the parser gets to "fix" it
    if let Some(reason) = syntax_error(&encoded) {
        return Err(ProbeError::InvalidTarget { target, reason });
    }

    let url = Url::parse(&target).map_err(|e| ProbeError::InvalidTarget {
        target: target.clone(),
        reason: e.to_string(),
    })?;

    if url.scheme() != "https" {
        return Err(ProbeError::InvalidTarget {
            reason: format!("unsupported scheme '{}'", url.scheme()),
            target,
        });
    }

    // Dot segments ("x/../y.pdf", "%2e%2e") are collapsed by the parser;
    // if the identifier no longer ends the URL, a different file would be hit
    if !url.as_str().ends_with(&encoded) {
        return Err(ProbeError::InvalidTarget {
            reason: format!("identifier is rewritten to '{}'", url),
            target,
        });
    }

    Ok(url)
}

// Finds the first piece of an encoded identifier that isn't legal URL syntax
fn syntax_error(encoded: &str) -> Option<String> {
    if let Some(c) = encoded
        .chars()
        .find(|c| ILLEGAL_PATH_CHARS.contains(c) || c.is_control())
    {
        return Some(format!("illegal character {:?}", c));
    }

    // Every '%' must start a two-digit hex escape
    let bytes = encoded.as_bytes();
    for (i, _) in encoded.match_indices('%') {
        let escape = bytes.get(i + 1..i + 3);
        if !escape.is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit)) {
            return Some(format!("malformed escape at index {}", i));
        }
    }

    None
}

// Decides whether a failed request should be retried
//
// Only a socket that was refused, reset or dropped (or a timeout) is worth
// another try. reqwest flags TLS handshake failures as connect errors too,
// so is_connect() alone isn't enough: a TLS failure anywhere in the chain
// makes the error permanent, as do DNS and protocol errors.
fn is_transient(error: &reqwest::Error) -> bool {
    // The top-level message carries the URL, so only the causes are searched
    if error.source().is_some_and(has_tls_error) {
        return false;
    }
    error.is_timeout() || has_socket_error(error)
}

// Walks the source chain looking for a TLS or certificate failure
//
// The TLS backends don't share an error type, so this goes by message.
fn has_tls_error(error: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(error);
    while let Some(err) = current {
        let message = err.to_string().to_lowercase();
        if ["ssl", "tls", "certificate", "handshake"]
            .iter()
            .any(|marker| message.contains(marker))
        {
            return true;
        }
        current = err.source();
    }
    false
}

// Walks the source chain looking for an io::Error caused by the socket
fn has_socket_error(error: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(error);
    while let Some(err) = current {
        if let Some(io_err) = err.downcast_ref::<io::Error>() {
            if matches!(
                io_err.kind(),
                io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::ConnectionRefused
                    | io::ErrorKind::BrokenPipe
                    | io::ErrorKind::UnexpectedEof
            ) {
                return true;
            }
        }
        current = err.source();
    }
    false
}
