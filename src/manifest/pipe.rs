// src/manifest/pipe.rs
// =============================================================================
// Line-oriented parsing of PIPE manifests.
//
// Rules:
// - The first line is a header and is always skipped
// - Every other line must match `field1|field2|field3|` exactly
// - The third field is the identifier; lines that don't match are ignored
// - Identifiers are collected into a HashSet, so duplicates vanish
// =============================================================================

use crate::error::ManifestError;
use regex::Regex;
use std::collections::HashSet;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;
use std::sync::OnceLock;
use tracing::debug;

// Greedy captures: with more than three fields the leading ones fold into
// the first group, so the identifier is always the last field.
const PIPE_LINE_PATTERN: &str = r"^(.+)\|(.+)\|(.+)\|$";

fn pipe_line() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // The pattern is a constant, so compiling it cannot fail at runtime
    PATTERN.get_or_init(|| Regex::new(PIPE_LINE_PATTERN).expect("PIPE pattern is valid"))
}

// Opens and parses a manifest file
//
// Returns ManifestError::NotFound when the file is missing and
// ManifestError::Io for any other read failure.
pub fn read_identifiers(path: &Path) -> Result<HashSet<String>, ManifestError> {
    let file = File::open(path).map_err(|e| ManifestError::from_io(path, e))?;
    let identifiers =
        parse_identifiers(BufReader::new(file)).map_err(|e| ManifestError::from_io(path, e))?;

    debug!(path = %path.display(), count = identifiers.len(), "Parsed manifest");
    Ok(identifiers)
}

// Parses manifest content from any buffered reader
//
// A line ends at "\n", "\r" or "\r\n". Content is decoded lossily so a
// stray non-UTF-8 byte in a description field doesn't abort the whole run.
pub fn parse_identifiers<R: BufRead>(mut reader: R) -> io::Result<HashSet<String>> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    let content = String::from_utf8_lossy(&bytes);

    // "\r\n" splits into a line and an empty string; empty lines never
    // match, and the header is always the first piece either way
    let identifiers = content
        .split(['\n', '\r'])
        .skip(1)
        .filter_map(|line| pipe_line().captures(line))
        .map(|caps| caps[3].to_string())
        .collect();

    Ok(identifiers)
}
