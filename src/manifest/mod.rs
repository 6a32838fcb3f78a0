// src/manifest/mod.rs
// =============================================================================
// This module turns a PIPE manifest into the set of identifiers to check.
//
// A PIPE manifest is a plain text export: one header line, then one record
// per line with pipe-delimited fields. The third field of every record is a
// file path relative to the download base.
//
// Rust concepts:
// - Modules: Organizing related functionality
// - HashSet: Duplicate paths collapse into one entry
// =============================================================================

mod pipe;

// Re-export the public entry points from pipe.rs
pub use pipe::read_identifiers;
