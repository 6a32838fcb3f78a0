// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// There are no subcommands: a run always reads one PIPE manifest and checks
// every file it lists. All flags are optional and fall back to the defaults
// declared as constants below.
//
// Rust concepts:
// - Structs: Custom data types that group related data
// - Derive macros: Automatically generate the parsing code
// - Constants: Defaults shared with the config module and the tests
// =============================================================================

use clap::Parser;
use std::path::PathBuf;

/// Manifest read when `--file` is not given.
pub const DEFAULT_MANIFEST: &str = "CAXY_MEDIA_DOC.PIPE";
/// URL prefix used to resolve identifiers when `--base` is not given.
pub const DEFAULT_BASE: &str = "https://docs.peerless-av.com/";
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_RETRIES: u32 = 3;
pub const DEFAULT_THREADS: usize = 50;

// This struct represents our entire CLI application
//
// #[derive(Parser)] tells clap to generate the parsing code.
// Every field maps to one flag; default_value_t supplies the fallback.
#[derive(Parser, Debug)]
#[command(
    name = "status-sweep",
    version = "0.1.0",
    about = "Checks every file listed in a PIPE manifest for HTTPS availability",
    long_about = "status-sweep reads a PIPE manifest, resolves each listed file against a base URL \
                  and requests them concurrently. Missing or erroring files are printed, one per line."
)]
pub struct Cli {
    /// The PIPE file to parse
    #[arg(short = 'f', long = "file", default_value = DEFAULT_MANIFEST)]
    pub file: PathBuf,

    /// The URL prefix used to resolve filenames from the PIPE file
    ///
    /// Falls back to the STATUS_SWEEP_BASE environment variable.
    #[arg(short = 'b', long = "base", env = "STATUS_SWEEP_BASE", default_value = DEFAULT_BASE)]
    pub base: String,

    /// The time in seconds before execution times out
    #[arg(short = 't', long = "timeout", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,

    /// The number of failed retries before a request is discarded
    #[arg(short = 'r', long = "retries", default_value_t = DEFAULT_RETRIES)]
    pub retries: u32,

    /// The number of requests to run at once. Set to 0 for an unbounded pool
    #[arg(short = 'p', long = "threads", default_value_t = DEFAULT_THREADS)]
    pub threads: usize,

    /// Decodes percent-encoded paths in output
    #[arg(short = 'd', long = "decode")]
    pub decode: bool,

    /// Prints detailed information on requests
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Prints all results regardless of status
    #[arg(short = 'l', long = "list")]
    pub list: bool,

    /// Prints the final statistics as JSON
    #[arg(long)]
    pub json: bool,
}
