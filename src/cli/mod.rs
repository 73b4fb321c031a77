//! Command-line interface for patchloop.
//!
//! A single command: load problems, run the repair agent on each one and
//! print the pass@1 report.

mod commands;

pub use commands::{parse_cli, run, run_with_cli, Cli};
