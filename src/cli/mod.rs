//! CLI support for jqlite
//!
//! Provides programmatic access to the `jqlite` command so it can be driven
//! from tests or embedded in other tools.

mod run;

pub use run::{RunOptions, RunSummary, execute, open_input};

use std::{io, path::PathBuf};

/// Errors that end a CLI invocation early
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Filter expression failed to compile
    #[error("jqlite: {0}")]
    Parse(#[from] crate::ParseError),

    /// An input file could not be opened
    #[error("jqlite: could not open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Reading input or writing output failed
    #[error("jqlite: I/O error: {0}")]
    Io(#[from] io::Error),

    /// No input provided
    #[error("jqlite: no input provided. Pass files, use --input, or pipe JSON to stdin.")]
    NoInput,
}

impl CliError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Parse(_) => 2,
            CliError::Open { .. } | CliError::Io(_) | CliError::NoInput => 1,
        }
    }
}
