//! Error types for makecdb-runner.

use makecdb_parser::ParseError;
use miette::Diagnostic;
use thiserror::Error;

/// Result type for makecdb-runner operations.
pub type Result<T> = std::result::Result<T, RunError>;

#[derive(Error, Debug, Diagnostic)]
pub enum RunError {
    /// The build tool could not be started.
    #[error("Failed to start `{program}`")]
    #[diagnostic(
        code(makecdb::run::launch),
        help("check that the program exists and is on PATH, or set it with --make")
    )]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Reading from or signalling the running process failed.
    #[error("I/O error while running the build: {0}")]
    #[diagnostic(code(makecdb::run::io))]
    Io(#[from] std::io::Error),

    /// The build output could not be parsed.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(#[from] ParseError),
}
