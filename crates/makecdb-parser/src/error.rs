//! Error types for makecdb-parser.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for makecdb-parser operations.
pub type Result<T> = std::result::Result<T, ParseError>;

/// Errors that abort a parsing session.
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum ParseError {
    /// A "Leaving directory" line named a directory other than the innermost one.
    #[error("mismatched directory stack; expected '{}', got '{}'", expected.display(), actual.display())]
    #[diagnostic(
        code(makecdb::parse::stack_mismatch),
        help("make's directory announcements were interleaved; build with -j1")
    )]
    StackMismatch { expected: PathBuf, actual: PathBuf },

    /// A "Leaving directory" line arrived with no directory entered.
    #[error("mismatched directory stack; left '{}' without entering it", actual.display())]
    #[diagnostic(code(makecdb::parse::empty_stack))]
    EmptyStack { actual: PathBuf },

    /// An announcement line had no quoted directory.
    #[error("malformed directory announcement: {line}")]
    #[diagnostic(code(makecdb::parse::malformed_announcement))]
    MalformedAnnouncement { line: String },

    /// A compiler invocation was seen before any directory was entered.
    #[error("no directory context for compiler invocation of '{}'", file.display())]
    #[diagnostic(
        code(makecdb::parse::no_directory),
        help("run make with -w so it announces every directory")
    )]
    NoDirectoryContext { file: PathBuf },
}
