//! Error types for makecdb-build.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for makecdb-build operations.
pub type Result<T> = std::result::Result<T, BuildError>;

/// Errors that can occur while loading or storing the database and config.
#[derive(Error, Debug, Diagnostic)]
pub enum BuildError {
    /// Failed to read the compilation database.
    #[error("Failed to read compilation database {path}")]
    #[diagnostic(code(makecdb::build::read_database))]
    ReadDatabase {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write the compilation database.
    #[error("Failed to write compilation database {path}")]
    #[diagnostic(code(makecdb::build::write_database))]
    WriteDatabase {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The existing database is not valid JSON of the expected shape.
    #[error("Failed to parse compilation database {path}")]
    #[diagnostic(
        code(makecdb::build::parse_database),
        help("fix or delete the file; it is regenerated from the build output")
    )]
    ParseDatabase {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A database entry is structurally valid JSON but unusable.
    #[error("Invalid entry #{index} in compilation database: {reason}")]
    #[diagnostic(code(makecdb::build::invalid_entry))]
    InvalidEntry { index: usize, reason: String },

    /// JSON (de)serialization error without file context.
    #[error("Invalid compilation database JSON: {0}")]
    #[diagnostic(code(makecdb::build::json))]
    Json(#[from] serde_json::Error),

    /// Failed to read configuration file.
    #[error("Failed to read config file {path}")]
    #[diagnostic(code(makecdb::build::read_config))]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML configuration.
    #[error("Failed to parse TOML config: {0}")]
    #[diagnostic(code(makecdb::build::parse_config))]
    ParseToml(#[from] toml::de::Error),
}
