//! Compilation database model for makecdb.
//!
//! This crate provides:
//! - The `compile_commands.json` model and its JSON codec
//! - Shell-like command line splitting
//! - Tool configuration (`makecdb.toml`)
//!
//! # Example
//!
//! ```toml
//! # makecdb.toml
//! [make]
//! program = "make"
//!
//! [database]
//! path = "compile_commands.json"
//! extra_args = ["-Wall"]
//! ```

mod compile_commands;
mod config;
mod error;
mod tokenize;

pub use compile_commands::{normalize, Command, Database};
pub use config::{Config, DatabaseConfig, MakeConfig, CONFIG_FILE_NAME};
pub use error::{BuildError, Result};
pub use tokenize::split_command;
