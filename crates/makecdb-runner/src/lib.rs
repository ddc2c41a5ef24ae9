//! Running make and streaming its output for makecdb.
//!
//! This crate provides:
//! - A [`ProcessRunner`] abstraction with a `std::process` implementation
//! - Newline framing of incrementally read output ([`LineBuffer`])
//! - The polling loop feeding lines to a callback ([`drive`])
//! - The dry (observed) and wet (real) make runs ([`MakeRunner`])

mod driver;
mod error;
mod lines;
mod make;
mod process;

pub use driver::{drive, CancelFlag, Outcome};
pub use error::{Result, RunError};
pub use lines::LineBuffer;
pub use make::{DryRunSummary, MakeRunner};
pub use process::{ChildProcess, ProcessRunner, RunningProcess, SystemRunner};
