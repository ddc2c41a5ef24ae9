//! Recognition of compiler invocations in make output.
//!
//! A line is an invocation when the basename of its first space-separated
//! word names a known compiler driver and one of its other words looks like
//! a C or C++ source file. Everything else make prints is ignored.

use makecdb_build::Command;
use std::path::{Path, PathBuf};

/// Substrings identifying a compiler driver (`x86_64-linux-gnu-gcc-12`,
/// `clang++`, ...).
pub const COMPILER_DRIVERS: &[&str] = &["gcc", "g++", "clang"];

/// Options whose value is the following word.
pub const VALUE_FLAGS: &[&str] = &["-o", "-include", "-MF"];

/// Suffixes of files that can be the subject of a compile command.
pub const SOURCE_EXTENSIONS: &[&str] = &[".c", ".h", ".cc", ".cpp", ".cxx", ".hh", ".hpp", ".hxx"];

/// A recognized compiler invocation, not yet tied to a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// The source file, exactly as written on the command line.
    pub file: String,
    /// The invocation, compiler first.
    pub args: Vec<String>,
}

impl Invocation {
    /// Bind the invocation to the directory it ran in.
    pub fn into_command(self, directory: impl Into<PathBuf>) -> Command {
        Command::new(directory, self.file, self.args)
    }
}

/// Whether `program` (possibly a path) is a compiler driver.
pub fn is_compiler_invocation(program: &str) -> bool {
    Path::new(program)
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| COMPILER_DRIVERS.iter().any(|driver| name.contains(driver)))
}

pub fn is_source_file(word: &str) -> bool {
    SOURCE_EXTENSIONS.iter().any(|ext| word.ends_with(ext))
}

/// Drop every backslash from `word`.
///
/// This is deliberately cruder than shell unescaping: `\\` becomes nothing
/// rather than `\`. Existing databases were produced this way.
pub fn unescape(word: &str) -> String {
    word.chars().filter(|&c| c != '\\').collect()
}

/// Classify one line of make output.
pub fn classify(line: &str) -> Option<Invocation> {
    let mut parts = line.split(' ');

    let program = parts.next()?;
    if !is_compiler_invocation(program) {
        return None;
    }

    let mut args = vec![program.to_string()];
    let mut file = None;

    // Set by a value-taking option so its value is never mistaken for the
    // source file. Left set if the option is the last word.
    let mut skip_next = false;

    for part in parts.filter(|p| !p.is_empty()) {
        if VALUE_FLAGS.contains(&part) {
            skip_next = true;
        } else if skip_next {
            skip_next = false;
        } else if is_source_file(part) {
            file = Some(part);
        }

        args.push(unescape(part));
    }

    Some(Invocation {
        file: file?.to_string(),
        args,
    })
}
