//! Tracking of make's nested working directories.
//!
//! With `-w`, make brackets the output of every (recursive) invocation with
//! `make: Entering directory '...'` and `make: Leaving directory '...'`, or
//! `make[N]: ...` for sub-makes. Compiler commands are relative to the
//! innermost directory entered.

use crate::error::{ParseError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const ENTERING: &str = "Entering directory ";
const LEAVING: &str = "Leaving directory ";

/// A directory announcement extracted from a line of make output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Announcement<'a> {
    Entering(&'a str),
    Leaving(&'a str),
}

impl<'a> Announcement<'a> {
    /// Recognize an announcement line. Returns `Ok(None)` for any other line.
    pub fn parse(line: &'a str) -> Result<Option<Self>> {
        if is_announcement(line, ENTERING) {
            Ok(Some(Announcement::Entering(quoted_dir(line)?)))
        } else if is_announcement(line, LEAVING) {
            Ok(Some(Announcement::Leaving(quoted_dir(line)?)))
        } else {
            Ok(None)
        }
    }
}

fn is_announcement(line: &str, phrase: &str) -> bool {
    if let Some(rest) = line.strip_prefix("make: ") {
        return rest.starts_with(phrase);
    }

    line.starts_with("make[") && line.contains(&format!("]: {}", phrase))
}

/// The directory between the first `'` or backtick and the closing `'`.
fn quoted_dir(line: &str) -> Result<&str> {
    let start = line
        .find(|c: char| c == '\'' || c == '`')
        .ok_or_else(|| ParseError::MalformedAnnouncement {
            line: line.to_string(),
        })?;

    let dir = &line[start + 1..];
    Ok(dir.strip_suffix('\'').unwrap_or(dir))
}

/// Per-session parser context: the stack of directories make has entered,
/// innermost last.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MakeState {
    dir_stack: Vec<PathBuf>,
}

impl MakeState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of directories currently entered.
    pub fn depth(&self) -> usize {
        self.dir_stack.len()
    }

    /// The innermost directory, if any.
    pub fn current_dir(&self) -> Option<&Path> {
        self.dir_stack.last().map(PathBuf::as_path)
    }

    /// All entered directories, outermost first.
    pub fn dirs(&self) -> &[PathBuf] {
        &self.dir_stack
    }

    /// True when every entered directory has been left again.
    pub fn is_balanced(&self) -> bool {
        self.dir_stack.is_empty()
    }

    /// Indentation for trace lines at the current depth.
    pub(crate) fn indent(&self) -> String {
        " ".repeat(self.dir_stack.len() * 2)
    }

    pub fn enter(&mut self, dir: impl Into<PathBuf>) {
        let dir = dir.into();
        info!("{} # {}", self.indent(), dir.display());
        self.dir_stack.push(dir);
    }

    /// Leave `dir`, which must be the innermost entered directory.
    pub fn leave(&mut self, dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();
        match self.dir_stack.last() {
            Some(top) if top == dir => {
                self.dir_stack.pop();
                debug!(dir = %dir.display(), depth = self.dir_stack.len(), "left directory");
                Ok(())
            }
            Some(top) => Err(ParseError::StackMismatch {
                expected: top.clone(),
                actual: dir.to_path_buf(),
            }),
            None => Err(ParseError::EmptyStack {
                actual: dir.to_path_buf(),
            }),
        }
    }

    /// Apply the announcement on `line`, if there is one.
    pub fn track<'a>(&mut self, line: &'a str) -> Result<Option<Announcement<'a>>> {
        let announcement = Announcement::parse(line)?;
        match announcement {
            Some(Announcement::Entering(dir)) => self.enter(dir),
            Some(Announcement::Leaving(dir)) => self.leave(dir)?,
            None => {}
        }
        Ok(announcement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_announcements() {
        assert_eq!(
            Announcement::parse("make: Entering directory '/src/app'").unwrap(),
            Some(Announcement::Entering("/src/app"))
        );
        assert_eq!(
            Announcement::parse("make[2]: Leaving directory '/src/app/lib'").unwrap(),
            Some(Announcement::Leaving("/src/app/lib"))
        );
        assert_eq!(
            Announcement::parse("make[1]: Entering directory `/old/style'").unwrap(),
            Some(Announcement::Entering("/old/style"))
        );
    }

    #[test]
    fn test_other_lines_are_not_announcements() {
        for line in [
            "",
            "gcc -c main.c",
            "make: Nothing to be done for 'all'.",
            "make[1]: *** [Makefile:12: all] Error 1",
            "echo make: Entering directory '/x'",
            "gmake: Entering directory '/x'",
        ] {
            assert_eq!(Announcement::parse(line).unwrap(), None, "{line}");
        }
    }

    #[test]
    fn test_unquoted_announcement_is_malformed() {
        let err = Announcement::parse("make: Entering directory /src").unwrap_err();
        assert!(matches!(err, ParseError::MalformedAnnouncement { .. }));
    }

    #[test]
    fn test_missing_closing_quote_is_tolerated() {
        assert_eq!(
            Announcement::parse("make: Leaving directory '/src").unwrap(),
            Some(Announcement::Leaving("/src"))
        );
    }

    #[test]
    fn test_nested_enter_leave() {
        let mut ms = MakeState::new();
        ms.track("make: Entering directory '/a'").unwrap();
        ms.track("make[1]: Entering directory '/a/b'").unwrap();
        assert_eq!(ms.depth(), 2);
        assert_eq!(ms.current_dir(), Some(Path::new("/a/b")));

        ms.track("make[1]: Leaving directory '/a/b'").unwrap();
        assert_eq!(ms.current_dir(), Some(Path::new("/a")));
        ms.track("make: Leaving directory '/a'").unwrap();

        assert!(ms.is_balanced());
        assert_eq!(ms.current_dir(), None);
    }

    #[test]
    fn test_leave_mismatch() {
        let mut ms = MakeState::new();
        ms.track("make: Entering directory 'A'").unwrap();

        let err = ms.track("make: Leaving directory 'B'").unwrap_err();
        assert_eq!(
            err,
            ParseError::StackMismatch {
                expected: PathBuf::from("A"),
                actual: PathBuf::from("B"),
            }
        );
        assert_eq!(err.to_string(), "mismatched directory stack; expected 'A', got 'B'");
        assert_eq!(ms.dirs(), &[PathBuf::from("A")]);
    }

    #[test]
    fn test_leave_empty_stack() {
        let mut ms = MakeState::new();
        let err = ms.leave("/x").unwrap_err();
        assert_eq!(
            err,
            ParseError::EmptyStack {
                actual: PathBuf::from("/x")
            }
        );
    }

    #[test]
    fn test_non_announcement_passes_through() {
        let mut ms = MakeState::new();
        ms.enter("/a");
        assert_eq!(ms.track("cc -c x.c").unwrap(), None);
        assert_eq!(ms.depth(), 1);
    }
}
