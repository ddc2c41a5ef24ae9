//! Feeding make output into a compilation database.

use crate::classify::classify;
use crate::dir_stack::MakeState;
use crate::error::{ParseError, Result};
use makecdb_build::Database;
use std::path::PathBuf;
use tracing::{info, warn};

/// Process one line of make output.
///
/// Directory announcements update `ms`; compiler invocations are recorded in
/// `db` under the innermost directory. Returns the key of the recorded entry,
/// if the line produced one.
pub fn parse_command_output(db: &mut Database, ms: &mut MakeState, line: &str) -> Result<Option<PathBuf>> {
    ms.track(line)?;

    let Some(invocation) = classify(line) else {
        return Ok(None);
    };

    let directory = ms
        .current_dir()
        .ok_or_else(|| ParseError::NoDirectoryContext {
            file: PathBuf::from(&invocation.file),
        })?
        .to_path_buf();

    info!("{} + {}", ms.indent(), invocation.file);

    let key = db.upsert(invocation.into_command(directory));
    Ok(Some(key))
}

/// A parsing session over one run of make.
///
/// Owns the directory stack for the run and borrows the database it records
/// into, so entries merged before an error stay in the database.
#[derive(Debug)]
pub struct ParseSession<'db> {
    db: &'db mut Database,
    state: MakeState,
    recorded: usize,
}

impl<'db> ParseSession<'db> {
    pub fn new(db: &'db mut Database) -> Self {
        Self {
            db,
            state: MakeState::new(),
            recorded: 0,
        }
    }

    /// Process one line; see [`parse_command_output`].
    pub fn feed(&mut self, line: &str) -> Result<Option<PathBuf>> {
        let key = parse_command_output(self.db, &mut self.state, line)?;
        if key.is_some() {
            self.recorded += 1;
        }
        Ok(key)
    }

    /// Number of invocations recorded so far, counting re-recorded files.
    pub fn recorded(&self) -> usize {
        self.recorded
    }

    pub fn state(&self) -> &MakeState {
        &self.state
    }

    /// End the session, reporting directories that were never left.
    pub fn finish(self) -> MakeState {
        if !self.state.is_balanced() {
            warn!(
                unclosed = ?self.state.dirs(),
                "make output ended inside {} directories",
                self.state.depth()
            );
        }
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_records_under_current_directory() {
        let mut db = Database::new();
        let mut ms = MakeState::new();
        ms.enter("/build");

        let key = parse_command_output(&mut db, &mut ms, "clang -DFOO -o out.o -c src/main.cpp").unwrap();
        assert_eq!(key, Some(PathBuf::from("/build/src/main.cpp")));

        let cmd = db.get("/build/src/main.cpp").unwrap();
        assert_eq!(cmd.file, Path::new("src/main.cpp"));
        assert_eq!(cmd.directory, Path::new("/build"));
        assert_eq!(cmd.args, ["clang", "-DFOO", "-o", "out.o", "-c", "src/main.cpp"]);
    }

    #[test]
    fn test_ignores_noise() {
        let mut db = Database::new();
        let mut ms = MakeState::new();
        ms.enter("/build");

        for line in ["ld -o foo bar.o", "echo done", "", "ar rcs libx.a x.o"] {
            assert_eq!(parse_command_output(&mut db, &mut ms, line).unwrap(), None);
        }
        assert!(db.is_empty());
    }

    #[test]
    fn test_invocation_without_directory() {
        let mut db = Database::new();
        let mut ms = MakeState::new();

        let err = parse_command_output(&mut db, &mut ms, "gcc -c a.c").unwrap_err();
        assert_eq!(
            err,
            ParseError::NoDirectoryContext {
                file: PathBuf::from("a.c")
            }
        );
        assert!(db.is_empty());
    }

    #[test]
    fn test_rerecording_overwrites() {
        let mut db = Database::new();
        let mut session = ParseSession::new(&mut db);

        session.feed("make: Entering directory '/p'").unwrap();
        session.feed("gcc -O0 -c a.c").unwrap();
        session.feed("gcc -O2 -c a.c").unwrap();
        session.feed("make: Leaving directory '/p'").unwrap();
        assert_eq!(session.recorded(), 2);
        assert!(session.finish().is_balanced());

        assert_eq!(db.len(), 1);
        assert_eq!(db.get("/p/a.c").unwrap().args, ["gcc", "-O2", "-c", "a.c"]);
    }

    #[test]
    fn test_error_keeps_earlier_entries() {
        let mut db = Database::new();
        let mut session = ParseSession::new(&mut db);

        session.feed("make: Entering directory '/p'").unwrap();
        session.feed("gcc -c a.c").unwrap();
        assert!(session.feed("make: Leaving directory '/q'").is_err());
        assert_eq!(session.state().depth(), 1);

        assert!(db.get("/p/a.c").is_some());
    }

    #[test]
    fn test_unbalanced_finish() {
        let mut db = Database::new();
        let mut session = ParseSession::new(&mut db);
        session.feed("make: Entering directory '/p'").unwrap();

        let state = session.finish();
        assert!(!state.is_balanced());
        assert_eq!(state.current_dir(), Some(Path::new("/p")));
    }
}
