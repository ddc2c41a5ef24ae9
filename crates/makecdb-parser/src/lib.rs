//! Build output parsing for makecdb.
//!
//! Lines of `make -nw` output go through two stages:
//!
//! ```text
//!   line ──▶ MakeState::track ──▶ classify ──▶ Database::upsert
//!            (Entering/Leaving)   (compiler +
//!                                  source file)
//! ```
//!
//! The directory stack gives every recorded command its working directory.
//! Both stages are pure apart from the state passed in, so a session can be
//! replayed from captured output.
//!
//! # Usage
//!
//! ```
//! use makecdb_build::Database;
//! use makecdb_parser::ParseSession;
//!
//! let mut db = Database::new();
//! let mut session = ParseSession::new(&mut db);
//! for line in [
//!     "make: Entering directory 'build'",
//!     "clang -c a.c -o a.o",
//!     "make: Leaving directory 'build'",
//! ] {
//!     session.feed(line)?;
//! }
//! session.finish();
//!
//! assert_eq!(db.get("build/a.c").unwrap().args, ["clang", "-c", "a.c", "-o", "a.o"]);
//! # Ok::<(), makecdb_parser::ParseError>(())
//! ```

mod classify;
mod dir_stack;
mod error;
mod session;

pub use classify::{
    classify, is_compiler_invocation, is_source_file, unescape, Invocation, COMPILER_DRIVERS,
    SOURCE_EXTENSIONS, VALUE_FLAGS,
};
pub use dir_stack::{Announcement, MakeState};
pub use error::{ParseError, Result};
pub use session::{parse_command_output, ParseSession};
