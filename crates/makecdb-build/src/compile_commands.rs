//! compile_commands.json model and codec.
//!
//! The database maps the normalized `directory/file` path of every observed
//! translation unit to the exact command used to compile it.

use crate::error::{BuildError, Result};
use crate::tokenize::split_command;
use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

/// A single compile command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Command {
    /// The working directory for compilation.
    pub directory: PathBuf,

    /// The source file path, as it appeared on the command line.
    pub file: PathBuf,

    /// The compiler invocation, compiler executable first.
    #[serde(rename = "arguments")]
    pub args: Vec<String>,
}

impl Command {
    /// Create a command; `args` must start with the compiler.
    pub fn new(directory: impl Into<PathBuf>, file: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            directory: directory.into(),
            file: file.into(),
            args,
        }
    }

    /// The database key for this command.
    pub fn key(&self) -> PathBuf {
        normalize(&self.directory.join(&self.file))
    }

    /// The compiler executable, if any arguments were recorded.
    pub fn compiler(&self) -> Option<&str> {
        self.args.first().map(String::as_str)
    }
}

/// An entry as it may appear on disk: either `arguments` or a `command`
/// string is accepted.
#[derive(Debug, Deserialize)]
struct RawCommand {
    directory: Option<PathBuf>,
    file: Option<PathBuf>,
    #[serde(default)]
    command: Option<String>,
    #[serde(default)]
    arguments: Option<Vec<String>>,
}

impl RawCommand {
    fn into_command(self, index: usize) -> Result<Command> {
        let invalid = |reason: &str| BuildError::InvalidEntry {
            index,
            reason: reason.to_string(),
        };

        let file = self.file.ok_or_else(|| invalid("missing key 'file'"))?;
        let directory = self
            .directory
            .ok_or_else(|| invalid("missing key 'directory'"))?;

        let args = match (self.arguments, self.command) {
            (Some(arguments), _) => arguments,
            (None, Some(command)) => split_command(&command),
            (None, None) => {
                return Err(invalid("one of 'command' or 'arguments' must be given"));
            }
        };

        if args.is_empty() {
            return Err(invalid("empty compiler invocation"));
        }

        Ok(Command {
            directory,
            file,
            args,
        })
    }
}

/// The compilation database, keyed by normalized `directory/file`.
///
/// Iteration follows first insertion of each key, so output is stable
/// across runs over the same build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Database {
    files: IndexMap<PathBuf, Command, FxBuildHasher>,
}

impl Database {
    /// Create an empty database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a database from disk; a missing file yields an empty database.
    pub fn load(path: &Path) -> Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::new()),
            Err(source) => {
                return Err(BuildError::ReadDatabase {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        Self::parse(&content).map_err(|e| match e {
            BuildError::Json(source) => BuildError::ParseDatabase {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    /// Parse a database from a JSON string.
    pub fn parse(json: &str) -> Result<Self> {
        let raw: Vec<RawCommand> = serde_json::from_str(json)?;

        let mut db = Self::new();
        for (index, entry) in raw.into_iter().enumerate() {
            db.upsert(entry.into_command(index)?);
        }
        Ok(db)
    }

    /// Insert a command, replacing any previous command for the same key.
    /// Returns the key it was stored under.
    pub fn upsert(&mut self, command: Command) -> PathBuf {
        let key = command.key();
        self.files.insert(key.clone(), command);
        key
    }

    /// Look up the command recorded for a key.
    pub fn get(&self, key: impl AsRef<Path>) -> Option<&Command> {
        self.files.get(&normalize(key.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Iterate over `(key, command)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&PathBuf, &Command)> {
        self.files.iter()
    }

    /// Append global arguments to every command.
    ///
    /// Arguments a command already carries are not added again, so applying
    /// the same extras on every run leaves the database unchanged.
    pub fn apply_extra_args(&mut self, extra: &[String]) {
        for command in self.files.values_mut() {
            for arg in extra {
                if !command.args.contains(arg) {
                    command.args.push(arg.clone());
                }
            }
        }
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        let commands: Vec<&Command> = self.files.values().collect();
        Ok(serde_json::to_string_pretty(&commands)?)
    }

    /// Write the database to disk.
    pub fn store(&self, path: &Path) -> Result<()> {
        let mut json = self.to_json()?;
        json.push('\n');
        std::fs::write(path, json).map_err(|source| BuildError::WriteDatabase {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Lexically normalize a path: drop `.` components and fold `..` into the
/// preceding normal component. The filesystem is never consulted.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let can_pop = matches!(out.components().next_back(), Some(Component::Normal(_)));
                if can_pop {
                    out.pop();
                } else if !matches!(
                    out.components().next_back(),
                    Some(Component::RootDir | Component::Prefix(_))
                ) {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_compile_commands() {
        let json = r#"[
            {
                "directory": "/home/user/project/build",
                "file": "../src/main.cc",
                "command": "g++ -I/usr/include -I\"../my include\" -DDEBUG=1 -c ../src/main.cc"
            },
            {
                "directory": "/home/user/project/build",
                "file": "utils.cc",
                "arguments": ["g++", "-I/usr/include", "-DNDEBUG", "-c", "utils.cc"]
            }
        ]"#;

        let db = Database::parse(json).unwrap();
        assert_eq!(db.len(), 2);

        let main = db.get("/home/user/project/src/main.cc").unwrap();
        assert_eq!(
            main.args,
            args(&["g++", "-I/usr/include", "-I../my include", "-DDEBUG=1", "-c", "../src/main.cc"])
        );

        let utils = db.get("/home/user/project/build/utils.cc").unwrap();
        assert_eq!(utils.compiler(), Some("g++"));
        assert_eq!(utils.args.len(), 5);
    }

    #[test]
    fn test_parse_rejects_missing_keys() {
        let err = Database::parse(r#"[{"directory": "/b", "arguments": ["cc"]}]"#).unwrap_err();
        assert!(matches!(err, BuildError::InvalidEntry { index: 0, .. }));

        let err = Database::parse(r#"[{"directory": "/b", "file": "a.c"}]"#).unwrap_err();
        assert!(err.to_string().contains("'command' or 'arguments'"));

        let err = Database::parse(r#"[{"file": "a.c", "command": "cc a.c"}]"#).unwrap_err();
        assert!(err.to_string().contains("'directory'"));
    }

    #[test]
    fn test_parse_rejects_wrong_shape() {
        assert!(Database::parse(r#"{"directory": "/b"}"#).is_err());
        assert!(Database::parse(r#"[{"directory": 3, "file": "a.c", "command": "cc"}]"#).is_err());
        assert!(Database::parse("[").is_err());
    }

    #[test]
    fn test_upsert_overwrites() {
        let mut db = Database::new();
        db.upsert(Command::new("/build", "a.c", args(&["cc", "-O0", "-c", "a.c"])));
        let key = db.upsert(Command::new("/build", "a.c", args(&["cc", "-O2", "-c", "a.c"])));

        assert_eq!(key, PathBuf::from("/build/a.c"));
        assert_eq!(db.len(), 1);
        assert_eq!(db.get("/build/a.c").unwrap().args[1], "-O2");
    }

    #[test]
    fn test_key_is_directory_and_file() {
        let mut db = Database::new();
        db.upsert(Command::new("/a", "main.c", args(&["cc", "main.c"])));
        db.upsert(Command::new("/b", "main.c", args(&["cc", "main.c"])));
        db.upsert(Command::new("/a/./sub/..", "main.c", args(&["clang", "main.c"])));

        assert_eq!(db.len(), 2);
        assert_eq!(db.get("/a/main.c").unwrap().compiler(), Some("clang"));
    }

    #[test]
    fn test_extra_args_are_not_duplicated() {
        let mut db = Database::new();
        db.upsert(Command::new("/b", "a.c", args(&["cc", "-c", "a.c"])));
        db.upsert(Command::new("/b", "b.c", args(&["cc", "-Wall", "-c", "b.c"])));

        let extra = args(&["-Wall", "-Iextra"]);
        db.apply_extra_args(&extra);
        db.apply_extra_args(&extra);

        assert_eq!(db.get("/b/a.c").unwrap().args, args(&["cc", "-c", "a.c", "-Wall", "-Iextra"]));
        assert_eq!(db.get("/b/b.c").unwrap().args, args(&["cc", "-Wall", "-c", "b.c", "-Iextra"]));
    }

    #[test]
    fn test_serialized_layout() {
        let mut db = Database::new();
        db.upsert(Command::new("/build", "a.c", args(&["clang", "-c", "a.c"])));

        insta::assert_snapshot!(db.to_json().unwrap(), @r###"
        [
          {
            "directory": "/build",
            "file": "a.c",
            "arguments": [
              "clang",
              "-c",
              "a.c"
            ]
          }
        ]
        "###);
    }

    #[test]
    fn test_store_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("compile_commands.json");

        let mut db = Database::new();
        db.upsert(Command::new("/src", "x.cpp", args(&["clang++", "-std=c++20", "-c", "x.cpp"])));
        db.upsert(Command::new("/src", "y.c", args(&["gcc", "-c", "y.c"])));
        db.store(&path).unwrap();

        let loaded = Database::load(&path).unwrap();
        assert_eq!(loaded, db);
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::load(&dir.path().join("nope.json")).unwrap();
        assert!(db.is_empty());
    }

    #[test]
    fn test_load_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("compile_commands.json");
        std::fs::write(&path, "[{").unwrap();

        let err = Database::load(&path).unwrap_err();
        assert!(matches!(err, BuildError::ParseDatabase { .. }));
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Path::new("build/./a.c")), PathBuf::from("build/a.c"));
        assert_eq!(normalize(Path::new("/x/y/../z.c")), PathBuf::from("/x/z.c"));
        assert_eq!(normalize(Path::new("../a/b.c")), PathBuf::from("../a/b.c"));
        assert_eq!(normalize(Path::new("/../a.c")), PathBuf::from("/a.c"));
    }
}
