//! Tool configuration (`makecdb.toml` format).

use crate::error::{BuildError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the config file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "makecdb.toml";

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// How the build tool is invoked.
    #[serde(default)]
    pub make: MakeConfig,

    /// Where the database lives and what is added to every entry.
    #[serde(default)]
    pub database: DatabaseConfig,
}

/// Build tool settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MakeConfig {
    /// Build tool executable.
    pub program: String,

    /// Flags appended for the observation run. The defaults request a
    /// serial, keep-going dry run of every target with directory
    /// announcements.
    pub dry_run_flags: Vec<String>,

    /// Upper bound on a single wait for process output, in milliseconds.
    pub poll_interval_ms: u64,
}

impl Default for MakeConfig {
    fn default() -> Self {
        Self {
            program: "make".to_string(),
            dry_run_flags: vec!["-j1".to_string(), "-knwB".to_string()],
            poll_interval_ms: 50,
        }
    }
}

impl MakeConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Database settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database path, relative to the working directory.
    pub path: PathBuf,

    /// Arguments appended to every entry.
    pub extra_args: Vec<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("compile_commands.json"),
            extra_args: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| BuildError::ReadConfig {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load `explicit` if given, else `makecdb.toml` in `dir` if it exists,
    /// else the defaults.
    pub fn discover(explicit: Option<&Path>, dir: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        let candidate = dir.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            Self::from_file(&candidate)
        } else {
            Ok(Self::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let toml = r#"
[make]
program = "gmake"
poll_interval_ms = 20

[database]
path = "build/compile_commands.json"
extra_args = ["-Wall", "-Iinclude"]
        "#;

        let config = Config::from_toml(toml).unwrap();

        assert_eq!(config.make.program, "gmake");
        assert_eq!(config.make.poll_interval(), Duration::from_millis(20));
        assert_eq!(config.make.dry_run_flags, vec!["-j1", "-knwB"]);
        assert_eq!(config.database.path, PathBuf::from("build/compile_commands.json"));
        assert_eq!(config.database.extra_args, vec!["-Wall", "-Iinclude"]);
    }

    #[test]
    fn test_empty_config_is_default() {
        assert_eq!(Config::from_toml("").unwrap(), Config::default());
    }

    #[test]
    fn test_invalid_config() {
        let err = Config::from_toml("[make]\npoll_interval_ms = \"soon\"").unwrap_err();
        assert!(matches!(err, BuildError::ParseToml(_)));
    }

    #[test]
    fn test_discover() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(Config::discover(None, dir.path()).unwrap(), Config::default());

        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "[make]\nprogram = \"bmake\"\n").unwrap();
        assert_eq!(Config::discover(None, dir.path()).unwrap().make.program, "bmake");

        let missing = dir.path().join("other.toml");
        let err = Config::discover(Some(&missing), dir.path()).unwrap_err();
        assert!(matches!(err, BuildError::ReadConfig { .. }));
    }
}
