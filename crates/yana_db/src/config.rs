//! Connection configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default file name of the shared last-modified map.
pub const DEFAULT_LAST_MODIFIED_FILE: &str = "db_last_modified.tmp";

/// Configuration for a connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Whether updates are checked against concurrent edits by other users.
    pub strict_locking: bool,

    /// Directory holding temporary state files.
    pub temp_dir: PathBuf,

    /// File name of the last-modified map inside `temp_dir`.
    pub last_modified_file: String,

    /// Maximum number of rows a single `remove` call deletes by default.
    pub default_remove_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            strict_locking: true,
            temp_dir: std::env::temp_dir(),
            last_modified_file: DEFAULT_LAST_MODIFIED_FILE.to_string(),
            default_remove_limit: 1,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables the dirty-write guard.
    #[must_use]
    pub const fn strict_locking(mut self, value: bool) -> Self {
        self.strict_locking = value;
        self
    }

    /// Sets the directory for temporary state files.
    #[must_use]
    pub fn temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = dir.into();
        self
    }

    /// Sets the file name of the last-modified map.
    #[must_use]
    pub fn last_modified_file(mut self, name: impl Into<String>) -> Self {
        self.last_modified_file = name.into();
        self
    }

    /// Sets the default row cap for `remove`.
    #[must_use]
    pub const fn default_remove_limit(mut self, limit: usize) -> Self {
        self.default_remove_limit = limit;
        self
    }

    /// Full path of the last-modified map.
    #[must_use]
    pub fn last_modified_path(&self) -> PathBuf {
        self.temp_dir.join(&self.last_modified_file)
    }
}
