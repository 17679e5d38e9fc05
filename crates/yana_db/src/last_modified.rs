//! Last-modified bookkeeping for the dirty-write guard.
//!
//! A process-wide map `table -> row -> (timestamp, user)` records who last
//! touched each row and when. Before an update, the connection asks the
//! tracker whether someone else touched the row after the current user's
//! session started.
//!
//! The map is loaded from its storage backend on first use and rewritten
//! after every check. Unreadable content counts as an empty map, and a
//! failed write only costs the bookkeeping of that one check.

use crate::config::Config;
use crate::error::DbResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;
use yana_codec::{from_cbor, to_cbor};
use yana_storage::{FileBackend, StorageBackend};

/// Last modification of one row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastModified {
    /// Unix timestamp of the modification.
    pub timestamp: u64,
    /// User who made it.
    pub user: String,
}

/// `table -> row -> last modification`.
pub type LastModifiedMap = BTreeMap<String, BTreeMap<String, LastModified>>;

/// Tracks the last modification of each row.
#[derive(Debug)]
pub struct LastModifiedTracker {
    backend: Box<dyn StorageBackend>,
    entries: Option<LastModifiedMap>,
}

impl LastModifiedTracker {
    /// Creates a tracker on `backend`. Nothing is read until first use.
    pub fn new(backend: Box<dyn StorageBackend>) -> Self {
        Self {
            backend,
            entries: None,
        }
    }

    /// Creates a tracker on the file named by `config`.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the file cannot be created.
    pub fn open(config: &Config) -> DbResult<Self> {
        let backend = FileBackend::open_with_create_dirs(&config.last_modified_path())?;
        Ok(Self::new(Box::new(backend)))
    }

    /// Records that `user` modifies `table.row` at `now`.
    ///
    /// Returns the timestamp of the previous modification if it was made by
    /// a different user, and 0 otherwise.
    pub fn check(&mut self, table: &str, row: &str, user: &str, now: u64) -> u64 {
        let entries = self.load();
        let rows = entries.entry(table.to_string()).or_default();
        let conflict = match rows.get(row) {
            Some(previous) if previous.user != user => previous.timestamp,
            _ => 0,
        };
        rows.insert(
            row.to_string(),
            LastModified {
                timestamp: now,
                user: user.to_string(),
            },
        );
        self.persist();
        conflict
    }

    /// Returns the last modification of a row.
    pub fn get(&mut self, table: &str, row: &str) -> Option<LastModified> {
        self.load().get(table)?.get(row).cloned()
    }

    /// Returns the whole map.
    pub fn entries(&mut self) -> &LastModifiedMap {
        self.load()
    }

    /// Forgets every entry and empties the backend.
    ///
    /// # Errors
    ///
    /// Returns the storage error if the backend cannot be cleared.
    pub fn clear(&mut self) -> DbResult<()> {
        self.entries = Some(LastModifiedMap::new());
        self.backend.clear()?;
        Ok(())
    }

    /// Returns where the map is stored.
    pub fn location(&self) -> String {
        self.backend.location()
    }

    fn load(&mut self) -> &mut LastModifiedMap {
        let backend = &self.backend;
        self.entries.get_or_insert_with(|| read_map(backend.as_ref()))
    }

    fn persist(&mut self) {
        let Some(entries) = &self.entries else {
            return;
        };
        let result = to_cbor(entries)
            .map_err(crate::error::DbError::from)
            .and_then(|bytes| Ok(self.backend.replace(&bytes)?));
        if let Err(err) = result {
            warn!(
                location = %self.backend.location(),
                error = %err,
                "failed to write last-modified map"
            );
        }
    }
}

fn read_map(backend: &dyn StorageBackend) -> LastModifiedMap {
    let bytes = match backend.load() {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(location = %backend.location(), error = %err, "cannot read last-modified map");
            return LastModifiedMap::new();
        }
    };
    if bytes.is_empty() {
        return LastModifiedMap::new();
    }
    from_cbor(&bytes).unwrap_or_else(|err| {
        warn!(
            location = %backend.location(),
            error = %err,
            "corrupt last-modified map, starting empty"
        );
        LastModifiedMap::new()
    })
}
