//! Last-modified command implementations.

use serde::Serialize;
use std::path::Path;
use tracing::info;
use yana_db::{LastModifiedMap, LastModifiedTracker};
use yana_storage::FileBackend;

/// One row of the last-modified map.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct Entry {
    /// Table name.
    pub table: String,
    /// Row key.
    pub row: String,
    /// Unix timestamp of the last modification.
    pub timestamp: u64,
    /// User who made it.
    pub user: String,
}

/// Runs `last-modified show`.
pub fn show(
    path: &Path,
    table: Option<&str>,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut tracker = open(path)?;
    let entries = flatten(tracker.entries(), table);

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        _ => {
            println!("Last-modified map: {}", tracker.location());
            println!("========================================");
            if entries.is_empty() {
                println!("(no entries)");
            }
            for entry in &entries {
                println!(
                    "  {}.{:<16} {:>12}  {}",
                    entry.table, entry.row, entry.timestamp, entry.user
                );
            }
        }
    }

    Ok(())
}

/// Runs `last-modified clear`.
pub fn clear(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let mut tracker = open(path)?;
    let count = flatten(tracker.entries(), None).len();
    tracker.clear()?;
    info!("Cleared {} last-modified entries in {:?}", count, path);
    Ok(())
}

/// Lists the entries of `map` in table and row order, optionally for one table.
pub fn flatten(map: &LastModifiedMap, table: Option<&str>) -> Vec<Entry> {
    let wanted = table.map(str::to_lowercase);
    map.iter()
        .filter(|(name, _)| wanted.as_ref().is_none_or(|w| w == *name))
        .flat_map(|(name, rows)| {
            rows.iter().map(move |(row, modified)| Entry {
                table: name.clone(),
                row: row.clone(),
                timestamp: modified.timestamp,
                user: modified.user.clone(),
            })
        })
        .collect()
}

fn open(path: &Path) -> Result<LastModifiedTracker, Box<dyn std::error::Error>> {
    if !path.exists() {
        return Err(format!("No last-modified file found at {:?}", path).into());
    }
    let backend = FileBackend::open(path)?;
    Ok(LastModifiedTracker::new(Box::new(backend)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker_at(path: &Path) -> LastModifiedTracker {
        LastModifiedTracker::new(Box::new(FileBackend::open(path).unwrap()))
    }

    #[test]
    fn flatten_orders_and_filters() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lm.bin");
        let mut tracker = tracker_at(&path);
        tracker.check("users", "2", "bob", 20);
        tracker.check("users", "1", "alice", 10);
        tracker.check("posts", "9", "alice", 30);

        let all = flatten(tracker.entries(), None);
        let keys: Vec<String> = all.iter().map(|e| format!("{}.{}", e.table, e.row)).collect();
        assert_eq!(keys, vec!["posts.9", "users.1", "users.2"]);

        let users = flatten(tracker.entries(), Some("Users"));
        assert_eq!(users.len(), 2);
        assert_eq!(
            users[1],
            Entry {
                table: "users".into(),
                row: "2".into(),
                timestamp: 20,
                user: "bob".into(),
            }
        );
    }

    #[test]
    fn show_and_clear_on_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lm.bin");
        tracker_at(&path).check("users", "1", "alice", 10);

        show(&path, None, "json").unwrap();
        clear(&path).unwrap();

        let mut reopened = tracker_at(&path);
        assert!(reopened.entries().is_empty());
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(show(&dir.path().join("missing.bin"), None, "text").is_err());
        assert!(clear(&dir.path().join("missing.bin")).is_err());
    }
}
