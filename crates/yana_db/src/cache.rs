//! Write-cache of pending values.
//!
//! Holds what the current transaction is going to write, as
//! `table -> row -> COLUMN -> value`. Later writes replace earlier ones
//! column by column. Rows removed by the transaction are remembered until
//! they are inserted again. Cleared wholesale when the connection resets.

use crate::key::KeyAddress;
use crate::row::Row;
use std::collections::{BTreeMap, BTreeSet};
use yana_codec::Value;

/// Pending row and cell values, not yet committed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteCache {
    tables: BTreeMap<String, BTreeMap<String, Row>>,
    removed: BTreeSet<(String, String)>,
}

impl WriteCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the pending values of a row.
    pub fn row(&self, table: &str, row: &str) -> Option<&Row> {
        self.tables.get(table)?.get(row)
    }

    /// Returns the pending value of a cell.
    pub fn cell(&self, table: &str, row: &str, column: &str) -> Option<&Value> {
        self.row(table, row)?.get(column)
    }

    /// Returns true if the row has pending values.
    pub fn contains_row(&self, table: &str, row: &str) -> bool {
        self.row(table, row).is_some()
    }

    /// Returns true if the transaction removes the row and has not
    /// inserted it again since.
    pub fn is_removed(&self, table: &str, row: &str) -> bool {
        self.removed.contains(&(table.to_string(), row.to_string()))
    }

    /// Reads an address: a row yields a map, a cell its value (navigated
    /// through the sub-address). Table-wide addresses are never cached.
    pub fn lookup(&self, address: &KeyAddress) -> Option<Value> {
        let id = address.row.id()?;
        match &address.column {
            None => self.row(&address.table, id).cloned().map(Value::Map),
            Some(column) => {
                let cell = self.cell(&address.table, id, column)?;
                if address.path.is_empty() {
                    Some(cell.clone())
                } else {
                    cell.get_path(&address.path[..]).cloned()
                }
            }
        }
    }

    /// Records a cell value.
    pub fn set_cell(&mut self, table: &str, row: &str, column: &str, value: Value) {
        self.row_entry(table, row).insert(column.to_string(), value);
    }

    /// Records several column values of a row.
    pub fn merge_row(&mut self, table: &str, row: &str, values: Row) {
        self.row_entry(table, row).extend(values);
    }

    /// Records the values of a row being inserted.
    pub fn insert_row(&mut self, table: &str, row: &str, values: Row) {
        self.removed.remove(&(table.to_string(), row.to_string()));
        self.merge_row(table, row, values);
    }

    /// Drops a row and remembers its removal.
    pub fn remove_row(&mut self, table: &str, row: &str) {
        self.removed.insert((table.to_string(), row.to_string()));
        if let Some(rows) = self.tables.get_mut(table) {
            rows.remove(row);
            if rows.is_empty() {
                self.tables.remove(table);
            }
        }
    }

    /// Drops everything.
    pub fn clear(&mut self) {
        self.tables.clear();
        self.removed.clear();
    }

    /// Returns true if nothing is cached or removed.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty() && self.removed.is_empty()
    }

    /// Returns the number of cached rows.
    pub fn len(&self) -> usize {
        self.tables.values().map(BTreeMap::len).sum()
    }

    fn row_entry(&mut self, table: &str, row: &str) -> &mut Row {
        self.tables
            .entry(table.to_string())
            .or_default()
            .entry(row.to_string())
            .or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_write_wins_per_column() {
        let mut cache = WriteCache::new();
        cache.merge_row(
            "users",
            "1",
            Row::from([
                ("NAME".to_string(), Value::from("Ann")),
                ("AGE".to_string(), Value::from(30)),
            ]),
        );
        cache.set_cell("users", "1", "NAME", Value::from("Bea"));

        let row = cache.row("users", "1").unwrap();
        assert_eq!(row.get("NAME"), Some(&Value::from("Bea")));
        assert_eq!(row.get("AGE"), Some(&Value::from(30)));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn lookup_by_address() {
        let mut cache = WriteCache::new();
        let mut tags = Value::empty_map();
        tags.set_path(&["k1"], Value::from("a"));
        cache.set_cell("t", "1", "TAGS", tags);

        let cell = KeyAddress::parse("t.1.tags.k1").unwrap();
        assert_eq!(cache.lookup(&cell), Some(Value::from("a")));
        let row = KeyAddress::parse("t.1").unwrap();
        assert!(matches!(cache.lookup(&row), Some(Value::Map(_))));
        assert_eq!(cache.lookup(&KeyAddress::parse("t").unwrap()), None);
        assert_eq!(cache.lookup(&KeyAddress::parse("t.2.tags").unwrap()), None);
    }

    #[test]
    fn remove_and_clear() {
        let mut cache = WriteCache::new();
        cache.set_cell("t", "1", "A", Value::from(1));
        cache.set_cell("t", "2", "A", Value::from(2));
        cache.remove_row("t", "1");
        assert!(!cache.contains_row("t", "1"));
        assert!(cache.contains_row("t", "2"));

        cache.remove_row("t", "2");
        assert_eq!(cache.len(), 0);
        assert!(!cache.is_empty());

        cache.set_cell("u", "1", "A", Value::Null);
        cache.clear();
        assert!(cache.is_empty());
        assert!(!cache.is_removed("t", "1"));
    }

    #[test]
    fn removal_is_remembered_until_reinsert() {
        let mut cache = WriteCache::new();
        cache.remove_row("t", "1");
        assert!(cache.is_removed("t", "1"));
        assert!(!cache.is_removed("t", "2"));

        cache.set_cell("t", "1", "A", Value::from(1));
        assert!(cache.is_removed("t", "1"));

        cache.insert_row("t", "1", Row::new());
        assert!(!cache.is_removed("t", "1"));
    }
}
