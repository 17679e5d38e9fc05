//! Schema definitions.
//!
//! The schema is the read-only source of table definitions, column types,
//! constraints and triggers. Connections share it as `Arc<Schema>` and
//! never mutate it.

mod column;
mod table;

pub use column::{Column, ColumnType};
pub use table::Table;

use crate::error::{DbError, DbResult};
use std::collections::BTreeMap;

/// A named collection of tables.
#[derive(Debug, Clone)]
pub struct Schema {
    name: String,
    readonly: bool,
    tables: BTreeMap<String, Table>,
}

impl Schema {
    /// Creates an empty, writeable schema.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            readonly: false,
            tables: BTreeMap::new(),
        }
    }

    /// Marks the whole schema read-only.
    #[must_use]
    pub fn readonly(mut self) -> Self {
        self.readonly = true;
        self
    }

    /// Adds a table, replacing one with the same name.
    #[must_use]
    pub fn with_table(mut self, table: Table) -> Self {
        self.tables.insert(table.name().to_string(), table);
        self
    }

    /// Returns the schema name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true if the schema refuses writes.
    pub fn is_readonly(&self) -> bool {
        self.readonly
    }

    /// Returns true if the table exists.
    pub fn is_table(&self, name: &str) -> bool {
        self.tables.contains_key(&name.to_lowercase())
    }

    /// Looks up a table, case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for an empty name and `TableNotFound` for
    /// an unknown one.
    pub fn table(&self, name: &str) -> DbResult<&Table> {
        if name.is_empty() {
            return Err(DbError::invalid_argument("table name must not be empty"));
        }
        self.tables
            .get(&name.to_lowercase())
            .ok_or_else(|| DbError::table_not_found(name))
    }

    /// Iterates over the tables in name order.
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.values()
    }
}
