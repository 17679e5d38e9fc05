//! Dotted key addresses.
//!
//! A key address names a target for a read or write:
//!
//! ```text
//! table                 whole table
//! table.*               whole table
//! table.row             one row
//! table.*.column        one column across all rows
//! table.row.column      one cell
//! table.row.column.a.b  a sub-address inside an array-typed cell
//! ```
//!
//! Table names are case-insensitive and normalised to lower case, column
//! names to upper case. Row keys and sub-address segments are kept as given.

use crate::error::{DbError, DbResult};
use crate::query::ExpectedResult;
use std::fmt;

/// Selects one row or all rows of a table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RowSelector {
    /// Every row (`*`).
    All,
    /// The row with this primary key.
    Id(String),
}

impl RowSelector {
    /// Parses a row segment; `*` and the empty string select all rows.
    pub fn parse(segment: &str) -> Self {
        if segment.is_empty() || segment == "*" {
            RowSelector::All
        } else {
            RowSelector::Id(segment.to_string())
        }
    }

    /// Returns the row key, or `None` for [`RowSelector::All`].
    pub fn id(&self) -> Option<&str> {
        match self {
            RowSelector::All => None,
            RowSelector::Id(id) => Some(id),
        }
    }

    /// Returns true if this selects a single concrete row.
    pub fn is_concrete(&self) -> bool {
        matches!(self, RowSelector::Id(_))
    }
}

impl fmt::Display for RowSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowSelector::All => f.write_str("*"),
            RowSelector::Id(id) => f.write_str(id),
        }
    }
}

impl From<&str> for RowSelector {
    fn from(segment: &str) -> Self {
        RowSelector::parse(segment)
    }
}

/// A parsed `table.row.column.path…` address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyAddress {
    /// Lower-case table name.
    pub table: String,
    /// Row selector.
    pub row: RowSelector,
    /// Upper-case column name, or `None` for the whole row.
    pub column: Option<String>,
    /// Sub-address inside an array-typed cell.
    pub path: Vec<String>,
}

impl KeyAddress {
    /// Parses a dotted key.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for an empty key, an empty segment, or a
    /// sub-address without a column.
    pub fn parse(key: &str) -> DbResult<Self> {
        let key = key.trim();
        if key.is_empty() {
            return Err(DbError::invalid_argument("key must not be empty"));
        }

        let segments: Vec<&str> = key.split('.').collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(DbError::invalid_argument(format!(
                "key '{key}' contains an empty segment"
            )));
        }

        let table = segments[0].to_lowercase();
        let row = segments
            .get(1)
            .map_or(RowSelector::All, |s| RowSelector::parse(s));
        let column = match segments.get(2) {
            None | Some(&"*") => None,
            Some(c) => Some(c.to_uppercase()),
        };
        let path: Vec<String> = segments.iter().skip(3).map(|s| s.to_string()).collect();

        if column.is_none() && !path.is_empty() {
            return Err(DbError::invalid_argument(format!(
                "key '{key}' addresses a sub-path without a column"
            )));
        }

        Ok(Self {
            table,
            row,
            column,
            path,
        })
    }

    /// Creates an address for a whole table.
    pub fn table(table: &str) -> Self {
        Self {
            table: table.to_lowercase(),
            row: RowSelector::All,
            column: None,
            path: Vec::new(),
        }
    }

    /// Returns the kind of result this address denotes.
    pub fn expected_result(&self) -> ExpectedResult {
        ExpectedResult::of(&self.row, self.column.as_deref())
    }

    /// Returns true if the address stops at a row.
    pub fn is_row(&self) -> bool {
        self.row.is_concrete() && self.column.is_none()
    }

    /// Returns the address of the enclosing row (drops column and path).
    #[must_use]
    pub fn row_address(&self) -> Self {
        Self {
            table: self.table.clone(),
            row: self.row.clone(),
            column: None,
            path: Vec::new(),
        }
    }
}

impl fmt::Display for KeyAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table, self.row)?;
        if let Some(column) = &self.column {
            write!(f, ".{column}")?;
        }
        for segment in &self.path {
            write!(f, ".{segment}")?;
        }
        Ok(())
    }
}

impl std::str::FromStr for KeyAddress {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
