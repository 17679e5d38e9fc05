//! The query variants.
//!
//! Query objects are plain descriptors. Table names are lower case and
//! column names upper case; [`QueryBuilder`](super::QueryBuilder) takes care
//! of that when it builds them from a key.

use super::filter::Where;
use super::ExpectedResult;
use crate::key::RowSelector;
use crate::row::Row;
use yana_codec::Value;

/// Reads a table, a row, a column or a cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    /// Table name.
    pub table: String,
    /// Row selector.
    pub row: RowSelector,
    /// Column, or `None` for whole rows.
    pub column: Option<String>,
    /// Sub-address inside an array-typed cell.
    pub path: Vec<String>,
    /// Row filter.
    pub filter: Option<Where>,
    /// Column to order by. Rows are ordered by id otherwise.
    pub order_by: Option<String>,
    /// Reverse the order.
    pub descending: bool,
    /// Rows to skip.
    pub offset: usize,
    /// Maximum number of rows.
    pub limit: Option<usize>,
}

impl Select {
    /// Selects a whole table.
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_lowercase(),
            row: RowSelector::All,
            column: None,
            path: Vec::new(),
            filter: None,
            order_by: None,
            descending: false,
            offset: 0,
            limit: None,
        }
    }

    /// Returns the kind of result this select produces.
    pub fn expected_result(&self) -> ExpectedResult {
        ExpectedResult::of(&self.row, self.column.as_deref())
    }
}

/// Changes a row or a single cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    /// Table name.
    pub table: String,
    /// Row selector; must be concrete.
    pub row: RowSelector,
    /// Column for a cell update, `None` for a whole-row update.
    pub column: Option<String>,
    /// New cell value, or a map of column values.
    pub value: Value,
}

impl Update {
    /// Updates one cell.
    pub fn cell(table: &str, row: &str, column: &str, value: impl Into<Value>) -> Self {
        Self {
            table: table.to_lowercase(),
            row: RowSelector::parse(row),
            column: Some(column.to_uppercase()),
            value: value.into(),
        }
    }

    /// Updates several columns of one row.
    pub fn row(table: &str, row: &str, values: Row) -> Self {
        Self {
            table: table.to_lowercase(),
            row: RowSelector::parse(row),
            column: None,
            value: Value::Map(values),
        }
    }
}

/// Adds a row.
#[derive(Debug, Clone, PartialEq)]
pub struct Insert {
    /// Table name.
    pub table: String,
    /// Id of the new row; `*` lets the driver derive or assign one.
    pub row: RowSelector,
    /// Column values.
    pub values: Row,
}

impl Insert {
    /// Creates an insert.
    pub fn new(table: &str, row: RowSelector, values: Row) -> Self {
        Self {
            table: table.to_lowercase(),
            row,
            values,
        }
    }
}

/// Removes rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Delete {
    /// Table name.
    pub table: String,
    /// Row selector.
    pub row: RowSelector,
    /// Row filter.
    pub filter: Option<Where>,
    /// Maximum number of rows removed.
    pub limit: usize,
}

impl Delete {
    /// Removes at most one matching row.
    pub fn new(table: &str, row: RowSelector) -> Self {
        Self {
            table: table.to_lowercase(),
            row,
            filter: None,
            limit: 1,
        }
    }
}

/// Counts rows.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectCount {
    /// Table name.
    pub table: String,
    /// Row selector.
    pub row: RowSelector,
    /// When set, only rows with a non-null value in this column count.
    pub column: Option<String>,
    /// Row filter.
    pub filter: Option<Where>,
}

impl SelectCount {
    /// Counts every row of a table.
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_lowercase(),
            row: RowSelector::All,
            column: None,
            filter: None,
        }
    }
}

/// Checks whether a row or cell exists.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectExist {
    /// Table name.
    pub table: String,
    /// Row selector.
    pub row: RowSelector,
    /// When set, the cell must be non-null.
    pub column: Option<String>,
    /// Row filter.
    pub filter: Option<Where>,
}

impl SelectExist {
    /// Checks for one row.
    pub fn new(table: &str, row: RowSelector) -> Self {
        Self {
            table: table.to_lowercase(),
            row,
            column: None,
            filter: None,
        }
    }
}
