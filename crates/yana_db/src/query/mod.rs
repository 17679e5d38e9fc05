//! Query objects.
//!
//! A [`Query`] describes one logical operation. Queries are produced from
//! key addresses by the [`QueryBuilder`] or built directly, and executed by
//! a [`Driver`](crate::driver::Driver).

mod builder;
mod filter;
mod variants;

pub use builder::{QueryBuilder, SelectOptions};
pub use filter::{Operator, Where};
pub use variants::{Delete, Insert, Select, SelectCount, SelectExist, Update};

use crate::key::RowSelector;
use std::fmt;
use yana_codec::Value;

/// Shape of the result a query or key address denotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExpectedResult {
    /// One row.
    Row,
    /// One cell.
    Cell,
    /// Every row of a table.
    Table,
    /// One column across rows.
    Column,
}

impl ExpectedResult {
    /// Derives the result kind from a row selector and optional column.
    pub fn of(row: &RowSelector, column: Option<&str>) -> Self {
        match (row.is_concrete(), column.is_some()) {
            (false, false) => ExpectedResult::Table,
            (false, true) => ExpectedResult::Column,
            (true, false) => ExpectedResult::Row,
            (true, true) => ExpectedResult::Cell,
        }
    }
}

/// One logical database operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    /// Read.
    Select(Select),
    /// Change a row or cell.
    Update(Update),
    /// Add a row.
    Insert(Insert),
    /// Remove rows.
    Delete(Delete),
    /// Count rows.
    Count(SelectCount),
    /// Check existence.
    Exist(SelectExist),
}

impl Query {
    /// Returns the table name.
    pub fn table(&self) -> &str {
        match self {
            Query::Select(q) => &q.table,
            Query::Update(q) => &q.table,
            Query::Insert(q) => &q.table,
            Query::Delete(q) => &q.table,
            Query::Count(q) => &q.table,
            Query::Exist(q) => &q.table,
        }
    }

    fn row_selector(&self) -> &RowSelector {
        match self {
            Query::Select(q) => &q.row,
            Query::Update(q) => &q.row,
            Query::Insert(q) => &q.row,
            Query::Delete(q) => &q.row,
            Query::Count(q) => &q.row,
            Query::Exist(q) => &q.row,
        }
    }

    fn column_name(&self) -> Option<&str> {
        match self {
            Query::Select(q) => q.column.as_deref(),
            Query::Update(q) => q.column.as_deref(),
            Query::Count(q) => q.column.as_deref(),
            Query::Exist(q) => q.column.as_deref(),
            Query::Insert(_) | Query::Delete(_) => None,
        }
    }

    /// Returns the row key, `*` when the query is table-wide.
    pub fn row(&self) -> String {
        self.row_selector().to_string()
    }

    /// Returns the column, `*` when the query covers whole rows.
    pub fn column(&self) -> &str {
        self.column_name().unwrap_or("*")
    }

    /// Returns the values an update or insert writes.
    pub fn values(&self) -> Option<Value> {
        match self {
            Query::Update(q) => Some(q.value.clone()),
            Query::Insert(q) => Some(Value::Map(q.values.clone())),
            _ => None,
        }
    }

    /// Returns the kind of result the query addresses.
    ///
    /// An insert always addresses one row, even when its id is assigned by
    /// the driver.
    pub fn expected_result(&self) -> ExpectedResult {
        match self {
            Query::Insert(_) => ExpectedResult::Row,
            _ => ExpectedResult::of(self.row_selector(), self.column_name()),
        }
    }

    /// Returns true if executing the query would change nothing.
    ///
    /// This is the case for a whole-row update without values.
    pub fn is_empty(&self) -> bool {
        match self {
            Query::Update(q) => {
                q.column.is_none() && q.value.as_map().map_or(false, |m| m.is_empty())
            }
            _ => false,
        }
    }

    /// Returns true for update, insert and delete.
    pub fn is_write(&self) -> bool {
        matches!(self, Query::Update(_) | Query::Insert(_) | Query::Delete(_))
    }
}

fn write_target(f: &mut fmt::Formatter<'_>, table: &str, row: &RowSelector) -> fmt::Result {
    f.write_str(table)?;
    if let RowSelector::Id(id) = row {
        write!(f, " WHERE ID = {id:?}")?;
    }
    Ok(())
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Query::Select(q) => {
                let column = q.column.as_deref().unwrap_or("*");
                write!(f, "SELECT {column}")?;
                for segment in &q.path {
                    write!(f, "[{segment}]")?;
                }
                f.write_str(" FROM ")?;
                write_target(f, &q.table, &q.row)?;
                if let Some(filter) = &q.filter {
                    write!(f, " FILTER {filter}")?;
                }
                if let Some(order) = &q.order_by {
                    write!(
                        f,
                        " ORDER BY {order} {}",
                        if q.descending { "DESC" } else { "ASC" }
                    )?;
                }
                if let Some(limit) = q.limit {
                    write!(f, " LIMIT {limit}")?;
                }
                if q.offset > 0 {
                    write!(f, " OFFSET {}", q.offset)?;
                }
                Ok(())
            }
            Query::Update(q) => {
                write!(f, "UPDATE {} SET ", q.table)?;
                match &q.column {
                    Some(column) => write!(f, "{column} = {}", q.value)?,
                    None => write!(f, "{}", q.value)?,
                }
                if let RowSelector::Id(id) = &q.row {
                    write!(f, " WHERE ID = {id:?}")?;
                }
                Ok(())
            }
            Query::Insert(q) => {
                write!(f, "INSERT INTO {}", q.table)?;
                if let RowSelector::Id(id) = &q.row {
                    write!(f, " ({id:?})")?;
                }
                write!(f, " VALUES {}", Value::Map(q.values.clone()))
            }
            Query::Delete(q) => {
                f.write_str("DELETE FROM ")?;
                write_target(f, &q.table, &q.row)?;
                if let Some(filter) = &q.filter {
                    write!(f, " FILTER {filter}")?;
                }
                write!(f, " LIMIT {}", q.limit)
            }
            Query::Count(q) => {
                let column = q.column.as_deref().unwrap_or("*");
                write!(f, "SELECT COUNT({column}) FROM ")?;
                write_target(f, &q.table, &q.row)?;
                if let Some(filter) = &q.filter {
                    write!(f, " FILTER {filter}")?;
                }
                Ok(())
            }
            Query::Exist(q) => {
                f.write_str("SELECT EXISTS ")?;
                write_target(f, &q.table, &q.row)?;
                if let Some(filter) = &q.filter {
                    write!(f, " FILTER {filter}")?;
                }
                Ok(())
            }
        }
    }
}
