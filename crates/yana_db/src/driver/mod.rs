//! Backend drivers.
//!
//! A [`Driver`] executes one physical statement at a time and wraps them in
//! the backend's transaction primitives. The crate ships [`FileDbDriver`];
//! other backends implement the trait themselves.

mod filedb;

pub use filedb::{FileDbDriver, FileDbImage, TableRows};

use crate::error::DbResult;
use crate::query::Query;
use crate::row::Row;
use std::fmt;
use yana_codec::Value;

/// One row of a result set.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    /// Row key.
    pub id: String,
    /// Column values (possibly projected to a single column).
    pub values: Row,
}

/// Result of executing a statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    /// Returned rows, in result order.
    pub rows: Vec<ResultRow>,
    /// Number of rows matched or affected.
    pub count: usize,
}

impl ResultSet {
    /// A result without rows.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A result that only carries a count.
    pub fn affected(count: usize) -> Self {
        Self {
            rows: Vec::new(),
            count,
        }
    }

    /// A result carrying rows; the count is the number of rows.
    pub fn from_rows(rows: Vec<ResultRow>) -> Self {
        let count = rows.len();
        Self { rows, count }
    }

    /// Returns the first row.
    pub fn first(&self) -> Option<&ResultRow> {
        self.rows.first()
    }

    /// Returns true if there are no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A database backend.
pub trait Driver: Send + fmt::Debug {
    /// Short backend name, e.g. `filedb`.
    fn name(&self) -> &str;

    /// Opens a backend transaction.
    ///
    /// # Errors
    ///
    /// Backend specific.
    fn begin_transaction(&mut self) -> DbResult<()>;

    /// Commits the open backend transaction.
    ///
    /// # Errors
    ///
    /// Backend specific.
    fn commit(&mut self) -> DbResult<()>;

    /// Rolls back the open backend transaction.
    ///
    /// # Errors
    ///
    /// Backend specific.
    fn rollback(&mut self) -> DbResult<()>;

    /// Executes a query object.
    ///
    /// # Errors
    ///
    /// `QueryFailed` when the backend rejects the statement.
    fn send_query(&mut self, query: &Query) -> DbResult<ResultSet>;

    /// Executes a raw statement.
    ///
    /// # Errors
    ///
    /// `QueryFailed` when the backend rejects the statement.
    fn send_sql(&mut self, sql: &str) -> DbResult<ResultSet>;

    /// Renders a value as a literal.
    fn quote(&self, value: &Value) -> String {
        quote_literal(value)
    }

    /// Renders an identifier.
    fn quote_identifier(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}

/// Standard literal quoting shared by the bundled drivers.
pub fn quote_literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(b) => if *b { "1" } else { "0" }.to_string(),
        Value::Integer(n) => n.to_string(),
        Value::Float(x) => x.to_string(),
        Value::Text(s) => format!("'{}'", s.replace('\'', "''")),
        Value::Bytes(bytes) => {
            let hex: String = bytes.iter().map(|b| format!("{b:02X}")).collect();
            format!("X'{hex}'")
        }
        container => format!("'{}'", container.to_string().replace('\'', "''")),
    }
}
