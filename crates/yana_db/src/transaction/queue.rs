//! Queued statements.

use crate::query::Query;
use crate::trigger::TriggerCollection;
use std::fmt;

/// One physical statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// A query object.
    Query(Query),
    /// A raw statement, passed to the driver unchanged.
    Sql(String),
}

impl Statement {
    /// Returns true if executing the statement would do nothing.
    pub fn is_empty(&self) -> bool {
        match self {
            Statement::Query(query) => query.is_empty(),
            Statement::Sql(sql) => sql.trim().is_empty(),
        }
    }

    /// Returns the query object, if any.
    pub fn as_query(&self) -> Option<&Query> {
        match self {
            Statement::Query(query) => Some(query),
            Statement::Sql(_) => None,
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Query(query) => write!(f, "{query}"),
            Statement::Sql(sql) => f.write_str(sql),
        }
    }
}

/// A statement and the after-triggers to fire once it executed.
#[derive(Debug, Clone)]
pub struct QueuedStatement {
    /// The statement.
    pub statement: Statement,
    /// After-triggers bound to the statement.
    pub triggers: TriggerCollection,
}
