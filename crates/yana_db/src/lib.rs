//! # Yana DB
//!
//! Key-addressed database abstraction for the Yana framework.
//!
//! Application code names its targets with dotted keys such as
//! `"users.42.name"` instead of writing statements. A [`Connection`] turns
//! those keys into query objects, reads through a pluggable [`Driver`] and
//! queues writes in a [`Transaction`] until they are committed.
//!
//! This crate provides:
//! - key addresses and the [`QueryBuilder`] that validates them against a
//!   [`Schema`]
//! - declared [`constraint`]s and before/after [`trigger`]s
//! - queued transactions replayed inside a begin/commit envelope
//! - a write-cache of pending values
//! - detection of writes that would overwrite another user's concurrent edit
//! - the bundled [`FileDbDriver`]
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use yana_db::{Column, ColumnType, Connection, FileDbDriver, Schema, Table, Value};
//!
//! let schema = Arc::new(Schema::new("app").with_table(
//!     Table::new("users", "id")
//!         .with_column(Column::new("id", ColumnType::Text))
//!         .with_column(Column::new("name", ColumnType::Text)),
//! ));
//! let driver = FileDbDriver::in_memory(Arc::clone(&schema));
//! let mut db = Connection::new(schema, Box::new(driver));
//!
//! db.insert("users.ann", Value::map([("name", "Ann")])).unwrap();
//! db.update("users.ann.name", "Anna").unwrap();
//! db.commit().unwrap();
//!
//! assert_eq!(db.select("users.ann.name").unwrap(), Value::from("Anna"));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cache;
mod config;
mod connection;
pub mod constraint;
pub mod driver;
mod error;
mod key;
mod last_modified;
pub mod query;
mod row;
pub mod schema;
mod session;
mod transaction;
pub mod trigger;

pub use cache::WriteCache;
pub use config::{Config, DEFAULT_LAST_MODIFIED_FILE};
pub use connection::{Connection, ConnectionBuilder, ConnectionSnapshot};
pub use constraint::{ColumnConstraint, Constraint, ConstraintSet, RowConstraint};
pub use driver::{Driver, FileDbDriver, FileDbImage, ResultRow, ResultSet};
pub use error::{DbError, DbResult};
pub use key::{KeyAddress, RowSelector};
pub use last_modified::{LastModified, LastModifiedMap, LastModifiedTracker};
pub use query::{
    Delete, ExpectedResult, Insert, Operator, Query, QueryBuilder, Select, SelectCount,
    SelectExist, SelectOptions, Update, Where,
};
pub use row::{normalize_row, Row};
pub use schema::{Column, ColumnType, Schema, Table};
pub use session::{Clock, ManualClock, SessionContext, SystemClock, ANONYMOUS_USER};
pub use transaction::{QueuedStatement, Statement, Transaction};
pub use trigger::{trigger, TriggerCollection, TriggerContext, TriggerEvent, TriggerFn, TriggerSet};
pub use yana_codec::Value;
