//! The connection façade.
//!
//! A [`Connection`] is what application code talks to. It turns dotted keys
//! into queries, reads through the driver, and queues writes in a lazily
//! created [`Transaction`] until [`commit`](Connection::commit). Values
//! accepted for writing are mirrored in a [`WriteCache`] so that pending
//! changes can be read back before they are committed.
//!
//! ```text
//! NoTransaction --first write--> TransactionOpen
//! TransactionOpen --commit (ok or failed) | rollback | reset--> NoTransaction
//! ```

mod builder;
mod snapshot;
mod write;

pub use builder::ConnectionBuilder;
pub use snapshot::ConnectionSnapshot;

use crate::cache::WriteCache;
use crate::config::Config;
use crate::driver::{Driver, ResultSet};
use crate::error::{DbError, DbResult};
use crate::key::{KeyAddress, RowSelector};
use crate::last_modified::LastModifiedTracker;
use crate::query::{
    ExpectedResult, Query, QueryBuilder, Select, SelectCount, SelectExist, SelectOptions, Where,
};
use crate::schema::Schema;
use crate::session::{Clock, SessionContext};
use crate::transaction::Transaction;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::warn;
use yana_codec::Value;
use yana_storage::InMemoryBackend;

/// Key-addressed access to one schema through one driver.
#[derive(Debug)]
pub struct Connection {
    schema: Arc<Schema>,
    driver: Box<dyn Driver>,
    query_builder: QueryBuilder,
    transaction: Option<Transaction>,
    cache: WriteCache,
    tracker: Option<LastModifiedTracker>,
    session: SessionContext,
    config: Config,
    clock: Arc<dyn Clock>,
}

impl Connection {
    /// Creates a connection with default configuration and an anonymous
    /// session.
    pub fn new(schema: Arc<Schema>, driver: Box<dyn Driver>) -> Self {
        Self::builder(schema, driver).build()
    }

    /// Starts building a connection.
    pub fn builder(schema: Arc<Schema>, driver: Box<dyn Driver>) -> ConnectionBuilder {
        ConnectionBuilder::new(schema, driver)
    }

    /// Reads the value at `key`.
    ///
    /// # Errors
    ///
    /// See [`Connection::select_with`].
    pub fn select(&mut self, key: &str) -> DbResult<Value> {
        self.select_with(key, SelectOptions::default())
    }

    /// Reads the value at `key` with filter, order and paging.
    ///
    /// The result depends on what the key addresses:
    ///
    /// - a table: map of row id to row
    /// - a column: map of row id to cell value
    /// - a row: the row as a map, or `Null`
    /// - a cell: the value, or `Null`
    ///
    /// # Errors
    ///
    /// Malformed keys, unknown tables or columns, and driver errors.
    pub fn select_with(&mut self, key: &str, options: SelectOptions) -> DbResult<Value> {
        let address = self.query_builder.address(key)?;
        let select = self.query_builder.select_at(&address, options);
        self.select_query(&select)
    }

    /// Executes a prebuilt select.
    ///
    /// # Errors
    ///
    /// Driver errors.
    pub fn select_query(&mut self, select: &Select) -> DbResult<Value> {
        let result = self.driver.send_query(&Query::Select(select.clone()))?;
        Ok(shape(select, result))
    }

    /// Counts the rows of a table; 0 if the table does not exist.
    ///
    /// # Errors
    ///
    /// Driver errors.
    pub fn length(&mut self, table: &str) -> DbResult<usize> {
        self.length_with(table, None)
    }

    /// Counts the rows of a table matching `filter`.
    ///
    /// # Errors
    ///
    /// Driver errors.
    pub fn length_with(&mut self, table: &str, filter: Option<Where>) -> DbResult<usize> {
        if !self.schema.is_table(table) {
            return Ok(0);
        }
        let mut count = SelectCount::new(table);
        count.filter = filter;
        self.length_query(&count)
    }

    /// Executes a prebuilt count.
    ///
    /// # Errors
    ///
    /// Driver errors.
    pub fn length_query(&mut self, count: &SelectCount) -> DbResult<usize> {
        Ok(self.driver.send_query(&Query::Count(count.clone()))?.count)
    }

    /// Returns true if the table has no rows (or does not exist).
    ///
    /// # Errors
    ///
    /// Driver errors.
    pub fn is_empty(&mut self, table: &str) -> DbResult<bool> {
        Ok(self.length(table)? == 0)
    }

    /// Returns true if `key` exists.
    ///
    /// Table and column keys are answered from the schema, row and cell
    /// keys by the driver. A cell only exists if it is not `Null`.
    ///
    /// # Errors
    ///
    /// Malformed keys and driver errors.
    pub fn exists(&mut self, key: &str) -> DbResult<bool> {
        self.exists_with(key, None)
    }

    /// Returns true if `key` exists and matches `filter`.
    ///
    /// # Errors
    ///
    /// Malformed keys and driver errors.
    pub fn exists_with(&mut self, key: &str, filter: Option<Where>) -> DbResult<bool> {
        let address = KeyAddress::parse(key)?;
        let Ok(table) = self.schema.table(&address.table) else {
            return Ok(false);
        };
        if let Some(column) = &address.column {
            if !table.has_column(column) {
                return Ok(false);
            }
        }
        if !address.row.is_concrete() && filter.is_none() {
            return Ok(true);
        }
        if !address.path.is_empty() {
            let select = self.query_builder.select_at(
                &address,
                SelectOptions {
                    filter,
                    ..SelectOptions::default()
                },
            );
            return Ok(!self.select_query(&select)?.is_null());
        }
        let exist = self.query_builder.exist_at(&address, filter);
        self.exists_query(&exist)
    }

    /// Executes a prebuilt existence check.
    ///
    /// # Errors
    ///
    /// Driver errors.
    pub fn exists_query(&mut self, exist: &SelectExist) -> DbResult<bool> {
        Ok(self.driver.send_query(&Query::Exist(exist.clone()))?.count > 0)
    }

    /// Reads the uncommitted value at `key` from the write-cache.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for malformed keys.
    pub fn pending(&self, key: &str) -> DbResult<Option<Value>> {
        Ok(self.cache.lookup(&KeyAddress::parse(key)?))
    }

    /// Renders a value as a literal for the driver. `Null` is always `NULL`.
    pub fn quote(&self, value: &Value) -> String {
        if value.is_null() {
            return "NULL".to_string();
        }
        self.driver.quote(value)
    }

    /// Renders an identifier for the driver.
    pub fn quote_id(&self, name: &str) -> String {
        self.driver.quote_identifier(name)
    }

    /// Returns the schema.
    #[must_use]
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Returns the driver name.
    pub fn driver_name(&self) -> &str {
        self.driver.name()
    }

    /// Returns true unless the schema is read-only.
    pub fn is_writeable(&self) -> bool {
        !self.schema.is_readonly()
    }

    /// Returns the session.
    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    /// Replaces the session.
    pub fn set_session(&mut self, session: SessionContext) {
        self.session = session;
    }

    /// Returns the configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the open transaction, if any.
    pub fn transaction(&self) -> Option<&Transaction> {
        self.transaction.as_ref()
    }

    /// Returns the write-cache.
    pub fn write_cache(&self) -> &WriteCache {
        &self.cache
    }

    /// Replaces the query builder.
    pub fn set_query_builder(&mut self, query_builder: QueryBuilder) {
        self.query_builder = query_builder;
    }

    /// Returns the transaction, creating it on first use.
    fn open_transaction(&mut self) -> DbResult<&mut Transaction> {
        if self.transaction.is_none() {
            self.transaction = Some(Transaction::new(Arc::clone(&self.schema))?);
        }
        self.transaction
            .as_mut()
            .ok_or_else(|| DbError::not_writeable("no transaction"))
    }

    /// Returns the tracker, opening the configured file on first use.
    fn tracker(&mut self) -> &mut LastModifiedTracker {
        let config = &self.config;
        self.tracker.get_or_insert_with(|| {
            LastModifiedTracker::open(config).unwrap_or_else(|err| {
                warn!(
                    path = %config.last_modified_path().display(),
                    error = %err,
                    "cannot open last-modified file, tracking in memory"
                );
                LastModifiedTracker::new(Box::new(InMemoryBackend::new()))
            })
        })
    }

    /// Fails with `Timeout` if another user modified the row after the
    /// current session started.
    fn check_dirty_write(&mut self, table: &str, row: &str) -> DbResult<()> {
        if !self.config.strict_locking {
            return Ok(());
        }
        let Some(started_at) = self.session.started_at else {
            return Ok(());
        };
        let now = self.clock.now();
        let user = self.session.user.clone();
        let modified = self.tracker().check(table, row, &user, now);
        if modified > started_at {
            warn!(
                table,
                row,
                user = %user,
                modified,
                started_at,
                "row was modified by another user"
            );
            return Err(DbError::timeout(table, row));
        }
        Ok(())
    }

    /// Reads the committed value of a whole cell.
    fn stored_cell(&mut self, address: &KeyAddress) -> DbResult<Value> {
        let mut cell = address.clone();
        cell.path.clear();
        let select = self.query_builder.select_at(&cell, SelectOptions::default());
        self.select_query(&select)
    }

    /// Returns true if the row exists in storage.
    fn row_exists(&mut self, table: &str, id: &str) -> DbResult<bool> {
        self.exists_query(&SelectExist::new(table, RowSelector::Id(id.to_string())))
    }
}

/// Shapes a driver result according to what the select addresses.
fn shape(select: &Select, result: ResultSet) -> Value {
    let cell = |values: &crate::row::Row| -> Value {
        let Some(column) = &select.column else {
            return Value::Null;
        };
        let value = values.get(column).cloned().unwrap_or(Value::Null);
        if select.path.is_empty() {
            value
        } else {
            value.get_path(&select.path[..]).cloned().unwrap_or(Value::Null)
        }
    };

    match select.expected_result() {
        ExpectedResult::Table => Value::Map(
            result
                .rows
                .into_iter()
                .map(|r| (r.id, Value::Map(r.values)))
                .collect(),
        ),
        ExpectedResult::Column => Value::Map(
            result
                .rows
                .iter()
                .map(|r| (r.id.clone(), cell(&r.values)))
                .collect::<BTreeMap<_, _>>(),
        ),
        ExpectedResult::Row => result
            .rows
            .into_iter()
            .next()
            .map_or(Value::Null, |r| Value::Map(r.values)),
        ExpectedResult::Cell => result.first().map_or(Value::Null, |r| cell(&r.values)),
    }
}
