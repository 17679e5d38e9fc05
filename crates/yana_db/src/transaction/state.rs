//! Transaction state: validation and queueing.

use super::queue::{QueuedStatement, Statement};
use crate::error::{DbError, DbResult};
use crate::query::{Delete, ExpectedResult, Insert, Query, Update};
use crate::row::Row;
use crate::schema::{Schema, Table};
use crate::trigger::{TriggerCollection, TriggerEvent};
use std::sync::Arc;
use yana_codec::Value;

/// An ordered queue of pending statements for one schema.
///
/// The queue only grows until [`commit`](Transaction::commit) succeeds or
/// [`rollback`](Transaction::rollback) discards it.
#[derive(Debug)]
pub struct Transaction {
    schema: Arc<Schema>,
    pub(super) queue: Vec<QueuedStatement>,
}

impl Transaction {
    /// Creates an empty transaction.
    ///
    /// # Errors
    ///
    /// `NotWriteable` if the schema is read-only.
    pub fn new(schema: Arc<Schema>) -> DbResult<Self> {
        if schema.is_readonly() {
            return Err(DbError::not_writeable(format!(
                "schema {} is read-only",
                schema.name()
            )));
        }
        Ok(Self {
            schema,
            queue: Vec::new(),
        })
    }

    /// Returns the schema.
    #[must_use]
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Queues an update of a row or cell.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` unless the update addresses a row or a cell, or
    ///   if a value does not fit its column
    /// - `TableNotFound`, `NotWriteable`
    /// - `ConstraintViolation`
    /// - whatever a before-update trigger returns
    ///
    /// Nothing is queued on error.
    pub fn update(&mut self, query: Update) -> DbResult<()> {
        let query = Query::Update(query);
        let schema = Arc::clone(&self.schema);
        let table = writeable_table(
            &schema,
            &query,
            &[ExpectedResult::Row, ExpectedResult::Cell],
        )?;

        let input = match &query {
            Query::Update(Update {
                column: Some(column),
                value,
                ..
            }) => Row::from([(column.clone(), value.clone())]),
            Query::Update(Update {
                column: None,
                value: Value::Map(values),
                ..
            }) => values.clone(),
            _ => {
                return Err(DbError::invalid_argument(format!(
                    "row update needs a map of column values: {query}"
                )))
            }
        };
        check_columns(table, &input)?;
        table.constraints().check(&input)?;

        self.enqueue(table, query, TriggerEvent::BeforeUpdate, TriggerEvent::AfterUpdate)
    }

    /// Queues an insert.
    ///
    /// # Errors
    ///
    /// As for [`update`](Transaction::update); additionally
    /// `InvalidArgument` if a non-null column other than the primary key
    /// has no value.
    pub fn insert(&mut self, query: Insert) -> DbResult<()> {
        let query = Query::Insert(query);
        let schema = Arc::clone(&self.schema);
        let table = writeable_table(&schema, &query, &[ExpectedResult::Row])?;
        let Query::Insert(insert) = &query else {
            return Err(DbError::invalid_argument(format!("not an insert: {query}")));
        };

        check_columns(table, &insert.values)?;
        if let Some(missing) = table.columns().find(|c| {
            !c.is_nullable()
                && c.name() != table.primary_key()
                && insert.values.get(c.name()).map_or(true, Value::is_null)
        }) {
            return Err(DbError::invalid_argument(format!(
                "column {}.{} must not be null",
                table.name(),
                missing.name()
            )));
        }
        table.constraints().check(&insert.values)?;

        self.enqueue(table, query, TriggerEvent::BeforeInsert, TriggerEvent::AfterInsert)
    }

    /// Queues a delete. Constraints are not checked.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for cell or column targets, `TableNotFound`,
    /// `NotWriteable`, or whatever a before-delete trigger returns.
    pub fn remove(&mut self, query: Delete) -> DbResult<()> {
        let query = Query::Delete(query);
        let schema = Arc::clone(&self.schema);
        let table = writeable_table(
            &schema,
            &query,
            &[ExpectedResult::Row, ExpectedResult::Table],
        )?;

        self.enqueue(table, query, TriggerEvent::BeforeDelete, TriggerEvent::AfterDelete)
    }

    /// Queues a raw statement. No triggers fire for it.
    pub fn sql(&mut self, sql: impl Into<String>) {
        self.queue.push(QueuedStatement {
            statement: Statement::Sql(sql.into()),
            triggers: TriggerCollection::new(),
        });
    }

    /// Discards every queued statement. The driver is not touched.
    pub fn rollback(&mut self) {
        self.queue.clear();
    }

    /// Returns true if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Returns the number of queued statements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Iterates over the queued statements in order.
    pub fn statements(&self) -> impl Iterator<Item = &Statement> {
        self.queue.iter().map(|entry| &entry.statement)
    }

    fn enqueue(
        &mut self,
        table: &Table,
        query: Query,
        before: TriggerEvent,
        after: TriggerEvent,
    ) -> DbResult<()> {
        TriggerCollection::bind(table.triggers(before), before, table.name(), &query).fire()?;
        let triggers = TriggerCollection::bind(table.triggers(after), after, table.name(), &query);
        self.queue.push(QueuedStatement {
            statement: Statement::Query(query),
            triggers,
        });
        Ok(())
    }
}

/// Resolves the target table of a write and checks it accepts writes.
fn writeable_table<'s>(
    schema: &'s Schema,
    query: &Query,
    allowed: &[ExpectedResult],
) -> DbResult<&'s Table> {
    let expected = query.expected_result();
    if !allowed.contains(&expected) {
        return Err(DbError::invalid_argument(format!(
            "{expected:?} is not a valid target here: {query}"
        )));
    }
    let table = schema.table(query.table())?;
    if table.is_readonly() {
        return Err(DbError::not_writeable(format!(
            "table {} is read-only",
            table.name()
        )));
    }
    Ok(table)
}

/// Checks that every column exists, is writeable and accepts its value.
fn check_columns(table: &Table, values: &Row) -> DbResult<()> {
    for (name, value) in values {
        let column = table.column(name).ok_or_else(|| {
            DbError::invalid_argument(format!("unknown column {}.{name}", table.name()))
        })?;
        if column.is_readonly() {
            return Err(DbError::not_writeable(format!(
                "column {}.{} is read-only",
                table.name(),
                column.name()
            )));
        }
        if !column.accepts(value) {
            return Err(DbError::invalid_argument(format!(
                "value {value} does not fit column {}.{} ({:?})",
                table.name(),
                column.name(),
                column.column_type()
            )));
        }
    }
    Ok(())
}
