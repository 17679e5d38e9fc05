//! Writes through the connection.

use super::Connection;
use crate::error::{DbError, DbResult};
use crate::key::{KeyAddress, RowSelector};
use crate::query::{Delete, Insert, Update, Where};
use tracing::debug;
use yana_codec::Value;

impl Connection {
    /// Queues an update of the row or cell at `key`.
    ///
    /// If the key reaches into an array-typed cell (`table.row.column.a.b`),
    /// `value` is merged into the pending cell, or else the committed cell,
    /// or else an empty map, and the whole cell is written. Whole-row keys
    /// take a map of column values.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` for table-wide keys, malformed keys or values
    /// - `Timeout` if another user modified the row after the session started
    /// - everything [`Transaction::update`](crate::Transaction::update) returns
    pub fn update(&mut self, key: &str, value: impl Into<Value>) -> DbResult<()> {
        let address = self.query_builder.address(key)?;
        let id = concrete_row(&address, "update")?;
        self.check_dirty_write(&address.table, &id)?;

        let value = if address.path.is_empty() {
            value.into()
        } else {
            let mut cell = match self.cache.lookup(&cell_address(&address)) {
                Some(pending) => pending,
                None => self.stored_cell(&address)?,
            };
            if !cell.is_container() {
                cell = Value::empty_map();
            }
            cell.set_path(&address.path[..], value.into());
            cell
        };

        let update = self.query_builder.update_at(&address, value)?;
        self.queue_update(update)
    }

    /// Queues a prebuilt update.
    ///
    /// # Errors
    ///
    /// As for [`Connection::update`].
    pub fn update_query(&mut self, update: Update) -> DbResult<()> {
        if let RowSelector::Id(id) = &update.row {
            self.check_dirty_write(&update.table, id)?;
        }
        self.queue_update(update)
    }

    fn queue_update(&mut self, update: Update) -> DbResult<()> {
        self.open_transaction()?.update(update.clone())?;

        let Some(id) = update.row.id() else {
            return Ok(());
        };
        match (update.column, update.value) {
            (Some(column), value) => self.cache.set_cell(&update.table, id, &column, value),
            (None, Value::Map(values)) => self.cache.merge_row(&update.table, id, values),
            (None, _) => {}
        }
        Ok(())
    }

    /// Queues an insert of the row at `key`.
    ///
    /// `table.row` inserts under that row key; `table` or `table.*` takes
    /// the id from the primary key value, or lets the driver assign one.
    ///
    /// # Errors
    ///
    /// Malformed keys or values, and everything
    /// [`Transaction::insert`](crate::Transaction::insert) returns.
    pub fn insert(&mut self, key: &str, value: impl Into<Value>) -> DbResult<()> {
        let insert = self.query_builder.insert(key, value.into())?;
        self.insert_query(insert)
    }

    /// Queues a prebuilt insert.
    ///
    /// # Errors
    ///
    /// As for [`Connection::insert`].
    pub fn insert_query(&mut self, insert: Insert) -> DbResult<()> {
        self.open_transaction()?.insert(insert.clone())?;
        if let RowSelector::Id(id) = &insert.row {
            self.cache.insert_row(&insert.table, id, insert.values);
        }
        Ok(())
    }

    /// Updates the row at `key` if it is pending or stored, inserts it
    /// otherwise. A row removed earlier in the transaction counts as new.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for table-wide keys and for cell keys of rows that
    /// do not exist; otherwise as for update and insert.
    pub fn insert_or_update(&mut self, key: &str, value: impl Into<Value>) -> DbResult<()> {
        let address = self.query_builder.address(key)?;
        let id = concrete_row(&address, "insert_or_update")?;

        let known = !self.cache.is_removed(&address.table, &id)
            && (self.cache.contains_row(&address.table, &id)
                || self.row_exists(&address.table, &id)?);
        if known {
            debug!(key, "row exists, updating");
            return self.update(key, value);
        }
        if address.column.is_some() {
            return Err(DbError::invalid_argument(format!(
                "cannot set cell {address}: row {} does not exist",
                address.row
            )));
        }
        debug!(key, "row is new, inserting");
        self.insert(key, value)
    }

    /// Queues the removal of the row at `key`, at most
    /// `config.default_remove_limit` rows.
    ///
    /// # Errors
    ///
    /// See [`Connection::remove_with`].
    pub fn remove(&mut self, key: &str) -> DbResult<()> {
        let limit = self.config.default_remove_limit;
        self.remove_with(key, None, limit)
    }

    /// Queues the removal of at most `limit` rows selected by `key` and
    /// `filter`.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for a zero limit and for cell or column keys;
    /// otherwise everything [`Transaction::remove`](crate::Transaction::remove)
    /// returns.
    pub fn remove_with(&mut self, key: &str, filter: Option<Where>, limit: usize) -> DbResult<()> {
        check_limit(limit)?;
        let address = self.query_builder.address(key)?;
        if address.column.is_some() {
            return Err(DbError::invalid_argument(format!(
                "cannot remove {address}: cells and columns are not removable"
            )));
        }
        let delete = self.query_builder.delete_at(&address, filter, limit);
        self.remove_query(delete)
    }

    /// Queues a prebuilt delete.
    ///
    /// # Errors
    ///
    /// As for [`Connection::remove_with`].
    pub fn remove_query(&mut self, delete: Delete) -> DbResult<()> {
        check_limit(delete.limit)?;
        self.open_transaction()?.remove(delete.clone())?;
        if let RowSelector::Id(id) = &delete.row {
            self.cache.remove_row(&delete.table, id);
        }
        Ok(())
    }

    /// Queues a raw statement.
    ///
    /// # Errors
    ///
    /// `NotWriteable` if the schema is read-only.
    pub fn sql(&mut self, statement: impl Into<String>) -> DbResult<()> {
        self.open_transaction()?.sql(statement);
        Ok(())
    }

    /// Commits the pending transaction and resets the connection, whether
    /// the commit succeeded or not.
    ///
    /// # Errors
    ///
    /// Whatever [`Transaction::commit`](crate::Transaction::commit) returns.
    pub fn commit(&mut self) -> DbResult<()> {
        let result = match self.transaction.as_mut() {
            Some(transaction) => transaction.commit(self.driver.as_mut()),
            None => Ok(()),
        };
        self.reset();
        result
    }

    /// Discards the pending transaction and write-cache.
    pub fn rollback(&mut self) {
        self.reset();
    }

    /// Drops the transaction and clears the write-cache.
    pub fn reset(&mut self) {
        self.transaction = None;
        self.cache.clear();
    }
}

fn concrete_row(address: &KeyAddress, operation: &str) -> DbResult<String> {
    address.row.id().map(str::to_string).ok_or_else(|| {
        DbError::invalid_argument(format!("{operation} needs a row key, got {address}"))
    })
}

fn cell_address(address: &KeyAddress) -> KeyAddress {
    KeyAddress {
        path: Vec::new(),
        ..address.clone()
    }
}

fn check_limit(limit: usize) -> DbResult<()> {
    if limit == 0 {
        return Err(DbError::invalid_argument("remove limit must be at least 1"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::Constraint;
    use crate::driver::FileDbDriver;
    use crate::row::Row;
    use crate::schema::{Column, ColumnType, Schema, Table};
    use crate::transaction::{Statement, Transaction};
    use std::sync::Arc;
    use yana_storage::InMemoryBackend;

    fn connection() -> Connection {
        let schema = Arc::new(
            Schema::new("app").with_table(
                Table::new("t", "id")
                    .with_column(Column::new("id", ColumnType::Integer))
                    .with_column(Column::new("name", ColumnType::Text))
                    .with_column(Column::new("arr", ColumnType::Array))
                    .with_constraint(Constraint::new("no_root", |row: &Row| {
                        row.get("NAME") != Some(&Value::from("root"))
                    })),
            ),
        );
        let driver = FileDbDriver::in_memory(Arc::clone(&schema));
        Connection::builder(schema, Box::new(driver))
            .last_modified_backend(Box::new(InMemoryBackend::new()))
            .build()
    }

    #[test]
    fn array_updates_accumulate() {
        let mut db = connection();
        db.update("t.1.arr.k1", "a").unwrap();
        db.update("t.1.arr.k2", "b").unwrap();

        assert_eq!(
            db.pending("t.1.arr").unwrap(),
            Some(Value::map([("k1", "a"), ("k2", "b")]))
        );
        assert_eq!(db.pending("t.1.arr.k2").unwrap(), Some(Value::from("b")));
    }

    #[test]
    fn array_update_merges_into_stored_cell() {
        let mut db = connection();
        db.insert("t.1", Value::map([("arr", Value::map([("k1", "a")]))]))
            .unwrap();
        db.commit().unwrap();

        db.update("t.1.arr.k2", "b").unwrap();
        db.commit().unwrap();
        assert_eq!(
            db.select("t.1.arr").unwrap(),
            Value::map([("k1", "a"), ("k2", "b")])
        );
    }

    #[test]
    fn update_needs_a_row() {
        let mut db = connection();
        assert!(matches!(
            db.update("t.*.name", "x"),
            Err(DbError::InvalidArgument { .. })
        ));
        assert!(db.transaction().is_none());
    }

    #[test]
    fn insert_or_update_routes() {
        let mut db = connection();
        db.insert_or_update("t.5", Value::map([("name", "new")]))
            .unwrap();
        db.insert_or_update("t.5.name", "changed").unwrap();

        let kinds: Vec<_> = db
            .transaction()
            .unwrap()
            .statements()
            .filter_map(Statement::as_query)
            .map(|q| q.to_string().split(' ').next().unwrap_or_default().to_string())
            .collect();
        assert_eq!(kinds, vec!["INSERT", "UPDATE"]);

        assert!(matches!(
            db.insert_or_update("t.6.name", "x"),
            Err(DbError::InvalidArgument { .. })
        ));
        assert!(matches!(
            db.insert_or_update("t", Value::empty_map()),
            Err(DbError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn insert_or_update_sees_stored_rows() {
        let mut db = connection();
        db.insert("t.1", Value::map([("name", "a")])).unwrap();
        db.commit().unwrap();

        db.insert_or_update("t.1.name", "b").unwrap();
        db.commit().unwrap();
        assert_eq!(db.select("t.1.name").unwrap(), Value::from("b"));
    }

    #[test]
    fn insert_or_update_after_remove_inserts() {
        let mut db = connection();
        db.insert("t.1", Value::map([("name", "a")])).unwrap();
        db.commit().unwrap();

        db.remove("t.1").unwrap();
        assert!(matches!(
            db.insert_or_update("t.1.name", "b"),
            Err(DbError::InvalidArgument { .. })
        ));
        db.insert_or_update("t.1", Value::map([("name", "b")]))
            .unwrap();
        db.insert_or_update("t.1.name", "c").unwrap();

        let kinds: Vec<_> = db
            .transaction()
            .unwrap()
            .statements()
            .filter_map(Statement::as_query)
            .map(|q| q.to_string().split(' ').next().unwrap_or_default().to_string())
            .collect();
        assert_eq!(kinds, vec!["DELETE", "INSERT", "UPDATE"]);

        db.commit().unwrap();
        assert_eq!(db.select("t.1.name").unwrap(), Value::from("c"));
    }

    #[test]
    fn remove_limits() {
        let mut db = connection();
        for id in ["1", "2", "3"] {
            db.insert(&format!("t.{id}"), Value::empty_map()).unwrap();
        }
        db.commit().unwrap();

        db.remove("t").unwrap();
        db.commit().unwrap();
        assert_eq!(db.length("t").unwrap(), 2);

        assert!(matches!(
            db.remove_with("t", None, 0),
            Err(DbError::InvalidArgument { .. })
        ));
        assert!(matches!(
            db.remove("t.1.name"),
            Err(DbError::InvalidArgument { .. })
        ));

        db.remove_with("t", None, 10).unwrap();
        db.commit().unwrap();
        assert!(db.is_empty("t").unwrap());
    }

    #[test]
    fn removed_row_leaves_the_cache() {
        let mut db = connection();
        db.insert("t.1", Value::map([("name", "a")])).unwrap();
        db.remove("t.1").unwrap();
        assert_eq!(db.pending("t.1").unwrap(), None);
        assert_eq!(db.transaction().map(Transaction::len), Some(2));
    }

    #[test]
    fn constraint_gate_leaves_state_untouched() {
        let mut db = connection();
        db.update("t.1.name", "ok").unwrap();
        assert!(matches!(
            db.update("t.1.name", "root"),
            Err(DbError::ConstraintViolation { .. })
        ));
        assert_eq!(db.transaction().map(Transaction::len), Some(1));
        assert_eq!(db.pending("t.1.name").unwrap(), Some(Value::from("ok")));
    }

    #[test]
    fn commit_and_rollback_reset() {
        let mut db = connection();
        db.insert("t.1", Value::empty_map()).unwrap();
        db.rollback();
        assert!(db.transaction().is_none());
        assert!(db.write_cache().is_empty());

        db.insert("t.1", Value::empty_map()).unwrap();
        db.insert("t.1", Value::empty_map()).unwrap();
        assert!(db.commit().is_err());
        assert!(db.transaction().is_none());
        assert!(db.write_cache().is_empty());
        assert_eq!(db.length("t").unwrap(), 0);

        db.commit().unwrap();
    }

    #[test]
    fn raw_sql_fails_on_filedb() {
        let mut db = connection();
        db.sql("DELETE FROM t").unwrap();
        assert!(matches!(db.commit(), Err(DbError::QueryFailed { .. })));
    }
}
