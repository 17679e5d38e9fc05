//! Builds query objects from key addresses.

use super::filter::Where;
use super::variants::{Delete, Insert, Select, SelectCount, SelectExist, Update};
use crate::error::{DbError, DbResult};
use crate::key::{KeyAddress, RowSelector};
use crate::row::{normalize_row, Row};
use crate::schema::{Column, ColumnType, Schema, Table};
use std::sync::Arc;
use yana_codec::Value;

/// Options for [`QueryBuilder::select`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectOptions {
    /// Row filter.
    pub filter: Option<Where>,
    /// Column to order by.
    pub order_by: Option<String>,
    /// Reverse the order.
    pub descending: bool,
    /// Rows to skip.
    pub offset: usize,
    /// Maximum number of rows.
    pub limit: Option<usize>,
}

impl SelectOptions {
    /// Sets the filter.
    #[must_use]
    pub fn filter(mut self, filter: Where) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Orders by `column`; the name is upper-cased.
    #[must_use]
    pub fn order_by(mut self, column: &str, descending: bool) -> Self {
        self.order_by = Some(column.to_uppercase());
        self.descending = descending;
        self
    }

    /// Skips `offset` rows.
    #[must_use]
    pub const fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Returns at most `limit` rows.
    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Turns key addresses into query objects, validated against a schema.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    schema: Arc<Schema>,
}

impl QueryBuilder {
    /// Creates a builder for `schema`.
    pub fn new(schema: Arc<Schema>) -> Self {
        Self { schema }
    }

    /// Returns the schema.
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Parses `key` and checks it against the schema.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for malformed keys, unknown columns, or a
    /// sub-address into a column that is not array-typed;
    /// `TableNotFound` for unknown tables.
    pub fn address(&self, key: &str) -> DbResult<KeyAddress> {
        let address = KeyAddress::parse(key)?;
        let table = self.schema.table(&address.table)?;
        if let Some(column) = &address.column {
            let column = Self::column(table, column)?;
            if !address.path.is_empty() && !column.is_array() {
                return Err(DbError::invalid_argument(format!(
                    "column {}.{} is not an array and has no sub-address",
                    table.name(),
                    column.name()
                )));
            }
        }
        Ok(address)
    }

    fn column<'t>(table: &'t Table, name: &str) -> DbResult<&'t Column> {
        table.column(name).ok_or_else(|| {
            DbError::invalid_argument(format!("unknown column {}.{name}", table.name()))
        })
    }

    /// Builds a select from an address.
    pub fn select_at(&self, address: &KeyAddress, options: SelectOptions) -> Select {
        Select {
            table: address.table.clone(),
            row: address.row.clone(),
            column: address.column.clone(),
            path: address.path.clone(),
            filter: options.filter,
            order_by: options.order_by,
            descending: options.descending,
            offset: options.offset,
            limit: options.limit,
        }
    }

    /// Builds an update from an address.
    ///
    /// The sub-address is not part of the update; callers merge `value` into
    /// the full cell first. Whole-row updates take a map of column values.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if a whole-row value is not a map or names an
    /// unknown column.
    pub fn update_at(&self, address: &KeyAddress, value: Value) -> DbResult<Update> {
        let value = match &address.column {
            Some(_) => value,
            None => {
                let table = self.schema.table(&address.table)?;
                let row = normalize_row(value)?;
                Self::check_columns(table, &row)?;
                Value::Map(row)
            }
        };
        Ok(Update {
            table: address.table.clone(),
            row: address.row.clone(),
            column: address.column.clone(),
            value,
        })
    }

    /// Builds an insert from an address.
    ///
    /// For a concrete row the primary key is filled in from the row key, or
    /// must agree with it. For `*` the row id is taken from the primary key
    /// value if one is given; otherwise the driver assigns one.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for cell addresses, non-map values, unknown columns,
    /// or a primary key that contradicts the row key.
    pub fn insert_at(&self, address: &KeyAddress, value: Value) -> DbResult<Insert> {
        if address.column.is_some() {
            return Err(DbError::invalid_argument(format!(
                "cannot insert into cell {address}; insert whole rows"
            )));
        }
        let table = self.schema.table(&address.table)?;
        let mut values = normalize_row(value)?;
        Self::check_columns(table, &values)?;

        let pk = table.primary_key().to_string();
        let given = values.get(&pk).cloned();
        let row = match (&address.row, given) {
            (RowSelector::Id(id), Some(given)) => {
                if given.to_key_string().as_deref() != Some(id.as_str()) {
                    return Err(DbError::invalid_argument(format!(
                        "primary key {pk} = {given} contradicts row key {id}"
                    )));
                }
                address.row.clone()
            }
            (RowSelector::Id(id), None) => {
                values.insert(pk, id_value(table.column(table.primary_key()), id));
                address.row.clone()
            }
            (RowSelector::All, Some(given)) => match given.to_key_string() {
                Some(id) => RowSelector::Id(id),
                None => RowSelector::All,
            },
            (RowSelector::All, None) => RowSelector::All,
        };

        Ok(Insert {
            table: address.table.clone(),
            row,
            values,
        })
    }

    /// Builds a delete from an address.
    pub fn delete_at(&self, address: &KeyAddress, filter: Option<Where>, limit: usize) -> Delete {
        Delete {
            table: address.table.clone(),
            row: address.row.clone(),
            filter,
            limit,
        }
    }

    /// Builds a count from an address.
    pub fn count_at(&self, address: &KeyAddress, filter: Option<Where>) -> SelectCount {
        SelectCount {
            table: address.table.clone(),
            row: address.row.clone(),
            column: address.column.clone(),
            filter,
        }
    }

    /// Builds an existence check from an address.
    pub fn exist_at(&self, address: &KeyAddress, filter: Option<Where>) -> SelectExist {
        SelectExist {
            table: address.table.clone(),
            row: address.row.clone(),
            column: address.column.clone(),
            filter,
        }
    }

    /// Parses `key` and builds a select.
    ///
    /// # Errors
    ///
    /// See [`QueryBuilder::address`].
    pub fn select(&self, key: &str, options: SelectOptions) -> DbResult<Select> {
        Ok(self.select_at(&self.address(key)?, options))
    }

    /// Parses `key` and builds an update.
    ///
    /// # Errors
    ///
    /// See [`QueryBuilder::address`] and [`QueryBuilder::update_at`].
    pub fn update(&self, key: &str, value: Value) -> DbResult<Update> {
        self.update_at(&self.address(key)?, value)
    }

    /// Parses `key` and builds an insert.
    ///
    /// # Errors
    ///
    /// See [`QueryBuilder::address`] and [`QueryBuilder::insert_at`].
    pub fn insert(&self, key: &str, value: Value) -> DbResult<Insert> {
        self.insert_at(&self.address(key)?, value)
    }

    /// Parses `key` and builds a single-row delete.
    ///
    /// # Errors
    ///
    /// See [`QueryBuilder::address`].
    pub fn delete(&self, key: &str) -> DbResult<Delete> {
        Ok(self.delete_at(&self.address(key)?, None, 1))
    }

    /// Parses `key` and builds a count.
    ///
    /// # Errors
    ///
    /// See [`QueryBuilder::address`].
    pub fn count(&self, key: &str) -> DbResult<SelectCount> {
        Ok(self.count_at(&self.address(key)?, None))
    }

    /// Parses `key` and builds an existence check.
    ///
    /// # Errors
    ///
    /// See [`QueryBuilder::address`].
    pub fn exist(&self, key: &str) -> DbResult<SelectExist> {
        Ok(self.exist_at(&self.address(key)?, None))
    }

    fn check_columns(table: &Table, row: &Row) -> DbResult<()> {
        for column in row.keys() {
            Self::column(table, column)?;
        }
        Ok(())
    }
}

/// Converts a row key into a value for the primary key column.
fn id_value(column: Option<&Column>, id: &str) -> Value {
    match column.map(Column::column_type) {
        Some(ColumnType::Integer) => id
            .parse::<i64>()
            .map_or_else(|_| Value::from(id), Value::Integer),
        _ => Value::from(id),
    }
}
