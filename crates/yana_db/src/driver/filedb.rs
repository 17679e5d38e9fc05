//! FileDB: the bundled flat-file backend.
//!
//! Tables live in memory as `table -> row id -> Row`. When opened on a
//! [`StorageBackend`] the whole image is loaded up front and rewritten as
//! CBOR on every commit. A transaction is a snapshot of the image taken at
//! `begin_transaction` and restored on `rollback` or when the image cannot
//! be written.

use super::{Driver, ResultRow, ResultSet};
use crate::error::{DbError, DbResult};
use crate::key::RowSelector;
use crate::query::{Delete, Insert, Query, Select, SelectCount, SelectExist, Update, Where};
use crate::row::Row;
use crate::schema::{ColumnType, Schema};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;
use yana_codec::{from_cbor, to_cbor, Value};
use yana_storage::StorageBackend;

/// Rows of one table, keyed by row id.
pub type TableRows = BTreeMap<String, Row>;

/// The persisted content of a FileDB database.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileDbImage {
    /// Table name to rows.
    pub tables: BTreeMap<String, TableRows>,
}

impl FileDbImage {
    /// Reads an image; an empty backend yields an empty image.
    ///
    /// # Errors
    ///
    /// Storage errors and `Codec` errors for corrupt content.
    pub fn load(backend: &dyn StorageBackend) -> DbResult<Self> {
        let bytes = backend.load()?;
        if bytes.is_empty() {
            return Ok(Self::default());
        }
        Ok(from_cbor(&bytes)?)
    }

    /// Writes the image, replacing previous content.
    ///
    /// # Errors
    ///
    /// Storage and codec errors.
    pub fn save(&self, backend: &mut dyn StorageBackend) -> DbResult<()> {
        let bytes = to_cbor(self)?;
        backend.replace(&bytes)?;
        Ok(())
    }

    /// Returns the rows of a table.
    pub fn table(&self, name: &str) -> Option<&TableRows> {
        self.tables.get(name)
    }

    /// Returns the total number of rows.
    pub fn row_count(&self) -> usize {
        self.tables.values().map(BTreeMap::len).sum()
    }
}

/// Driver for the FileDB backend.
#[derive(Debug)]
pub struct FileDbDriver {
    schema: Arc<Schema>,
    image: FileDbImage,
    snapshot: Option<FileDbImage>,
    backend: Option<Box<dyn StorageBackend>>,
}

impl FileDbDriver {
    /// Creates a driver that keeps everything in memory.
    pub fn in_memory(schema: Arc<Schema>) -> Self {
        Self {
            schema,
            image: FileDbImage::default(),
            snapshot: None,
            backend: None,
        }
    }

    /// Opens a driver on a storage backend, loading its image.
    ///
    /// # Errors
    ///
    /// See [`FileDbImage::load`].
    pub fn open(schema: Arc<Schema>, backend: Box<dyn StorageBackend>) -> DbResult<Self> {
        let image = FileDbImage::load(backend.as_ref())?;
        debug!(
            location = %backend.location(),
            rows = image.row_count(),
            "opened filedb image"
        );
        Ok(Self {
            schema,
            image,
            snapshot: None,
            backend: Some(backend),
        })
    }

    /// Returns the current (possibly uncommitted) image.
    pub fn image(&self) -> &FileDbImage {
        &self.image
    }

    /// Returns true while a transaction is open.
    pub fn in_transaction(&self) -> bool {
        self.snapshot.is_some()
    }

    fn rows(&self, table: &str) -> DbResult<Option<&TableRows>> {
        self.schema.table(table)?;
        Ok(self.image.tables.get(table))
    }

    fn rows_mut(&mut self, table: &str) -> DbResult<&mut TableRows> {
        self.schema.table(table)?;
        Ok(self.image.tables.entry(table.to_string()).or_default())
    }

    fn select(&self, query: &Select) -> DbResult<ResultSet> {
        let Some(rows) = self.rows(&query.table)? else {
            return Ok(ResultSet::empty());
        };
        let mut matched = matching(rows, &query.row, query.filter.as_ref());

        if let Some(column) = &query.order_by {
            matched.sort_by(|(_, a), (_, b)| {
                let left = a.get(column).unwrap_or(&Value::Null);
                let right = b.get(column).unwrap_or(&Value::Null);
                left.compare(right).unwrap_or(Ordering::Equal)
            });
        }
        if query.descending {
            matched.reverse();
        }

        let result: Vec<ResultRow> = matched
            .into_iter()
            .skip(query.offset)
            .take(query.limit.unwrap_or(usize::MAX))
            .map(|(id, row)| ResultRow {
                id: id.clone(),
                values: match &query.column {
                    Some(column) => row
                        .get(column)
                        .map(|v| Row::from([(column.clone(), v.clone())]))
                        .unwrap_or_default(),
                    None => row.clone(),
                },
            })
            .collect();
        Ok(ResultSet::from_rows(result))
    }

    fn count(&self, query: &SelectCount) -> DbResult<ResultSet> {
        let Some(rows) = self.rows(&query.table)? else {
            return Ok(ResultSet::affected(0));
        };
        let count = matching(rows, &query.row, query.filter.as_ref())
            .into_iter()
            .filter(|(_, row)| non_null(row, query.column.as_deref()))
            .count();
        Ok(ResultSet::affected(count))
    }

    fn exist(&self, query: &SelectExist) -> DbResult<ResultSet> {
        let Some(rows) = self.rows(&query.table)? else {
            return Ok(ResultSet::affected(0));
        };
        let found = matching(rows, &query.row, query.filter.as_ref())
            .into_iter()
            .any(|(_, row)| non_null(row, query.column.as_deref()));
        Ok(ResultSet::affected(usize::from(found)))
    }

    fn insert(&mut self, query: &Insert) -> DbResult<ResultSet> {
        let table = self.schema.table(&query.table)?;
        let pk = table.primary_key().to_string();
        let pk_is_integer = table
            .column(&pk)
            .map_or(false, |c| c.column_type() == ColumnType::Integer);

        let rows = self.rows_mut(&query.table)?;
        let mut values = query.values.clone();
        let id = match &query.row {
            RowSelector::Id(id) => id.clone(),
            RowSelector::All => {
                let next = next_id(&query.table, rows)?;
                values.insert(
                    pk,
                    if pk_is_integer {
                        Value::Integer(next)
                    } else {
                        Value::from(next.to_string())
                    },
                );
                next.to_string()
            }
        };

        if rows.contains_key(&id) {
            return Err(DbError::query_failed(
                Query::Insert(query.clone()),
                format!("duplicate key {id}"),
            ));
        }
        rows.insert(id.clone(), values.clone());
        Ok(ResultSet::from_rows(vec![ResultRow { id, values }]))
    }

    fn update(&mut self, query: &Update) -> DbResult<ResultSet> {
        let RowSelector::Id(id) = &query.row else {
            return Err(DbError::query_failed(
                Query::Update(query.clone()),
                "update needs a row key",
            ));
        };
        let rows = self.rows_mut(&query.table)?;
        let Some(row) = rows.get_mut(id) else {
            return Ok(ResultSet::affected(0));
        };
        match (&query.column, &query.value) {
            (Some(column), value) => {
                row.insert(column.clone(), value.clone());
            }
            (None, Value::Map(values)) => {
                row.extend(values.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
            (None, other) => {
                return Err(DbError::query_failed(
                    Query::Update(query.clone()),
                    format!("row update needs a map, got {other}"),
                ));
            }
        }
        Ok(ResultSet::affected(1))
    }

    fn delete(&mut self, query: &Delete) -> DbResult<ResultSet> {
        let rows = self.rows_mut(&query.table)?;
        let doomed: Vec<String> = matching(rows, &query.row, query.filter.as_ref())
            .into_iter()
            .take(query.limit)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &doomed {
            rows.remove(id);
        }
        Ok(ResultSet::affected(doomed.len()))
    }
}

impl Driver for FileDbDriver {
    fn name(&self) -> &str {
        "filedb"
    }

    fn begin_transaction(&mut self) -> DbResult<()> {
        self.snapshot = Some(self.image.clone());
        Ok(())
    }

    fn commit(&mut self) -> DbResult<()> {
        if let Some(backend) = self.backend.as_mut() {
            if let Err(err) = self.image.save(backend.as_mut()) {
                if let Some(snapshot) = self.snapshot.take() {
                    self.image = snapshot;
                }
                return Err(err);
            }
            debug!(location = %backend.location(), "filedb image written");
        }
        self.snapshot = None;
        Ok(())
    }

    fn rollback(&mut self) -> DbResult<()> {
        if let Some(snapshot) = self.snapshot.take() {
            self.image = snapshot;
        }
        Ok(())
    }

    fn send_query(&mut self, query: &Query) -> DbResult<ResultSet> {
        match query {
            Query::Select(q) => self.select(q),
            Query::Count(q) => self.count(q),
            Query::Exist(q) => self.exist(q),
            Query::Insert(q) => self.insert(q),
            Query::Update(q) => self.update(q),
            Query::Delete(q) => self.delete(q),
        }
    }

    fn send_sql(&mut self, sql: &str) -> DbResult<ResultSet> {
        Err(DbError::query_failed(sql, "filedb does not execute raw sql"))
    }
}

/// Rows selected by `row` and `filter`, in id order.
fn matching<'a>(
    rows: &'a TableRows,
    row: &RowSelector,
    filter: Option<&Where>,
) -> Vec<(&'a String, &'a Row)> {
    let selected: Box<dyn Iterator<Item = (&'a String, &'a Row)> + 'a> = match row {
        RowSelector::All => Box::new(rows.iter()),
        RowSelector::Id(id) => Box::new(rows.get_key_value(id).into_iter()),
    };
    selected
        .filter(|(_, values)| filter.map_or(true, |f| f.matches(values)))
        .collect()
}

fn non_null(row: &Row, column: Option<&str>) -> bool {
    column.map_or(true, |c| row.get(c).map_or(false, |v| !v.is_null()))
}

/// One past the largest numeric id in the table, starting at 1.
fn next_id(table: &str, rows: &TableRows) -> DbResult<i64> {
    match rows.keys().filter_map(|id| id.parse::<i64>().ok()).max() {
        None => Ok(1),
        Some(max) => max.checked_add(1).ok_or_else(|| {
            DbError::query_failed(
                format!("INSERT INTO {table}"),
                format!("no id left after {max}"),
            )
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Column, Table};
    use yana_storage::InMemoryBackend;

    fn schema() -> Arc<Schema> {
        Arc::new(
            Schema::new("app").with_table(
                Table::new("users", "id")
                    .with_column(Column::new("id", ColumnType::Integer))
                    .with_column(Column::new("name", ColumnType::Text))
                    .with_column(Column::new("age", ColumnType::Integer)),
            ),
        )
    }

    fn row(pairs: &[(&str, Value)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn seeded() -> FileDbDriver {
        let mut driver = FileDbDriver::in_memory(schema());
        for (id, name, age) in [("1", "Ann", 31), ("2", "Bob", 25), ("3", "Cy", 40)] {
            let insert = Insert::new(
                "users",
                RowSelector::Id(id.into()),
                row(&[
                    ("ID", Value::Integer(id.parse().unwrap())),
                    ("NAME", Value::from(name)),
                    ("AGE", Value::from(age)),
                ]),
            );
            driver.send_query(&Query::Insert(insert)).unwrap();
        }
        driver
    }

    #[test]
    fn select_with_order_offset_limit() {
        let mut driver = seeded();
        let mut select = Select::new("users");
        select.order_by = Some("AGE".into());
        select.descending = true;
        select.offset = 1;
        select.limit = Some(1);
        let result = driver.send_query(&Query::Select(select)).unwrap();
        assert_eq!(result.count, 1);
        assert_eq!(result.rows[0].id, "1");
    }

    #[test]
    fn select_column_projects() {
        let mut driver = seeded();
        let mut select = Select::new("users");
        select.column = Some("NAME".into());
        select.filter = Some(Where::gt("age", 30));
        let result = driver.send_query(&Query::Select(select)).unwrap();
        let ids: Vec<_> = result.rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);
        assert_eq!(result.rows[0].values.len(), 1);
    }

    #[test]
    fn count_and_exist() {
        let mut driver = seeded();
        let count = driver
            .send_query(&Query::Count(SelectCount::new("users")))
            .unwrap();
        assert_eq!(count.count, 3);

        let hit = SelectExist::new("users", RowSelector::Id("2".into()));
        assert_eq!(driver.send_query(&Query::Exist(hit)).unwrap().count, 1);
        let miss = SelectExist::new("users", RowSelector::Id("9".into()));
        assert_eq!(driver.send_query(&Query::Exist(miss)).unwrap().count, 0);
    }

    #[test]
    fn insert_assigns_ids_and_rejects_duplicates() {
        let mut driver = seeded();
        let auto = Insert::new("users", RowSelector::All, row(&[("NAME", "Di".into())]));
        let result = driver.send_query(&Query::Insert(auto)).unwrap();
        assert_eq!(result.rows[0].id, "4");
        assert_eq!(result.rows[0].values.get("ID"), Some(&Value::Integer(4)));

        let dup = Insert::new("users", RowSelector::Id("1".into()), Row::new());
        assert!(matches!(
            driver.send_query(&Query::Insert(dup)),
            Err(DbError::QueryFailed { .. })
        ));
    }

    #[test]
    fn update_cell_and_row() {
        let mut driver = seeded();
        driver
            .send_query(&Query::Update(Update::cell("users", "2", "name", "Rob")))
            .unwrap();
        driver
            .send_query(&Query::Update(Update::row(
                "users",
                "2",
                row(&[("AGE", Value::from(26))]),
            )))
            .unwrap();
        let stored = &driver.image().table("users").unwrap()["2"];
        assert_eq!(stored.get("NAME"), Some(&Value::from("Rob")));
        assert_eq!(stored.get("AGE"), Some(&Value::from(26)));

        let missing = driver
            .send_query(&Query::Update(Update::cell("users", "9", "name", "X")))
            .unwrap();
        assert_eq!(missing.count, 0);
    }

    #[test]
    fn delete_respects_limit() {
        let mut driver = seeded();
        let mut delete = Delete::new("users", RowSelector::All);
        delete.filter = Some(Where::gt("age", 20));
        let result = driver.send_query(&Query::Delete(delete)).unwrap();
        assert_eq!(result.count, 1);
        assert_eq!(driver.image().row_count(), 2);
    }

    #[test]
    fn rollback_restores_snapshot() {
        let mut driver = seeded();
        driver.begin_transaction().unwrap();
        driver
            .send_query(&Query::Delete(Delete::new("users", RowSelector::Id("1".into()))))
            .unwrap();
        assert_eq!(driver.image().row_count(), 2);
        driver.rollback().unwrap();
        assert_eq!(driver.image().row_count(), 3);
        assert!(!driver.in_transaction());
    }

    #[test]
    fn commit_persists_image() {
        let backend = InMemoryBackend::new();
        let mut driver = FileDbDriver::open(schema(), Box::new(backend.clone())).unwrap();
        driver.begin_transaction().unwrap();
        let insert = Insert::new("users", RowSelector::Id("5".into()), Row::new());
        driver.send_query(&Query::Insert(insert)).unwrap();
        driver.commit().unwrap();

        let reopened = FileDbDriver::open(schema(), Box::new(backend)).unwrap();
        assert!(reopened.image().table("users").unwrap().contains_key("5"));
    }

    #[test]
    fn failed_write_restores_snapshot() {
        let backend = InMemoryBackend::new();
        let mut driver = FileDbDriver::open(schema(), Box::new(backend.clone())).unwrap();
        backend.close();

        driver.begin_transaction().unwrap();
        let insert = Insert::new("users", RowSelector::Id("7".into()), Row::new());
        driver.send_query(&Query::Insert(insert)).unwrap();
        assert!(matches!(driver.commit(), Err(DbError::Storage(_))));

        assert_eq!(driver.image().row_count(), 0);
        assert!(!driver.in_transaction());
    }

    #[test]
    fn auto_id_after_largest_integer_fails() {
        let mut driver = FileDbDriver::in_memory(schema());
        let max = Insert::new(
            "users",
            RowSelector::Id(i64::MAX.to_string()),
            row(&[("ID", Value::Integer(i64::MAX))]),
        );
        driver.send_query(&Query::Insert(max)).unwrap();

        let auto = Insert::new("users", RowSelector::All, row(&[("NAME", "Ed".into())]));
        assert!(matches!(
            driver.send_query(&Query::Insert(auto)),
            Err(DbError::QueryFailed { .. })
        ));
        assert_eq!(driver.image().row_count(), 1);
    }

    #[test]
    fn unknown_table_and_raw_sql() {
        let mut driver = seeded();
        assert!(matches!(
            driver.send_query(&Query::Count(SelectCount::new("orders"))),
            Err(DbError::TableNotFound { .. })
        ));
        assert!(matches!(
            driver.send_sql("DELETE FROM users"),
            Err(DbError::QueryFailed { .. })
        ));
    }
}
