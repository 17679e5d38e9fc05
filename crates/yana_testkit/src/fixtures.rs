//! Test fixtures: a sample schema, a recording driver and a wired-up
//! connection.

use parking_lot::Mutex;
use std::ops::{Deref, DerefMut};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use yana_db::{
    Column, ColumnType, Config, Connection, Constraint, DbError, DbResult, Driver, FileDbDriver,
    ManualClock, Query, ResultSet, Row, Schema, SessionContext, Table, TriggerEvent, Value,
};
use yana_storage::InMemoryBackend;

/// Something that happened to a [`RecordingDriver`] or a trigger.
#[derive(Debug, Clone, PartialEq)]
pub enum DriverEvent {
    /// `begin_transaction` was called.
    Begin,
    /// A query was executed.
    Query(Query),
    /// A raw statement was executed.
    Sql(String),
    /// A statement was rejected by failure injection.
    Failed(String),
    /// `commit` was called and succeeded.
    Commit,
    /// `rollback` was called.
    Rollback,
    /// A trigger of the sample schema fired, e.g. `after-insert users.42`.
    Trigger(String),
}

/// Shared, ordered log of [`DriverEvent`]s.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<DriverEvent>>>,
}

impl EventLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an event.
    pub fn push(&self, event: DriverEvent) {
        self.events.lock().push(event);
    }

    /// Returns a copy of all events.
    pub fn events(&self) -> Vec<DriverEvent> {
        self.events.lock().clone()
    }

    /// Returns the executed update, insert and delete queries in order.
    pub fn writes(&self) -> Vec<Query> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                DriverEvent::Query(q) if q.is_write() => Some(q.clone()),
                _ => None,
            })
            .collect()
    }

    /// Returns the events that are not reads, in order.
    ///
    /// Reads (selects, counts, existence checks) are dropped so tests can
    /// compare the transactional part of the log.
    pub fn without_reads(&self) -> Vec<DriverEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| !matches!(e, DriverEvent::Query(q) if !q.is_write()))
            .cloned()
            .collect()
    }

    /// Counts the events matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&DriverEvent) -> bool) -> usize {
        self.events.lock().iter().filter(|e| predicate(e)).count()
    }

    /// Forgets all events.
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

/// A FileDB driver that records every call and can be told to fail.
#[derive(Debug)]
pub struct RecordingDriver {
    inner: FileDbDriver,
    log: EventLog,
    fail_statement: Option<usize>,
    fail_commit: bool,
    fail_rollback: bool,
    sent: usize,
}

impl RecordingDriver {
    /// Creates an in-memory driver recording into `log`.
    pub fn new(schema: Arc<Schema>, log: EventLog) -> Self {
        Self {
            inner: FileDbDriver::in_memory(schema),
            log,
            fail_statement: None,
            fail_commit: false,
            fail_rollback: false,
            sent: 0,
        }
    }

    /// Fails the `n`-th write statement (1-based) sent from now on.
    #[must_use]
    pub fn fail_statement(mut self, n: usize) -> Self {
        self.fail_statement = Some(n);
        self
    }

    /// Fails every commit.
    #[must_use]
    pub fn fail_commit(mut self) -> Self {
        self.fail_commit = true;
        self
    }

    /// Fails every rollback (after recording it).
    #[must_use]
    pub fn fail_rollback(mut self) -> Self {
        self.fail_rollback = true;
        self
    }

    fn inject(&mut self, statement: String) -> DbResult<()> {
        self.sent += 1;
        if self.fail_statement == Some(self.sent) {
            self.log.push(DriverEvent::Failed(statement.clone()));
            return Err(DbError::query_failed(statement, "injected failure"));
        }
        Ok(())
    }
}

impl Driver for RecordingDriver {
    fn name(&self) -> &str {
        "recording"
    }

    fn begin_transaction(&mut self) -> DbResult<()> {
        self.log.push(DriverEvent::Begin);
        self.inner.begin_transaction()
    }

    fn commit(&mut self) -> DbResult<()> {
        if self.fail_commit {
            return Err(DbError::query_failed("COMMIT", "injected commit failure"));
        }
        self.inner.commit()?;
        self.log.push(DriverEvent::Commit);
        Ok(())
    }

    fn rollback(&mut self) -> DbResult<()> {
        self.log.push(DriverEvent::Rollback);
        self.inner.rollback()?;
        if self.fail_rollback {
            return Err(DbError::query_failed("ROLLBACK", "injected rollback failure"));
        }
        Ok(())
    }

    fn send_query(&mut self, query: &Query) -> DbResult<ResultSet> {
        if query.is_write() {
            self.inject(query.to_string())?;
        }
        let result = self.inner.send_query(query)?;
        self.log.push(DriverEvent::Query(query.clone()));
        Ok(result)
    }

    fn send_sql(&mut self, sql: &str) -> DbResult<ResultSet> {
        self.inject(sql.to_string())?;
        self.log.push(DriverEvent::Sql(sql.to_string()));
        Ok(ResultSet::empty())
    }

    fn quote(&self, value: &Value) -> String {
        format!("<{value}>")
    }
}

/// Builds the sample schema.
///
/// - `users` (`ID` integer key, `NAME`, `MAIL`, `AGE`, `TAGS` array,
///   `CREATED` read-only); constraint `age_non_negative`; column
///   constraint `mail_has_at`; every trigger event is logged to `log` as
///   [`DriverEvent::Trigger`]
/// - `posts` (`ID` integer key, `TITLE` not null, `AUTHOR`)
/// - `audit`, a read-only table
pub fn sample_schema(log: &EventLog) -> Arc<Schema> {
    let mut users = Table::new("users", "id")
        .with_column(Column::new("id", ColumnType::Integer))
        .with_column(Column::new("name", ColumnType::Text))
        .with_column(Column::new("mail", ColumnType::Text).with_constraint(
            Constraint::new("mail_has_at", |v: &Value| {
                v.as_text().map_or(true, |s| s.contains('@'))
            }),
        ))
        .with_column(Column::new("age", ColumnType::Integer))
        .with_column(Column::new("tags", ColumnType::Array))
        .with_column(Column::new("created", ColumnType::Integer).readonly())
        .with_constraint(Constraint::new("age_non_negative", |row: &Row| {
            row.get("AGE")
                .and_then(Value::as_integer)
                .map_or(true, |age| age >= 0)
        }));

    for (event, label) in [
        (TriggerEvent::BeforeInsert, "before-insert"),
        (TriggerEvent::AfterInsert, "after-insert"),
        (TriggerEvent::BeforeUpdate, "before-update"),
        (TriggerEvent::AfterUpdate, "after-update"),
        (TriggerEvent::BeforeDelete, "before-delete"),
        (TriggerEvent::AfterDelete, "after-delete"),
    ] {
        let log = log.clone();
        users = users.on(event, move |ctx| {
            log.push(DriverEvent::Trigger(format!(
                "{label} {}.{}",
                ctx.table,
                ctx.query.row()
            )));
            Ok(())
        });
    }

    let posts = Table::new("posts", "id")
        .with_column(Column::new("id", ColumnType::Integer))
        .with_column(Column::new("title", ColumnType::Text).not_null())
        .with_column(Column::new("author", ColumnType::Integer));

    let audit = Table::new("audit", "id")
        .with_column(Column::new("id", ColumnType::Integer))
        .readonly();

    Arc::new(
        Schema::new("sample")
            .with_table(users)
            .with_table(posts)
            .with_table(audit),
    )
}

/// A temporary directory and a FileDB image path inside it.
///
/// The directory is removed when the returned [`TempDir`] is dropped.
pub fn temp_image_path() -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let path = dir.path().join("data").join("sample.filedb");
    (dir, path)
}

/// A connection on the sample schema and a [`RecordingDriver`].
///
/// Dereferences to [`Connection`].
#[derive(Debug)]
pub struct TestConnection {
    /// The connection.
    pub connection: Connection,
    /// Driver and trigger events.
    pub log: EventLog,
    /// Clock used for last-modified stamps.
    pub clock: Arc<ManualClock>,
    /// Backend of the last-modified map.
    pub last_modified: InMemoryBackend,
}

impl TestConnection {
    /// Creates an anonymous connection with a fresh log.
    pub fn new() -> Self {
        Self::with_driver(|schema, log| RecordingDriver::new(schema, log))
    }

    /// Creates a connection whose driver is configured by `configure`.
    pub fn with_driver<F>(configure: F) -> Self
    where
        F: FnOnce(Arc<Schema>, EventLog) -> RecordingDriver,
    {
        let log = EventLog::new();
        let schema = sample_schema(&log);
        let driver = configure(Arc::clone(&schema), log.clone());
        Self::assemble(
            schema,
            driver,
            log,
            SessionContext::anonymous(),
            Arc::new(ManualClock::new(1_000)),
            InMemoryBackend::new(),
        )
    }

    /// Creates a connection for `user`, whose session started at
    /// `started_at`, sharing the clock and last-modified map of `other`.
    pub fn for_user(other: &TestConnection, user: &str, started_at: u64) -> Self {
        let log = EventLog::new();
        let schema = sample_schema(&log);
        let driver = RecordingDriver::new(Arc::clone(&schema), log.clone());
        Self::assemble(
            schema,
            driver,
            log,
            SessionContext::new(user).started_at(started_at),
            Arc::clone(&other.clock),
            other.last_modified.clone(),
        )
    }

    fn assemble(
        schema: Arc<Schema>,
        driver: RecordingDriver,
        log: EventLog,
        session: SessionContext,
        clock: Arc<ManualClock>,
        last_modified: InMemoryBackend,
    ) -> Self {
        let connection = Connection::builder(schema, Box::new(driver))
            .config(Config::new())
            .session(session)
            .clock(Arc::clone(&clock) as Arc<dyn yana_db::Clock>)
            .last_modified_backend(Box::new(last_modified.clone()))
            .build();
        Self {
            connection,
            log,
            clock,
            last_modified,
        }
    }

    /// Inserts and commits `users.<id>` with a name, then clears the log.
    pub fn seed_user(&mut self, id: u32, name: &str) {
        self.connection
            .insert(&format!("users.{id}"), Value::map([("name", name)]))
            .expect("seed insert");
        self.connection.commit().expect("seed commit");
        self.log.clear();
    }
}

impl Default for TestConnection {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for TestConnection {
    type Target = Connection;

    fn deref(&self) -> &Self::Target {
        &self.connection
    }
}

impl DerefMut for TestConnection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.connection
    }
}
