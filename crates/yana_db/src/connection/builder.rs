//! Connection assembly.

use super::Connection;
use crate::cache::WriteCache;
use crate::config::Config;
use crate::driver::Driver;
use crate::last_modified::LastModifiedTracker;
use crate::query::QueryBuilder;
use crate::schema::Schema;
use crate::session::{Clock, SessionContext, SystemClock};
use std::sync::Arc;
use yana_storage::StorageBackend;

/// Builder for [`Connection`].
///
/// ```
/// use std::sync::Arc;
/// use yana_db::{Config, Connection, FileDbDriver, Schema, SessionContext};
///
/// let schema = Arc::new(Schema::new("app"));
/// let driver = FileDbDriver::in_memory(Arc::clone(&schema));
/// let connection = Connection::builder(schema, Box::new(driver))
///     .config(Config::new().strict_locking(false))
///     .session(SessionContext::new("10.0.0.1"))
///     .build();
/// assert_eq!(connection.driver_name(), "filedb");
/// ```
#[derive(Debug)]
pub struct ConnectionBuilder {
    schema: Arc<Schema>,
    driver: Box<dyn Driver>,
    config: Config,
    session: SessionContext,
    clock: Arc<dyn Clock>,
    query_builder: Option<QueryBuilder>,
    last_modified: Option<Box<dyn StorageBackend>>,
}

impl ConnectionBuilder {
    pub(super) fn new(schema: Arc<Schema>, driver: Box<dyn Driver>) -> Self {
        Self {
            schema,
            driver,
            config: Config::default(),
            session: SessionContext::default(),
            clock: Arc::new(SystemClock),
            query_builder: None,
            last_modified: None,
        }
    }

    /// Sets the configuration.
    #[must_use]
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Sets the session.
    #[must_use]
    pub fn session(mut self, session: SessionContext) -> Self {
        self.session = session;
        self
    }

    /// Sets the clock used for last-modified stamps.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the default query builder.
    #[must_use]
    pub fn query_builder(mut self, query_builder: QueryBuilder) -> Self {
        self.query_builder = Some(query_builder);
        self
    }

    /// Stores the last-modified map in `backend` instead of the file named
    /// by the configuration.
    #[must_use]
    pub fn last_modified_backend(mut self, backend: Box<dyn StorageBackend>) -> Self {
        self.last_modified = Some(backend);
        self
    }

    /// Builds the connection.
    pub fn build(self) -> Connection {
        let query_builder = self
            .query_builder
            .unwrap_or_else(|| QueryBuilder::new(Arc::clone(&self.schema)));
        Connection {
            schema: self.schema,
            driver: self.driver,
            query_builder,
            transaction: None,
            cache: WriteCache::new(),
            tracker: self.last_modified.map(LastModifiedTracker::new),
            session: self.session,
            config: self.config,
            clock: self.clock,
        }
    }
}
