//! Serialisable connection state.

use super::Connection;
use crate::config::Config;
use crate::driver::Driver;
use crate::error::{DbError, DbResult};
use crate::schema::Schema;
use crate::session::SessionContext;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use yana_codec::{from_cbor, to_cbor};

/// What survives when a connection is stored between requests.
///
/// Pending writes are not part of it; a restored connection starts
/// without a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionSnapshot {
    /// Name of the schema the connection was opened on.
    pub schema: String,
    /// Session of the acting user.
    pub session: SessionContext,
    /// Configuration the connection was built with.
    pub config: Config,
}

impl ConnectionSnapshot {
    /// Encodes the snapshot as CBOR.
    ///
    /// # Errors
    ///
    /// Codec errors.
    pub fn to_bytes(&self) -> DbResult<Vec<u8>> {
        Ok(to_cbor(self)?)
    }

    /// Decodes a snapshot.
    ///
    /// # Errors
    ///
    /// Codec errors.
    pub fn from_bytes(bytes: &[u8]) -> DbResult<Self> {
        Ok(from_cbor(bytes)?)
    }
}

impl Connection {
    /// Captures the connection state.
    pub fn snapshot(&self) -> ConnectionSnapshot {
        ConnectionSnapshot {
            schema: self.schema.name().to_string(),
            session: self.session.clone(),
            config: self.config.clone(),
        }
    }

    /// Recreates a connection from a snapshot.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `schema` is not the schema the snapshot was
    /// taken on.
    pub fn restore(
        snapshot: ConnectionSnapshot,
        schema: Arc<Schema>,
        driver: Box<dyn Driver>,
    ) -> DbResult<Self> {
        if snapshot.schema != schema.name() {
            return Err(DbError::invalid_argument(format!(
                "snapshot was taken on schema {}, not {}",
                snapshot.schema,
                schema.name()
            )));
        }
        Ok(Connection::builder(schema, driver)
            .config(snapshot.config)
            .session(snapshot.session)
            .build())
    }
}
