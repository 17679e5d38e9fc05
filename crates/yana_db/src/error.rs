//! Error types for the database layer.

use thiserror::Error;

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

/// Errors that can occur in database operations.
#[derive(Debug, Error)]
pub enum DbError {
    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] yana_storage::StorageError),

    /// CBOR codec error.
    #[error("codec error: {0}")]
    Codec(#[from] yana_codec::CodecError),

    /// Malformed key, empty table name, or an operation on the wrong
    /// kind of target (e.g. updating a whole table).
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of the problem.
        message: String,
    },

    /// The named table does not exist in the schema.
    #[error("table not found: {name}")]
    TableNotFound {
        /// Name of the table.
        name: String,
    },

    /// The schema, table or column does not accept writes.
    #[error("not writeable: {message}")]
    NotWriteable {
        /// What refused the write.
        message: String,
    },

    /// A declared constraint rejected the proposed values.
    #[error("constraint '{constraint}' violated on table {table}")]
    ConstraintViolation {
        /// Table the constraint belongs to.
        table: String,
        /// Name of the failing constraint.
        constraint: String,
    },

    /// Another user modified the row after the current session started.
    #[error("row {table}.{row} was modified by another user; reload and try again")]
    Timeout {
        /// Table of the conflicting row.
        table: String,
        /// Key of the conflicting row.
        row: String,
    },

    /// The driver failed to commit after all statements succeeded.
    #[error("commit failed: {reason}")]
    CommitFailed {
        /// Reason reported by the driver.
        reason: String,
    },

    /// The driver failed to execute a statement.
    #[error("query failed: {message} [{statement}]")]
    QueryFailed {
        /// Log representation of the statement.
        statement: String,
        /// Driver message.
        message: String,
    },
}

impl DbError {
    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates a table not found error.
    pub fn table_not_found(name: impl Into<String>) -> Self {
        Self::TableNotFound { name: name.into() }
    }

    /// Creates a not writeable error.
    pub fn not_writeable(message: impl Into<String>) -> Self {
        Self::NotWriteable {
            message: message.into(),
        }
    }

    /// Creates a constraint violation error.
    pub fn constraint_violation(table: impl Into<String>, constraint: impl Into<String>) -> Self {
        Self::ConstraintViolation {
            table: table.into(),
            constraint: constraint.into(),
        }
    }

    /// Creates a dirty-write timeout error.
    pub fn timeout(table: impl Into<String>, row: impl Into<String>) -> Self {
        Self::Timeout {
            table: table.into(),
            row: row.into(),
        }
    }

    /// Creates a commit failed error.
    pub fn commit_failed(reason: impl Into<String>) -> Self {
        Self::CommitFailed {
            reason: reason.into(),
        }
    }

    /// Creates a query failed error.
    pub fn query_failed(statement: impl ToString, message: impl Into<String>) -> Self {
        Self::QueryFailed {
            statement: statement.to_string(),
            message: message.into(),
        }
    }

    /// Returns true for conditions the end user can fix by reloading and
    /// submitting again.
    pub fn is_user_correctable(&self) -> bool {
        matches!(self, DbError::Timeout { .. } | DbError::ConstraintViolation { .. })
    }
}
