//! # Yana Testkit
//!
//! Test utilities for the Yana database layer.
//!
//! This crate provides:
//! - a sample schema with constraints and triggers
//! - [`RecordingDriver`], a driver that logs every call into an
//!   [`EventLog`] and can be told to fail
//! - [`TestConnection`], a connection wired to both
//! - proptest strategies for keys and values
//!
//! The behavioural test-suite of the workspace lives in this crate's
//! `tests/` directory.
//!
//! ## Usage
//!
//! ```rust
//! use yana_testkit::prelude::*;
//!
//! let mut t = TestConnection::new();
//! t.insert("users.42", Value::map([("name", "Ann")])).unwrap();
//! t.commit().unwrap();
//! assert_eq!(t.log.writes().len(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use yana_db::{Connection, DbError, SessionContext, Value};
}

pub use fixtures::*;
pub use generators::*;
