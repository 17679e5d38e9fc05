//! # Yana Storage
//!
//! Blob storage backends for the Yana database layer.
//!
//! The database core keeps two kinds of small state files: the shared
//! "last modified" map used for dirty-write detection, and the image of a
//! FileDB database. Both are loaded whole and rewritten whole, so a backend
//! here is an **opaque blob store**: it does not interpret the bytes.
//!
//! ## Design Principles
//!
//! - Backends hold exactly one blob (load, replace, clear)
//! - A replace is all-or-nothing; readers never observe a torn blob
//! - Concurrent writers are last-writer-wins
//! - Must be `Send + Sync`
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`] - For testing and request-local state
//! - [`FileBackend`] - For state shared between processes
//!
//! ## Example
//!
//! ```rust
//! use yana_storage::{StorageBackend, InMemoryBackend};
//!
//! let mut backend = InMemoryBackend::new();
//! backend.replace(b"hello world").unwrap();
//! assert_eq!(backend.load().unwrap(), b"hello world");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
