//! # Yana Codec
//!
//! Dynamic value type and CBOR serialization for the Yana database layer.
//!
//! This crate provides:
//! - [`Value`], the dynamic cell/row value used by queries, the write-cache
//!   and drivers
//! - path-based access into array-typed cells ([`Value::get_path`],
//!   [`Value::set_path`])
//! - [`to_cbor`] / [`from_cbor`] for persisted state (FileDB images, the
//!   last-modified file, connection snapshots)
//!
//! ## Usage
//!
//! ```
//! use yana_codec::{from_cbor, to_cbor, Value};
//!
//! let mut tags = Value::empty_map();
//! tags.set_path(&["k1"], Value::from("a"));
//!
//! let bytes = to_cbor(&tags).unwrap();
//! let decoded: Value = from_cbor(&bytes).unwrap();
//! assert_eq!(decoded.get("k1"), Some(&Value::from("a")));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cbor;
mod error;
mod value;

pub use cbor::{from_cbor, to_cbor};
pub use error::{CodecError, CodecResult};
pub use value::Value;
