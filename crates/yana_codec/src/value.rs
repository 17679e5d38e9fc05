//! Dynamic value type.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// A dynamic database value.
///
/// Rows are represented as [`Value::Map`] keyed by column name, and
/// array-typed columns hold nested maps or arrays that can be addressed
/// by path (see [`Value::get_path`] and [`Value::set_path`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed integer.
    Integer(i64),
    /// Floating point number.
    Float(f64),
    /// Text string (UTF-8).
    Text(String),
    /// Byte string.
    Bytes(Vec<u8>),
    /// Ordered list of values.
    Array(Vec<Value>),
    /// String-keyed map, sorted by key.
    Map(BTreeMap<String, Value>),
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

impl Value {
    /// Create a map value from key/value pairs.
    pub fn map<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        Value::Map(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Create an empty map value.
    pub fn empty_map() -> Self {
        Value::Map(BTreeMap::new())
    }

    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Check if this value is a container (array or map).
    pub fn is_container(&self) -> bool {
        matches!(self, Value::Array(_) | Value::Map(_))
    }

    /// Get this value as a boolean, if it is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get this value as an integer, if it is one.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Get this value as a float. Integers are widened.
    #[allow(clippy::cast_precision_loss)]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Integer(n) => Some(*n as f64),
            _ => None,
        }
    }

    /// Get this value as a string, if it is a text string.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get this value as bytes, if it is a byte string.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Get this value as an array, if it is one.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Get this value as a map, if it is one.
    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Consume this value and return the map, if it is one.
    pub fn into_map(self) -> Option<BTreeMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Look up a key in this map value, or an index in this array value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(m) => m.get(key),
            Value::Array(a) => key.parse::<usize>().ok().and_then(|i| a.get(i)),
            _ => None,
        }
    }

    /// Follows `path` through nested maps and arrays.
    ///
    /// An empty path returns `self`.
    pub fn get_path<S: AsRef<str>>(&self, path: &[S]) -> Option<&Value> {
        path.iter()
            .try_fold(self, |current, segment| current.get(segment.as_ref()))
    }

    /// Writes `value` at `path`, creating intermediate maps as needed.
    ///
    /// Scalars found along the path are replaced by maps. Array segments
    /// that name an existing index (or the next free one) stay arrays; any
    /// other key turns the array into a map keyed by the stringified index.
    pub fn set_path<S: AsRef<str>>(&mut self, path: &[S], value: Value) {
        let Some((first, rest)) = path.split_first() else {
            *self = value;
            return;
        };
        let key = first.as_ref();

        if let Value::Array(items) = self {
            match key.parse::<usize>() {
                Ok(index) if index < items.len() => {
                    items[index].set_path(rest, value);
                    return;
                }
                Ok(index) if index == items.len() => {
                    let mut child = Value::Null;
                    child.set_path(rest, value);
                    items.push(child);
                    return;
                }
                _ => {
                    let converted = std::mem::take(items)
                        .into_iter()
                        .enumerate()
                        .map(|(i, v)| (i.to_string(), v))
                        .collect();
                    *self = Value::Map(converted);
                }
            }
        }

        if !matches!(self, Value::Map(_)) {
            *self = Value::empty_map();
        }
        if let Value::Map(map) = self {
            map.entry(key.to_string())
                .or_insert(Value::Null)
                .set_path(rest, value);
        }
    }

    /// Renders a scalar as a row identifier.
    ///
    /// Returns `None` for null and container values.
    pub fn to_key_string(&self) -> Option<String> {
        match self {
            Value::Text(s) => Some(s.clone()),
            Value::Integer(n) => Some(n.to_string()),
            Value::Float(f) => Some(f.to_string()),
            Value::Bool(b) => Some(if *b { "1".into() } else { "0".into() }),
            _ => None,
        }
    }

    /// Compares two values of compatible kinds.
    ///
    /// Integers and floats compare numerically with each other. Null sorts
    /// before everything. Incompatible kinds yield `None`.
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, Value::Null) => Some(Ordering::Equal),
            (Value::Null, _) => Some(Ordering::Less),
            (_, Value::Null) => Some(Ordering::Greater),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
            (Value::Integer(_) | Value::Float(_), Value::Integer(_) | Value::Float(_)) => {
                self.as_float()?.partial_cmp(&other.as_float()?)
            }
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            (Value::Bytes(a), Value::Bytes(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Integer(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Text(s) => write!(f, "{s:?}"),
            Value::Bytes(b) => {
                f.write_str("0x")?;
                b.iter().try_for_each(|byte| write!(f, "{byte:02x}"))
            }
            Value::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Map(map) => {
                f.write_str("{")?;
                for (i, (key, item)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key:?}: {item}")?;
                }
                f.write_str("}")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Integer(i64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Integer(i64::from(n))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Array(v)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(m: BTreeMap<String, Value>) -> Self {
        Value::Map(m)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl From<()> for Value {
    fn from((): ()) -> Self {
        Value::Null
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn value_accessors() {
        assert!(Value::Null.is_null());
        assert!(!Value::Bool(true).is_null());

        assert_eq!(Value::Bool(true).as_bool(), Some(true));
        assert_eq!(Value::Integer(42).as_bool(), None);

        assert_eq!(Value::Integer(42).as_integer(), Some(42));
        assert_eq!(Value::Integer(2).as_float(), Some(2.0));
        assert_eq!(Value::Text("42".to_string()).as_integer(), None);

        assert_eq!(Value::Text("hello".to_string()).as_text(), Some("hello"));
        assert_eq!(Value::Bytes(vec![1, 2, 3]).as_bytes(), Some(&[1, 2, 3][..]));
    }

    #[test]
    fn map_get() {
        let map = Value::map([("NAME", Value::from("Alice")), ("AGE", Value::from(30))]);

        assert_eq!(map.get("NAME"), Some(&Value::from("Alice")));
        assert_eq!(map.get("AGE"), Some(&Value::Integer(30)));
        assert_eq!(map.get("missing"), None);
    }

    #[test]
    fn array_get_by_index() {
        let arr = Value::Array(vec![Value::from("a"), Value::from("b")]);
        assert_eq!(arr.get("1"), Some(&Value::from("b")));
        assert_eq!(arr.get("2"), None);
        assert_eq!(arr.get("x"), None);
    }

    #[test]
    fn set_path_creates_nested_maps() {
        let mut v = Value::Null;
        v.set_path(&["a", "b"], Value::from(1));
        assert_eq!(v.get_path(&["a", "b"]), Some(&Value::Integer(1)));
    }

    #[test]
    fn set_path_keeps_siblings() {
        let mut v = Value::map([("k1", "a")]);
        v.set_path(&["k2"], Value::from("b"));
        assert_eq!(v, Value::map([("k1", "a"), ("k2", "b")]));
    }

    #[test]
    fn set_path_on_array_index_and_append() {
        let mut v = Value::Array(vec![Value::from(1)]);
        v.set_path(&["0"], Value::from(10));
        v.set_path(&["1"], Value::from(20));
        assert_eq!(v, Value::Array(vec![Value::from(10), Value::from(20)]));
    }

    #[test]
    fn set_path_on_array_with_text_key_converts_to_map() {
        let mut v = Value::Array(vec![Value::from(1)]);
        v.set_path(&["name"], Value::from("x"));
        assert_eq!(v, Value::map([("0", Value::from(1)), ("name", Value::from("x"))]));
    }

    #[test]
    fn set_empty_path_replaces() {
        let mut v = Value::from(1);
        v.set_path::<&str>(&[], Value::from("new"));
        assert_eq!(v, Value::from("new"));
    }

    #[test]
    fn compare_mixed_numbers() {
        assert_eq!(
            Value::Integer(2).compare(&Value::Float(2.5)),
            Some(Ordering::Less)
        );
        assert_eq!(Value::Null.compare(&Value::from("a")), Some(Ordering::Less));
        assert_eq!(Value::from("a").compare(&Value::Integer(1)), None);
    }

    #[test]
    fn key_strings() {
        assert_eq!(Value::from(42).to_key_string().as_deref(), Some("42"));
        assert_eq!(Value::from("abc").to_key_string().as_deref(), Some("abc"));
        assert_eq!(Value::Null.to_key_string(), None);
    }

    #[test]
    fn display_is_readable() {
        let v = Value::map([("A", Value::from(1)), ("B", Value::from("x"))]);
        assert_eq!(v.to_string(), r#"{"A": 1, "B": "x"}"#);
    }

    #[test]
    fn from_impls() {
        assert_eq!(Value::from(true), Value::Bool(true));
        assert_eq!(Value::from(42i64), Value::Integer(42));
        assert_eq!(Value::from(42u32), Value::Integer(42));
        assert_eq!(Value::from(1.5), Value::Float(1.5));
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(()), Value::Null);
    }

    proptest! {
        #[test]
        fn set_then_get_path(path in proptest::collection::vec("[a-z]{1,4}", 1..4), n in any::<i64>()) {
            let mut v = Value::Null;
            v.set_path(&path[..], Value::Integer(n));
            prop_assert_eq!(v.get_path(&path[..]), Some(&Value::Integer(n)));
        }
    }
}
