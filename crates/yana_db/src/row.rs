//! Row values.

use crate::error::{DbError, DbResult};
use std::collections::BTreeMap;
use yana_codec::Value;

/// A row: upper-case column name to value.
pub type Row = BTreeMap<String, Value>;

/// Converts a map value into a [`Row`], upper-casing column names.
///
/// # Errors
///
/// Returns `InvalidArgument` if `value` is not a map.
pub fn normalize_row(value: Value) -> DbResult<Row> {
    match value {
        Value::Map(map) => Ok(map
            .into_iter()
            .map(|(column, v)| (column.to_uppercase(), v))
            .collect()),
        other => Err(DbError::invalid_argument(format!(
            "expected a map of column values, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_uppercases_columns() {
        let row = normalize_row(Value::map([("name", "Alice"), ("Mail", "a@x")])).unwrap();
        assert_eq!(row.get("NAME"), Some(&Value::from("Alice")));
        assert_eq!(row.get("MAIL"), Some(&Value::from("a@x")));
        assert_eq!(row.len(), 2);
    }

    #[test]
    fn normalize_rejects_scalars() {
        assert!(matches!(
            normalize_row(Value::from(1)),
            Err(DbError::InvalidArgument { .. })
        ));
    }
}
