//! Property-based test generators using proptest.

use proptest::prelude::*;
use yana_codec::Value;

/// Strategy for table names in mixed case.
pub fn table_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z][a-zA-Z0-9_]{0,15}").expect("Invalid regex")
}

/// Strategy for concrete row keys.
pub fn row_key_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        (1u32..100_000).prop_map(|n| n.to_string()),
        prop::string::string_regex("[a-zA-Z0-9_-]{1,12}").expect("Invalid regex"),
    ]
}

/// Strategy for column names in mixed case.
pub fn column_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z][a-zA-Z0-9_]{0,15}").expect("Invalid regex")
}

/// Strategy for sub-addresses into an array cell (one to three segments).
pub fn array_path_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(
        prop::string::string_regex("[a-z0-9]{1,6}").expect("Invalid regex"),
        1..4,
    )
}

/// Strategy for well-formed dotted keys of every shape.
pub fn key_strategy() -> impl Strategy<Value = String> {
    (
        table_name_strategy(),
        prop::option::of(row_key_strategy()),
        prop::option::of(column_name_strategy()),
        prop::collection::vec(
            prop::string::string_regex("[a-z0-9]{1,6}").expect("Invalid regex"),
            0..3,
        ),
    )
        .prop_map(|(table, row, column, path)| {
            let mut key = table;
            match (row, column) {
                (None, None) => return key,
                (row, column) => {
                    key.push('.');
                    key.push_str(row.as_deref().unwrap_or("*"));
                    if let Some(column) = column {
                        key.push('.');
                        key.push_str(&column);
                        for segment in path {
                            key.push('.');
                            key.push_str(&segment);
                        }
                    }
                }
            }
            key
        })
}

/// Strategy for scalar cell values.
pub fn scalar_value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Integer),
        (-1.0e9f64..1.0e9).prop_map(Value::Float),
        "[a-zA-Z0-9 @.]{0,24}".prop_map(Value::Text),
    ]
}
