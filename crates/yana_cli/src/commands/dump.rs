//! Dump command implementation.

use serde_json::{Map, Number, Value as Json};
use std::path::Path;
use tracing::info;
use yana_db::{FileDbImage, Row, Value};

/// Runs the dump command.
pub fn run(
    path: &Path,
    table: Option<&str>,
    limit: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    info!("Dumping FileDB image at {:?}", path);
    let image = super::load_image(path)?;
    let dump = dump_image(&image, table, limit)?;
    println!("{}", serde_json::to_string_pretty(&dump)?);
    Ok(())
}

/// Renders `table -> row id -> row` as JSON.
///
/// Table names are matched case-insensitively. `limit` caps the number of
/// rows written per table.
pub fn dump_image(
    image: &FileDbImage,
    table: Option<&str>,
    limit: Option<usize>,
) -> Result<Json, Box<dyn std::error::Error>> {
    let wanted = table.map(str::to_lowercase);
    if let Some(name) = &wanted {
        if image.table(name).is_none() {
            return Err(format!("Table '{name}' not found in image").into());
        }
    }

    let mut tables = Map::new();
    for (name, rows) in &image.tables {
        if wanted.as_ref().is_some_and(|w| w != name) {
            continue;
        }
        let rows: Map<String, Json> = rows
            .iter()
            .take(limit.unwrap_or(usize::MAX))
            .map(|(id, row)| (id.clone(), row_to_json(row)))
            .collect();
        tables.insert(name.clone(), Json::Object(rows));
    }
    Ok(Json::Object(tables))
}

fn row_to_json(row: &Row) -> Json {
    Json::Object(
        row.iter()
            .map(|(column, value)| (column.clone(), to_json(value)))
            .collect(),
    )
}

/// Converts a database value to plain JSON.
///
/// Byte strings become lower-case hex; non-finite floats become `null`.
pub fn to_json(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Integer(i) => Json::Number((*i).into()),
        Value::Float(f) => Number::from_f64(*f).map_or(Json::Null, Json::Number),
        Value::Text(s) => Json::String(s.clone()),
        Value::Bytes(bytes) => Json::String(bytes.iter().map(|b| format!("{b:02x}")).collect()),
        Value::Array(items) => Json::Array(items.iter().map(to_json).collect()),
        Value::Map(map) => Json::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), to_json(v)))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn image() -> FileDbImage {
        let mut users = BTreeMap::new();
        for id in 1..=3 {
            let mut row = Row::new();
            row.insert("ID".into(), Value::Integer(id));
            row.insert(
                "TAGS".into(),
                Value::map([("a", Value::Integer(1)), ("b", Value::Null)]),
            );
            users.insert(id.to_string(), row);
        }
        let mut image = FileDbImage::default();
        image.tables.insert("users".into(), users);
        image.tables.insert("posts".into(), BTreeMap::new());
        image
    }

    #[test]
    fn scalar_conversion() {
        assert_eq!(to_json(&Value::Null), Json::Null);
        assert_eq!(to_json(&Value::Integer(-3)), json!(-3));
        assert_eq!(to_json(&Value::Float(1.5)), json!(1.5));
        assert_eq!(to_json(&Value::Float(f64::NAN)), Json::Null);
        assert_eq!(to_json(&Value::Bytes(vec![0x0a, 0xff])), json!("0aff"));
        assert_eq!(
            to_json(&Value::Array(vec![Value::Bool(true), Value::from("x")])),
            json!([true, "x"])
        );
    }

    #[test]
    fn dump_single_table_with_limit() {
        let dump = dump_image(&image(), Some("USERS"), Some(2)).unwrap();
        assert_eq!(
            dump,
            json!({
                "users": {
                    "1": {"ID": 1, "TAGS": {"a": 1, "b": null}},
                    "2": {"ID": 2, "TAGS": {"a": 1, "b": null}},
                }
            })
        );
    }

    #[test]
    fn dump_all_tables() {
        let dump = dump_image(&image(), None, None).unwrap();
        assert_eq!(dump["posts"], json!({}));
        assert_eq!(dump["users"].as_object().unwrap().len(), 3);
    }

    #[test]
    fn unknown_table_is_an_error() {
        assert!(dump_image(&image(), Some("nope"), None).is_err());
    }
}
