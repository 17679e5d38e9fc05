//! Inspect command implementation.

use serde::Serialize;
use std::path::Path;
use tracing::info;
use yana_db::FileDbImage;

/// Image inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Image path.
    pub path: String,
    /// File size in bytes.
    pub size: u64,
    /// Number of tables.
    pub table_count: usize,
    /// Number of rows across all tables.
    pub row_count: usize,
    /// Per-table statistics (if requested).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tables: Option<Vec<TableStats>>,
}

/// Statistics for a single table.
#[derive(Debug, Serialize)]
pub struct TableStats {
    /// Table name.
    pub name: String,
    /// Number of rows.
    pub row_count: usize,
    /// Distinct column names seen across rows.
    pub columns: Vec<String>,
}

/// Runs the inspect command.
pub fn run(
    path: &Path,
    show_tables: bool,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    info!("Inspecting FileDB image at {:?}", path);
    let image = super::load_image(path)?;
    let size = std::fs::metadata(path)?.len();
    let result = summarize(path, size, &image, show_tables);

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print_text_output(&result);
        }
    }

    Ok(())
}

/// Builds the statistics for an already loaded image.
pub fn summarize(
    path: &Path,
    size: u64,
    image: &FileDbImage,
    show_tables: bool,
) -> InspectResult {
    let tables = show_tables.then(|| {
        image
            .tables
            .iter()
            .map(|(name, rows)| {
                let mut columns: Vec<String> = rows
                    .values()
                    .flat_map(|row| row.keys().cloned())
                    .collect();
                columns.sort();
                columns.dedup();
                TableStats {
                    name: name.clone(),
                    row_count: rows.len(),
                    columns,
                }
            })
            .collect()
    });

    InspectResult {
        path: path.display().to_string(),
        size,
        table_count: image.tables.len(),
        row_count: image.row_count(),
        tables,
    }
}

fn print_text_output(result: &InspectResult) {
    println!("FileDB Image: {}", result.path);
    println!("========================================");
    println!();
    println!("Size:   {} bytes", result.size);
    println!("Tables: {}", result.table_count);
    println!("Rows:   {}", result.row_count);

    if let Some(tables) = &result.tables {
        println!();
        println!("Tables:");
        for table in tables {
            println!(
                "  {:<20} {:>8} rows  [{}]",
                table.name,
                table.row_count,
                table.columns.join(", ")
            );
        }
    }
}
