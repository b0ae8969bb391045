//! Table inspect command

use anyhow::{Context, Result};
use dnt::Layout;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

pub fn inspect_file(path: &Path, json: bool) -> Result<()> {
    let layout = read_layout(path)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&layout)?);
        return Ok(());
    }

    println!("File: {}", path.display());
    println!(
        "Rows: {}, Columns: {}",
        layout.header.row_count, layout.header.column_count
    );
    for (i, column) in layout.schema.iter().enumerate() {
        println!(
            "Column {}: {} (Type: {}, {})",
            i,
            column.name,
            column.kind.tag(),
            column.kind.name()
        );
    }

    Ok(())
}

fn read_layout(path: &Path) -> Result<Layout> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    Layout::read(&mut BufReader::new(file))
        .with_context(|| format!("Failed to read table layout from {}", path.display()))
}
