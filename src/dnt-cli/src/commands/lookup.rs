//! Catalog lookup command

use anyhow::{Context, Result};
use dnt::StringCatalog;
use std::path::Path;

pub fn lookup(
    catalog_path: &Path,
    id: i32,
    params: &[String],
    bracketed: Option<&str>,
) -> Result<()> {
    let catalog = StringCatalog::load(catalog_path)
        .with_context(|| format!("Failed to load catalog from {}", catalog_path.display()))?;

    if !catalog.contains(id) {
        eprintln!("Message {} not found in catalog", id);
    }
    println!("{}", render(&catalog, id, params, bracketed));

    Ok(())
}

/// Render with literal params, or with a bracketed id list resolved first
fn render(catalog: &StringCatalog, id: i32, params: &[String], bracketed: Option<&str>) -> String {
    match bracketed {
        Some(raw) => catalog.render(id, catalog.resolve_bracketed_params(raw).as_slice()),
        None => catalog.render(id, params),
    }
}
