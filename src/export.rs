//! File export of crawl results.

use crate::format::{csv_record, CSV_COLUMNS};
use crate::woo::Product;
use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

/// Writes products as a pretty-printed JSON array. Absent fields are `null`.
pub fn write_json(path: impl AsRef<Path>, products: &[Product]) -> Result<()> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(products).context("Failed to serialize products")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write JSON export: {}", path.display()))?;

    info!("Exported {} products to {}", products.len(), path.display());
    Ok(())
}

/// Reads products back from a JSON export.
pub fn read_json(path: impl AsRef<Path>) -> Result<Vec<Product>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read JSON export: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse JSON export: {}", path.display()))
}

/// Writes products as CSV with a header row.
pub fn write_csv(path: impl AsRef<Path>, products: &[Product]) -> Result<()> {
    let path = path.as_ref();
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create CSV export: {}", path.display()))?;

    writer.write_record(CSV_COLUMNS).context("Failed to write CSV header")?;
    for product in products {
        writer
            .write_record(csv_record(product))
            .with_context(|| format!("Failed to write CSV row for '{}'", product.title))?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to write CSV export: {}", path.display()))?;

    info!("Exported {} products to {}", products.len(), path.display());
    Ok(())
}
