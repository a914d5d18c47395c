//! Export the catalog as a ZIP archive holding one CSV file.
//!
//! Rows are read in insertion order and written with the canonical header
//! `name,category,price,create_date`, prices with two decimals and dates as
//! `YYYY-MM-DD`. Both the CSV and the archive are built in memory.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use std::io::{Cursor, Write};
use std::path::Path;
use std::sync::Arc;
use zip::write::SimpleFileOptions;

use crate::config::Config;
use crate::db;
use crate::decode::ColumnMap;
use crate::error::ExportError;
use crate::migrate;
use crate::models::{PriceRecord, DATE_FORMAT, PRICE_SCALE};
use crate::sqlite_store::SqliteStore;
use crate::store::PriceStore;

/// Builds the download archive from the store.
pub struct Exporter {
    store: Arc<dyn PriceStore>,
    entry_name: String,
}

impl Exporter {
    pub fn new(store: Arc<dyn PriceStore>, entry_name: impl Into<String>) -> Self {
        Self {
            store,
            entry_name: entry_name.into(),
        }
    }

    /// Read every stored row and return the ZIP bytes.
    pub async fn export(&self) -> Result<Vec<u8>, ExportError> {
        let records = self.store.all_records().await.map_err(ExportError::Query)?;
        let csv = render_csv(&records)?;
        let archive = wrap_zip(&self.entry_name, &csv)?;
        tracing::info!(
            rows = records.len(),
            csv_bytes = csv.len(),
            archive_bytes = archive.len(),
            "catalog exported"
        );
        Ok(archive)
    }
}

/// Renders a price with exactly two fractional digits.
pub fn format_price(price: Decimal) -> String {
    let mut rounded = price.round_dp(PRICE_SCALE);
    rounded.rescale(PRICE_SCALE);
    rounded.to_string()
}

/// Renders records as CSV text with a header line.
pub fn render_csv(records: &[PriceRecord]) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(ColumnMap::CANONICAL)?;
    for record in records {
        let price = format_price(record.price);
        let date = record.create_date.format(DATE_FORMAT).to_string();
        writer.write_record([
            record.name.as_str(),
            record.category.as_str(),
            price.as_str(),
            date.as_str(),
        ])?;
    }
    writer
        .into_inner()
        .map_err(|e| ExportError::Serialization {
            message: e.to_string(),
        })
}

/// Wraps `contents` as the single entry `entry_name` of a new ZIP archive.
pub fn wrap_zip(entry_name: &str, contents: &[u8]) -> Result<Vec<u8>, ExportError> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    zip.start_file(entry_name, SimpleFileOptions::default())?;
    zip.write_all(contents)?;
    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}

/// CLI entry point: write the export archive to `output`.
pub async fn run_export(config: &Config, output: &Path) -> Result<()> {
    let pool = db::connect(config).await?;
    migrate::ensure_schema(&pool).await?;

    let store = Arc::new(SqliteStore::new(pool.clone()));
    let exporter = Exporter::new(store, config.export.entry_name.clone());
    let result = exporter.export().await;
    pool.close().await;

    let archive = result.with_context(|| "Export failed")?;

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(output, &archive)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    eprintln!(
        "Exported {} bytes to {}",
        archive.len(),
        output.display()
    );
    Ok(())
}
