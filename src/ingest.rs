//! Ingestion pipeline orchestration.
//!
//! Coordinates the full import flow: archive → CSV entry → validated batch →
//! one store transaction → aggregate summary. Every archive and decode
//! failure happens before the store is touched. A failure before commit
//! leaves the store without any row of the batch; an aggregate failure after
//! commit does not undo it.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::archive::{locate, ContainerKind, LocateOptions};
use crate::config::Config;
use crate::db;
use crate::decode::{decode, DecodeOptions};
use crate::error::{CatalogError, IngestError};
use crate::migrate;
use crate::models::{AggregateSummary, PriceRecord};
use crate::sqlite_store::SqliteStore;
use crate::store::{PriceStore, PriceTransaction};

/// Settings for the whole import flow.
#[derive(Debug, Clone, Default)]
pub struct IngestOptions {
    pub locate: LocateOptions,
    pub decode: DecodeOptions,
    /// Compute aggregates inside the insert transaction, before commit.
    pub consistent_aggregates: bool,
}

impl IngestOptions {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            locate: LocateOptions {
                csv_suffix: config.archive.csv_suffix.clone(),
                max_entry_bytes: config.archive.max_entry_bytes,
            },
            decode: config.decode_options()?,
            consistent_aggregates: config.ingest.consistent_aggregates,
        })
    }
}

/// Persists validated batches and reports aggregates.
///
/// Holds its store as an injected handle; one `Ingestor` is shared by all
/// request tasks.
pub struct Ingestor {
    store: Arc<dyn PriceStore>,
    options: IngestOptions,
}

impl Ingestor {
    pub fn new(store: Arc<dyn PriceStore>, options: IngestOptions) -> Self {
        Self { store, options }
    }

    /// Locate, decode, and ingest one uploaded archive.
    pub async fn import_archive(
        &self,
        bytes: &[u8],
        kind: ContainerKind,
    ) -> Result<AggregateSummary, CatalogError> {
        let csv = locate(bytes, kind, &self.options.locate)?;
        let records = decode(&csv, &self.options.decode)?;
        tracing::debug!(
            container = %kind,
            archive_bytes = bytes.len(),
            csv_bytes = csv.len(),
            rows = records.len(),
            "archive decoded"
        );
        Ok(self.ingest(&records).await?)
    }

    /// Insert `records` in order inside one transaction, then aggregate.
    ///
    /// `total_items` is the batch length; the other fields describe the
    /// whole store after the write.
    pub async fn ingest(&self, records: &[PriceRecord]) -> Result<AggregateSummary, IngestError> {
        let started = Instant::now();
        let mut tx = self.store.begin().await.map_err(IngestError::Transaction)?;

        for (idx, record) in records.iter().enumerate() {
            if let Err(source) = tx.insert(record).await {
                rollback_quietly(tx.as_mut()).await;
                tracing::warn!(row = idx + 1, error = %source, "insert failed, batch rolled back");
                return Err(IngestError::IngestionFailed {
                    row: idx + 1,
                    source,
                });
            }
        }

        let totals = if self.options.consistent_aggregates {
            let totals = match tx.totals().await {
                Ok(totals) => totals,
                Err(e) => {
                    rollback_quietly(tx.as_mut()).await;
                    return Err(IngestError::Aggregation(e));
                }
            };
            tx.commit().await.map_err(IngestError::Transaction)?;
            totals
        } else {
            tx.commit().await.map_err(IngestError::Transaction)?;
            // Committed: a failure from here on leaves the batch in place.
            self.store.totals().await.map_err(IngestError::Aggregation)?
        };

        let summary = AggregateSummary::new(records.len(), totals);
        tracing::info!(
            items = summary.total_items,
            categories = summary.total_categories,
            total_price = %summary.total_price,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "batch ingested"
        );
        Ok(summary)
    }
}

async fn rollback_quietly(tx: &mut dyn PriceTransaction) {
    if let Err(e) = tx.rollback().await {
        tracing::error!(error = %e, "rollback failed");
    }
}

/// CLI entry point: import one archive file into the configured database.
pub async fn run_import(config: &Config, archive: &Path, kind: ContainerKind) -> Result<()> {
    let bytes = std::fs::read(archive)
        .with_context(|| format!("Failed to read archive: {}", archive.display()))?;

    let pool = db::connect(config).await?;
    migrate::ensure_schema(&pool).await?;

    let store = Arc::new(SqliteStore::new(pool.clone()));
    let ingestor = Ingestor::new(store, IngestOptions::from_config(config)?);

    let result = ingestor.import_archive(&bytes, kind).await;
    pool.close().await;

    let summary = result.with_context(|| format!("Import of {} failed", archive.display()))?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
