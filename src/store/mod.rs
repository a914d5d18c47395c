//! Storage abstraction for the price catalog.
//!
//! The [`PriceStore`] trait is the only way the ingestion and export
//! pipelines reach persisted rows. It exposes a transactional insert path
//! and two read queries, so backends stay pluggable (SQLite in production,
//! in-memory for tests).
//!
//! Implementations must be `Send + Sync` to be shared across request tasks.
//!
//! # Operations
//!
//! | Method | Purpose |
//! |--------|---------|
//! | [`begin`](PriceStore::begin) | Open an atomic unit of work |
//! | [`totals`](PriceStore::totals) | Aggregate read over committed rows |
//! | [`all_records`](PriceStore::all_records) | Every row, in insertion order |
//! | [`category_breakdown`](PriceStore::category_breakdown) | Per-category counts and sums |

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::models::{CatalogTotals, PriceRecord};

/// Row count and price sum for one category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryTotals {
    pub category: String,
    pub items: i64,
    pub total_price: Decimal,
}

/// Abstract storage backend.
#[async_trait]
pub trait PriceStore: Send + Sync {
    /// Open a new transaction.
    async fn begin(&self) -> Result<Box<dyn PriceTransaction>>;

    /// Aggregate over all committed rows.
    async fn totals(&self) -> Result<CatalogTotals>;

    /// All committed rows in insertion order.
    async fn all_records(&self) -> Result<Vec<PriceRecord>>;

    /// Per-category aggregates, largest categories first.
    async fn category_breakdown(&self) -> Result<Vec<CategoryTotals>>;
}

/// An open unit of work against a [`PriceStore`].
///
/// Dropping a transaction without calling [`commit`](Self::commit) discards
/// its writes.
#[async_trait]
pub trait PriceTransaction: Send {
    /// Stage one row. Constraint violations surface here.
    async fn insert(&mut self, record: &PriceRecord) -> Result<()>;

    /// Aggregate over committed rows plus rows staged in this transaction.
    async fn totals(&mut self) -> Result<CatalogTotals>;

    /// Make every staged row durable.
    async fn commit(&mut self) -> Result<()>;

    /// Discard every staged row.
    async fn rollback(&mut self) -> Result<()>;
}
