//! Core data models for the price catalog.
//!
//! A [`PriceRecord`] is created by the CSV decoder from one input row and
//! consumed immediately by the ingestion manager. [`AggregateSummary`] is
//! derived per ingestion request and never stored.

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;

/// Date format used on both the ingestion and export side.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Number of fractional digits kept for a price.
pub const PRICE_SCALE: u32 = 2;

/// One validated row of the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceRecord {
    pub name: String,
    pub category: String,
    pub price: Decimal,
    pub create_date: NaiveDate,
}

impl PriceRecord {
    /// Price in minor units (hundredths), as persisted by the SQLite store.
    pub fn price_cents(&self) -> Option<i64> {
        price_to_cents(self.price)
    }
}

/// Converts a price into minor units, or `None` if it does not fit an `i64`.
pub fn price_to_cents(price: Decimal) -> Option<i64> {
    price
        .round_dp(PRICE_SCALE)
        .checked_mul(Decimal::ONE_HUNDRED)?
        .trunc()
        .to_i64()
}

/// Converts minor units back into a two-digit decimal price.
pub fn price_from_cents(cents: i64) -> Decimal {
    Decimal::new(cents, PRICE_SCALE)
}

/// Store-wide aggregate state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CatalogTotals {
    /// Number of rows in the store.
    pub items: i64,
    /// Number of distinct categories in the store.
    pub categories: i64,
    /// Sum of all stored prices.
    pub total_price: Decimal,
}

/// Response of one ingestion request.
///
/// `total_items` counts only the rows of the just-ingested batch, while
/// `total_categories` and `total_price` describe the whole store after the
/// write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AggregateSummary {
    pub total_items: usize,
    pub total_categories: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_price: Decimal,
}

impl AggregateSummary {
    pub fn new(batch_len: usize, totals: CatalogTotals) -> Self {
        Self {
            total_items: batch_len,
            total_categories: totals.categories,
            total_price: totals.total_price,
        }
    }
}
