//! In-memory [`PriceStore`] implementation for testing.
//!
//! Committed rows live in a `Vec` behind `std::sync::RwLock`. Transactions
//! stage rows locally and append them on commit, enforcing the same row
//! constraints as the SQLite schema.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, RwLock};

use anyhow::{bail, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::models::{price_to_cents, CatalogTotals, PriceRecord};

use super::{CategoryTotals, PriceStore, PriceTransaction};

/// In-memory store for tests.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    rows: Arc<RwLock<Vec<PriceRecord>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of committed rows.
    pub fn len(&self) -> usize {
        self.rows.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn check_constraints(record: &PriceRecord) -> Result<()> {
    if record.name.is_empty() {
        bail!("constraint failed: name must not be empty");
    }
    if record.category.is_empty() {
        bail!("constraint failed: category must not be empty");
    }
    match price_to_cents(record.price) {
        Some(cents) if cents >= 0 => Ok(()),
        Some(_) => bail!("constraint failed: price must not be negative"),
        None => bail!("constraint failed: price out of range"),
    }
}

fn compute_totals<'a>(rows: impl Iterator<Item = &'a PriceRecord>) -> CatalogTotals {
    let mut categories = HashSet::new();
    let mut totals = CatalogTotals::default();
    for row in rows {
        totals.items += 1;
        totals.total_price += row.price;
        categories.insert(row.category.as_str());
    }
    totals.categories = categories.len() as i64;
    totals
}

#[async_trait]
impl PriceStore for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn PriceTransaction>> {
        Ok(Box::new(InMemoryTransaction {
            rows: self.rows.clone(),
            staged: Vec::new(),
            finished: false,
        }))
    }

    async fn totals(&self) -> Result<CatalogTotals> {
        let rows = self.rows.read().unwrap();
        Ok(compute_totals(rows.iter()))
    }

    async fn all_records(&self) -> Result<Vec<PriceRecord>> {
        Ok(self.rows.read().unwrap().clone())
    }

    async fn category_breakdown(&self) -> Result<Vec<CategoryTotals>> {
        let rows = self.rows.read().unwrap();
        let mut by_category: BTreeMap<&str, (i64, Decimal)> = BTreeMap::new();
        for row in rows.iter() {
            let entry = by_category
                .entry(row.category.as_str())
                .or_insert((0, Decimal::ZERO));
            entry.0 += 1;
            entry.1 += row.price;
        }
        let mut breakdown: Vec<CategoryTotals> = by_category
            .into_iter()
            .map(|(category, (items, total_price))| CategoryTotals {
                category: category.to_string(),
                items,
                total_price,
            })
            .collect();
        breakdown.sort_by(|a, b| b.items.cmp(&a.items));
        Ok(breakdown)
    }
}

struct InMemoryTransaction {
    rows: Arc<RwLock<Vec<PriceRecord>>>,
    staged: Vec<PriceRecord>,
    finished: bool,
}

impl InMemoryTransaction {
    fn ensure_open(&self) -> Result<()> {
        if self.finished {
            bail!("transaction already finished");
        }
        Ok(())
    }
}

#[async_trait]
impl PriceTransaction for InMemoryTransaction {
    async fn insert(&mut self, record: &PriceRecord) -> Result<()> {
        self.ensure_open()?;
        check_constraints(record)?;
        self.staged.push(record.clone());
        Ok(())
    }

    async fn totals(&mut self) -> Result<CatalogTotals> {
        self.ensure_open()?;
        let rows = self.rows.read().unwrap();
        Ok(compute_totals(rows.iter().chain(self.staged.iter())))
    }

    async fn commit(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.finished = true;
        let staged = std::mem::take(&mut self.staged);
        self.rows.write().unwrap().extend(staged);
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.finished = true;
        self.staged.clear();
        Ok(())
    }
}
