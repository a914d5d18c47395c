//! SQLite-backed [`PriceStore`] implementation.
//!
//! Prices are persisted as integer minor units (`price_cents`) so that
//! `SUM` is exact; dates are stored as `YYYY-MM-DD` text.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};

use crate::models::{price_from_cents, CatalogTotals, PriceRecord};
use crate::store::{CategoryTotals, PriceStore, PriceTransaction};

const TOTALS_SQL: &str = r#"
    SELECT
        COUNT(*) AS items,
        COUNT(DISTINCT category) AS categories,
        COALESCE(SUM(price_cents), 0) AS total_cents
    FROM prices
"#;

/// SQLite implementation of the [`PriceStore`] trait.
///
/// Wraps a [`SqlitePool`]; each [`begin`](PriceStore::begin) checks out one
/// connection for the lifetime of the transaction.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn totals_from_row(row: &SqliteRow) -> Result<CatalogTotals> {
    Ok(CatalogTotals {
        items: row.try_get("items")?,
        categories: row.try_get("categories")?,
        total_price: price_from_cents(row.try_get("total_cents")?),
    })
}

fn record_from_row(row: &SqliteRow) -> Result<PriceRecord> {
    let create_date: NaiveDate = row.try_get("create_date")?;
    Ok(PriceRecord {
        name: row.try_get("name")?,
        category: row.try_get("category")?,
        price: price_from_cents(row.try_get("price_cents")?),
        create_date,
    })
}

#[async_trait]
impl PriceStore for SqliteStore {
    async fn begin(&self) -> Result<Box<dyn PriceTransaction>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(SqliteTransaction { tx: Some(tx) }))
    }

    async fn totals(&self) -> Result<CatalogTotals> {
        let row = sqlx::query(TOTALS_SQL).fetch_one(&self.pool).await?;
        totals_from_row(&row)
    }

    async fn all_records(&self) -> Result<Vec<PriceRecord>> {
        let rows = sqlx::query(
            "SELECT name, category, price_cents, create_date FROM prices ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(record_from_row).collect()
    }

    async fn category_breakdown(&self) -> Result<Vec<CategoryTotals>> {
        let rows = sqlx::query(
            r#"
            SELECT category, COUNT(*) AS items, SUM(price_cents) AS total_cents
            FROM prices
            GROUP BY category
            ORDER BY items DESC, category
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(CategoryTotals {
                    category: row.try_get("category")?,
                    items: row.try_get("items")?,
                    total_price: price_from_cents(row.try_get("total_cents")?),
                })
            })
            .collect()
    }
}

/// An open SQLite transaction. Dropped without commit, sqlx rolls it back.
struct SqliteTransaction {
    tx: Option<Transaction<'static, Sqlite>>,
}

impl SqliteTransaction {
    fn open(&mut self) -> Result<&mut Transaction<'static, Sqlite>> {
        self.tx
            .as_mut()
            .ok_or_else(|| anyhow!("transaction already finished"))
    }
}

#[async_trait]
impl PriceTransaction for SqliteTransaction {
    async fn insert(&mut self, record: &PriceRecord) -> Result<()> {
        let price_cents = record
            .price_cents()
            .ok_or_else(|| anyhow!("price {} out of range", record.price))?;
        let tx = self.open()?;

        sqlx::query(
            "INSERT INTO prices (name, category, price_cents, create_date) VALUES (?, ?, ?, ?)",
        )
        .bind(&record.name)
        .bind(&record.category)
        .bind(price_cents)
        .bind(record.create_date)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    async fn totals(&mut self) -> Result<CatalogTotals> {
        let tx = self.open()?;
        let row = sqlx::query(TOTALS_SQL).fetch_one(&mut **tx).await?;
        totals_from_row(&row)
    }

    async fn commit(&mut self) -> Result<()> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| anyhow!("transaction already finished"))?;
        tx.commit().await?;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| anyhow!("transaction already finished"))?;
        tx.rollback().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrate::ensure_schema;
    use rust_decimal::Decimal;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn memory_store() -> SqliteStore {
        // One connection: every new connection to :memory: is a fresh database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        ensure_schema(&pool).await.unwrap();
        SqliteStore::new(pool)
    }

    fn record(name: &str, category: &str, cents: i64, day: u32) -> PriceRecord {
        PriceRecord {
            name: name.to_string(),
            category: category.to_string(),
            price: Decimal::new(cents, 2),
            create_date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
        }
    }

    #[tokio::test]
    async fn empty_store_totals_are_zero() {
        let store = memory_store().await;
        let totals = store.totals().await.unwrap();
        assert_eq!(totals, CatalogTotals::default());
        assert_eq!(totals.total_price, Decimal::ZERO);
    }

    #[tokio::test]
    async fn committed_rows_round_trip() {
        let store = memory_store().await;
        let widget = record("Widget", "Tools", 999, 15);
        let gadget = record("Gadget", "Tools", 1999, 16);

        let mut tx = store.begin().await.unwrap();
        tx.insert(&widget).await.unwrap();
        tx.insert(&gadget).await.unwrap();
        tx.commit().await.unwrap();

        let rows = store.all_records().await.unwrap();
        assert_eq!(rows, vec![widget, gadget]);

        let totals = store.totals().await.unwrap();
        assert_eq!(totals.items, 2);
        assert_eq!(totals.categories, 1);
        assert_eq!(totals.total_price, Decimal::new(2998, 2));
    }

    #[tokio::test]
    async fn check_constraint_rejects_negative_price() {
        let store = memory_store().await;
        let mut tx = store.begin().await.unwrap();
        tx.insert(&record("Widget", "Tools", 100, 1)).await.unwrap();
        assert!(tx.insert(&record("Refund", "Tools", -100, 2)).await.is_err());
        tx.rollback().await.unwrap();

        assert!(store.all_records().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn in_transaction_totals_see_staged_rows() {
        let store = memory_store().await;
        let mut tx = store.begin().await.unwrap();
        tx.insert(&record("Widget", "Tools", 100, 1)).await.unwrap();
        tx.insert(&record("Apple", "Food", 50, 1)).await.unwrap();
        let totals = tx.totals().await.unwrap();
        assert_eq!(totals.items, 2);
        assert_eq!(totals.categories, 2);
        tx.commit().await.unwrap();
        assert!(tx.commit().await.is_err());
    }

    #[tokio::test]
    async fn breakdown_orders_by_size() {
        let store = memory_store().await;
        let mut tx = store.begin().await.unwrap();
        tx.insert(&record("Apple", "Food", 50, 1)).await.unwrap();
        tx.insert(&record("Widget", "Tools", 100, 1)).await.unwrap();
        tx.insert(&record("Hammer", "Tools", 250, 2)).await.unwrap();
        tx.commit().await.unwrap();

        let breakdown = store.category_breakdown().await.unwrap();
        assert_eq!(breakdown[0].category, "Tools");
        assert_eq!(breakdown[0].items, 2);
        assert_eq!(breakdown[0].total_price, Decimal::new(350, 2));
        assert_eq!(breakdown[1].category, "Food");
    }
}
