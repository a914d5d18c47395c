//! Schema bootstrap.
//!
//! Creates the `prices` table and its index. Every statement is
//! idempotent, so this runs both from `pricectl init` and at the start of
//! every command that touches the store.

use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

/// Open the configured database and create the schema.
pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    ensure_schema(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Create the schema on an existing pool if it is missing.
pub async fn ensure_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS prices (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL CHECK (name <> ''),
            category TEXT NOT NULL CHECK (category <> ''),
            price_cents INTEGER NOT NULL CHECK (price_cents >= 0),
            create_date TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_prices_category ON prices(category)")
        .execute(pool)
        .await?;

    Ok(())
}
