//! Catalog statistics.
//!
//! Quick summary of what is stored: row count, distinct categories, price
//! total, and a per-category breakdown. Used by `pricectl stats` to confirm
//! that imports landed as expected.

use anyhow::Result;
use std::sync::Arc;

use crate::config::Config;
use crate::db;
use crate::export::format_price;
use crate::migrate;
use crate::sqlite_store::SqliteStore;
use crate::store::{CategoryTotals, PriceStore};

/// Run the stats command: query the database and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    migrate::ensure_schema(&pool).await?;
    let store = Arc::new(SqliteStore::new(pool.clone()));

    let totals = store.totals().await?;
    let breakdown = store.category_breakdown().await?;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("Price Catalog — Database Stats");
    println!("==============================");
    println!();
    println!("  Database:    {}", config.db.path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!();
    println!("  Items:       {}", totals.items);
    println!("  Categories:  {}", totals.categories);
    println!("  Total price: {}", format_price(totals.total_price));

    if !breakdown.is_empty() {
        println!();
        println!("  By category:");
        print!("{}", render_breakdown(&breakdown));
    }

    println!();

    pool.close().await;
    Ok(())
}

fn render_breakdown(breakdown: &[CategoryTotals]) -> String {
    let mut out = format!("  {:<32} {:>8} {:>14}\n", "CATEGORY", "ITEMS", "TOTAL");
    out.push_str(&format!("  {}\n", "-".repeat(56)));
    for c in breakdown {
        out.push_str(&format!(
            "  {:<32} {:>8} {:>14}\n",
            c.category,
            c.items,
            format_price(c.total_price)
        ));
    }
    out
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn bytes_are_humanized() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
    }

    #[test]
    fn breakdown_lists_every_category() {
        let out = render_breakdown(&[
            CategoryTotals {
                category: "Tools".to_string(),
                items: 2,
                total_price: Decimal::new(2998, 2),
            },
            CategoryTotals {
                category: "Food".to_string(),
                items: 1,
                total_price: Decimal::new(50, 2),
            },
        ]);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[2].contains("Tools") && lines[2].ends_with("29.98"));
        assert!(lines[3].contains("Food") && lines[3].ends_with("0.50"));
    }
}
