//! # Price Catalog
//!
//! Archive-to-row ingestion of price catalogs with transactional
//! persistence, plus the symmetric row-to-archive export.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   ┌───────────┐   ┌─────────────┐   ┌──────────┐
//! │  Archive  │──▶│    CSV    │──▶│  Ingestion  │──▶│  SQLite  │
//! │ ZIP / TAR │   │  Decoder  │   │ Transaction │   │  prices  │
//! └───────────┘   └───────────┘   └─────────────┘   └────┬─────┘
//!                                                        │
//!                     ┌──────────────┐                   │
//!                     │    Export    │◀──────────────────┘
//!                     │ CSV in ZIP   │
//!                     └──────────────┘
//! ```
//!
//! ## Data Flow
//!
//! 1. The **archive locator** ([`archive`]) finds the first `.csv` entry in a
//!    ZIP or TAR upload and buffers it.
//! 2. The **decoder** ([`decode`]) binds columns positionally through a
//!    [`decode::ColumnMap`] and validates every row before anything is written.
//! 3. The **ingestor** ([`ingest`]) inserts the batch inside one store
//!    transaction and reports an [`models::AggregateSummary`].
//! 4. The **exporter** ([`export`]) renders all rows as CSV inside a ZIP.
//! 5. Both pipelines are exposed via the **CLI** (`pricectl`) and the
//!    **HTTP server** ([`server`]).
//!
//! ## Quick Start
//!
//! ```bash
//! pricectl init                           # create database
//! pricectl import prices.zip              # ingest an archive
//! pricectl import prices.tar --type tar
//! pricectl export --output data.zip
//! pricectl serve                          # start HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`models`] | `PriceRecord`, `CatalogTotals`, `AggregateSummary` |
//! | [`error`] | Layered error taxonomy |
//! | [`archive`] | CSV entry lookup in ZIP and TAR archives |
//! | [`decode`] | CSV parsing, column mapping, and row validation |
//! | [`store`] | `PriceStore` trait and in-memory backend |
//! | [`sqlite_store`] | SQLite `PriceStore` backend |
//! | [`ingest`] | Transactional batch ingestion |
//! | [`export`] | CSV-in-ZIP export |
//! | [`server`] | HTTP server |
//! | [`stats`] | Catalog statistics |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema bootstrap |
//! | [`logging`] | Tracing subscriber setup |

pub mod archive;
pub mod config;
pub mod db;
pub mod decode;
pub mod error;
pub mod export;
pub mod ingest;
pub mod logging;
pub mod migrate;
pub mod models;
pub mod server;
pub mod sqlite_store;
pub mod stats;
pub mod store;
