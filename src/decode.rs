//! CSV decoding and row validation.
//!
//! Turns the bytes of the located CSV entry into an ordered batch of
//! [`PriceRecord`]s. Columns are bound positionally through a [`ColumnMap`];
//! the header line is consumed and, only when configured, checked against
//! the map.
//!
//! Decoding is fail-fast: the first invalid row aborts the whole batch and
//! no rows are returned.

use anyhow::{bail, Result};
use chrono::NaiveDate;
use csv::StringRecord;
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

use crate::error::DecodeError;
use crate::models::{price_to_cents, PriceRecord, DATE_FORMAT, PRICE_SCALE};

/// Positional binding of CSV columns to [`PriceRecord`] fields.
///
/// Built from an ordered list of column names. The four field names must
/// each appear exactly once; any other name marks a column that is read
/// and ignored (for example a leading external `id`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMap {
    names: Vec<String>,
    name: usize,
    category: usize,
    price: usize,
    create_date: usize,
}

impl ColumnMap {
    /// The default ingestion contract, also used as the export header.
    pub const CANONICAL: [&'static str; 4] = ["name", "category", "price", "create_date"];

    pub fn canonical() -> Self {
        Self {
            names: Self::CANONICAL.iter().map(|c| c.to_string()).collect(),
            name: 0,
            category: 1,
            price: 2,
            create_date: 3,
        }
    }

    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        let names: Vec<String> = names
            .iter()
            .map(|n| n.as_ref().trim().to_ascii_lowercase())
            .collect();

        let position = |field: &str| -> Result<usize> {
            let mut hits = names.iter().enumerate().filter(|(_, n)| n.as_str() == field);
            match (hits.next(), hits.next()) {
                (Some((idx, _)), None) => Ok(idx),
                (None, _) => bail!("column '{}' is missing", field),
                (Some(_), Some(_)) => bail!("column '{}' appears more than once", field),
            }
        };

        Ok(Self {
            name: position("name")?,
            category: position("category")?,
            price: position("price")?,
            create_date: position("create_date")?,
            names,
        })
    }

    /// Number of columns every data row must have.
    pub fn width(&self) -> usize {
        self.names.len()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self::canonical()
    }
}

/// Decoder settings.
#[derive(Debug, Clone, Default)]
pub struct DecodeOptions {
    pub columns: ColumnMap,
    /// Require the header names to match `columns` (case-insensitive).
    pub check_header: bool,
    /// Reject negative prices here instead of at the store.
    pub reject_negative_prices: bool,
}

/// Decodes CSV bytes into a validated batch.
///
/// The first record is the header. At least one data record must follow.
pub fn decode(bytes: &[u8], options: &DecodeOptions) -> Result<Vec<PriceRecord>, DecodeError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let mut records: Vec<(u64, StringRecord)> = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| DecodeError::MalformedRow {
            line: e.position().map(|p| p.line()).unwrap_or(0),
            message: e.to_string(),
        })?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        records.push((line, record));
    }

    if records.len() < 2 {
        return Err(DecodeError::EmptyDataset);
    }

    let (_, header) = &records[0];
    if options.check_header {
        check_header(header, &options.columns)?;
    }

    records[1..]
        .iter()
        .map(|(line, record)| decode_row(*line, record, options))
        .collect()
}

fn check_header(header: &StringRecord, columns: &ColumnMap) -> Result<(), DecodeError> {
    let found: Vec<String> = header.iter().map(|h| h.to_ascii_lowercase()).collect();
    if found.as_slice() != columns.names() {
        return Err(DecodeError::HeaderMismatch {
            expected: columns.names().join(", "),
            found: found.join(", "),
        });
    }
    Ok(())
}

fn decode_row(
    line: u64,
    record: &StringRecord,
    options: &DecodeOptions,
) -> Result<PriceRecord, DecodeError> {
    let columns = &options.columns;
    if record.len() != columns.width() {
        return Err(DecodeError::MalformedRow {
            line,
            message: format!("expected {} fields, found {}", columns.width(), record.len()),
        });
    }

    let name = non_empty(line, "name", &record[columns.name])?;
    let category = non_empty(line, "category", &record[columns.category])?;
    let price = parse_price(line, &record[columns.price], options.reject_negative_prices)?;
    let create_date = parse_date(line, &record[columns.create_date])?;

    Ok(PriceRecord {
        name,
        category,
        price,
        create_date,
    })
}

fn non_empty(line: u64, field: &'static str, value: &str) -> Result<String, DecodeError> {
    if value.is_empty() {
        return Err(DecodeError::EmptyField { line, field });
    }
    Ok(value.to_string())
}

/// Parses a plain base-10 decimal and rounds it to the stored scale.
fn parse_price(line: u64, value: &str, reject_negative: bool) -> Result<Decimal, DecodeError> {
    let invalid = || DecodeError::InvalidPrice {
        line,
        value: value.to_string(),
    };

    // Decimal::from_str tolerates digit separators; the contract does not.
    let plain = value
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'-' | b'+'));
    if value.is_empty() || !plain {
        return Err(invalid());
    }

    let price = Decimal::from_str(value)
        .map_err(|_| invalid())?
        .round_dp_with_strategy(PRICE_SCALE, RoundingStrategy::MidpointAwayFromZero);

    if reject_negative && price.is_sign_negative() && !price.is_zero() {
        return Err(invalid());
    }

    if price_to_cents(price).is_none() {
        return Err(invalid());
    }

    Ok(price)
}

fn parse_date(line: u64, value: &str) -> Result<NaiveDate, DecodeError> {
    let invalid = || DecodeError::InvalidDate {
        line,
        value: value.to_string(),
    };

    // chrono accepts unpadded months and days; the contract is fixed-width.
    if value.len() != 10 {
        return Err(invalid());
    }
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_| invalid())
}
