//! Error taxonomy for the ingestion and export pipelines.
//!
//! Each pipeline layer has its own enum; [`CatalogError`] unifies them for
//! callers that drive the whole flow (HTTP handlers, CLI commands).
//!
//! | Layer | Enum | Fault |
//! |-------|------|-------|
//! | Archive | [`ArchiveError`] | client |
//! | Decode | [`DecodeError`] | client |
//! | Persistence | [`IngestError`] | server |
//! | Export | [`ExportError`] | server |

use thiserror::Error;

/// Failures while locating the CSV entry inside an archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("cannot read {kind} archive: {message}")]
    Format { kind: &'static str, message: String },

    #[error("no entry ending in '{suffix}' found in archive")]
    CsvNotFound { suffix: String },
}

/// Failures while parsing and validating CSV rows.
///
/// Line numbers are 1-based and count the header line.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("dataset is empty: a header and at least one data row are required")]
    EmptyDataset,

    #[error("line {line}: invalid price '{value}'")]
    InvalidPrice { line: u64, value: String },

    #[error("line {line}: invalid date '{value}', expected YYYY-MM-DD")]
    InvalidDate { line: u64, value: String },

    #[error("line {line}: field '{field}' must not be empty")]
    EmptyField { line: u64, field: &'static str },

    #[error("line {line}: malformed row: {message}")]
    MalformedRow { line: u64, message: String },

    #[error("header mismatch: expected [{expected}], found [{found}]")]
    HeaderMismatch { expected: String, found: String },
}

/// Failures while persisting a validated batch.
///
/// `Aggregation` is distinct from the others because, outside of
/// consistent-aggregate mode, it happens after the batch is committed.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("transaction error: {0}")]
    Transaction(#[source] anyhow::Error),

    #[error("ingestion failed at row {row}, batch rolled back: {source}")]
    IngestionFailed {
        row: usize,
        #[source]
        source: anyhow::Error,
    },

    #[error("aggregation failed: {0}")]
    Aggregation(#[source] anyhow::Error),
}

/// Failures while building the export archive.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("query failed: {0}")]
    Query(#[source] anyhow::Error),

    #[error("serialization failed: {message}")]
    Serialization { message: String },
}

impl From<csv::Error> for ExportError {
    fn from(err: csv::Error) -> Self {
        ExportError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<zip::result::ZipError> for ExportError {
    fn from(err: zip::result::ZipError) -> Self {
        ExportError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for ExportError {
    fn from(err: std::io::Error) -> Self {
        ExportError::Serialization {
            message: err.to_string(),
        }
    }
}

/// Any failure of the ingestion or export flow.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Export(#[from] ExportError),
}

impl CatalogError {
    /// True when the input was at fault (the store was never touched).
    pub fn is_client_fault(&self) -> bool {
        matches!(self, CatalogError::Archive(_) | CatalogError::Decode(_))
    }

    /// Machine-readable code used in HTTP error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            CatalogError::Archive(ArchiveError::Format { .. }) => "archive_format",
            CatalogError::Archive(ArchiveError::CsvNotFound { .. }) => "csv_not_found",
            CatalogError::Decode(DecodeError::EmptyDataset) => "empty_dataset",
            CatalogError::Decode(DecodeError::InvalidPrice { .. }) => "invalid_price",
            CatalogError::Decode(DecodeError::InvalidDate { .. }) => "invalid_date",
            CatalogError::Decode(DecodeError::EmptyField { .. }) => "empty_field",
            CatalogError::Decode(DecodeError::MalformedRow { .. }) => "malformed_row",
            CatalogError::Decode(DecodeError::HeaderMismatch { .. }) => "header_mismatch",
            CatalogError::Ingest(IngestError::Transaction(_)) => "transaction",
            CatalogError::Ingest(IngestError::IngestionFailed { .. }) => "ingestion_failed",
            CatalogError::Ingest(IngestError::Aggregation(_)) => "aggregation",
            CatalogError::Export(ExportError::Query(_)) => "query",
            CatalogError::Export(ExportError::Serialization { .. }) => "serialization",
        }
    }
}
