//! HTTP server for price catalog ingestion and export.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/v0/prices?type=zip\|tar` | Ingest an archive (multipart `file` field or raw body) |
//! | `GET`  | `/api/v0/prices` | Download the catalog as `data.zip` |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Ingestion response
//!
//! ```json
//! { "total_items": 2, "total_categories": 1, "total_price": 29.98 }
//! ```
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "invalid_price", "message": "line 3: invalid price 'abc'" } }
//! ```
//!
//! Malformed input (archive and decode errors) maps to `400`; persistence and
//! export failures map to `500`. An error response never carries aggregate
//! fields.

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, FromRequest, Multipart, Query, Request, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::archive::ContainerKind;
use crate::config::Config;
use crate::db;
use crate::error::CatalogError;
use crate::export::Exporter;
use crate::ingest::{IngestOptions, Ingestor};
use crate::migrate;
use crate::models::AggregateSummary;
use crate::sqlite_store::SqliteStore;
use crate::store::PriceStore;

/// Multipart field that carries the uploaded archive.
const UPLOAD_FIELD: &str = "file";

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    ingestor: Arc<Ingestor>,
    exporter: Arc<Exporter>,
    download_name: Arc<str>,
}

impl AppState {
    /// Wire the ingestion and export pipelines to one store.
    pub fn new(config: &Config, store: Arc<dyn PriceStore>) -> anyhow::Result<Self> {
        let options = IngestOptions::from_config(config)?;
        Ok(Self {
            ingestor: Arc::new(Ingestor::new(store.clone(), options)),
            exporter: Arc::new(Exporter::new(store, config.export.entry_name.clone())),
            download_name: Arc::from(config.export.download_name.as_str()),
        })
    }
}

/// Build the router with all routes and layers.
pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v0/prices", get(handle_export).post(handle_ingest))
        .route("/health", get(handle_health))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(cors)
        .with_state(state)
}

/// Starts the HTTP server backed by the configured SQLite database.
///
/// Creates the schema if needed, binds to `[server].bind`, and serves until
/// the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let pool = db::connect(config).await?;
    migrate::ensure_schema(&pool).await?;

    let store: Arc<dyn PriceStore> = Arc::new(SqliteStore::new(pool));
    let state = AppState::new(config, store)?;
    let app = router(state, config.server.max_upload_bytes);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    tracing::info!(bind = %config.server.bind, "price catalog server listening");
    println!("Price catalog server listening on http://{}", config.server.bind);

    axum::serve(listener, app).await?;
    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
#[derive(Debug)]
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

/// Constructs an error for a request that never reached the pipeline.
fn request_error(status: StatusCode, message: impl Into<String>) -> AppError {
    AppError {
        status,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        let status = if err.is_client_fault() {
            tracing::warn!(code = err.code(), error = %err, "request rejected");
            StatusCode::BAD_REQUEST
        } else {
            tracing::error!(code = err.code(), error = ?err, "request failed");
            StatusCode::INTERNAL_SERVER_ERROR
        };
        AppError {
            status,
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /api/v0/prices ============

#[derive(Debug, Deserialize)]
struct IngestParams {
    #[serde(rename = "type", default)]
    kind: Option<String>,
}

/// Handler for `POST /api/v0/prices`.
///
/// Reads the archive from the `file` multipart field when the request is
/// `multipart/form-data`, otherwise from the raw body.
async fn handle_ingest(
    State(state): State<AppState>,
    Query(params): Query<IngestParams>,
    request: Request,
) -> Result<Json<AggregateSummary>, AppError> {
    let kind = ContainerKind::from_selector(params.kind.as_deref().unwrap_or_default());
    let bytes = read_upload(request).await?;
    tracing::debug!(container = %kind, bytes = bytes.len(), "archive received");

    let summary = state.ingestor.import_archive(&bytes, kind).await?;
    Ok(Json(summary))
}

async fn read_upload(request: Request) -> Result<Bytes, AppError> {
    let is_multipart = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(is_form_data)
        .unwrap_or(false);

    if !is_multipart {
        return Bytes::from_request(request, &())
            .await
            .map_err(|rejection| request_error(rejection.status(), rejection.body_text()));
    }

    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(|rejection| request_error(rejection.status(), rejection.body_text()))?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| request_error(e.status(), e.body_text()))?
    {
        if field.name() == Some(UPLOAD_FIELD) {
            return field
                .bytes()
                .await
                .map_err(|e| request_error(e.status(), e.body_text()));
        }
    }

    Err(request_error(
        StatusCode::BAD_REQUEST,
        format!("multipart request has no '{}' field", UPLOAD_FIELD),
    ))
}

/// Media types are case-insensitive and may carry parameters.
fn is_form_data(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .map(|essence| essence.trim().eq_ignore_ascii_case("multipart/form-data"))
        .unwrap_or(false)
}

// ============ GET /api/v0/prices ============

/// Handler for `GET /api/v0/prices`: the catalog as a ZIP download.
async fn handle_export(State(state): State<AppState>) -> Result<Response, AppError> {
    let archive = state.exporter.export().await.map_err(CatalogError::from)?;

    let headers = [
        (header::CONTENT_TYPE, "application/zip".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", state.download_name),
        ),
    ];
    Ok((headers, archive).into_response())
}
