//! Serve command - HTTP extraction service.
//!
//! Routes:
//! - `GET /`, `GET /version`, `GET /health`
//! - `POST /extract_text`: multipart field `input_file`, extraction parameters
//!   in the query string; answers with an [`ExtractionSummary`].

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::QueryRejection;
use axum::extract::{DefaultBodyLimit, Multipart, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use clap::Args;
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::json;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use poppleract_core::{ExtractionParams, HybridExtractor, PoppleractError, Strategy};

use super::{load_config, ExtractionSummary};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Multipart field carrying the PDF.
const FILE_FIELD: &str = "input_file";

/// Arguments for the serve command.
#[derive(Args)]
pub struct ServeArgs {
    /// Address to bind (default from config)
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (default from config)
    #[arg(short, long)]
    port: Option<u16>,
}

/// Shared state of the service.
#[derive(Clone)]
pub struct AppState {
    extractor: Arc<HybridExtractor>,
    defaults: Arc<ExtractionParams>,
}

impl AppState {
    pub fn new(extractor: HybridExtractor, defaults: ExtractionParams) -> Self {
        Self {
            extractor: Arc::new(extractor),
            defaults: Arc::new(defaults),
        }
    }
}

/// Query parameters of `POST /extract_text`; missing ones take the configured defaults.
#[derive(Debug, Default, Deserialize)]
pub struct ExtractQuery {
    minimum_chars_number: Option<usize>,
    #[serde(default, deserialize_with = "flag")]
    raw: Option<bool>,
    #[serde(default, deserialize_with = "flag")]
    physical: Option<bool>,
    dpi: Option<u32>,
    lang: Option<String>,
    oem: Option<u8>,
    psm: Option<u8>,
    tessdata_dir: Option<PathBuf>,
    thresholding_method: Option<u8>,
    preserve_interword_spaces: Option<u8>,
    strategy: Option<Strategy>,
}

/// Boolean query value written as `true`/`false` or `1`/`0`.
fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
    let Some(value) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(Some(true)),
        "false" | "0" => Ok(Some(false)),
        other => Err(de::Error::custom(format!("expected true, false, 1 or 0, got '{other}'"))),
    }
}

impl ExtractQuery {
    fn resolve(self, defaults: &ExtractionParams) -> Result<ExtractionParams, ApiError> {
        let mut params = defaults.clone();
        if let Some(n) = self.minimum_chars_number {
            params.minimum_chars_number = n;
        }
        if let Some(raw) = self.raw {
            params.raw = raw;
        }
        if let Some(physical) = self.physical {
            params.physical = physical;
        }
        if let Some(dpi) = self.dpi {
            params.dpi = dpi;
        }
        if let Some(lang) = self.lang {
            params.lang = lang;
        }
        if let Some(oem) = self.oem {
            params.oem = oem;
        }
        if let Some(psm) = self.psm {
            params.psm = psm;
        }
        if let Some(dir) = self.tessdata_dir {
            params.tessdata_dir = Some(dir);
        }
        if let Some(method) = self.thresholding_method {
            params.thresholding_method = method;
        }
        match self.preserve_interword_spaces {
            None => {}
            Some(0) => params.preserve_interword_spaces = false,
            Some(1) => params.preserve_interword_spaces = true,
            Some(other) => {
                return Err(ApiError::unprocessable(
                    "configuration error",
                    format!("preserve_interword_spaces must be 0 or 1, got {other}"),
                ));
            }
        }
        if let Some(strategy) = self.strategy {
            params.strategy = strategy;
        }
        params.validate()?;
        Ok(params)
    }
}

/// Error body `{error, details}` with its status code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error: String,
    details: String,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    details: &'a str,
}

impl ApiError {
    fn new(status: StatusCode, error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            status,
            error: error.into(),
            details: details.into(),
        }
    }

    fn unprocessable(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, error, details)
    }

    fn internal(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, error, details)
    }
}

impl From<PoppleractError> for ApiError {
    fn from(err: PoppleractError) -> Self {
        if err.is_client_error() {
            return Self::unprocessable("configuration error", err.to_string());
        }
        error!("Extraction failed: {}", err);
        let error = match &err {
            PoppleractError::Extraction(_) => "text extraction failed",
            PoppleractError::Rasterization(_) => "page rendering failed",
            PoppleractError::Ocr(_) => "OCR failed",
            PoppleractError::PageCountMismatch { .. } => "page count mismatch",
            PoppleractError::Config(_) | PoppleractError::Io(_) => "internal error",
        };
        Self::internal(error, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: &self.error,
            details: &self.details,
        });
        (self.status, body).into_response()
    }
}

/// Build the service router.
pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/version", get(version))
        .route("/health", get(health))
        .route("/extract_text", post(extract_text))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run(args: ServeArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    config.extraction.validate()?;

    let host = args.host.unwrap_or_else(|| config.server.host.clone());
    let port = args.port.unwrap_or(config.server.port);
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;

    let state = AppState::new(HybridExtractor::from_config(&config), config.extraction.clone());
    let app = router(state, config.server.max_upload_mb * 1024 * 1024);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("poppleract {} listening on {}", VERSION, addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({ "message": format!("poppleract ({VERSION}) root page!") }))
}

async fn version() -> Json<serde_json::Value> {
    Json(json!({ "version": VERSION }))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn extract_text(
    State(state): State<AppState>,
    query: Result<Query<ExtractQuery>, QueryRejection>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ExtractionSummary>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::unprocessable("invalid query parameters", e.body_text()))?;
    let params = query.resolve(&state.defaults)?;
    let mut multipart = multipart.map_err(|e| ApiError::unprocessable("invalid multipart request", e.body_text()))?;

    let (file_name, data) = read_upload(&mut multipart).await?;
    debug!("Received {} ({} bytes)", file_name, data.len());

    // Removed when the request completes, successfully or not
    let upload_dir = tempfile::Builder::new()
        .prefix("poppleract-upload-")
        .tempdir()
        .map_err(|e| ApiError::internal("internal error", e.to_string()))?;
    let pdf_path = upload_dir.path().join(safe_file_name(&file_name));
    tokio::fs::write(&pdf_path, &data)
        .await
        .map_err(|e| ApiError::internal("internal error", e.to_string()))?;

    let output = state.extractor.extract(&pdf_path, &params).await?;
    info!(
        "Extracted {} chars from {} ({} pages, {} OCR)",
        output.num_extracted_chars,
        file_name,
        output.page_count,
        output.ocr_page_count()
    );

    Ok(Json(ExtractionSummary::new(file_name, data.len() as u64, output)))
}

/// The uploaded file's name and contents.
async fn read_upload(multipart: &mut Multipart) -> Result<(String, Vec<u8>), ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::unprocessable("invalid multipart request", e.body_text()))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or("document.pdf").to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::unprocessable("invalid multipart request", e.body_text()))?;
        return Ok((file_name, data.to_vec()));
    }

    warn!("No {} field in multipart upload", FILE_FIELD);
    Err(ApiError::new(
        StatusCode::NOT_FOUND,
        "file not found",
        format!("multipart field '{FILE_FIELD}' is missing"),
    ))
}

/// Last path component of a client-supplied name.
fn safe_file_name(name: &str) -> String {
    Path::new(name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty() && n != "..")
        .unwrap_or_else(|| "document.pdf".to_string())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting graceful shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting graceful shutdown..."),
    }
}
