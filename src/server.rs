use crate::config::Config;
use crate::error::OcrError;
use crate::recognizer::Recognizer;
use crate::region::RecognizedRegion;
use crate::request::{RecognitionMode, RecognitionRequest};
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, State},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::io::Write;
use std::sync::Arc;
use std::time::Instant;
use tempfile::NamedTempFile;
use tower_http::trace::TraceLayer;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub recognizer: Arc<Recognizer>,
    pub config: Arc<Config>,
}

/// OCR response
#[derive(Serialize)]
pub struct OcrResponse {
    pub regions: Vec<RecognizedRegion>,
    pub processing_time_ms: u64,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Server info response
#[derive(Serialize)]
pub struct InfoResponse {
    pub version: String,
    pub engine_path: Option<String>,
    pub engine_revision: Option<String>,
    pub timeout_secs: f64,
    pub max_file_size_bytes: usize,
    pub modes: Vec<&'static str>,
}

/// Build the router; split from [`run`] so it can be driven without a socket
pub fn router(state: AppState) -> Router {
    let max_file_size = state.config.max_file_size;

    Router::new()
        .route("/ocr", post(handle_ocr))
        .route("/health", get(handle_health))
        .route("/info", get(handle_info))
        .layer(DefaultBodyLimit::max(max_file_size))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the HTTP server
pub async fn run(config: Config) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);

    if config.engine.engine_path.is_none() {
        tracing::warn!("No engine path configured; /ocr will report CONFIGURATION_ERROR");
    }

    let state = AppState {
        recognizer: Arc::new(Recognizer::new(config.engine.clone())),
        config: Arc::new(config),
    };

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, router(state)).await?;

    Ok(())
}

fn parse_bool(field: &str, value: &str) -> Result<bool, OcrError> {
    match value.trim().to_lowercase().as_str() {
        "" | "0" | "false" | "no" | "off" => Ok(false),
        "1" | "true" | "yes" | "on" => Ok(true),
        _ => Err(OcrError::InvalidRequest(format!(
            "{} must be a boolean, got '{}'",
            field, value
        ))),
    }
}

fn write_temp(data: &[u8], suffix: &str) -> Result<NamedTempFile, OcrError> {
    let mut temp_file = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile()
        .map_err(|e| OcrError::Internal(format!("Failed to create temp file: {}", e)))?;

    temp_file
        .write_all(data)
        .map_err(|e| OcrError::Internal(format!("Failed to write temp file: {}", e)))?;

    Ok(temp_file)
}

/// Handle OCR requests
async fn handle_ocr(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<OcrResponse>, OcrError> {
    let start = Instant::now();

    let mut file_data: Option<Bytes> = None;
    let mut content_type: Option<String> = None;
    let mut mode = RecognitionMode::default();
    let mut fix = false;
    let mut min_text_height: Option<f32> = None;
    let mut custom_words: Option<String> = None;

    // Parse multipart form
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| OcrError::InvalidRequest(format!("Failed to parse multipart: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            "file" => {
                content_type = field.content_type().map(|s| s.to_string());
                file_data = Some(field.bytes().await.map_err(|e| {
                    OcrError::InvalidRequest(format!("Failed to read file data: {}", e))
                })?);
            }
            "mode" | "fix" | "min_text_height" | "custom_words" => {
                let value = field.text().await.map_err(|e| {
                    OcrError::InvalidRequest(format!("Invalid {}: {}", name, e))
                })?;
                match name.as_str() {
                    "mode" => {
                        mode = RecognitionMode::from_str(&value).ok_or_else(|| {
                            OcrError::InvalidRequest(format!("Unknown mode '{}'", value))
                        })?;
                    }
                    "fix" => fix = parse_bool("fix", &value)?,
                    "min_text_height" => {
                        let height = value.trim().parse::<f32>().map_err(|_| {
                            OcrError::InvalidRequest(format!(
                                "min_text_height must be a number, got '{}'",
                                value
                            ))
                        })?;
                        min_text_height = Some(height);
                    }
                    _ => custom_words = Some(value),
                }
            }
            _ => {
                // Ignore unknown fields
            }
        }
    }

    // Validate file was provided
    let data = file_data.ok_or(OcrError::MissingFile)?;

    // Check file size
    if data.len() > state.config.max_file_size {
        return Err(OcrError::ImageTooLarge {
            size: data.len(),
            max: state.config.max_file_size,
        });
    }

    // The engine picks a decoder from the file extension
    let mime = content_type.unwrap_or_else(|| "application/octet-stream".to_string());
    let extension = match mime.as_str() {
        "image/png" => ".png",
        "image/jpeg" => ".jpg",
        "image/gif" => ".gif",
        "image/bmp" => ".bmp",
        "image/webp" => ".webp",
        "image/tiff" => ".tiff",
        "image/heic" => ".heic",
        _ => {
            tracing::warn!("Received file with content type: {}", mime);
            ".tmp"
        }
    };

    let image_file = write_temp(&data, extension)?;

    let mut request = RecognitionRequest::new(image_file.path())
        .mode(mode)
        .correction(fix);
    if let Some(height) = min_text_height {
        request = request.min_text_height(height);
    }

    // Kept alive until the engine has finished reading it
    let word_file = match custom_words {
        Some(words) if !words.trim().is_empty() => Some(write_temp(words.as_bytes(), ".txt")?),
        _ => None,
    };
    if let Some(word_file) = &word_file {
        request = request.custom_word_file(word_file.path());
    }

    let regions = state.recognizer.recognize(&request).await.into_result()?;

    let processing_time_ms = start.elapsed().as_millis() as u64;

    Ok(Json(OcrResponse {
        regions,
        processing_time_ms,
    }))
}

/// Handle health check requests
async fn handle_health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Handle info requests
async fn handle_info(State(state): State<AppState>) -> impl IntoResponse {
    let engine = state.recognizer.config();

    let engine_revision = match state.recognizer.engine_revision().await {
        Ok(revision) => Some(revision),
        Err(failure) => {
            tracing::debug!("Engine revision unavailable: {}", failure);
            None
        }
    };

    Json(InfoResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        engine_path: engine
            .engine_path
            .as_ref()
            .map(|p| p.display().to_string()),
        engine_revision,
        timeout_secs: engine.timeout.as_secs_f64(),
        max_file_size_bytes: state.config.max_file_size,
        modes: vec![
            RecognitionMode::Accurate.as_str(),
            RecognitionMode::Fast.as_str(),
        ],
    })
}
