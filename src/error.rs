use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Classification of a failed recognition call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureKind {
    /// Engine path missing or unresolvable; nothing was spawned
    ConfigurationError,
    /// The engine process could not be started
    LaunchError,
    /// The engine started but exited non-zero
    EngineRuntimeError,
    /// The engine exited zero but its output was empty or malformed
    OutputParseError,
    /// The engine exceeded the deadline and was killed
    TimeoutError,
    /// A request field was out of range; nothing was spawned
    InvalidRequest,
    /// The caller cancelled the call and the engine was killed
    Cancelled,
}

impl FailureKind {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigurationError => "CONFIGURATION_ERROR",
            Self::LaunchError => "LAUNCH_ERROR",
            Self::EngineRuntimeError => "ENGINE_RUNTIME_ERROR",
            Self::OutputParseError => "OUTPUT_PARSE_ERROR",
            Self::TimeoutError => "TIMEOUT_ERROR",
            Self::InvalidRequest => "INVALID_REQUEST",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A classified failure with a human-readable diagnostic
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("{kind}: {detail}")]
pub struct Failure {
    pub kind: FailureKind,
    pub detail: String,
}

impl Failure {
    pub fn new(kind: FailureKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }
}

/// Errors surfaced by the HTTP layer
#[derive(Error, Debug)]
pub enum OcrError {
    #[error("Recognition failed: {0}")]
    Recognition(#[from] Failure),

    #[error("Image too large: {size} bytes (max: {max} bytes)")]
    ImageTooLarge { size: usize, max: usize },

    #[error("Missing file in request")]
    MissingFile,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl OcrError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            OcrError::Recognition(failure) => {
                let status = match failure.kind {
                    FailureKind::ConfigurationError | FailureKind::LaunchError => {
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                    FailureKind::EngineRuntimeError | FailureKind::OutputParseError => {
                        StatusCode::BAD_GATEWAY
                    }
                    FailureKind::TimeoutError => StatusCode::GATEWAY_TIMEOUT,
                    FailureKind::InvalidRequest => StatusCode::BAD_REQUEST,
                    FailureKind::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
                };
                (status, failure.kind.code())
            }
            OcrError::ImageTooLarge { .. } => (StatusCode::PAYLOAD_TOO_LARGE, "IMAGE_TOO_LARGE"),
            OcrError::MissingFile => (StatusCode::BAD_REQUEST, "MISSING_FILE"),
            OcrError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
            OcrError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl IntoResponse for OcrError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        });

        (status, body).into_response()
    }
}
