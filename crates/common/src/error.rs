use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// Error taxonomy shared by the fetchers, the generator and the pipelines.
///
/// Every stage fails fast; the HTTP layer maps `Validation` to 400 and
/// everything else to 500.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Transport error calling {source_name}: {message}")]
    Transport {
        source_name: String,
        message: String,
    },

    #[error("{source_name} upstream returned HTTP {status}: {body}")]
    Upstream {
        source_name: String,
        status: u16,
        body: String,
    },

    #[error("Decode error from {source_name}: {message}")]
    Decode {
        source_name: String,
        message: String,
    },

    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("No structured payload found in model response")]
    NoStructuredPayloadFound,

    #[error("Malformed payload in model response: {0}")]
    MalformedPayload(#[from] serde_json::Error),

    #[error("Merge collision: generated field '{0}' would overwrite fetched data")]
    MergeCollision(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    /// Whether a retry at the call boundary could plausibly succeed.
    ///
    /// Network failures, rate limiting and upstream 5xx answers are transient.
    /// Generation failures are only transient when the endpoint was unreachable
    /// or overloaded, which the generator signals through `Transport`/`Upstream`
    /// before the error is folded into `Generation`.
    pub fn is_transient(&self) -> bool {
        match self {
            AppError::Transport { .. } => true,
            AppError::Upstream { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// HTTP status of an upstream failure, if this is one.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            AppError::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            AppError::Validation(msg) => msg.clone(),
            _ => self.to_string(),
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let body = json!({ "error": message });
        (status, Json(body)).into_response()
    }
}
