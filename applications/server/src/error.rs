/// Server error types
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ServerError>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Reader unavailable: {0}")]
    Reader(String),

    #[error("No tag was presented in time")]
    TagTimeout,

    #[error("Bluetooth error: {0}")]
    Bluetooth(String),

    #[error("Playback error: {0}")]
    Playback(#[from] tagbox_playback::PlaybackError),

    #[error(transparent)]
    Core(#[from] tagbox_core::CoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<tagbox_nfc::LinkError> for ServerError {
    fn from(err: tagbox_nfc::LinkError) -> Self {
        ServerError::Reader(err.to_string())
    }
}

impl From<tagbox_nfc::WriteError> for ServerError {
    fn from(err: tagbox_nfc::WriteError) -> Self {
        match err {
            tagbox_nfc::WriteError::NoTagPresented(_) => ServerError::TagTimeout,
            other => ServerError::Reader(other.to_string()),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            ServerError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ServerError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ServerError::TagTimeout => (
                StatusCode::REQUEST_TIMEOUT,
                "No tag was presented in time".to_string(),
            ),
            ServerError::Reader(ref msg) => {
                tracing::warn!("Reader error: {}", msg);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Tag reader unavailable".to_string(),
                )
            }
            ServerError::Bluetooth(ref msg) => {
                tracing::error!("Bluetooth error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Bluetooth error".to_string(),
                )
            }
            ServerError::Playback(ref e) => {
                tracing::error!("Playback error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Playback error".to_string(),
                )
            }
            ServerError::Config(ref msg) => {
                tracing::error!("Config error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Configuration error".to_string(),
                )
            }
            ServerError::Core(ref e) => {
                tracing::error!("Core error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            ServerError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            ServerError::Io(ref e) => {
                tracing::error!("IO error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "IO error".to_string())
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
