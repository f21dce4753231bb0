/// Core error types for Tagbox
use thiserror::Error;

/// Result type alias using `CoreError`
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core error type for Tagbox
#[derive(Error, Debug)]
pub enum CoreError {
    /// A song hash string failed validation
    #[error("Invalid song hash: {0}")]
    InvalidHash(String),

    /// A tag UID string failed validation
    #[error("Invalid tag UID: {0}")]
    InvalidUid(String),

    /// Settings file could not be read or written
    #[error("Settings error: {0}")]
    Settings(String),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}
