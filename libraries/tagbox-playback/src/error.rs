/// Error types for playback
use thiserror::Error;

/// Playback error type
#[derive(Error, Debug)]
pub enum PlaybackError {
    /// The player binary could not be started
    #[error("Failed to start {program}: {source}")]
    Spawn {
        /// Player program name
        program: String,
        /// Underlying spawn error
        #[source]
        source: std::io::Error,
    },

    /// Querying or reaping the player process failed
    #[error("Failed to wait on player process: {0}")]
    Wait(#[from] std::io::Error),
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;
