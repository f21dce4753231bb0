/// Error types for the reader link
///
/// The taxonomy follows how callers recover: `LinkError` means the
/// connection is gone and must be re-established; `ReadError`/`WriteError`
/// are tag-level failures that a fresh presentation can retry. No error in
/// this crate is fatal to the worker loops above it.
use std::time::Duration;
use thiserror::Error;

/// Transport/connection-level failure. Any of these marks the link
/// disconnected; callers must `connect()` again before further use.
#[derive(Error, Debug)]
pub enum LinkError {
    /// Serial port could not be opened
    #[error("Failed to open serial port {path}: {source}")]
    Open {
        /// Configured serial device path
        path: String,
        /// Underlying serial error
        #[source]
        source: serialport::Error,
    },

    /// Reader did not answer the firmware handshake
    #[error("Reader handshake failed: {0}")]
    Handshake(String),

    /// Operation attempted while disconnected
    #[error("Not connected to reader")]
    NotConnected,

    /// Transport I/O failure mid-operation
    #[error("Transport I/O failure: {0}")]
    Io(#[from] std::io::Error),

    /// Reader sent a frame that does not parse or checksum
    #[error("Malformed reader frame: {0}")]
    Protocol(String),
}

/// Tag-level read failure. The connection survives; partial data is never
/// surfaced.
#[derive(Error, Debug)]
pub enum ReadError {
    /// Connection loss during the read sequence
    #[error(transparent)]
    Link(#[from] LinkError),

    /// A block in the sequence could not be read
    #[error("Failed to read block {block} from tag")]
    Block {
        /// Block number that failed
        block: u8,
    },
}

/// Tag-level write failure. All-or-nothing at the call level; tag media has
/// no transactional semantics, so no rollback is attempted.
#[derive(Error, Debug)]
pub enum WriteError {
    /// Connection loss during the write sequence
    #[error(transparent)]
    Link(#[from] LinkError),

    /// A block in the sequence could not be written
    #[error("Failed to write block {block} to tag")]
    Block {
        /// Block number that failed
        block: u8,
    },

    /// Payload does not tile onto 4-byte blocks
    #[error("Payload length {0} is not a multiple of the tag block size")]
    Alignment(usize),

    /// No tag entered the field before the wait deadline
    #[error("No tag presented within {0:?}")]
    NoTagPresented(Duration),
}
