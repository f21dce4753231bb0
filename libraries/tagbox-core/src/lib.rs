//! Tagbox Core
//!
//! Shared domain types and plumbing for Tagbox: song content hashes, tag
//! identifiers, the streaming file digest, and the JSON-persisted settings
//! store.
//!
//! Everything here is hardware- and runtime-agnostic; the NFC link, the
//! playback controller, and the HTTP server all build on this crate.
//!
//! # Example
//!
//! ```rust
//! use tagbox_core::types::{SongHash, TagUid};
//!
//! let hash: SongHash = "a1b2c3d4e5f6a1b2c3d4e5f6a1b2c3d4e5f6a1b2c3d4e5f6a1b2c3d4e5f6a1b2"
//!     .parse()
//!     .unwrap();
//! assert_eq!(hash.to_bytes().len(), 32);
//!
//! let uid = TagUid::from_bytes(&[0x04, 0xA2, 0x2B, 0x6A]);
//! assert_eq!(uid.to_string(), "04A22B6A");
//! ```

pub mod digest;
pub mod error;
pub mod settings;
pub mod types;

// Re-export commonly used types
pub use digest::file_sha256;
pub use error::{CoreError, Result};
pub use settings::{IdleMode, Settings, SettingsStore};
pub use types::{SongHash, TagUid, HASH_BYTES};
