//! Tagbox NFC
//!
//! Everything between the serial port and the [`TagObserver`] callbacks:
//!
//! - [`pn532`] - wire framing and command layer for the PN532 reader chip
//!   over UART, generic over any `Read + Write` transport.
//! - [`link`] - the [`TagLink`] hardware-link contract and its serial-port
//!   implementation [`NfcLink`]. One internal mutex serializes every
//!   hardware operation, including multi-block read/write sequences.
//! - [`presence`] - the pure new-tag/same-tag/removed tracker.
//! - [`watcher`] - the long-lived reader worker thread that owns the poll
//!   loop, recovers from disconnects, and notifies a [`TagObserver`].
//! - [`registrar`] - one-shot operations used by tag registration: scan a
//!   UID, write a song hash to a presented tag.
//!
//! The link never reconnects itself; any transport failure marks it
//! disconnected and the watcher re-establishes the connection on its next
//! iteration, with a fixed cooldown between failed attempts.

pub mod error;
pub mod link;
pub mod pn532;
pub mod presence;
pub mod registrar;
pub mod watcher;

pub use error::{LinkError, ReadError, WriteError};
pub use link::{NfcLink, TagLink};
pub use presence::{Presence, PresenceTracker};
pub use registrar::{scan_uid_once, write_hash_to_tag};
pub use watcher::{TagObserver, TagWatcher, WatcherConfig, WatcherHandle};

use tagbox_core::HASH_BYTES;

/// NTAG2xx user-memory block size in bytes.
pub const TAG_BLOCK_SIZE: usize = 4;

/// First user block past the tag's reserved system blocks; the hash payload
/// starts here.
pub const HASH_START_BLOCK: u8 = 4;

/// Number of blocks the hash payload occupies. Derived, not a literal: if
/// the hash width ever changes this follows automatically.
pub const HASH_BLOCK_COUNT: u8 = (HASH_BYTES / TAG_BLOCK_SIZE) as u8;

// The payload must tile exactly onto tag blocks.
const _: () = assert!(HASH_BYTES % TAG_BLOCK_SIZE == 0);
