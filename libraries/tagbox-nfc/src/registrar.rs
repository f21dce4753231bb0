//! One-shot reader operations for tag registration
//!
//! Used by the HTTP surface when the user links a tag to a song: scan a UID
//! so it can be stored in the registry, or burn a song hash into a tag's
//! user memory. Both wait for a tag to be presented, bounded by a deadline.

use crate::error::{LinkError, WriteError};
use crate::link::TagLink;
use crate::HASH_START_BLOCK;
use std::time::{Duration, Instant};
use tagbox_core::{SongHash, TagUid};

/// How long each poll attempt waits while looping toward the deadline.
const POLL_STEP: Duration = Duration::from_millis(500);

/// Wait up to `wait` for a tag and return its UID, or `None` if nothing was
/// presented in time.
pub fn scan_uid_once(link: &dyn TagLink, wait: Duration) -> Result<Option<TagUid>, LinkError> {
    if !link.is_connected() {
        link.connect()?;
    }
    wait_for_tag(link, wait)
}

/// Wait up to `wait` for a tag, then write `hash` across its user-memory
/// blocks. Returns the UID of the tag that was written.
pub fn write_hash_to_tag(
    link: &dyn TagLink,
    hash: &SongHash,
    wait: Duration,
) -> Result<TagUid, WriteError> {
    if !link.is_connected() {
        link.connect().map_err(WriteError::Link)?;
    }

    let uid = wait_for_tag(link, wait)
        .map_err(WriteError::Link)?
        .ok_or(WriteError::NoTagPresented(wait))?;

    link.write_blocks(HASH_START_BLOCK, &hash.to_bytes())?;
    tracing::info!("Wrote hash {} to tag {}", hash, uid);
    Ok(uid)
}

fn wait_for_tag(link: &dyn TagLink, wait: Duration) -> Result<Option<TagUid>, LinkError> {
    let deadline = Instant::now() + wait;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Ok(None);
        }
        if let Some(uid) = link.poll_uid(remaining.min(POLL_STEP))? {
            return Ok(Some(uid));
        }
    }
}
