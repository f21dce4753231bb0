//! Tagbox playback
//!
//! Controls the external audio player process and the loop-mode replay
//! logic on top of it.
//!
//! - [`player`] - the single playback slot: spawn, supersede, stop with
//!   SIGTERM-then-SIGKILL, and generation-checked waiting.
//! - [`loop_session`] - replays a song on natural completion while loop
//!   mode holds and the song remains the active attribution.
//!
//! There is no queue and no decoding here. The system plays at most one
//! file at a time through an external binary, and "what happens next" is
//! decided by tag presence, not by this crate.

pub mod error;
pub mod loop_session;
pub mod player;

pub use error::{PlaybackError, Result};
pub use loop_session::{LoopGate, LoopSession};
pub use player::{PlayTicket, Player, PlayerCommand, WaitOutcome};
