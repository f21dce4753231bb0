//! Loop sessions
//!
//! When loop mode is on, a tag arrival starts a session that replays the
//! song every time the player process finishes naturally. The session ends
//! the moment any of its conditions stop holding: its play was superseded,
//! loop mode was switched off, the slot is attributed to a different song,
//! or the player process can no longer be tracked. The gate is consulted
//! fresh on every cycle, so turning loop mode off takes effect after the
//! in-flight play at the latest.

use crate::error::Result;
use crate::player::{PlayTicket, Player, WaitOutcome};
use std::path::PathBuf;
use std::sync::Arc;
use tagbox_core::SettingsStore;

/// Read-side of the loop-mode switch.
pub trait LoopGate: Send + Sync {
    /// Whether loop mode is currently on.
    fn loop_enabled(&self) -> bool;
}

impl LoopGate for SettingsStore {
    fn loop_enabled(&self) -> bool {
        SettingsStore::loop_enabled(self)
    }
}

/// Replays one song for as long as it remains the active, loop-eligible
/// playback.
pub struct LoopSession {
    player: Arc<Player>,
    gate: Arc<dyn LoopGate>,
    file_path: PathBuf,
    identifier: String,
}

impl LoopSession {
    /// A session for the song at `file_path`, attributed as `identifier`.
    /// The caller has already started the first play and holds its ticket.
    pub fn new(
        player: Arc<Player>,
        gate: Arc<dyn LoopGate>,
        file_path: PathBuf,
        identifier: String,
    ) -> Self {
        Self {
            player,
            gate,
            file_path,
            identifier,
        }
    }

    /// Drive the session to its natural end. Consumes the ticket of the
    /// already-running first play.
    pub async fn run(self, mut ticket: PlayTicket) -> Result<()> {
        loop {
            match self.player.wait_for_exit(&ticket).await {
                WaitOutcome::Superseded => {
                    tracing::debug!("Loop session for {} superseded", self.identifier);
                    return Ok(());
                }
                WaitOutcome::Completed => {}
                WaitOutcome::Failed => {
                    // Process state is unknown; replaying on top of it could
                    // double up audio. End the session and release the slot
                    // if it is still ours.
                    tracing::warn!(
                        "Could not track player process for {}, ending loop session",
                        self.identifier
                    );
                    if self.player.now_playing().await.as_deref()
                        == Some(self.identifier.as_str())
                    {
                        self.player.stop().await;
                    }
                    return Ok(());
                }
            }

            if !self.gate.loop_enabled() {
                tracing::debug!("Loop mode off, ending session for {}", self.identifier);
                return Ok(());
            }
            if self.player.now_playing().await.as_deref() != Some(self.identifier.as_str()) {
                return Ok(());
            }

            tracing::debug!("Replaying {}", self.identifier);
            ticket = self.player.play(&self.file_path, &self.identifier).await?;
        }
    }
}
