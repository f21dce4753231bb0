//! External player process control
//!
//! One playback slot for the whole system: starting a song supersedes
//! whatever was playing. The slot tracks a generation counter that
//! increments on every play and stop, so a [`PlayTicket`] from an earlier
//! play can tell "my process finished" apart from "someone replaced me".
//!
//! Termination is two-phase: SIGTERM, a short grace period, then SIGKILL.
//! The player binary (ffplay by default) exits cleanly on SIGTERM, so the
//! kill path only fires for wedged processes.

use crate::error::{PlaybackError, Result};
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::path::Path;
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;

/// How long a process gets to exit after SIGTERM before SIGKILL.
const TERM_GRACE: Duration = Duration::from_secs(2);

/// How often [`Player::wait_for_exit`] re-checks the slot.
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// The external program used to play a file, plus its fixed arguments.
/// The file path is appended as the final argument.
#[derive(Debug, Clone)]
pub struct PlayerCommand {
    program: String,
    args: Vec<String>,
}

impl PlayerCommand {
    /// ffplay in quiet, headless, exit-at-end mode.
    pub fn ffplay() -> Self {
        Self {
            program: "ffplay".to_string(),
            args: vec![
                "-nodisp".to_string(),
                "-autoexit".to_string(),
                "-loglevel".to_string(),
                "quiet".to_string(),
            ],
        }
    }

    /// An arbitrary program. Used by tests and alternative player setups.
    pub fn custom(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

/// Proof of a specific play request. Becomes stale as soon as another play
/// or a stop bumps the slot generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayTicket {
    generation: u64,
}

/// How a waited-on play ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The process ran to completion on its own.
    Completed,
    /// Another play or a stop replaced this ticket's process.
    Superseded,
    /// The process state could not be determined. The child may or may not
    /// still be running; callers must not treat this as a clean finish.
    Failed,
}

struct Slot {
    child: Option<Child>,
    /// Identifier of the song the slot is attributed to. Survives natural
    /// completion so status queries and loop checks can see what last
    /// played; cleared only by an explicit stop.
    current: Option<String>,
    generation: u64,
    #[cfg(test)]
    wait_error: bool,
}

/// Single-slot controller for the external player process.
pub struct Player {
    command: PlayerCommand,
    slot: Mutex<Slot>,
}

impl Player {
    /// A player that spawns the given command for each file.
    pub fn new(command: PlayerCommand) -> Self {
        Self {
            command,
            slot: Mutex::new(Slot {
                child: None,
                current: None,
                generation: 0,
                #[cfg(test)]
                wait_error: false,
            }),
        }
    }

    /// Start playing `path`, superseding any active playback. `identifier`
    /// is the song name recorded as the slot's attribution.
    pub async fn play(&self, path: &Path, identifier: &str) -> Result<PlayTicket> {
        let mut slot = self.slot.lock().await;
        if let Some(child) = slot.child.take() {
            terminate(child, &self.command.program).await;
        }

        let child = Command::new(&self.command.program)
            .args(&self.command.args)
            .arg(path)
            .spawn()
            .map_err(|source| PlaybackError::Spawn {
                program: self.command.program.clone(),
                source,
            })?;

        let pid = child.id();
        slot.generation += 1;
        slot.current = Some(identifier.to_string());
        slot.child = Some(child);
        tracing::info!("Playing {} (pid {:?})", identifier, pid);

        Ok(PlayTicket {
            generation: slot.generation,
        })
    }

    /// Stop playback and clear the slot's attribution. Returns whether a
    /// process was actually terminated. Outstanding tickets become stale.
    pub async fn stop(&self) -> bool {
        let mut slot = self.slot.lock().await;
        slot.generation += 1;
        slot.current = None;
        match slot.child.take() {
            Some(child) => {
                terminate(child, &self.command.program).await;
                tracing::info!("Playback stopped");
                true
            }
            None => false,
        }
    }

    /// Identifier of the song the slot is attributed to.
    pub async fn now_playing(&self) -> Option<String> {
        self.slot.lock().await.current.clone()
    }

    /// Whether a player process is currently running. Reaps a process that
    /// exited since the last check; attribution is left in place.
    pub async fn is_active(&self) -> bool {
        let mut slot = self.slot.lock().await;
        match reap_if_exited(&mut slot) {
            Ok(active) => active,
            Err(e) => {
                tracing::warn!("Could not query player process: {}", e);
                false
            }
        }
    }

    /// Block until the play behind `ticket` finishes or is superseded.
    ///
    /// Polls the slot under short lock acquisitions, so other operations
    /// (stop, a superseding play) proceed freely in between.
    pub async fn wait_for_exit(&self, ticket: &PlayTicket) -> WaitOutcome {
        loop {
            {
                let mut slot = self.slot.lock().await;
                if slot.generation != ticket.generation {
                    return WaitOutcome::Superseded;
                }
                match reap_if_exited(&mut slot) {
                    Ok(true) => {}
                    Ok(false) => return WaitOutcome::Completed,
                    Err(e) => {
                        tracing::warn!("Could not query player process: {}", e);
                        return WaitOutcome::Failed;
                    }
                }
            }
            tokio::time::sleep(WAIT_POLL_INTERVAL).await;
        }
    }
}

#[cfg(test)]
impl Player {
    /// Make every subsequent process-state query fail.
    pub(crate) async fn fail_process_queries(&self) {
        self.slot.lock().await.wait_error = true;
    }
}

/// Returns whether the slot still holds a running process, reaping an
/// exited child in passing.
fn reap_if_exited(slot: &mut Slot) -> std::io::Result<bool> {
    #[cfg(test)]
    if slot.wait_error {
        return Err(std::io::Error::other("injected wait failure"));
    }
    let Some(child) = slot.child.as_mut() else {
        return Ok(false);
    };
    match child.try_wait()? {
        Some(status) => {
            tracing::debug!("Player exited with {}", status);
            slot.child = None;
            Ok(false)
        }
        None => Ok(true),
    }
}

/// SIGTERM, bounded grace, then SIGKILL.
async fn terminate(mut child: Child, program: &str) {
    let Some(pid) = child.id() else {
        // Already reaped by a prior wait.
        return;
    };

    #[allow(clippy::cast_possible_wrap)]
    let pid = Pid::from_raw(pid as i32);
    if let Err(e) = signal::kill(pid, Signal::SIGTERM) {
        tracing::debug!("SIGTERM to {} failed: {}", pid, e);
    }

    match tokio::time::timeout(TERM_GRACE, child.wait()).await {
        Ok(Ok(status)) => tracing::debug!("{} terminated with {}", program, status),
        Ok(Err(e)) => tracing::warn!("Waiting on {} failed: {}", program, e),
        Err(_) => {
            tracing::warn!("{} ignored SIGTERM, sending SIGKILL", program);
            if let Err(e) = child.kill().await {
                tracing::warn!("SIGKILL to {} failed: {}", program, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn wait_failure_is_reported_distinctly() {
        let player = Player::new(PlayerCommand::custom("sleep", vec![]));
        let ticket = player.play(Path::new("5"), "long-running").await.unwrap();

        player.fail_process_queries().await;
        let outcome = player.wait_for_exit(&ticket).await;
        assert_eq!(outcome, WaitOutcome::Failed);

        // The failure is not a clean finish; stop still reaps the child.
        player.stop().await;
    }
}
