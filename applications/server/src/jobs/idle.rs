/// Idle-mode watchdog
///
/// Background task that starts a song after the system has been silent for
/// a while, depending on the configured idle policy. Idleness is keyed on
/// the player process actually being alive, not on the slot's attribution,
/// so a song that finished naturally counts as silence once its process is
/// gone. The pruned selection list is written back to settings so missing
/// files are not retried forever.
use crate::services::MusicLibrary;
use rand::seq::SliceRandom;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tagbox_core::{IdleMode, SettingsStore};
use tagbox_playback::Player;
use tokio::task::JoinHandle;

/// Silence required before idle playback kicks in.
const IDLE_THRESHOLD: Duration = Duration::from_secs(30);

/// How often the watchdog re-evaluates.
const TICK_INTERVAL: Duration = Duration::from_secs(2);

pub struct IdleWatchdog {
    player: Arc<Player>,
    library: Arc<MusicLibrary>,
    settings: Arc<SettingsStore>,
}

impl IdleWatchdog {
    pub fn new(
        player: Arc<Player>,
        library: Arc<MusicLibrary>,
        settings: Arc<SettingsStore>,
    ) -> Self {
        Self {
            player,
            library,
            settings,
        }
    }

    /// Start the watchdog task. Abort the handle at shutdown.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            tracing::info!("Idle watchdog started");
            self.run().await;
        })
    }

    async fn run(self) {
        let mut last_active = Instant::now();

        loop {
            tokio::time::sleep(TICK_INTERVAL).await;

            if self.player.is_active().await {
                last_active = Instant::now();
                continue;
            }

            let mode = self.settings.idle_mode();
            if mode == IdleMode::DoNothing {
                continue;
            }

            if last_active.elapsed() <= IDLE_THRESHOLD {
                continue;
            }

            if let Some(song) = self.pick_song(mode).await {
                tracing::info!("Idle for >{:?}, playing {}", IDLE_THRESHOLD, song);
                match self.library.path_of(&song) {
                    Ok(path) => {
                        if let Err(e) = self.player.play(&path, &song).await {
                            tracing::error!("Idle playback of {} failed: {}", song, e);
                        }
                        // The next tick sees the live process and resets
                        // the timer.
                        last_active = Instant::now();
                    }
                    Err(e) => tracing::warn!("Idle song {} unavailable: {}", song, e),
                }
            }
        }
    }

    async fn pick_song(&self, mode: IdleMode) -> Option<String> {
        match mode {
            IdleMode::DoNothing => None,
            IdleMode::PlayRandom => {
                let songs = self.library.list().await;
                songs.choose(&mut rand::thread_rng()).cloned()
            }
            IdleMode::PlaySelect => {
                let mut current = self.settings.snapshot();
                let valid: Vec<String> = current
                    .select_songs
                    .iter()
                    .filter(|s| self.library.path_of(s).is_ok())
                    .cloned()
                    .collect();

                if valid.len() != current.select_songs.len() {
                    tracing::warn!("Pruning missing songs from idle selection");
                    current.select_songs.clone_from(&valid);
                    if let Err(e) = self.settings.update(current) {
                        tracing::warn!("Could not persist pruned selection: {}", e);
                    }
                }

                valid.choose(&mut rand::thread_rng()).cloned()
            }
        }
    }
}
