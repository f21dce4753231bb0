/// Runtime settings - loop mode, idle behavior, song selection
///
/// Settings are persisted as a small JSON file and read fresh at every
/// decision point: the loop session and the idle watchdog consult the store
/// on each cycle so a live change is observed within one iteration, without
/// any caching layer in between.
use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::RwLock;

/// What to do when nothing has played for a while
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdleMode {
    /// Stay silent
    #[default]
    DoNothing,
    /// Pick a random song from the whole library
    PlayRandom,
    /// Pick a random song from `select_songs`
    PlaySelect,
}

/// User-tunable runtime settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Replay a tag's song continuously while it remains the active target
    #[serde(default)]
    pub loop_tag_song: bool,

    /// Idle-mode song selection policy
    #[serde(default)]
    pub idle_mode: IdleMode,

    /// Candidate filenames for `IdleMode::PlaySelect`
    #[serde(default)]
    pub select_songs: Vec<String>,
}

/// JSON-file-backed settings store shared across workers.
///
/// Reads take the lock briefly and copy out; writes replace the whole
/// settings value and persist immediately.
#[derive(Debug)]
pub struct SettingsStore {
    path: PathBuf,
    inner: RwLock<Settings>,
}

impl SettingsStore {
    /// Load settings from `path`, falling back to defaults when the file is
    /// missing or unreadable. A corrupt file is never fatal.
    pub fn load(path: PathBuf) -> Self {
        let settings = match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<Settings>(&raw) {
                Ok(s) => s,
                Err(e) => {
                    tracing::warn!("Could not parse {:?}, using defaults: {}", path, e);
                    Settings::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("Settings file {:?} not found, using defaults", path);
                Settings::default()
            }
            Err(e) => {
                tracing::warn!("Could not read {:?}, using defaults: {}", path, e);
                Settings::default()
            }
        };

        Self {
            path,
            inner: RwLock::new(settings),
        }
    }

    /// Current settings snapshot.
    pub fn snapshot(&self) -> Settings {
        self.inner.read().map(|s| s.clone()).unwrap_or_default()
    }

    /// Whether loop mode is currently enabled.
    pub fn loop_enabled(&self) -> bool {
        self.inner.read().map(|s| s.loop_tag_song).unwrap_or(false)
    }

    /// Current idle-mode policy.
    pub fn idle_mode(&self) -> IdleMode {
        self.inner
            .read()
            .map(|s| s.idle_mode)
            .unwrap_or(IdleMode::DoNothing)
    }

    /// Replace the stored settings and persist them.
    pub fn update(&self, settings: Settings) -> Result<()> {
        {
            let mut guard = self
                .inner
                .write()
                .map_err(|_| CoreError::Settings("settings lock poisoned".to_string()))?;
            *guard = settings;
        }
        self.save()
    }

    /// Write the current settings to disk.
    pub fn save(&self) -> Result<()> {
        let snapshot = self.snapshot();
        let raw = serde_json::to_string_pretty(&snapshot)?;
        std::fs::write(&self.path, raw)?;
        Ok(())
    }
}
