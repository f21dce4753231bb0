/// Server configuration
use crate::error::{Result, ServerError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_server")]
    pub server: ServerSettings,

    #[serde(default = "default_library")]
    pub library: LibrarySettings,

    #[serde(default = "default_nfc")]
    pub nfc: NfcSettings,

    #[serde(default = "default_playback")]
    pub playback: PlaybackSettings,

    #[serde(default = "default_bluetooth")]
    pub bluetooth: BluetoothSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LibrarySettings {
    /// Directory holding the playable audio files
    #[serde(default = "default_music_dir")]
    pub music_dir: PathBuf,

    /// Directory for persisted JSON state (hash index, tag registry,
    /// settings, Bluetooth state)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NfcSettings {
    /// Whether to run the reader worker at all
    #[serde(default = "default_nfc_enabled")]
    pub enabled: bool,

    #[serde(default = "default_serial_port")]
    pub serial_port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlaybackSettings {
    /// Player binary
    #[serde(default = "default_player_program")]
    pub player_program: String,

    /// Fixed arguments placed before the file path
    #[serde(default = "default_player_args")]
    pub player_args: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BluetoothSettings {
    #[serde(default = "default_bluetooth_enabled")]
    pub enabled: bool,

    #[serde(default = "default_bluetoothctl_path")]
    pub bluetoothctl_path: PathBuf,
}

impl ServerConfig {
    /// Load configuration from file and environment
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        let config_path = config_path.unwrap_or_else(|| Path::new("config.toml"));
        if config_path.exists() {
            settings = settings.add_source(config::File::from(config_path));
        }

        // Override with environment variables (prefixed with TAGBOX_)
        settings = settings.add_source(
            config::Environment::with_prefix("TAGBOX")
                .separator("_")
                .try_parsing(true),
        );

        let config = settings
            .build()
            .map_err(|e| ServerError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| ServerError::Config(e.to_string()))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.library.music_dir.as_os_str().is_empty() {
            return Err(ServerError::Config(
                "Music directory is required (set TAGBOX_LIBRARY_MUSIC_DIR)".to_string(),
            ));
        }

        if self.nfc.enabled && self.nfc.serial_port.is_empty() {
            return Err(ServerError::Config(
                "Serial port is required when NFC is enabled".to_string(),
            ));
        }

        if self.playback.player_program.is_empty() {
            return Err(ServerError::Config(
                "Player program must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

// Default values
fn default_server() -> ServerSettings {
    ServerSettings {
        host: default_host(),
        port: default_port(),
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_library() -> LibrarySettings {
    LibrarySettings {
        music_dir: default_music_dir(),
        data_dir: default_data_dir(),
    }
}

fn default_music_dir() -> PathBuf {
    PathBuf::from("./data/music")
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_nfc() -> NfcSettings {
    NfcSettings {
        enabled: default_nfc_enabled(),
        serial_port: default_serial_port(),
        baud_rate: default_baud_rate(),
    }
}

fn default_nfc_enabled() -> bool {
    true
}

fn default_serial_port() -> String {
    "/dev/ttyS0".to_string()
}

fn default_baud_rate() -> u32 {
    115_200
}

fn default_playback() -> PlaybackSettings {
    PlaybackSettings {
        player_program: default_player_program(),
        player_args: default_player_args(),
    }
}

fn default_player_program() -> String {
    "ffplay".to_string()
}

fn default_player_args() -> Vec<String> {
    vec![
        "-nodisp".to_string(),
        "-autoexit".to_string(),
        "-loglevel".to_string(),
        "quiet".to_string(),
    ]
}

fn default_bluetooth() -> BluetoothSettings {
    BluetoothSettings {
        enabled: default_bluetooth_enabled(),
        bluetoothctl_path: default_bluetoothctl_path(),
    }
}

fn default_bluetooth_enabled() -> bool {
    true
}

fn default_bluetoothctl_path() -> PathBuf {
    PathBuf::from("/usr/bin/bluetoothctl")
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server: default_server(),
            library: default_library(),
            nfc: default_nfc(),
            playback: default_playback(),
            bluetooth: default_bluetooth(),
        }
    }
}
