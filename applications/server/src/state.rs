/// Shared application state
use crate::services::{BluetoothService, MusicLibrary, TagRegistry};
use std::sync::Arc;
use tagbox_core::SettingsStore;
use tagbox_nfc::TagLink;
use tagbox_playback::Player;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub player: Arc<Player>,
    pub settings: Arc<SettingsStore>,
    pub library: Arc<MusicLibrary>,
    pub registry: Arc<TagRegistry>,
    pub bluetooth: Arc<BluetoothService>,
    pub link: Arc<dyn TagLink>,
}

impl AppState {
    pub fn new(
        player: Arc<Player>,
        settings: Arc<SettingsStore>,
        library: Arc<MusicLibrary>,
        registry: Arc<TagRegistry>,
        bluetooth: Arc<BluetoothService>,
        link: Arc<dyn TagLink>,
    ) -> Self {
        Self {
            player,
            settings,
            library,
            registry,
            bluetooth,
            link,
        }
    }
}
