/// Tag event dispatch - from the reader thread into playback
///
/// The watcher thread calls in on every presence edge; work is handed to
/// the tokio runtime immediately so the poll loop is never blocked on
/// process control or Bluetooth. The dispatcher performs the claiming
/// `play` itself and only then hands the ticket to a loop session, so the
/// session's "am I still the active song" check is correct from its very
/// first cycle.
use crate::services::{BluetoothService, MusicLibrary};
use std::sync::Arc;
use tagbox_core::{SettingsStore, SongHash, TagUid};
use tagbox_nfc::TagObserver;
use tagbox_playback::{LoopGate, LoopSession, Player};
use tokio::runtime::Handle;

pub struct Dispatcher {
    runtime: Handle,
    player: Arc<Player>,
    library: Arc<MusicLibrary>,
    settings: Arc<SettingsStore>,
    bluetooth: Arc<BluetoothService>,
}

impl Dispatcher {
    pub fn new(
        runtime: Handle,
        player: Arc<Player>,
        library: Arc<MusicLibrary>,
        settings: Arc<SettingsStore>,
        bluetooth: Arc<BluetoothService>,
    ) -> Self {
        Self {
            runtime,
            player,
            library,
            settings,
            bluetooth,
        }
    }

    async fn handle_arrival(
        player: Arc<Player>,
        library: Arc<MusicLibrary>,
        settings: Arc<SettingsStore>,
        bluetooth: Arc<BluetoothService>,
        uid: TagUid,
        hash: SongHash,
    ) {
        let Some((filename, path)) = library.resolve(&hash).await else {
            tracing::warn!("Tag {} carries unknown hash {}", uid, hash);
            return;
        };

        bluetooth.ensure_connected().await;

        // Loop mode is sampled at arrival time; a session started now keeps
        // consulting the live settings on every cycle.
        let loop_requested = settings.loop_enabled();

        let ticket = match player.play(&path, &filename).await {
            Ok(ticket) => ticket,
            Err(e) => {
                tracing::error!("Could not play {}: {}", filename, e);
                return;
            }
        };

        if loop_requested {
            let session = LoopSession::new(
                Arc::clone(&player),
                Arc::clone(&settings) as Arc<dyn LoopGate>,
                path,
                filename.clone(),
            );
            tokio::spawn(async move {
                if let Err(e) = session.run(ticket).await {
                    tracing::error!("Loop session for {} failed: {}", filename, e);
                }
            });
        }
    }
}

impl TagObserver for Dispatcher {
    fn tag_arrived(&self, uid: &TagUid, hash: &SongHash) {
        let player = Arc::clone(&self.player);
        let library = Arc::clone(&self.library);
        let settings = Arc::clone(&self.settings);
        let bluetooth = Arc::clone(&self.bluetooth);
        let uid = uid.clone();
        let hash = hash.clone();
        self.runtime.spawn(async move {
            Self::handle_arrival(player, library, settings, bluetooth, uid, hash).await;
        });
    }

    fn tag_present(&self, _uid: &TagUid) {
        // Presence heartbeat: playback continuation needs no action, the
        // slot keeps running until removal or completion.
    }

    fn tag_removed(&self) {
        let player = Arc::clone(&self.player);
        self.runtime.spawn(async move {
            player.stop().await;
        });
    }
}
