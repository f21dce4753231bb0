//! Reader worker thread
//!
//! [`TagWatcher`] owns the poll loop: connect (with cooldown between failed
//! attempts), poll for a tag, classify presence edges, read the hash payload
//! on arrival, and notify the observer. Serial I/O here is blocking, so the
//! watcher runs on a dedicated OS thread rather than an async task.
//!
//! A failed payload read suppresses the arrival but the tag stays
//! remembered: the read is not retried while the tag sits in the field,
//! only when it leaves and is presented again.

use crate::link::TagLink;
use crate::presence::{Presence, PresenceTracker};
use crate::{HASH_BLOCK_COUNT, HASH_START_BLOCK};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tagbox_core::{SongHash, TagUid, HASH_BYTES};

/// Receives presence callbacks from the watcher thread.
///
/// Callbacks run on the watcher thread; implementations hand work off to
/// the async runtime rather than blocking here.
pub trait TagObserver: Send + Sync {
    /// A new tag arrived and its full hash payload was read.
    fn tag_arrived(&self, uid: &TagUid, hash: &SongHash);

    /// A tag is in the field. Fires once per poll cycle that observes a
    /// UID, including the arrival poll itself.
    fn tag_present(&self, uid: &TagUid);

    /// The field became empty.
    fn tag_removed(&self);
}

/// Timing knobs for the poll loop.
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Pause between poll cycles.
    pub poll_interval: Duration,
    /// How long a single poll waits for a tag to enter the field.
    pub poll_timeout: Duration,
    /// Wait between failed connection attempts.
    pub reconnect_cooldown: Duration,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            poll_timeout: Duration::from_millis(500),
            reconnect_cooldown: Duration::from_secs(5),
        }
    }
}

/// Granularity at which long sleeps check the shutdown flag.
const SLEEP_SLICE: Duration = Duration::from_millis(50);

/// Handle to a running watcher thread.
pub struct WatcherHandle {
    shutdown: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl WatcherHandle {
    /// Signal the watcher to stop and wait for the thread to exit.
    pub fn stop(mut self) {
        self.shutdown.store(true, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::error!("Reader worker thread panicked");
            }
        }
    }
}

impl Drop for WatcherHandle {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// The reader poll loop. Construct with a link and an observer, then
/// [`spawn`](TagWatcher::spawn).
pub struct TagWatcher {
    link: Arc<dyn TagLink>,
    observer: Arc<dyn TagObserver>,
    config: WatcherConfig,
}

impl TagWatcher {
    /// Bind a watcher to a hardware link and an observer. The observer is
    /// fixed for the watcher's lifetime.
    pub fn new(link: Arc<dyn TagLink>, observer: Arc<dyn TagObserver>) -> Self {
        Self::with_config(link, observer, WatcherConfig::default())
    }

    /// Same as [`new`](TagWatcher::new) with explicit timing.
    pub fn with_config(
        link: Arc<dyn TagLink>,
        observer: Arc<dyn TagObserver>,
        config: WatcherConfig,
    ) -> Self {
        Self {
            link,
            observer,
            config,
        }
    }

    /// Start the worker thread.
    pub fn spawn(self) -> WatcherHandle {
        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&shutdown);
        let thread = std::thread::Builder::new()
            .name("tag-watcher".to_string())
            .spawn(move || self.run(&flag))
            // Thread spawn fails only under resource exhaustion at startup.
            .unwrap_or_else(|e| panic!("failed to spawn reader worker: {e}"));
        WatcherHandle {
            shutdown,
            thread: Some(thread),
        }
    }

    fn run(self, shutdown: &AtomicBool) {
        tracing::info!("Reader worker started");
        let mut tracker = PresenceTracker::new();

        while !shutdown.load(Ordering::Acquire) {
            if !self.link.is_connected() {
                if let Err(e) = self.link.connect() {
                    tracing::warn!(
                        "Reader connection failed, retrying in {:?}: {}",
                        self.config.reconnect_cooldown,
                        e
                    );
                    pause(shutdown, self.config.reconnect_cooldown);
                    continue;
                }
            }

            match self.link.poll_uid(self.config.poll_timeout) {
                Ok(uid) => self.handle_poll(&mut tracker, uid),
                Err(e) => {
                    // Link already marked itself disconnected; reconnect
                    // next iteration. Presence state is kept so a tag that
                    // stayed put does not re-arrive after recovery.
                    tracing::warn!("Tag poll failed: {}", e);
                }
            }

            pause(shutdown, self.config.poll_interval);
        }

        self.link.disconnect();
        tracing::info!("Reader worker stopped");
    }

    fn handle_poll(&self, tracker: &mut PresenceTracker, uid: Option<TagUid>) {
        match tracker.observe(uid) {
            Presence::Arrived(uid) => {
                self.observer.tag_present(&uid);
                match self.read_hash() {
                    Ok(hash) => {
                        tracing::info!("Tag {} arrived with hash {}", uid, hash);
                        self.observer.tag_arrived(&uid, &hash);
                    }
                    Err(e) => {
                        // The UID stays remembered: the payload is not
                        // re-read while the tag sits in the field, only on
                        // a fresh presentation.
                        tracing::warn!("Discarding arrival of tag {}: {}", uid, e);
                    }
                }
            }
            Presence::StillPresent(uid) => self.observer.tag_present(&uid),
            Presence::Departed => {
                tracing::info!("Tag removed");
                self.observer.tag_removed();
            }
            Presence::Absent => {}
        }
    }

    fn read_hash(&self) -> Result<SongHash, crate::error::ReadError> {
        let data = self.link.read_blocks(HASH_START_BLOCK, HASH_BLOCK_COUNT)?;
        let bytes: [u8; HASH_BYTES] = data.try_into().map_err(|_| {
            crate::error::ReadError::Block {
                block: HASH_START_BLOCK,
            }
        })?;
        Ok(SongHash::from_bytes(&bytes))
    }
}

/// Sleep in short slices so shutdown stays responsive.
fn pause(shutdown: &AtomicBool, total: Duration) {
    let mut remaining = total;
    while !remaining.is_zero() && !shutdown.load(Ordering::Acquire) {
        let slice = remaining.min(SLEEP_SLICE);
        std::thread::sleep(slice);
        remaining = remaining.saturating_sub(slice);
    }
}
