/// Tag registry - which physical tag was linked to which song
///
/// Purely informational: playback resolution goes through the content hash
/// on the tag, not this map. The registry exists so the UI can show and
/// manage what was registered, keyed by the tag's hardware UID.
use crate::error::{Result, ServerError};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

const REGISTRY_FILE: &str = "nfc_map.json";

pub struct TagRegistry {
    path: PathBuf,
    entries: RwLock<HashMap<String, String>>,
}

impl TagRegistry {
    /// Load the registry from `data_dir`, starting empty when the file is
    /// missing or unreadable.
    pub fn open(data_dir: &Path) -> Self {
        let path = data_dir.join(REGISTRY_FILE);
        let entries = match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(map) => map,
                Err(e) => {
                    tracing::warn!("Could not parse {:?}, starting empty: {}", path, e);
                    HashMap::new()
                }
            },
            Err(_) => HashMap::new(),
        };

        Self {
            path,
            entries: RwLock::new(entries),
        }
    }

    /// All uid → filename pairs.
    pub async fn list(&self) -> HashMap<String, String> {
        self.entries.read().await.clone()
    }

    /// Record (or overwrite) the song a tag was registered to.
    pub async fn insert(&self, uid: String, filename: String) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.insert(uid, filename);
        self.persist(&entries)
    }

    /// Remove a tag's registration. Errors if the UID was never registered.
    pub async fn remove(&self, uid: &str) -> Result<()> {
        let mut entries = self.entries.write().await;
        if entries.remove(uid).is_none() {
            return Err(ServerError::NotFound(format!("No registration for {uid}")));
        }
        self.persist(&entries)
    }

    fn persist(&self, entries: &HashMap<String, String>) -> Result<()> {
        let raw = serde_json::to_string_pretty(entries)
            .map_err(|e| ServerError::Internal(e.to_string()))?;
        std::fs::write(&self.path, raw)?;
        Ok(())
    }
}
