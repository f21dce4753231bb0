/// Music library service - file storage plus the hash index
///
/// The index maps a file's SHA-256 content hash to its filename and is
/// persisted as JSON so restarts do not re-hash an unchanged library.
/// Rebuilding reconciles it with the directory: entries for deleted files
/// are dropped, new files are hashed (on the blocking pool, hashing is
/// CPU- and IO-bound).
use crate::error::{Result, ServerError};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tagbox_core::{file_sha256, SongHash};
use tokio::sync::RwLock;

const INDEX_FILE: &str = "hash_map.json";

pub struct MusicLibrary {
    music_dir: PathBuf,
    index_path: PathBuf,
    index: RwLock<HashMap<SongHash, String>>,
}

impl MusicLibrary {
    /// Open the library rooted at `music_dir`, loading any persisted index
    /// from `data_dir`. A missing or corrupt index file starts empty and is
    /// repopulated by [`rebuild`](Self::rebuild).
    pub fn open(music_dir: PathBuf, data_dir: &Path) -> Self {
        let index_path = data_dir.join(INDEX_FILE);
        let index = match std::fs::read_to_string(&index_path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(map) => map,
                Err(e) => {
                    tracing::warn!("Could not parse {:?}, starting empty: {}", index_path, e);
                    HashMap::new()
                }
            },
            Err(_) => HashMap::new(),
        };

        Self {
            music_dir,
            index_path,
            index: RwLock::new(index),
        }
    }

    /// Reconcile the index with the music directory. Returns the number of
    /// indexed songs.
    pub async fn rebuild(self: &Arc<Self>) -> Result<usize> {
        let files = self.scan_files()?;

        let mut index = self.index.write().await;
        index.retain(|_, filename| files.contains(filename));

        let known: Vec<String> = index.values().cloned().collect();
        for filename in &files {
            if known.contains(filename) {
                continue;
            }
            let path = self.music_dir.join(filename);
            let hash = tokio::task::spawn_blocking(move || file_sha256(&path))
                .await
                .map_err(|e| ServerError::Internal(format!("hashing task failed: {e}")))??;
            tracing::debug!("Indexed {} as {}", filename, hash);
            index.insert(hash, filename.clone());
        }

        let count = index.len();
        self.persist(&index)?;
        tracing::info!("Library index rebuilt: {} songs", count);
        Ok(count)
    }

    /// Filename and full path for the song with this content hash, if the
    /// file still exists.
    pub async fn resolve(&self, hash: &SongHash) -> Option<(String, PathBuf)> {
        let index = self.index.read().await;
        let filename = index.get(hash)?;
        let path = self.music_dir.join(filename);
        if path.is_file() {
            Some((filename.clone(), path))
        } else {
            tracing::warn!("Indexed file {} no longer exists", filename);
            None
        }
    }

    /// Content hash of a library file, from the index or freshly computed.
    pub async fn hash_of(&self, filename: &str) -> Result<SongHash> {
        {
            let index = self.index.read().await;
            if let Some((hash, _)) = index.iter().find(|(_, f)| f.as_str() == filename) {
                return Ok(hash.clone());
            }
        }

        let path = self.path_of(filename)?;
        let hash = tokio::task::spawn_blocking(move || file_sha256(&path))
            .await
            .map_err(|e| ServerError::Internal(format!("hashing task failed: {e}")))??;

        let mut index = self.index.write().await;
        index.insert(hash.clone(), filename.to_string());
        self.persist(&index)?;
        Ok(hash)
    }

    /// Sorted list of library filenames.
    pub async fn list(&self) -> Vec<String> {
        self.scan_files().unwrap_or_default()
    }

    /// Validated full path of a library file. Rejects names that escape the
    /// music directory and names for files that do not exist.
    pub fn path_of(&self, filename: &str) -> Result<PathBuf> {
        let name = sanitize_filename(filename)?;
        let path = self.music_dir.join(name);
        if path.is_file() {
            Ok(path)
        } else {
            Err(ServerError::NotFound(format!("No such song: {filename}")))
        }
    }

    /// Add an uploaded file to the library and index it.
    pub async fn store(&self, filename: &str, data: &[u8]) -> Result<()> {
        let name = sanitize_filename(filename)?;
        if !name.to_ascii_lowercase().ends_with(".mp3") {
            return Err(ServerError::BadRequest(
                "Only .mp3 files are accepted".to_string(),
            ));
        }

        let path = self.music_dir.join(name);
        tokio::fs::write(&path, data).await?;

        let hash_path = path.clone();
        let hash = tokio::task::spawn_blocking(move || file_sha256(&hash_path))
            .await
            .map_err(|e| ServerError::Internal(format!("hashing task failed: {e}")))??;

        let mut index = self.index.write().await;
        index.insert(hash, name.to_string());
        self.persist(&index)?;
        tracing::info!("Stored {}", name);
        Ok(())
    }

    /// Delete a library file and drop it from the index.
    pub async fn remove(&self, filename: &str) -> Result<()> {
        let path = self.path_of(filename)?;
        tokio::fs::remove_file(&path).await?;

        let mut index = self.index.write().await;
        index.retain(|_, f| f != filename);
        self.persist(&index)?;
        tracing::info!("Deleted {}", filename);
        Ok(())
    }

    fn scan_files(&self) -> Result<Vec<String>> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(&self.music_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if name.to_ascii_lowercase().ends_with(".mp3") {
                files.push(name.to_string());
            }
        }
        files.sort();
        Ok(files)
    }

    fn persist(&self, index: &HashMap<SongHash, String>) -> Result<()> {
        let raw = serde_json::to_string_pretty(index)
            .map_err(|e| ServerError::Internal(e.to_string()))?;
        std::fs::write(&self.index_path, raw)?;
        Ok(())
    }
}

/// Reject path traversal in user-supplied filenames.
fn sanitize_filename(filename: &str) -> Result<&str> {
    if filename.is_empty()
        || filename.contains('/')
        || filename.contains('\\')
        || filename.contains("..")
    {
        return Err(ServerError::BadRequest(format!(
            "Invalid filename: {filename}"
        )));
    }
    Ok(filename)
}
