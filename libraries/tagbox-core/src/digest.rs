/// Streaming file digest
use crate::error::Result;
use crate::types::SongHash;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Compute the SHA-256 content hash of a file.
///
/// Reads in 8 KiB chunks so arbitrarily large files never load into memory
/// at once. This is the hash written to tags and used as the library index
/// key.
pub fn file_sha256(path: &Path) -> Result<SongHash> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];

    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(SongHash::from_bytes(&hasher.finalize().into()))
}
