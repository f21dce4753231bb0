/// Domain types shared across the workspace
use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Width of the content digest stored in a tag's user memory.
///
/// SHA-256 produces 32 bytes; the tag payload layout and the hash index are
/// both sized from this constant.
pub const HASH_BYTES: usize = 32;

/// A song's content hash: exactly 64 lowercase hex characters (SHA-256).
///
/// This is the value written to a tag's user memory and the key of the
/// library's hash index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SongHash(String);

impl SongHash {
    /// Build a hash from raw digest bytes.
    pub fn from_bytes(bytes: &[u8; HASH_BYTES]) -> Self {
        SongHash(hex::encode(bytes))
    }

    /// Parse and validate a hex string. Uppercase input is normalized.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        if s.len() != HASH_BYTES * 2 || !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(CoreError::InvalidHash(format!(
                "expected {} hex characters, got {:?}",
                HASH_BYTES * 2,
                s
            )));
        }
        Ok(SongHash(s.to_ascii_lowercase()))
    }

    /// The hash as a lowercase hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decode back to raw digest bytes.
    pub fn to_bytes(&self) -> [u8; HASH_BYTES] {
        let mut out = [0u8; HASH_BYTES];
        // Infallible: the constructor validated length and hex digits.
        if let Ok(decoded) = hex::decode(&self.0) {
            out.copy_from_slice(&decoded);
        }
        out
    }
}

impl FromStr for SongHash {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SongHash::parse(s)
    }
}

impl TryFrom<String> for SongHash {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        SongHash::parse(&s)
    }
}

impl From<SongHash> for String {
    fn from(h: SongHash) -> String {
        h.0
    }
}

impl fmt::Display for SongHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hardware-level unique identifier of a tag, read on every detection.
///
/// Displayed and serialized as uppercase hex (NTAG UIDs are 4, 7, or 10
/// bytes; no length is enforced here).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TagUid(Vec<u8>);

impl TagUid {
    /// Build a UID from the raw bytes returned by the reader.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        TagUid(bytes.to_vec())
    }

    /// Parse an uppercase/lowercase hex UID string.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        hex::decode(s)
            .map(TagUid)
            .map_err(|_| CoreError::InvalidUid(s.to_string()))
    }

    /// Raw UID bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl TryFrom<String> for TagUid {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        TagUid::parse(&s)
    }
}

impl From<TagUid> for String {
    fn from(uid: TagUid) -> String {
        uid.to_string()
    }
}

impl fmt::Display for TagUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode_upper(&self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "a1b2c3d4e5f6a1b2c3d4e5f6a1b2c3d4e5f6a1b2c3d4e5f6a1b2c3d4e5f6a1b2";

    #[test]
    fn song_hash_roundtrips_through_bytes() {
        let hash = SongHash::parse(SAMPLE).unwrap();
        let bytes = hash.to_bytes();
        assert_eq!(SongHash::from_bytes(&bytes), hash);
    }

    #[test]
    fn song_hash_normalizes_uppercase() {
        let hash = SongHash::parse(&SAMPLE.to_ascii_uppercase()).unwrap();
        assert_eq!(hash.as_str(), SAMPLE);
    }

    #[test]
    fn song_hash_rejects_wrong_length_and_non_hex() {
        assert!(SongHash::parse("abcd").is_err());
        assert!(SongHash::parse(&"g".repeat(64)).is_err());
    }

    #[test]
    fn tag_uid_displays_uppercase_hex() {
        let uid = TagUid::from_bytes(&[0x04, 0xa2, 0x2b, 0x6a, 0x11, 0x22, 0x80]);
        assert_eq!(uid.to_string(), "04A22B6A112280");
        assert_eq!(TagUid::parse("04A22B6A112280").unwrap(), uid);
    }

    #[test]
    fn song_hash_serde_uses_plain_string() {
        let hash = SongHash::parse(SAMPLE).unwrap();
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, format!("\"{SAMPLE}\""));
        let back: SongHash = serde_json::from_str(&json).unwrap();
        assert_eq!(back, hash);
    }
}
