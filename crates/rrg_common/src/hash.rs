//! Content hashing for graph fingerprints and artifact checksums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A 128-bit content hash computed using XXH3.
///
/// Two byte streams with the same `ContentHash` are assumed identical. Graph
/// passes use it to prove that a no-op pass really left every structure
/// untouched, and the artifact cache uses it to detect corrupted payloads.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash([u8; 16]);

impl ContentHash {
    /// Computes a content hash from a byte slice using XXH3-128.
    pub fn from_bytes(data: &[u8]) -> Self {
        let hash = xxhash_rust::xxh3::xxh3_128(data);
        Self(hash.to_le_bytes())
    }

    /// Computes a single hash over several byte slices, in order.
    ///
    /// Chunk boundaries are not significant: `["ab", "c"]` and `["a", "bc"]`
    /// hash identically.
    pub fn from_chunks<'a>(chunks: impl IntoIterator<Item = &'a [u8]>) -> Self {
        let mut hasher = xxhash_rust::xxh3::Xxh3::new();
        for chunk in chunks {
            hasher.update(chunk);
        }
        Self(hasher.digest128().to_le_bytes())
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({:02x}{:02x}..)", self.0[0], self.0[1])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic() {
        let a = ContentHash::from_bytes(b"rr graph");
        let b = ContentHash::from_bytes(b"rr graph");
        assert_eq!(a, b);
    }

    #[test]
    fn different_inputs_differ() {
        let a = ContentHash::from_bytes(b"chanx");
        let b = ContentHash::from_bytes(b"chany");
        assert_ne!(a, b);
    }

    #[test]
    fn chunked_matches_contiguous() {
        let whole = ContentHash::from_bytes(b"storage+lookup");
        let parts = ContentHash::from_chunks([b"storage".as_slice(), b"+lookup".as_slice()]);
        assert_eq!(whole, parts);
    }

    #[test]
    fn display_is_hex() {
        let h = ContentHash::from_bytes(b"test");
        let s = format!("{h}");
        assert_eq!(s.len(), 32);
        assert!(s.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn debug_abbreviated() {
        let s = format!("{:?}", ContentHash::from_bytes(b"test"));
        assert!(s.starts_with("ContentHash("));
    }

    #[test]
    fn serde_roundtrip() {
        let h = ContentHash::from_bytes(b"serde");
        let json = serde_json::to_string(&h).unwrap();
        let back: ContentHash = serde_json::from_str(&json).unwrap();
        assert_eq!(h, back);
    }
}
