//! Content fingerprints for rendered pages.
//!
//! A fingerprint is the blake3 digest of the raw page payload. It carries no
//! salt, so the same bytes hash the same way across edits and runs.

use std::fmt;

/// A 256-bit content hash (blake3 output).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Hash a payload.
    pub fn of(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    pub fn to_hex(self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // First 16 hex chars are enough to tell pages apart in logs
        write!(f, "{}", &self.to_hex()[..16])
    }
}

/// Render cache key: payload fingerprint plus page slot.
///
/// Two blank pages at different indices get different keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageKey {
    pub hash: ContentHash,
    pub index: usize,
}

impl PageKey {
    pub fn new(data: &[u8], index: usize) -> Self {
        Self {
            hash: ContentHash::of(data),
            index,
        }
    }
}

impl fmt::Display for PageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.hash, self.index)
    }
}
