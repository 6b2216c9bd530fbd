//! Content hashing for fingerprints and cache validation.

use serde::{Deserialize, Serialize};
use std::fmt;

use xxhash_rust::xxh3::Xxh3;

/// A 128-bit content hash computed using XXH3.
///
/// Two inputs with the same `ContentHash` are assumed to be identical. Used to
/// fingerprint compile requests, to validate cached artifacts, and to detect
/// when an imported stylesheet changed since it was compiled.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash([u8; 16]);

impl ContentHash {
    /// Computes a content hash from a byte slice using XXH3-128.
    pub fn from_bytes(data: &[u8]) -> Self {
        let hash = xxhash_rust::xxh3::xxh3_128(data);
        Self(hash.to_le_bytes())
    }

    /// Returns the raw hash bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
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

/// Incremental XXH3-128 hasher for inputs assembled from several parts.
///
/// Every field is written length-prefixed, so `("ab", "c")` and `("a", "bc")`
/// never collide.
pub struct ContentHasher {
    state: Xxh3,
}

impl ContentHasher {
    /// Creates a hasher with an empty state.
    pub fn new() -> Self {
        Self { state: Xxh3::new() }
    }

    /// Feeds one length-prefixed field into the hasher.
    pub fn field(&mut self, data: &[u8]) -> &mut Self {
        self.state.update(&(data.len() as u64).to_le_bytes());
        self.state.update(data);
        self
    }

    /// Feeds an already computed hash into the hasher.
    pub fn hash(&mut self, hash: &ContentHash) -> &mut Self {
        self.field(hash.as_bytes())
    }

    /// Returns the digest of every field fed so far.
    pub fn finish(&self) -> ContentHash {
        ContentHash(self.state.digest128().to_le_bytes())
    }
}

impl Default for ContentHasher {
    fn default() -> Self {
        Self::new()
    }
}
