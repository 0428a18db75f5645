//! Content hashing for image storage keys
//!
//! Provides [`ContentHash`], a strongly-typed Blake3 hash. Image bytes are
//! stored content-addressed: the storage key is derived from the payload
//! hash, so re-uploading identical bytes never duplicates a slot.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// A 32-byte Blake3 content hash
///
/// Immutable and cheap to clone (Copy).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Create from raw bytes
    #[inline]
    #[must_use]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Reference to the underlying bytes
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Compute the Blake3 hash of arbitrary data
    #[inline]
    #[must_use]
    pub fn compute(data: &[u8]) -> Self {
        let hash = blake3::hash(data);
        Self::new(*hash.as_bytes())
    }

    /// Short representation (first 16 hex chars), used in storage keys
    #[inline]
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..8])
    }
}

impl Display for ContentHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for ContentHash {
    type Err = HashParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|_| HashParseError)?;
        if bytes.len() != 32 {
            return Err(HashParseError);
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

/// Error parsing a hex hash string
#[derive(Debug, Clone, Copy, thiserror::Error)]
#[error("invalid content hash")]
pub struct HashParseError;
