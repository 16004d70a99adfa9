//! SHA-256 digests and the tagged hashing used for every commitment in the pipeline

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};

/// 32-byte SHA-256 output
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Digest([u8; 32]);

impl Digest {
    pub const ZERO: Digest = Digest([0u8; 32]);

    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Plain SHA-256 of `data`
    pub fn hash(data: &[u8]) -> Self {
        Self(Sha256::digest(data).into())
    }

    /// SHA-256 of the concatenation `left || right`, used for Merkle nodes
    pub fn hash_pair(left: &Digest, right: &Digest) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(left.0);
        hasher.update(right.0);
        Self(hasher.finalize().into())
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self(bytes))
    }
}

impl From<[u8; 32]> for Digest {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Digest {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.to_hex())
    }
}

/// Incremental SHA-256 over a domain tag followed by fixed-width little-endian fields.
///
/// Every commitment in the system is built with one of these so that the byte layout of a
/// hashed structure is written out in one place next to the structure itself.
pub struct TaggedHasher(Sha256);

impl TaggedHasher {
    pub fn new(tag: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(tag.as_bytes());
        Self(hasher)
    }

    pub fn u32(mut self, v: u32) -> Self {
        self.0.update(v.to_le_bytes());
        self
    }

    pub fn u64(mut self, v: u64) -> Self {
        self.0.update(v.to_le_bytes());
        self
    }

    pub fn digest(mut self, d: &Digest) -> Self {
        self.0.update(d.0);
        self
    }

    pub fn bytes(mut self, b: &[u8]) -> Self {
        self.0.update(b);
        self
    }

    pub fn finalize(self) -> Digest {
        Digest(self.0.finalize().into())
    }
}
