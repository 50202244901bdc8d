use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Identity of the account that signs name anchors.
///
/// Derived deterministically from an Ed25519 public key with BLAKE3. The
/// same key always yields the same account, and the full hex form doubles as
/// the account's published name.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountId {
    hash: [u8; 32],
}

impl AccountId {
    /// Derive the account for a 32-byte public key.
    pub fn from_public_key(public_key: &[u8; 32]) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"dbx-account-v1:");
        hasher.update(public_key);
        Self {
            hash: *hasher.finalize().as_bytes(),
        }
    }

    /// A random account, for tests and throwaway sessions.
    pub fn ephemeral() -> Self {
        let mut bytes = [0u8; 32];
        rand::Rng::fill(&mut rand::thread_rng(), &mut bytes);
        Self::from_public_key(&bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.hash
    }

    /// Full hex-encoded string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.hash)
    }

    /// Short identifier (`acct:` + first 8 hex characters).
    pub fn short_id(&self) -> String {
        format!("acct:{}", hex::encode(&self.hash[..4]))
    }

    /// Parse from 64 hex characters, optionally prefixed with `acct:`.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let s = s.strip_prefix("acct:").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        if bytes.len() != 32 {
            return Err(TypeError::InvalidLength {
                expected: 32,
                actual: bytes.len(),
            });
        }
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&bytes);
        Ok(Self { hash })
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({})", self.short_id())
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short_id())
    }
}
