use dbx_types::AccountId;
use serde::{Deserialize, Serialize};

/// Ed25519 signing key (private).
pub struct SigningKey(ed25519_dalek::SigningKey);

/// Ed25519 verifying key (public). Serialized as hex.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyingKey(#[serde(with = "verifying_key_serde")] ed25519_dalek::VerifyingKey);

/// Ed25519 signature. Serialized as hex.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature(#[serde(with = "signature_serde")] ed25519_dalek::Signature);

impl SigningKey {
    /// Generate a new random signing key.
    pub fn generate() -> Self {
        let mut csprng = rand::thread_rng();
        Self(ed25519_dalek::SigningKey::generate(&mut csprng))
    }

    /// Create from raw 32-byte secret.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(ed25519_dalek::SigningKey::from_bytes(&bytes))
    }

    /// Parse a hex-encoded 32-byte secret, as written by [`SigningKey::to_hex`].
    pub fn from_hex(s: &str) -> Result<Self, SignatureError> {
        let bytes = hex::decode(s.trim()).map_err(|_| SignatureError::InvalidKey)?;
        let arr: [u8; 32] = bytes.try_into().map_err(|_| SignatureError::InvalidKey)?;
        Ok(Self::from_bytes(arr))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0.as_bytes())
    }

    /// The corresponding public verifying key.
    pub fn verifying_key(&self) -> VerifyingKey {
        VerifyingKey(self.0.verifying_key())
    }

    /// The account this key signs for.
    pub fn account_id(&self) -> AccountId {
        self.verifying_key().to_account_id()
    }

    /// Sign a message.
    pub fn sign(&self, message: &[u8]) -> Signature {
        use ed25519_dalek::Signer;
        Signature(self.0.sign(message))
    }

    /// Raw secret key bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }
}

impl VerifyingKey {
    /// Verify a signature on a message.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> Result<(), SignatureError> {
        use ed25519_dalek::Verifier;
        self.0
            .verify(message, &signature.0)
            .map_err(|_| SignatureError::InvalidSignature)
    }

    /// Derive the [`AccountId`] for this public key.
    pub fn to_account_id(&self) -> AccountId {
        AccountId::from_public_key(&self.0.to_bytes())
    }

    /// Raw public key bytes.
    pub fn as_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }

    /// Create from raw 32-byte public key.
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, SignatureError> {
        let key = ed25519_dalek::VerifyingKey::from_bytes(&bytes)
            .map_err(|_| SignatureError::InvalidKey)?;
        Ok(Self(key))
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SigningKey(<redacted>)")
    }
}

impl std::fmt::Debug for VerifyingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "VerifyingKey({})", hex::encode(self.0.to_bytes()))
    }
}

impl std::fmt::Debug for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Signature({}...)", hex::encode(&self.0.to_bytes()[..8]))
    }
}

/// Errors from signing operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("invalid signature")]
    InvalidSignature,
    #[error("invalid key")]
    InvalidKey,
}

mod signature_serde {
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(sig: &ed25519_dalek::Signature, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(sig.to_bytes()))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<ed25519_dalek::Signature, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
        let arr: [u8; 64] = bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("expected 64-byte signature"))?;
        Ok(ed25519_dalek::Signature::from_bytes(&arr))
    }
}

mod verifying_key_serde {
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(key: &ed25519_dalek::VerifyingKey, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(key.to_bytes()))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<ed25519_dalek::VerifyingKey, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("expected 32-byte public key"))?;
        ed25519_dalek::VerifyingKey::from_bytes(&arr).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify() {
        let sk = SigningKey::generate();
        let sig = sk.sign(b"hello world");
        assert!(sk.verifying_key().verify(b"hello world", &sig).is_ok());
    }

    #[test]
    fn verify_fails_on_wrong_message() {
        let sk = SigningKey::generate();
        let sig = sk.sign(b"correct message");
        assert_eq!(
            sk.verifying_key().verify(b"wrong message", &sig),
            Err(SignatureError::InvalidSignature)
        );
    }

    #[test]
    fn verify_fails_with_wrong_key() {
        let sig = SigningKey::generate().sign(b"message");
        assert!(SigningKey::generate()
            .verifying_key()
            .verify(b"message", &sig)
            .is_err());
    }

    #[test]
    fn account_id_is_stable_per_key() {
        let sk = SigningKey::generate();
        assert_eq!(sk.account_id(), sk.verifying_key().to_account_id());
        assert_ne!(sk.account_id(), SigningKey::generate().account_id());
    }

    #[test]
    fn hex_roundtrip_preserves_identity() {
        let sk = SigningKey::generate();
        let restored = SigningKey::from_hex(&sk.to_hex()).unwrap();
        assert_eq!(sk.verifying_key(), restored.verifying_key());
    }

    #[test]
    fn from_hex_rejects_wrong_length() {
        assert_eq!(
            SigningKey::from_hex("abcd").unwrap_err(),
            SignatureError::InvalidKey
        );
    }

    #[test]
    fn signature_serializes_as_hex() {
        let sig = SigningKey::generate().sign(b"test");
        let json = serde_json::to_string(&sig).unwrap();
        assert_eq!(json.len(), 128 + 2);
        let parsed: Signature = serde_json::from_str(&json).unwrap();
        assert_eq!(sig, parsed);
    }

    #[test]
    fn verifying_key_serde_roundtrip() {
        let vk = SigningKey::generate().verifying_key();
        let json = serde_json::to_string(&vk).unwrap();
        let parsed: VerifyingKey = serde_json::from_str(&json).unwrap();
        assert_eq!(vk, parsed);
    }

    #[test]
    fn debug_redacts_signing_key() {
        assert!(format!("{:?}", SigningKey::generate()).contains("redacted"));
    }
}
