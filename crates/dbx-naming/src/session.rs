use std::fs;
use std::path::Path;

use dbx_crypto::SigningKey;
use dbx_types::AccountId;

use crate::error::{NamingError, NamingResult};

/// The signing identity used for anchoring.
///
/// Created once per process and handed to the name service that needs it.
pub struct Session {
    key: SigningKey,
    account: AccountId,
}

impl Session {
    pub fn new(key: SigningKey) -> Self {
        let account = key.account_id();
        Self { key, account }
    }

    /// A session with a fresh random key.
    pub fn generate() -> Self {
        Self::new(SigningKey::generate())
    }

    /// Load the hex key stored at `path`, creating one if the file is absent.
    pub fn load_or_create(path: impl AsRef<Path>) -> NamingResult<Self> {
        let path = path.as_ref();
        if path.exists() {
            let text = fs::read_to_string(path)?;
            let key = SigningKey::from_hex(&text).map_err(|_| NamingError::InvalidKey {
                path: path.to_path_buf(),
            })?;
            let session = Self::new(key);
            tracing::debug!(account = %session.account, path = %path.display(), "session key loaded");
            return Ok(session);
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let session = Self::generate();
        fs::write(path, format!("{}\n", session.key.to_hex()))?;
        tracing::info!(account = %session.account, path = %path.display(), "session key created");
        Ok(session)
    }

    pub fn account(&self) -> &AccountId {
        &self.account
    }

    pub fn signing_key(&self) -> &SigningKey {
        &self.key
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("account", &self.account)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_file_is_created_then_reused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys/session.key");

        let first = Session::load_or_create(&path).unwrap();
        assert!(path.exists());
        let second = Session::load_or_create(&path).unwrap();
        assert_eq!(first.account(), second.account());
    }

    #[test]
    fn corrupt_key_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.key");
        fs::write(&path, "not a key").unwrap();
        assert!(matches!(
            Session::load_or_create(&path),
            Err(NamingError::InvalidKey { .. })
        ));
    }

    #[test]
    fn account_matches_key() {
        let session = Session::generate();
        assert_eq!(session.account(), &session.signing_key().account_id());
        assert!(!format!("{session:?}").contains(&session.signing_key().to_hex()));
    }
}
