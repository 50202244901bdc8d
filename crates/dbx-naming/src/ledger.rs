use std::sync::Arc;

use async_trait::async_trait;
use dbx_crypto::ContentHasher;
use dbx_ledger::{AnchorLedger, AnchorRecord, LedgerError};
use dbx_types::Address;

use crate::error::{NamingError, NamingResult};
use crate::names::validate_name;
use crate::session::Session;
use crate::traits::NameService;

/// Hasher for the per-account published names.
const PUBLISHED: ContentHasher = ContentHasher::new("dbx-publish-v1");

/// [`NameService`] backed by an [`AnchorLedger`].
///
/// Anchored names are keyed by [`ContentHasher::NAME`]; published account
/// names live in a separate key domain so the two namespaces never collide.
/// Every record is signed with the injected [`Session`].
#[derive(Clone)]
pub struct LedgerNameService {
    ledger: Arc<dyn AnchorLedger>,
    session: Arc<Session>,
}

impl LedgerNameService {
    pub fn new(ledger: Arc<dyn AnchorLedger>, session: Session) -> Self {
        Self {
            ledger,
            session: Arc::new(session),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn ledger(&self) -> &Arc<dyn AnchorLedger> {
        &self.ledger
    }

    /// Ledger key for an anchored name.
    pub fn name_key(name: &str) -> Address {
        ContentHasher::NAME.hash(name.as_bytes())
    }

    /// Every binding `name` has had, oldest first.
    pub fn history(&self, name: &str) -> NamingResult<Vec<AnchorRecord>> {
        validate_name(name)?;
        Ok(self.ledger.history(&Self::name_key(name))?)
    }

    async fn append(&self, key: Address, address: Address) -> NamingResult<AnchorRecord> {
        let ledger = Arc::clone(&self.ledger);
        let session = Arc::clone(&self.session);
        tokio::task::spawn_blocking(move || ledger.append(key, address, session.signing_key()))
            .await
            .map_err(|e| NamingError::Task(e.to_string()))?
            .map_err(NamingError::from)
    }

    fn current(&self, key: &Address, name: &str) -> NamingResult<Address> {
        self.ledger
            .latest(key)?
            .map(|record| record.address)
            .ok_or_else(|| NamingError::NotFound {
                name: name.to_string(),
            })
    }
}

#[async_trait]
impl NameService for LedgerNameService {
    async fn publish(&self, address: &Address) -> NamingResult<String> {
        let name = self.session.account().to_hex();
        let record = self.append(PUBLISHED.hash(name.as_bytes()), *address).await?;
        tracing::info!(account = %self.session.account(), %address, seq = record.seq, "published");
        Ok(name)
    }

    async fn resolve(&self, name: &str) -> NamingResult<Address> {
        validate_name(name)?;
        let name = name.strip_prefix("acct:").unwrap_or(name);
        self.current(&PUBLISHED.hash(name.as_bytes()), name)
    }

    async fn anchor(&self, name: &str, address: &Address) -> NamingResult<bool> {
        validate_name(name)?;
        match self.append(Self::name_key(name), *address).await {
            Ok(record) => {
                tracing::info!(name, %address, seq = record.seq, "anchored");
                Ok(true)
            }
            Err(NamingError::Ledger(LedgerError::NameOwned { owner, .. })) => {
                tracing::warn!(name, %owner, "anchor refused: name owned by another account");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    async fn lookup_binding(&self, name: &str) -> NamingResult<Address> {
        validate_name(name)?;
        self.current(&Self::name_key(name), name)
    }
}
