use std::sync::Arc;

use dbx_ledger::JournalLedger;
use dbx_naming::{LedgerNameService, Session};
use dbx_store::LocalContentStore;
use dbx_sync::SyncEngine;

use crate::config::AgentConfig;
use crate::error::AgentResult;

/// The collaborators and engine built from an [`AgentConfig`].
#[derive(Clone)]
pub struct Runtime {
    pub store: LocalContentStore,
    pub names: LedgerNameService,
    pub engine: SyncEngine,
}

impl Runtime {
    /// Open the persistent store, the anchor journal, and the session key.
    pub fn open(config: &AgentConfig) -> AgentResult<Self> {
        let store = LocalContentStore::open(&config.store_root)?;
        let ledger = Arc::new(JournalLedger::open(&config.ledger_journal)?);
        let session = Session::load_or_create(&config.key_file)?;
        tracing::info!(
            store = %config.store_root.display(),
            journal = %config.ledger_journal.display(),
            account = %session.account(),
            mode = ?config.sync,
            "runtime ready"
        );
        let names = LedgerNameService::new(ledger, session);
        let engine = SyncEngine::new(Arc::new(store.clone()), Arc::new(names.clone()))
            .with_mode(config.sync);
        Ok(Self {
            store,
            names,
            engine,
        })
    }
}
