use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;

use dbx_naming::NameService;
use dbx_store::ContentStore;
use dbx_types::{Address, ModifiedTime};

use crate::error::{SyncError, SyncResult};
use crate::types::ConcurrencyMode;

/// The reconciliation engine.
///
/// Holds no per-batch state: every call owns its own result map and
/// worklist, so one engine may be shared freely. Batches touching the same
/// paths must not run concurrently.
#[derive(Clone)]
pub struct SyncEngine {
    pub(crate) store: Arc<dyn ContentStore>,
    pub(crate) names: Arc<dyn NameService>,
    pub(crate) mode: ConcurrencyMode,
}

impl SyncEngine {
    pub fn new(store: Arc<dyn ContentStore>, names: Arc<dyn NameService>) -> Self {
        Self {
            store,
            names,
            mode: ConcurrencyMode::default(),
        }
    }

    pub fn with_mode(mut self, mode: ConcurrencyMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn store(&self) -> &Arc<dyn ContentStore> {
        &self.store
    }

    pub fn names(&self) -> &Arc<dyn NameService> {
        &self.names
    }

    pub fn mode(&self) -> ConcurrencyMode {
        self.mode
    }

    pub(crate) async fn is_directory(&self, address: &Address) -> SyncResult<bool> {
        self.store
            .is_directory(address)
            .await
            .map_err(SyncError::store("is_directory", address))
    }
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

/// What the local filesystem holds at a path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum LocalState {
    Missing,
    File { modified: ModifiedTime },
    Directory { modified: ModifiedTime },
}

pub(crate) async fn local_state(path: &Path) -> SyncResult<LocalState> {
    match tokio::fs::metadata(path).await {
        Ok(metadata) => {
            let modified =
                ModifiedTime::from_system_time(metadata.modified().map_err(SyncError::io(path))?);
            if metadata.is_dir() {
                Ok(LocalState::Directory { modified })
            } else {
                Ok(LocalState::File { modified })
            }
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(LocalState::Missing),
        Err(e) => Err(SyncError::io(path)(e)),
    }
}
