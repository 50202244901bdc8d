//! The reconciliation planner.
//!
//! A batch runs in two phases separated by a join barrier. The leaf phase
//! resolves every file by upload or download. Anything the store (or, for a
//! new path, the caller's hint or the local filesystem) calls a directory is
//! deferred without being read, and the directory phase re-adds each one
//! once its children are final.

use std::collections::HashSet;
use std::future::Future;
use std::path::Path;

use dbx_types::Address;
use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::Instrument;
use uuid::Uuid;

use crate::engine::{local_state, LocalState, SyncEngine};
use crate::error::{CollaboratorError, SyncError, SyncResult};
use crate::types::{
    ConcurrencyMode, FileDescriptor, ReconciliationResult, SyncEntry, UploadOptions,
};

/// Terminal state of one leaf.
enum LeafStep<'a> {
    Unchanged,
    Recorded(String, SyncEntry),
    Deferred(&'a FileDescriptor),
}

impl SyncEngine {
    /// Reconcile a batch of descriptors against the local filesystem.
    ///
    /// Returns the new state of every path that changed. Any failure aborts
    /// the batch and nothing is returned.
    pub async fn synchronize(
        &self,
        descriptors: &[FileDescriptor],
    ) -> SyncResult<ReconciliationResult> {
        let batch = Uuid::now_v7();
        let span = tracing::info_span!("synchronize", %batch, entries = descriptors.len());
        self.run_batch(descriptors).instrument(span).await
    }

    async fn run_batch(&self, descriptors: &[FileDescriptor]) -> SyncResult<ReconciliationResult> {
        check_unique(descriptors)?;

        // Hinted directories wait for the barrier; the store still decides
        // what they are once it is reached.
        let (mut worklist, leaves): (Vec<_>, Vec<_>) =
            descriptors.iter().partition(|d| d.hinted_directory());

        let steps = self
            .run_all(leaves.into_iter().map(|d| self.resolve_leaf(d)))
            .await?;

        let mut result = ReconciliationResult::new();
        let mut unchanged = 0usize;
        for step in steps {
            match step {
                LeafStep::Unchanged => unchanged += 1,
                LeafStep::Recorded(path, entry) => result.insert(path, entry),
                LeafStep::Deferred(descriptor) => worklist.push(descriptor),
            }
        }
        tracing::debug!(
            recorded = result.len(),
            unchanged,
            directories = worklist.len(),
            "leaf phase complete"
        );

        let directories = self
            .run_all(worklist.into_iter().map(|d| self.resolve_directory(d)))
            .await?;
        for (path, entry) in directories.into_iter().flatten() {
            result.insert(path, entry);
        }

        tracing::info!(recorded = result.len(), "batch reconciled");
        Ok(result)
    }

    /// Run `tasks` under the engine's concurrency mode, failing fast.
    async fn run_all<T, F>(&self, tasks: impl IntoIterator<Item = F>) -> SyncResult<Vec<T>>
    where
        F: Future<Output = SyncResult<T>>,
    {
        match self.mode {
            ConcurrencyMode::Serial => {
                let mut done = Vec::new();
                for task in tasks {
                    done.push(task.await?);
                }
                Ok(done)
            }
            ConcurrencyMode::Concurrent { .. } => {
                stream::iter(tasks)
                    .buffer_unordered(self.mode.limit())
                    .try_collect()
                    .await
            }
        }
    }

    /// Whether `descriptor` names a directory.
    ///
    /// A known address is asked of the store. Only a path the store has never
    /// seen falls back to the hint, then to what is on disk.
    async fn classify(&self, descriptor: &FileDescriptor, local: LocalState) -> SyncResult<bool> {
        match descriptor.known_address {
            Some(known) => self.is_directory(&known).await,
            None => Ok(descriptor
                .is_directory
                .unwrap_or(matches!(local, LocalState::Directory { .. }))),
        }
    }

    async fn resolve_leaf<'a>(&self, descriptor: &'a FileDescriptor) -> SyncResult<LeafStep<'a>> {
        let local = local_state(Path::new(&descriptor.path)).await?;
        if self.classify(descriptor, local).await? {
            tracing::debug!(path = %descriptor.path, "deferred to directory phase");
            return Ok(LeafStep::Deferred(descriptor));
        }
        Ok(match self.reconcile_file(descriptor, local).await? {
            Some(entry) => LeafStep::Recorded(descriptor.path.clone(), entry),
            None => LeafStep::Unchanged,
        })
    }

    /// Re-address a file and settle a conflict by modification time: a local
    /// copy strictly newer than the baseline is uploaded, anything else is
    /// replaced by the known content.
    async fn reconcile_file(
        &self,
        descriptor: &FileDescriptor,
        local: LocalState,
    ) -> SyncResult<Option<SyncEntry>> {
        let path = Path::new(&descriptor.path);
        let current = match local {
            LocalState::Missing => None,
            _ => Some(self.address_of(path).await?),
        };
        if current.is_some() && current == descriptor.known_address {
            tracing::debug!(path = %descriptor.path, "unchanged");
            return Ok(None);
        }

        let baseline = descriptor.baseline();
        let entry = match (descriptor.known_address, local) {
            (None, LocalState::Missing) => {
                return Err(SyncError::NotFound {
                    path: path.to_path_buf(),
                })
            }
            (None, _) => self.push_leaf(descriptor).await?,
            (Some(known), LocalState::Missing) => self.pull_leaf(descriptor, &known).await?,
            (Some(known), LocalState::File { modified } | LocalState::Directory { modified }) => {
                if modified > baseline {
                    self.push_leaf(descriptor).await?
                } else {
                    self.pull_leaf(descriptor, &known).await?
                }
            }
        };
        Ok(Some(entry))
    }

    async fn push_leaf(&self, descriptor: &FileDescriptor) -> SyncResult<SyncEntry> {
        let outcome = self
            .upload(Path::new(&descriptor.path), &UploadOptions::recursive())
            .await?;
        let root = outcome.root().ok_or_else(|| SyncError::DirectoryAddressMismatch {
            path: descriptor.path.clone(),
        })?;
        tracing::debug!(path = %descriptor.path, address = %root.address, "uploaded");
        Ok(SyncEntry {
            address: root.address,
            directory: root.directory,
        })
    }

    async fn pull_leaf(&self, descriptor: &FileDescriptor, known: &Address) -> SyncResult<SyncEntry> {
        let path = Path::new(&descriptor.path);
        self.materialize(known, path).await?;
        let address = self.address_of(path).await?;
        tracing::debug!(path = %descriptor.path, %address, "downloaded");
        Ok(SyncEntry {
            address,
            directory: false,
        })
    }

    async fn resolve_directory(
        &self,
        descriptor: &FileDescriptor,
    ) -> SyncResult<Option<(String, SyncEntry)>> {
        let path = Path::new(&descriptor.path);
        let local = local_state(path).await?;
        if !self.classify(descriptor, local).await? {
            tracing::debug!(path = %descriptor.path, "hinted directory is a file");
            let entry = self.reconcile_file(descriptor, local).await?;
            return Ok(entry.map(|entry| (descriptor.path.clone(), entry)));
        }

        if local == LocalState::Missing {
            let known = descriptor.known_address.ok_or_else(|| SyncError::NotFound {
                path: path.to_path_buf(),
            })?;
            self.materialize(&known, path).await?;
        } else if let Some(known) = descriptor.known_address {
            if self.address_of(path).await? == known {
                tracing::debug!(path = %descriptor.path, "directory unchanged");
                return Ok(None);
            }
        }

        let outcome = self.upload(path, &UploadOptions::recursive()).await?;
        let entry = outcome
            .find(&descriptor.path)
            .ok_or_else(|| SyncError::DirectoryAddressMismatch {
                path: descriptor.path.clone(),
            })?;
        tracing::debug!(path = %descriptor.path, address = %entry.address, "directory re-addressed");
        Ok(Some((
            descriptor.path.clone(),
            SyncEntry {
                address: entry.address,
                directory: entry.directory,
            },
        )))
    }

    /// Current content address of an existing local path.
    async fn address_of(&self, path: &Path) -> SyncResult<Address> {
        let shown = path.display().to_string();
        let added = self
            .store
            .add(path, true)
            .await
            .map_err(SyncError::store("add", &shown))?;
        added.root().ok_or_else(|| SyncError::Collaborator {
            operation: "add",
            subject: shown,
            source: CollaboratorError::Rejected("no address returned".into()),
        })
    }
}

fn check_unique(descriptors: &[FileDescriptor]) -> SyncResult<()> {
    let mut seen = HashSet::with_capacity(descriptors.len());
    for descriptor in descriptors {
        if !seen.insert(descriptor.path.as_str()) {
            return Err(SyncError::InvalidBatch {
                reason: format!("duplicate path {}", descriptor.path),
            });
        }
    }
    Ok(())
}
