//! The removal pipeline.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use dbx_types::Address;
use futures::future::{BoxFuture, FutureExt};

use crate::engine::SyncEngine;
use crate::error::{SyncError, SyncResult};
use crate::fetch::checked_component;
use crate::types::RemoveOptions;

impl SyncEngine {
    /// Remove `path`, last known at `address`.
    ///
    /// A file address is unpinned and, with `local`, deleted from disk. A
    /// directory address is only supported with `local`: its tracked files
    /// are deleted and directories left empty are removed. Nothing is rolled
    /// back when a step fails.
    pub async fn remove(
        &self,
        path: &Path,
        address: &Address,
        options: &RemoveOptions,
    ) -> SyncResult<Address> {
        if self.is_directory(address).await? {
            if !options.local {
                return Err(SyncError::Unsupported {
                    address: *address,
                    reason: "directories can only be removed locally".into(),
                });
            }
            self.remove_tree(*address, path.to_path_buf()).await?;
            tracing::info!(path = %path.display(), %address, "removed directory");
            return Ok(*address);
        }

        let unpinned = self
            .store
            .unpin(address)
            .await
            .map_err(SyncError::store("unpin", address))?;
        if options.local {
            delete_file(path).await?;
        }
        tracing::info!(path = %path.display(), %address, local = options.local, "removed file");
        Ok(unpinned.first().copied().unwrap_or(*address))
    }

    fn remove_tree(&self, address: Address, path: PathBuf) -> BoxFuture<'_, SyncResult<()>> {
        async move {
            let children = self
                .store
                .list(&address)
                .await
                .map_err(SyncError::store("list", address))?;
            for child in children {
                let target = path.join(checked_component(&child.name, &address)?);
                if self.is_directory(&child.address).await? {
                    self.remove_tree(child.address, target).await?;
                } else {
                    delete_file(&target).await?;
                }
            }
            remove_dir_if_empty(&path).await
        }
        .boxed()
    }
}

/// Delete a local file. One that is already gone counts as deleted.
async fn delete_file(path: &Path) -> SyncResult<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "already absent");
            Ok(())
        }
        Err(e) => Err(SyncError::io(path)(e)),
    }
}

async fn remove_dir_if_empty(path: &Path) -> SyncResult<()> {
    let mut entries = match tokio::fs::read_dir(path).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(SyncError::io(path)(e)),
    };
    if entries
        .next_entry()
        .await
        .map_err(SyncError::io(path))?
        .is_some()
    {
        tracing::debug!(path = %path.display(), "kept directory with untracked entries");
        return Ok(());
    }
    tokio::fs::remove_dir(path)
        .await
        .map_err(SyncError::io(path))
}
