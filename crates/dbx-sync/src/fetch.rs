use std::path::{Component, Path, PathBuf};

use dbx_types::Address;
use futures::future::{BoxFuture, FutureExt};

use crate::engine::SyncEngine;
use crate::error::{CollaboratorError, SyncError, SyncResult};

impl SyncEngine {
    /// Write the object at `address` to `path`: a blob becomes a file, a
    /// tree is recreated recursively. Parent directories are created.
    pub async fn materialize(&self, address: &Address, path: &Path) -> SyncResult<()> {
        self.materialize_node(*address, path.to_path_buf()).await
    }

    fn materialize_node(&self, address: Address, path: PathBuf) -> BoxFuture<'_, SyncResult<()>> {
        async move {
            if self.is_directory(&address).await? {
                tokio::fs::create_dir_all(&path)
                    .await
                    .map_err(SyncError::io(&path))?;
                let children = self
                    .store
                    .list(&address)
                    .await
                    .map_err(SyncError::store("list", address))?;
                for child in children {
                    let target = path.join(checked_component(&child.name, &address)?);
                    self.materialize_node(child.address, target).await?;
                }
                return Ok(());
            }

            let bytes = self
                .store
                .cat(&address)
                .await
                .map_err(SyncError::store("cat", address))?;
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(SyncError::io(parent))?;
            }
            if tokio::fs::metadata(&path).await.is_ok_and(|m| m.is_dir()) {
                tokio::fs::remove_dir_all(&path)
                    .await
                    .map_err(SyncError::io(&path))?;
            }
            tokio::fs::write(&path, &bytes)
                .await
                .map_err(SyncError::io(&path))?;
            tracing::debug!(path = %path.display(), %address, bytes = bytes.len(), "materialized");
            Ok(())
        }
        .boxed()
    }
}

/// A listed child name must be one plain path component.
pub(crate) fn checked_component<'a>(name: &'a str, parent: &Address) -> SyncResult<&'a str> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(name),
        _ => Err(SyncError::Collaborator {
            operation: "list",
            subject: parent.to_string(),
            source: CollaboratorError::Rejected(format!("unsafe child name {name:?}")),
        }),
    }
}
