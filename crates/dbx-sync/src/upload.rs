//! The upload pipeline: add a path to the content store, classify every
//! resulting entry, and optionally anchor the result under a name.

use std::path::Path;

use dbx_store::{AddOutcome, Link};
use dbx_types::Address;
use futures::future::try_join_all;

use crate::engine::{local_state, LocalState, SyncEngine};
use crate::error::{CollaboratorError, SyncError, SyncResult};
use crate::types::{AddressedFile, UploadOptions, UploadOutcome};

impl SyncEngine {
    /// Add `path` to the content store.
    ///
    /// With `publish`, a single file is anchored under `options.name`
    /// (default: the path as given); for a tree only the root is anchored.
    /// Any collaborator failure aborts the whole call.
    pub async fn upload(&self, path: &Path, options: &UploadOptions) -> SyncResult<UploadOutcome> {
        if local_state(path).await? == LocalState::Missing {
            return Err(SyncError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let shown = path.display().to_string();

        let added = self
            .store
            .add(path, options.recurse)
            .await
            .map_err(SyncError::store("add", &shown))?;

        match added {
            AddOutcome::Single(address) => {
                let mut file = AddressedFile {
                    address,
                    path: shown,
                    directory: self.is_directory(&address).await?,
                    name: None,
                };
                if options.publish {
                    file.name = Some(self.anchor_entry(&file, options).await?);
                }
                tracing::debug!(path = %file.path, address = %file.address, "uploaded file");
                Ok(UploadOutcome::Single(file))
            }
            AddOutcome::Tree(links) => {
                let mut files =
                    try_join_all(links.iter().map(|link| self.classify_link(path, &shown, link)))
                        .await?;
                if options.publish {
                    if let Some(root) = files.last_mut() {
                        root.name = Some(self.anchor_entry(root, options).await?);
                    }
                }
                tracing::debug!(path = %shown, entries = files.len(), "uploaded tree");
                Ok(UploadOutcome::Tree(files))
            }
        }
    }

    /// Turn a tree link into an entry whose path is rebuilt below `root`.
    async fn classify_link(&self, root: &Path, shown: &str, link: &Link) -> SyncResult<AddressedFile> {
        let path = match link.name.split_once('/') {
            Some((_, below)) => root.join(below).display().to_string(),
            None => shown.to_string(),
        };
        Ok(AddressedFile {
            address: link.address,
            directory: self.is_directory(&link.address).await?,
            path,
            name: None,
        })
    }

    async fn anchor_entry(
        &self,
        file: &AddressedFile,
        options: &UploadOptions,
    ) -> SyncResult<String> {
        let name = options.name.clone().unwrap_or_else(|| file.path.clone());
        self.anchor(&name, &file.address).await?;
        Ok(name)
    }

    /// Anchor `name` to `address`, treating a refusal as a failure.
    pub(crate) async fn anchor(&self, name: &str, address: &Address) -> SyncResult<()> {
        let anchored = self
            .names
            .anchor(name, address)
            .await
            .map_err(SyncError::naming("anchor", name))?;
        if !anchored {
            return Err(SyncError::Collaborator {
                operation: "anchor",
                subject: name.to_string(),
                source: CollaboratorError::Rejected(format!(
                    "ledger refused binding to {address}"
                )),
            });
        }
        tracing::info!(name, %address, "anchored");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::Arc;

    use dbx_ledger::{AnchorLedger, InMemoryLedger};
    use dbx_naming::{LedgerNameService, NameService, Session};
    use dbx_store::LocalContentStore;

    use super::*;

    fn engine_with(ledger: Arc<dyn AnchorLedger>) -> (SyncEngine, LedgerNameService) {
        let names = LedgerNameService::new(ledger, Session::generate());
        let engine = SyncEngine::new(
            Arc::new(LocalContentStore::in_memory()),
            Arc::new(names.clone()),
        );
        (engine, names)
    }

    fn engine() -> (SyncEngine, LedgerNameService) {
        engine_with(Arc::new(InMemoryLedger::new()))
    }

    #[tokio::test]
    async fn missing_path_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let (engine, _) = engine();
        let err = engine
            .upload(&dir.path().join("absent"), &UploadOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::NotFound { .. }));
    }

    #[tokio::test]
    async fn file_upload_is_single_and_not_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.txt");
        fs::write(&file, b"alpha").unwrap();
        let (engine, _) = engine();

        let outcome = engine.upload(&file, &UploadOptions::default()).await.unwrap();
        let UploadOutcome::Single(entry) = outcome else {
            panic!("expected a single entry");
        };
        assert!(!entry.directory);
        assert_eq!(entry.path, file.display().to_string());
        assert_eq!(entry.name, None);
    }

    #[tokio::test]
    async fn directory_without_recurse_fails_as_collaborator_error() {
        let dir = tempfile::tempdir().unwrap();
        let (engine, _) = engine();
        let err = engine
            .upload(dir.path(), &UploadOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SyncError::Collaborator {
                operation: "add",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn tree_paths_are_rebuilt_below_the_upload_path() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("data");
        fs::create_dir_all(data.join("sub")).unwrap();
        fs::write(data.join("x.txt"), b"x").unwrap();
        fs::write(data.join("sub/y.txt"), b"y").unwrap();
        let (engine, _) = engine();

        let outcome = engine.upload(&data, &UploadOptions::recursive()).await.unwrap();
        let root = outcome.root().unwrap();
        assert_eq!(root.path, data.display().to_string());
        assert!(root.directory);

        let x = outcome.find(&data.join("x.txt").display().to_string()).unwrap();
        assert!(!x.directory);
        let sub = outcome.find(&data.join("sub").display().to_string()).unwrap();
        assert!(sub.directory);
        assert!(outcome
            .find(&data.join("sub/y.txt").display().to_string())
            .is_some());
        assert_eq!(outcome.files().len(), 4);
    }

    #[tokio::test]
    async fn publish_anchors_file_under_its_path_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.txt");
        fs::write(&file, b"alpha").unwrap();
        let (engine, names) = engine();
        let options = UploadOptions {
            publish: true,
            ..UploadOptions::default()
        };

        let outcome = engine.upload(&file, &options).await.unwrap();
        let entry = outcome.root().unwrap();
        let name = file.display().to_string();
        assert_eq!(entry.name.as_deref(), Some(name.as_str()));
        assert_eq!(names.lookup_binding(&name).await.unwrap(), entry.address);
    }

    #[tokio::test]
    async fn publish_tree_anchors_only_the_root() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("data");
        fs::create_dir(&data).unwrap();
        fs::write(data.join("x.txt"), b"x").unwrap();
        let (engine, names) = engine();
        let options = UploadOptions {
            recurse: true,
            publish: true,
            name: Some("site".into()),
        };

        let outcome = engine.upload(&data, &options).await.unwrap();
        let root = outcome.root().unwrap();
        assert_eq!(root.name.as_deref(), Some("site"));
        assert_eq!(names.lookup_binding("site").await.unwrap(), root.address);
        let child = outcome.find(&data.join("x.txt").display().to_string()).unwrap();
        assert_eq!(child.name, None);
        assert_eq!(names.ledger().len().unwrap(), 1);
    }

    #[tokio::test]
    async fn refused_anchor_fails_the_upload() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.txt");
        fs::write(&file, b"alpha").unwrap();
        let ledger: Arc<dyn AnchorLedger> = Arc::new(InMemoryLedger::new());
        let squatter = LedgerNameService::new(ledger.clone(), Session::generate());
        assert!(squatter
            .anchor("taken", &Address::from_bytes(b"other"))
            .await
            .unwrap());
        let (engine, _) = engine_with(ledger);

        let options = UploadOptions {
            publish: true,
            name: Some("taken".into()),
            ..UploadOptions::default()
        };
        let err = engine.upload(&file, &options).await.unwrap_err();
        assert!(matches!(
            err,
            SyncError::Collaborator {
                source: CollaboratorError::Rejected(_),
                ..
            }
        ));
    }
}
