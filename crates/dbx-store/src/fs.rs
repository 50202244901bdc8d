//! Filesystem object store.
//!
//! Objects live at `<root>/objects/<first two hex chars>/<remaining hex>`.
//! Each file holds a one-byte kind tag followed by the object data. Writes go
//! through a temporary file in the same directory and are renamed into place,
//! so a crashed write never leaves a truncated object behind.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use dbx_types::Address;
use tempfile::NamedTempFile;

use crate::error::{StoreError, StoreResult};
use crate::object::{ObjectKind, StoredObject};
use crate::traits::ObjectStore;

/// One-file-per-object store rooted at a directory.
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    objects_dir: PathBuf,
}

impl FsObjectStore {
    /// Open (creating if needed) a store under `root`.
    pub fn open(root: impl AsRef<Path>) -> StoreResult<Self> {
        let objects_dir = root.as_ref().join("objects");
        fs::create_dir_all(&objects_dir)?;
        Ok(Self { objects_dir })
    }

    fn object_path(&self, id: &Address) -> PathBuf {
        let hex = id.to_hex();
        self.objects_dir.join(&hex[..2]).join(&hex[2..])
    }

    fn decode(id: &Address, raw: Vec<u8>) -> StoreResult<StoredObject> {
        let Some((&tag, _)) = raw.split_first() else {
            return Err(StoreError::CorruptObject {
                id: *id,
                reason: "empty object file".into(),
            });
        };
        let kind = ObjectKind::from_tag(tag).ok_or_else(|| StoreError::CorruptObject {
            id: *id,
            reason: format!("unknown kind tag {tag:#04x}"),
        })?;
        let object = StoredObject::new(kind, raw[1..].to_vec());
        let computed = object.compute_id();
        if computed != *id {
            return Err(StoreError::HashMismatch { id: *id, computed });
        }
        Ok(object)
    }
}

impl ObjectStore for FsObjectStore {
    fn read(&self, id: &Address) -> StoreResult<Option<StoredObject>> {
        match fs::read(self.object_path(id)) {
            Ok(raw) => Self::decode(id, raw).map(Some),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, object: &StoredObject) -> StoreResult<Address> {
        let id = object.compute_id();
        if id.is_null() {
            return Err(StoreError::NullAddress);
        }
        let path = self.object_path(&id);
        if path.exists() {
            return Ok(id);
        }
        let dir = path
            .parent()
            .ok_or_else(|| StoreError::CorruptObject {
                id,
                reason: "object path has no parent".into(),
            })?;
        fs::create_dir_all(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&[object.kind.tag()])?;
        tmp.write_all(&object.data)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| StoreError::Io(e.error))?;
        tracing::trace!(%id, kind = %object.kind, size = object.size, "object written");
        Ok(id)
    }
}
