use dbx_types::Address;

use crate::error::StoreResult;
use crate::object::StoredObject;

/// Immutable blobs and trees keyed by their address.
///
/// Writing the same object twice yields the same address and stores it once.
/// Objects are never removed; unpinned content simply stops being listed.
pub trait ObjectStore: Send + Sync {
    /// Read an object by its address.
    ///
    /// Returns `Ok(None)` if the object does not exist.
    /// Returns `Err` on I/O failure or data corruption.
    fn read(&self, id: &Address) -> StoreResult<Option<StoredObject>>;

    /// Write an object and return its address.
    ///
    /// If the object already exists, this is a no-op (idempotent).
    fn write(&self, object: &StoredObject) -> StoreResult<Address>;

    /// Read an object that must exist.
    fn read_required(&self, id: &Address) -> StoreResult<StoredObject> {
        self.read(id)?.ok_or(crate::error::StoreError::NotFound(*id))
    }
}
