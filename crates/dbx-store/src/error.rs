use std::path::PathBuf;

use dbx_types::Address;

/// Errors from object store and content store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested object was not found.
    #[error("object not found: {0}")]
    NotFound(Address),

    /// Content hash mismatch on read (data corruption).
    #[error("hash mismatch for {id}: stored data hashes to {computed}")]
    HashMismatch { id: Address, computed: Address },

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the underlying storage backend or the filesystem.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The object data is malformed or cannot be decoded.
    #[error("corrupt object {id}: {reason}")]
    CorruptObject { id: Address, reason: String },

    /// Attempted to write an object hashing to the null address.
    #[error("cannot store object with null address")]
    NullAddress,

    /// A path handed to `add` does not exist.
    #[error("path not found: {}", path.display())]
    PathNotFound { path: PathBuf },

    /// A directory was added without `recursive`.
    #[error("{} is a directory (add it recursively)", path.display())]
    IsDirectory { path: PathBuf },

    /// `list` was called on a blob address.
    #[error("not a directory: {0}")]
    NotADirectory(Address),

    /// `cat` was called on a tree address.
    #[error("is a directory: {0}")]
    IsDirectoryObject(Address),

    /// `unpin` was called on an address that is not pinned.
    #[error("not pinned: {0}")]
    NotPinned(Address),

    /// A blocking store task panicked or was cancelled.
    #[error("store task failed: {0}")]
    Task(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
