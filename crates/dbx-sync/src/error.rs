use std::fmt;
use std::path::PathBuf;

use dbx_naming::NamingError;
use dbx_store::StoreError;
use dbx_types::Address;
use thiserror::Error;

/// A failure reported by, or on behalf of, a collaborator.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Naming(#[from] NamingError),

    /// The collaborator answered but refused the request.
    #[error("rejected: {0}")]
    Rejected(String),
}

#[derive(Debug, Error)]
pub enum SyncError {
    /// A local path that must exist does not.
    #[error("path not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("{operation} failed for {subject}: {source}")]
    Collaborator {
        operation: &'static str,
        subject: String,
        #[source]
        source: CollaboratorError,
    },

    /// Re-adding a directory did not yield an entry for the directory itself.
    #[error("directory {path} missing from its own upload result")]
    DirectoryAddressMismatch { path: String },

    #[error("unsupported operation on {address}: {reason}")]
    Unsupported { address: Address, reason: String },

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid batch: {reason}")]
    InvalidBatch { reason: String },
}

impl SyncError {
    pub(crate) fn store(
        operation: &'static str,
        subject: impl fmt::Display,
    ) -> impl FnOnce(StoreError) -> Self {
        let subject = subject.to_string();
        move |source| Self::Collaborator {
            operation,
            subject,
            source: source.into(),
        }
    }

    pub(crate) fn naming(
        operation: &'static str,
        subject: impl fmt::Display,
    ) -> impl FnOnce(NamingError) -> Self {
        let subject = subject.to_string();
        move |source| Self::Collaborator {
            operation,
            subject,
            source: source.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }
}

pub type SyncResult<T> = Result<T, SyncError>;
