//! Error types for naming operations.

use std::path::PathBuf;

use dbx_ledger::LedgerError;
use thiserror::Error;

/// Errors that can occur while publishing, anchoring, or resolving names.
#[derive(Debug, Error)]
pub enum NamingError {
    /// The name failed validation.
    #[error("invalid name {name:?}: {reason}")]
    InvalidName { name: String, reason: String },

    /// Nothing is bound to the name.
    #[error("name not bound: {name}")]
    NotFound { name: String },

    /// The session key file exists but does not hold a valid key.
    #[error("invalid session key in {}", path.display())]
    InvalidKey { path: PathBuf },

    /// The underlying anchor ledger failed.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// A blocking ledger task panicked or was cancelled.
    #[error("naming task failed: {0}")]
    Task(String),

    /// I/O error while reading or writing the session key.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for naming operations.
pub type NamingResult<T> = std::result::Result<T, NamingError>;
