//! Reconciliation engine for Driftbox.
//!
//! Reconciles a local filesystem tree with a content-addressed store. Content
//! addresses are the identity of a file or directory; the time of the last
//! synchronization breaks ties when the local and remote copies diverge.
//!
//! The engine exposes four operations:
//! - [`SyncEngine::upload`]: add a path, optionally anchoring it under a name
//! - [`SyncEngine::synchronize`]: reconcile a batch of [`FileDescriptor`]s
//! - [`SyncEngine::remove`]: unpin an address or delete a local copy
//! - [`SyncEngine::materialize`]: write stored content back to disk
//!
//! Collaborators are consumed only through [`dbx_store::ContentStore`] and
//! [`dbx_naming::NameService`].

pub mod engine;
pub mod error;
pub mod fetch;
pub mod planner;
pub mod remove;
pub mod types;
pub mod upload;

pub use engine::SyncEngine;
pub use error::{CollaboratorError, SyncError, SyncResult};
pub use types::{
    AddressedFile, ConcurrencyMode, FileDescriptor, ReconciliationResult, RemoveOptions,
    SyncEntry, UploadOptions, UploadOutcome,
};
