use std::path::Path;

use async_trait::async_trait;
use dbx_types::Address;
use serde::{Deserialize, Serialize};

use crate::error::StoreResult;

/// A named address: one entry of a directory listing, or one node of an
/// added tree.
///
/// In an [`AddOutcome::Tree`], `name` is relative and `/`-separated, and
/// starts with the root's own name (`data`, `data/x.txt`, `data/sub/y`).
/// In a [`ContentStore::list`] result it is a single path component.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub name: String,
    pub address: Address,
}

impl Link {
    pub fn new(name: impl Into<String>, address: Address) -> Self {
        Self {
            name: name.into(),
            address,
        }
    }
}

/// Result of adding a path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AddOutcome {
    /// A single file.
    Single(Address),
    /// A directory tree: every descendant first, the root last.
    Tree(Vec<Link>),
}

impl AddOutcome {
    /// The address of what was added: the file, or the tree root.
    pub fn root(&self) -> Option<Address> {
        match self {
            Self::Single(address) => Some(*address),
            Self::Tree(links) => links.last().map(|link| link.address),
        }
    }
}

/// Addressing collaborator: computes content addresses for paths and owns
/// the pin set.
///
/// Implementations must be deterministic: adding byte-identical files, or
/// directories whose children have identical names and addresses, yields
/// identical addresses.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Add `path` and pin everything written.
    ///
    /// A file yields [`AddOutcome::Single`]. A directory requires
    /// `recursive` and yields [`AddOutcome::Tree`].
    async fn add(&self, path: &Path, recursive: bool) -> StoreResult<AddOutcome>;

    /// Whether `address` denotes a directory.
    async fn is_directory(&self, address: &Address) -> StoreResult<bool>;

    /// Pin `address` (and with `recursive`, every descendant). Returns the
    /// addresses pinned.
    async fn pin(&self, address: &Address, recursive: bool) -> StoreResult<Vec<Address>>;

    /// Remove the pin on `address`. Returns the addresses unpinned.
    async fn unpin(&self, address: &Address) -> StoreResult<Vec<Address>>;

    /// Children of a directory address.
    async fn list(&self, address: &Address) -> StoreResult<Vec<Link>>;

    /// Contents of a file address.
    async fn cat(&self, address: &Address) -> StoreResult<Vec<u8>>;
}
