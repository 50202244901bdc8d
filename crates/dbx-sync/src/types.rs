use std::collections::BTreeMap;

use dbx_types::{Address, ModifiedTime};
use serde::{Deserialize, Serialize};

/// One sync unit as the caller knew it after the previous cycle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDescriptor {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub known_address: Option<Address>,
    /// Time of the last synchronization. Absent means never.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub known_modified: Option<ModifiedTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_directory: Option<bool>,
}

impl FileDescriptor {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            known_address: None,
            known_modified: None,
            is_directory: None,
        }
    }

    pub fn known(mut self, address: Address, modified: ModifiedTime) -> Self {
        self.known_address = Some(address);
        self.known_modified = Some(modified);
        self
    }

    pub fn directory(mut self) -> Self {
        self.is_directory = Some(true);
        self
    }

    /// The baseline timestamp the local copy is compared against.
    pub fn baseline(&self) -> ModifiedTime {
        self.known_modified.unwrap_or(ModifiedTime::EPOCH)
    }

    pub(crate) fn hinted_directory(&self) -> bool {
        self.is_directory == Some(true)
    }
}

/// Something the content store addressed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressedFile {
    pub address: Address,
    pub path: String,
    pub directory: bool,
    /// Present only when the entry was published under a name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Result of an upload: one file, or a tree listed descendants first and
/// root last.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UploadOutcome {
    Single(AddressedFile),
    Tree(Vec<AddressedFile>),
}

impl UploadOutcome {
    pub fn files(&self) -> &[AddressedFile] {
        match self {
            Self::Single(file) => std::slice::from_ref(file),
            Self::Tree(files) => files,
        }
    }

    /// The entry whose path is exactly `path`.
    pub fn find(&self, path: &str) -> Option<&AddressedFile> {
        self.files().iter().find(|file| file.path == path)
    }

    /// The uploaded file, or the tree root.
    pub fn root(&self) -> Option<&AddressedFile> {
        self.files().last()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadOptions {
    pub recurse: bool,
    pub publish: bool,
    /// Name to anchor under when publishing; defaults to the path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl UploadOptions {
    pub fn recursive() -> Self {
        Self {
            recurse: true,
            ..Self::default()
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoveOptions {
    /// Also delete the local copy.
    pub local: bool,
}

/// The post-reconciliation state of one path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncEntry {
    pub address: Address,
    pub directory: bool,
}

/// Path to address map produced by one batch. Unchanged paths are absent.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReconciliationResult(BTreeMap<String, SyncEntry>);

impl ReconciliationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, entry: SyncEntry) {
        self.0.insert(path.into(), entry);
    }

    pub fn get(&self, path: &str) -> Option<&SyncEntry> {
        self.0.get(path)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &SyncEntry)> {
        self.0.iter()
    }

    pub fn into_inner(self) -> BTreeMap<String, SyncEntry> {
        self.0
    }
}

/// How the leaf phase (and the directory phase) schedules entries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ConcurrencyMode {
    /// One entry at a time, in batch order.
    Serial,
    /// Unordered fan-out with at most `limit` entries in flight.
    Concurrent { limit: usize },
}

impl ConcurrencyMode {
    pub const DEFAULT_LIMIT: usize = 8;

    pub fn limit(&self) -> usize {
        match self {
            Self::Serial => 1,
            Self::Concurrent { limit } => (*limit).max(1),
        }
    }
}

impl Default for ConcurrencyMode {
    fn default() -> Self {
        Self::Concurrent {
            limit: Self::DEFAULT_LIMIT,
        }
    }
}
