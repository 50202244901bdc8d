//! [`ContentStore`] over a local [`ObjectStore`].
//!
//! Files become blobs. Directories are walked children-first, so every
//! subtree is written before the tree that references it, and the resulting
//! link list is already in descendants-first, root-last order.

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use dbx_types::Address;
use tempfile::NamedTempFile;
use walkdir::WalkDir;

use crate::content::{AddOutcome, ContentStore, Link};
use crate::error::{StoreError, StoreResult};
use crate::fs::FsObjectStore;
use crate::memory::InMemoryObjectStore;
use crate::object::{Blob, EntryMode, Tree, TreeEntry};
use crate::traits::ObjectStore;

const PINS_FILE: &str = "pins.json";

/// Local content store: an object backend plus a pin set.
///
/// Cloning is cheap and clones share state. Blocking filesystem work runs
/// on tokio's blocking pool when called through [`ContentStore`]; the
/// `*_blocking` methods expose the same operations synchronously.
#[derive(Clone)]
pub struct LocalContentStore {
    inner: Arc<Inner>,
}

struct Inner {
    objects: Arc<dyn ObjectStore>,
    pins: RwLock<BTreeSet<Address>>,
    pins_path: Option<PathBuf>,
}

impl LocalContentStore {
    /// A store over `objects` whose pins are kept in memory only.
    pub fn new(objects: Arc<dyn ObjectStore>) -> Self {
        Self {
            inner: Arc::new(Inner {
                objects,
                pins: RwLock::new(BTreeSet::new()),
                pins_path: None,
            }),
        }
    }

    /// A fully in-memory store.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryObjectStore::new()))
    }

    /// Open (creating if needed) a persistent store under `root`: objects in
    /// `root/objects`, pins in `root/pins.json`.
    pub fn open(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref();
        let objects = FsObjectStore::open(root)?;
        let pins_path = root.join(PINS_FILE);
        let pins = match fs::read(&pins_path) {
            Ok(raw) => serde_json::from_slice(&raw)
                .map_err(|e| StoreError::Serialization(format!("{PINS_FILE}: {e}")))?,
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeSet::new(),
            Err(e) => return Err(e.into()),
        };
        tracing::debug!(root = %root.display(), pins = pins.len(), "opened content store");
        Ok(Self {
            inner: Arc::new(Inner {
                objects: Arc::new(objects),
                pins: RwLock::new(pins),
                pins_path: Some(pins_path),
            }),
        })
    }

    /// The underlying object backend.
    pub fn objects(&self) -> &Arc<dyn ObjectStore> {
        &self.inner.objects
    }

    pub fn is_pinned(&self, address: &Address) -> bool {
        self.inner.pins.read().expect("lock poisoned").contains(address)
    }

    /// All pinned addresses, sorted.
    pub fn pinned(&self) -> Vec<Address> {
        self.inner
            .pins
            .read()
            .expect("lock poisoned")
            .iter()
            .copied()
            .collect()
    }

    pub fn add_blocking(&self, path: &Path, recursive: bool) -> StoreResult<AddOutcome> {
        let metadata = match fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::PathNotFound {
                    path: path.to_path_buf(),
                })
            }
            Err(e) => return Err(e.into()),
        };

        if !metadata.is_dir() {
            let address = self.write_file(path)?;
            self.insert_pins([address])?;
            return Ok(AddOutcome::Single(address));
        }
        if !recursive {
            return Err(StoreError::IsDirectory {
                path: path.to_path_buf(),
            });
        }

        let root_name = root_name(path);
        let mut pending: HashMap<PathBuf, Vec<TreeEntry>> = HashMap::new();
        let mut links = Vec::new();

        let walker = WalkDir::new(path)
            .follow_links(true)
            .contents_first(true)
            .sort_by_file_name();
        for entry in walker {
            let entry = entry.map_err(io::Error::from)?;
            let (mode, address) = if entry.file_type().is_dir() {
                let children = pending.remove(entry.path()).unwrap_or_default();
                let tree = Tree::new(children);
                (EntryMode::Directory, self.inner.objects.write(&tree.to_stored_object()?)?)
            } else {
                (EntryMode::Regular, self.write_file(entry.path())?)
            };

            let relative = entry.path().strip_prefix(path).map_err(|_| {
                io::Error::new(
                    ErrorKind::InvalidData,
                    format!("{} escaped {}", entry.path().display(), path.display()),
                )
            })?;
            links.push(Link::new(link_name(&root_name, relative), address));

            if entry.depth() > 0 {
                if let Some(parent) = entry.path().parent() {
                    let name = entry.file_name().to_string_lossy().into_owned();
                    pending
                        .entry(parent.to_path_buf())
                        .or_default()
                        .push(TreeEntry::new(mode, name, address));
                }
            }
        }

        self.insert_pins(links.iter().map(|link| link.address))?;
        tracing::debug!(
            path = %path.display(),
            entries = links.len(),
            root = ?links.last().map(|link| link.address),
            "added directory"
        );
        Ok(AddOutcome::Tree(links))
    }

    pub fn is_directory_blocking(&self, address: &Address) -> StoreResult<bool> {
        Ok(self.inner.objects.read_required(address)?.is_tree())
    }

    pub fn pin_blocking(&self, address: &Address, recursive: bool) -> StoreResult<Vec<Address>> {
        let mut pinned = vec![*address];
        let root = self.inner.objects.read_required(address)?;
        if recursive && root.is_tree() {
            let mut stack = vec![Tree::from_stored_object(&root)?];
            while let Some(tree) = stack.pop() {
                for entry in tree.entries {
                    pinned.push(entry.address);
                    if entry.is_directory() {
                        let child = self.inner.objects.read_required(&entry.address)?;
                        stack.push(Tree::from_stored_object(&child)?);
                    }
                }
            }
        }
        self.insert_pins(pinned.iter().copied())?;
        Ok(pinned)
    }

    pub fn unpin_blocking(&self, address: &Address) -> StoreResult<Vec<Address>> {
        let mut pins = self.inner.pins.write().expect("lock poisoned");
        if !pins.remove(address) {
            return Err(StoreError::NotPinned(*address));
        }
        self.save_pins(&pins)?;
        Ok(vec![*address])
    }

    pub fn list_blocking(&self, address: &Address) -> StoreResult<Vec<Link>> {
        let object = self.inner.objects.read_required(address)?;
        if !object.is_tree() {
            return Err(StoreError::NotADirectory(*address));
        }
        Ok(Tree::from_stored_object(&object)?
            .entries
            .into_iter()
            .map(|entry| Link::new(entry.name, entry.address))
            .collect())
    }

    pub fn cat_blocking(&self, address: &Address) -> StoreResult<Vec<u8>> {
        let object = self.inner.objects.read_required(address)?;
        if object.is_tree() {
            return Err(StoreError::IsDirectoryObject(*address));
        }
        Ok(Blob::from_stored_object(object)?.data)
    }

    fn write_file(&self, path: &Path) -> StoreResult<Address> {
        let data = fs::read(path)?;
        self.inner.objects.write(&Blob::new(data).into_stored_object())
    }

    fn insert_pins(&self, addresses: impl IntoIterator<Item = Address>) -> StoreResult<()> {
        let mut pins = self.inner.pins.write().expect("lock poisoned");
        let before = pins.len();
        pins.extend(addresses);
        if pins.len() != before {
            self.save_pins(&pins)?;
        }
        Ok(())
    }

    fn save_pins(&self, pins: &BTreeSet<Address>) -> StoreResult<()> {
        let Some(path) = &self.inner.pins_path else {
            return Ok(());
        };
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let data =
            serde_json::to_vec_pretty(pins).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&data)?;
        tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;
        Ok(())
    }

    async fn blocking<T, F>(&self, op: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&LocalContentStore) -> StoreResult<T> + Send + 'static,
    {
        let this = self.clone();
        tokio::task::spawn_blocking(move || op(&this))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

impl std::fmt::Debug for LocalContentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalContentStore")
            .field("pins", &self.inner.pins.read().map(|p| p.len()).unwrap_or(0))
            .field("pins_path", &self.inner.pins_path)
            .finish()
    }
}

#[async_trait]
impl ContentStore for LocalContentStore {
    async fn add(&self, path: &Path, recursive: bool) -> StoreResult<AddOutcome> {
        let path = path.to_path_buf();
        self.blocking(move |store| store.add_blocking(&path, recursive))
            .await
    }

    async fn is_directory(&self, address: &Address) -> StoreResult<bool> {
        let address = *address;
        self.blocking(move |store| store.is_directory_blocking(&address))
            .await
    }

    async fn pin(&self, address: &Address, recursive: bool) -> StoreResult<Vec<Address>> {
        let address = *address;
        self.blocking(move |store| store.pin_blocking(&address, recursive))
            .await
    }

    async fn unpin(&self, address: &Address) -> StoreResult<Vec<Address>> {
        let address = *address;
        self.blocking(move |store| store.unpin_blocking(&address))
            .await
    }

    async fn list(&self, address: &Address) -> StoreResult<Vec<Link>> {
        let address = *address;
        self.blocking(move |store| store.list_blocking(&address))
            .await
    }

    async fn cat(&self, address: &Address) -> StoreResult<Vec<u8>> {
        let address = *address;
        self.blocking(move |store| store.cat_blocking(&address))
            .await
    }
}

/// Name of the added root: its last component, resolving `.` and `..`.
fn root_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .or_else(|| {
            fs::canonicalize(path)
                .ok()
                .and_then(|abs| abs.file_name().map(|n| n.to_string_lossy().into_owned()))
        })
        .unwrap_or_else(|| "root".to_string())
}

fn link_name(root_name: &str, relative: &Path) -> String {
    let mut name = root_name.to_string();
    for component in relative.components() {
        name.push('/');
        name.push_str(&component.as_os_str().to_string_lossy());
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn write(root: &Path, rel: &str, data: &[u8]) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, data).unwrap();
    }

    fn tree_links(outcome: AddOutcome) -> Vec<Link> {
        match outcome {
            AddOutcome::Tree(links) => links,
            other => panic!("expected tree, got {other:?}"),
        }
    }

    #[test]
    fn add_file_yields_single_and_pins() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.txt", b"alpha");
        let store = LocalContentStore::in_memory();

        let outcome = store.add_blocking(&dir.path().join("a.txt"), false).unwrap();
        let AddOutcome::Single(address) = outcome else {
            panic!("expected single");
        };
        assert!(store.is_pinned(&address));
        assert_eq!(store.cat_blocking(&address).unwrap(), b"alpha");
        assert!(!store.is_directory_blocking(&address).unwrap());
    }

    #[test]
    fn add_missing_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalContentStore::in_memory();
        let err = store.add_blocking(&dir.path().join("nope"), true).unwrap_err();
        assert!(matches!(err, StoreError::PathNotFound { .. }));
    }

    #[test]
    fn add_directory_requires_recursive() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalContentStore::in_memory();
        let err = store.add_blocking(dir.path(), false).unwrap_err();
        assert!(matches!(err, StoreError::IsDirectory { .. }));
    }

    #[test]
    fn tree_is_descendants_first_root_last() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("data");
        write(&data, "x.txt", b"x");
        write(&data, "sub/y.txt", b"y");
        let store = LocalContentStore::in_memory();

        let links = tree_links(store.add_blocking(&data, true).unwrap());
        let names: Vec<&str> = links.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, ["data/sub/y.txt", "data/sub", "data/x.txt", "data"]);

        let root = links.last().unwrap().address;
        assert!(store.is_directory_blocking(&root).unwrap());
        let children = store.list_blocking(&root).unwrap();
        assert_eq!(
            children.iter().map(|l| l.name.as_str()).collect::<Vec<_>>(),
            ["sub", "x.txt"]
        );
        assert!(links.iter().all(|l| store.is_pinned(&l.address)));
    }

    #[test]
    fn trailing_slash_and_dot_paths_name_the_root() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("data");
        write(&data, "x.txt", b"x");
        let store = LocalContentStore::in_memory();

        let with_slash = tree_links(
            store
                .add_blocking(Path::new(&format!("{}/", data.display())), true)
                .unwrap(),
        );
        assert_eq!(with_slash.last().unwrap().name, "data");

        let dotted = tree_links(store.add_blocking(&data.join("."), true).unwrap());
        assert_eq!(dotted.last().unwrap().name, "data");
        assert_eq!(dotted.last().unwrap().address, with_slash.last().unwrap().address);
    }

    #[test]
    fn empty_directory_has_an_address() {
        let dir = tempfile::tempdir().unwrap();
        let empty = dir.path().join("empty");
        fs::create_dir(&empty).unwrap();
        let store = LocalContentStore::in_memory();
        let links = tree_links(store.add_blocking(&empty, true).unwrap());
        assert_eq!(links.len(), 1);
        assert!(store.list_blocking(&links[0].address).unwrap().is_empty());
    }

    #[test]
    fn list_and_cat_reject_wrong_kind() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "d/f", b"f");
        let store = LocalContentStore::in_memory();
        let links = tree_links(store.add_blocking(&dir.path().join("d"), true).unwrap());
        let file = links[0].address;
        let root = links[1].address;
        assert!(matches!(store.list_blocking(&file), Err(StoreError::NotADirectory(_))));
        assert!(matches!(store.cat_blocking(&root), Err(StoreError::IsDirectoryObject(_))));
    }

    #[test]
    fn unpin_twice_fails() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a", b"a");
        let store = LocalContentStore::in_memory();
        let address = store.add_blocking(&dir.path().join("a"), false).unwrap().root().unwrap();

        assert_eq!(store.unpin_blocking(&address).unwrap(), vec![address]);
        assert!(!store.is_pinned(&address));
        assert!(matches!(store.unpin_blocking(&address), Err(StoreError::NotPinned(_))));
    }

    #[test]
    fn recursive_pin_covers_descendants() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "d/a", b"a");
        write(dir.path(), "d/e/b", b"b");
        let store = LocalContentStore::in_memory();
        let links = tree_links(store.add_blocking(&dir.path().join("d"), true).unwrap());
        for link in &links {
            store.unpin_blocking(&link.address).unwrap();
        }

        let root = links.last().unwrap().address;
        let pinned = store.pin_blocking(&root, true).unwrap();
        assert_eq!(pinned.len(), links.len());
        assert!(links.iter().all(|l| store.is_pinned(&l.address)));

        let direct = store.pin_blocking(&links[0].address, false).unwrap();
        assert_eq!(direct, vec![links[0].address]);
    }

    #[test]
    fn pins_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "work/a.txt", b"persist me");
        let root = dir.path().join(".dbx");

        let address = {
            let store = LocalContentStore::open(&root).unwrap();
            store
                .add_blocking(&dir.path().join("work/a.txt"), false)
                .unwrap()
                .root()
                .unwrap()
        };

        let reopened = LocalContentStore::open(&root).unwrap();
        assert!(reopened.is_pinned(&address));
        assert_eq!(reopened.cat_blocking(&address).unwrap(), b"persist me");
    }

    #[tokio::test]
    async fn async_interface_matches_blocking() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "d/a", b"a");
        let store = LocalContentStore::in_memory();
        let outcome = store.add(&dir.path().join("d"), true).await.unwrap();
        let root = outcome.root().unwrap();

        assert!(store.is_directory(&root).await.unwrap());
        let children = store.list(&root).await.unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(store.cat(&children[0].address).await.unwrap(), b"a");
        assert_eq!(store.unpin(&root).await.unwrap(), vec![root]);
        assert_eq!(store.pin(&root, false).await.unwrap(), vec![root]);
    }

    proptest! {
        #[test]
        fn identical_bytes_share_an_address(data in proptest::collection::vec(any::<u8>(), 0..512)) {
            let dir = tempfile::tempdir().unwrap();
            write(dir.path(), "one.bin", &data);
            write(dir.path(), "nested/two.bin", &data);
            let store = LocalContentStore::in_memory();
            let a = store.add_blocking(&dir.path().join("one.bin"), false).unwrap();
            let b = store.add_blocking(&dir.path().join("nested/two.bin"), true).unwrap();
            prop_assert_eq!(a, b);
        }

        #[test]
        fn identical_trees_share_an_address(
            files in proptest::collection::btree_map(
                "[a-z]{1,8}",
                proptest::collection::vec(any::<u8>(), 0..64),
                1..6,
            )
        ) {
            let dir = tempfile::tempdir().unwrap();
            for (name, data) in &files {
                write(&dir.path().join("left/data"), name, data);
                write(&dir.path().join("right/other"), &format!("inner/{name}"), data);
            }
            let store = LocalContentStore::in_memory();
            let left = store.add_blocking(&dir.path().join("left/data"), true).unwrap();
            let right = store.add_blocking(&dir.path().join("right/other/inner"), true).unwrap();
            prop_assert_eq!(left.root(), right.root());
        }
    }
}
