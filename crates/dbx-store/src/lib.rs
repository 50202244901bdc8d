//! Content-addressed storage for Driftbox.
//!
//! Two layers live here. The object layer is a hash-keyed key/value store of
//! immutable [`Blob`] and [`Tree`] objects, addressed by their
//! domain-separated BLAKE3 hash. The addressing layer ([`ContentStore`])
//! turns filesystem paths into addresses: it adds files and directory trees,
//! reports whether an address is a directory, lists and reads objects, and
//! keeps the pin set that marks content as retained.
//!
//! # Storage Backends
//!
//! All object backends implement the [`ObjectStore`] trait:
//!
//! - [`InMemoryObjectStore`] -- `HashMap`-based store for tests and embedding
//! - [`FsObjectStore`] -- one file per object under `objects/aa/bbbb...`
//!
//! [`LocalContentStore`] implements [`ContentStore`] on top of either.
//!
//! # Design Rules
//!
//! 1. Objects are immutable once written (content-addressing guarantees this).
//! 2. Tree entries are sorted by name before hashing, so a directory's address
//!    depends only on its children's names and addresses.
//! 3. Reads verify the content hash; corruption is an error, never ignored.
//! 4. Adding content pins it.

pub mod content;
pub mod error;
pub mod fs;
pub mod local;
pub mod memory;
pub mod object;
pub mod traits;

pub use content::{AddOutcome, ContentStore, Link};
pub use error::{StoreError, StoreResult};
pub use fs::FsObjectStore;
pub use local::LocalContentStore;
pub use memory::InMemoryObjectStore;
pub use object::{Blob, EntryMode, ObjectKind, StoredObject, Tree, TreeEntry};
pub use traits::ObjectStore;
