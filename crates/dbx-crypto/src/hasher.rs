use dbx_types::Address;

/// BLAKE3 keyed by a domain tag.
///
/// Blobs, trees, name keys and ledger records each hash under their own tag,
/// so a file whose bytes happen to equal a directory listing still gets a
/// different address.
#[derive(Clone, Copy, Debug)]
pub struct ContentHasher {
    domain: &'static str,
}

impl ContentHasher {
    /// File contents.
    pub const BLOB: Self = Self::new("dbx-blob-v1");
    /// Encoded directory listings.
    pub const TREE: Self = Self::new("dbx-tree-v1");
    /// Ledger name keys.
    pub const NAME: Self = Self::new("dbx-name-v1");

    pub const fn new(domain: &'static str) -> Self {
        Self { domain }
    }

    /// Address of `data` under this domain.
    pub fn hash(&self, data: &[u8]) -> Address {
        Address::from_hash(self.digest(&[data]))
    }

    /// Raw digest over `parts` fed in order.
    ///
    /// Each part is length-prefixed, so `["ab", "c"]` and `["a", "bc"]`
    /// produce different digests.
    pub fn digest(&self, parts: &[&[u8]]) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        if let [single] = parts {
            hasher.update(single);
        } else {
            for part in parts {
                hasher.update(&(part.len() as u64).to_be_bytes());
                hasher.update(part);
            }
        }
        *hasher.finalize().as_bytes()
    }
}
