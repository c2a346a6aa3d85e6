//! # Commitment Roots
//!
//! Every consensus object commits to all of its fields through a SHA-256
//! root. Lists commit to their length followed by each element's root, so
//! reordering, truncation or a single flipped bit all change the root.

use sha2::{Digest, Sha256};

use crate::entities::Hash;

/// Types with a cryptographic commitment over all of their fields.
pub trait TreeHash {
    fn hash_tree_root(&self) -> Hash;
}

impl TreeHash for Hash {
    fn hash_tree_root(&self) -> Hash {
        *self
    }
}

impl TreeHash for u64 {
    fn hash_tree_root(&self) -> Hash {
        RootHasher::new(b"u64").u64(*self).finish()
    }
}

/// Incremental builder used by the `TreeHash` impls.
///
/// The type tag is hashed first so two objects of different types with the
/// same field bytes never share a root.
pub struct RootHasher(Sha256);

impl RootHasher {
    pub fn new(type_tag: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update((type_tag.len() as u64).to_le_bytes());
        hasher.update(type_tag);
        Self(hasher)
    }

    pub fn u64(mut self, value: u64) -> Self {
        self.0.update(value.to_le_bytes());
        self
    }

    pub fn bool(mut self, value: bool) -> Self {
        self.0.update([value as u8]);
        self
    }

    pub fn root(mut self, root: &Hash) -> Self {
        self.0.update(root);
        self
    }

    /// Variable-length bytes, length-prefixed.
    pub fn bytes(mut self, bytes: &[u8]) -> Self {
        self.0.update((bytes.len() as u64).to_le_bytes());
        self.0.update(bytes);
        self
    }

    pub fn u64_list(mut self, values: &[u64]) -> Self {
        self.0.update((values.len() as u64).to_le_bytes());
        for value in values {
            self.0.update(value.to_le_bytes());
        }
        self
    }

    pub fn list<T: TreeHash>(mut self, items: &[T]) -> Self {
        self.0.update((items.len() as u64).to_le_bytes());
        for item in items {
            self.0.update(item.hash_tree_root());
        }
        self
    }

    pub fn finish(self) -> Hash {
        self.0.finalize().into()
    }
}

/// SHA-256 of the concatenated inputs.
pub fn sha256(chunks: &[&[u8]]) -> Hash {
    let mut hasher = Sha256::new();
    for chunk in chunks {
        hasher.update(chunk);
    }
    hasher.finalize().into()
}
