//! # Node Backend Port
//!
//! Persistence interface for tree nodes and version roots. The tree writes
//! encoded nodes keyed by hash and a root pointer per committed version.
//! Adapters must be durable and must return exactly the bytes written;
//! the tree verifies nothing beyond decode success.

use crate::domain::node::Hash;
use crate::domain::StoreError;

/// Persistence backend for the versioned tree.
pub trait NodeBackend: Send {
    /// Store an encoded node under its hash. Writing the same hash twice
    /// with different bytes is a corruption bug in the caller.
    fn put_node(&mut self, hash: Hash, bytes: Vec<u8>) -> Result<(), StoreError>;

    /// Fetch an encoded node.
    fn get_node(&self, hash: &Hash) -> Result<Option<Vec<u8>>, StoreError>;

    /// Remove a node (pruning sweep only).
    fn delete_node(&mut self, hash: &Hash) -> Result<(), StoreError>;

    /// All stored node hashes. Used by the pruning mark-and-sweep.
    fn node_hashes(&self) -> Result<Vec<Hash>, StoreError>;

    /// Record the root for a committed version. `None` marks an empty tree.
    fn put_root(&mut self, version: u64, root: Option<Hash>) -> Result<(), StoreError>;

    /// Fetch the root recorded for a version.
    fn get_root(&self, version: u64) -> Result<Option<Option<Hash>>, StoreError>;

    /// Remove the root pointer of a pruned version.
    fn delete_root(&mut self, version: u64) -> Result<(), StoreError>;

    /// All versions with a recorded root, ascending.
    fn root_versions(&self) -> Result<Vec<u64>, StoreError>;
}
