//! # In-Memory Backend
//!
//! HashMap-backed node store. Default for tests and light tooling; a
//! validator deployment uses the RocksDB adapter.

use std::collections::{BTreeMap, HashMap};

use crate::domain::node::Hash;
use crate::domain::StoreError;
use crate::ports::NodeBackend;

/// Volatile backend holding all nodes and roots in memory.
#[derive(Default)]
pub struct MemoryDb {
    nodes: HashMap<Hash, Vec<u8>>,
    roots: BTreeMap<u64, Option<Hash>>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes currently stored. Used by pruning tests.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

impl NodeBackend for MemoryDb {
    fn put_node(&mut self, hash: Hash, bytes: Vec<u8>) -> Result<(), StoreError> {
        self.nodes.insert(hash, bytes);
        Ok(())
    }

    fn get_node(&self, hash: &Hash) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.nodes.get(hash).cloned())
    }

    fn delete_node(&mut self, hash: &Hash) -> Result<(), StoreError> {
        self.nodes.remove(hash);
        Ok(())
    }

    fn node_hashes(&self) -> Result<Vec<Hash>, StoreError> {
        Ok(self.nodes.keys().copied().collect())
    }

    fn put_root(&mut self, version: u64, root: Option<Hash>) -> Result<(), StoreError> {
        self.roots.insert(version, root);
        Ok(())
    }

    fn get_root(&self, version: u64) -> Result<Option<Option<Hash>>, StoreError> {
        Ok(self.roots.get(&version).copied())
    }

    fn delete_root(&mut self, version: u64) -> Result<(), StoreError> {
        self.roots.remove(&version);
        Ok(())
    }

    fn root_versions(&self) -> Result<Vec<u64>, StoreError> {
        Ok(self.roots.keys().copied().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_db_round_trip() {
        let mut db = MemoryDb::new();
        let h = [7u8; 32];
        db.put_node(h, vec![1, 2, 3]).unwrap();
        assert_eq!(db.get_node(&h).unwrap(), Some(vec![1, 2, 3]));
        db.delete_node(&h).unwrap();
        assert_eq!(db.get_node(&h).unwrap(), None);
    }

    #[test]
    fn test_memory_db_roots() {
        let mut db = MemoryDb::new();
        db.put_root(1, Some([1u8; 32])).unwrap();
        db.put_root(2, None).unwrap();
        assert_eq!(db.get_root(1).unwrap(), Some(Some([1u8; 32])));
        assert_eq!(db.get_root(2).unwrap(), Some(None));
        assert_eq!(db.get_root(3).unwrap(), None);
        assert_eq!(db.root_versions().unwrap(), vec![1, 2]);
    }
}
