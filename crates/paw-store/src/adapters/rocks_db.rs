//! # RocksDB Backend
//!
//! Durable node store for validator deployments. Layout:
//!
//! - `n:<hash>` → encoded node
//! - `r:<version_be>` → root marker (`0x00` empty, `0x01 || hash`)

use rocksdb::{Direction, IteratorMode, DB};
use std::path::Path;

use crate::domain::node::Hash;
use crate::domain::StoreError;
use crate::ports::NodeBackend;

const NODE_PREFIX: u8 = b'n';
const ROOT_PREFIX: u8 = b'r';

/// RocksDB-backed node store.
pub struct RocksDb {
    db: DB,
}

impl RocksDb {
    /// Open (or create) the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db = DB::open_default(path).map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(Self { db })
    }

    fn node_key(hash: &Hash) -> Vec<u8> {
        let mut k = Vec::with_capacity(34);
        k.push(NODE_PREFIX);
        k.push(b':');
        k.extend_from_slice(hash);
        k
    }

    fn root_key(version: u64) -> Vec<u8> {
        let mut k = Vec::with_capacity(10);
        k.push(ROOT_PREFIX);
        k.push(b':');
        k.extend_from_slice(&version.to_be_bytes());
        k
    }
}

impl NodeBackend for RocksDb {
    fn put_node(&mut self, hash: Hash, bytes: Vec<u8>) -> Result<(), StoreError> {
        self.db
            .put(Self::node_key(&hash), bytes)
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    fn get_node(&self, hash: &Hash) -> Result<Option<Vec<u8>>, StoreError> {
        self.db
            .get(Self::node_key(hash))
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    fn delete_node(&mut self, hash: &Hash) -> Result<(), StoreError> {
        self.db
            .delete(Self::node_key(hash))
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    fn node_hashes(&self) -> Result<Vec<Hash>, StoreError> {
        let mode = IteratorMode::From(&[NODE_PREFIX, b':'], Direction::Forward);
        let mut out = Vec::new();
        for item in self.db.iterator(mode) {
            let (key, _) = item.map_err(|e| StoreError::Backend(e.to_string()))?;
            if key.first() != Some(&NODE_PREFIX) {
                break;
            }
            if key.len() == 34 {
                let mut h = [0u8; 32];
                h.copy_from_slice(&key[2..]);
                out.push(h);
            }
        }
        Ok(out)
    }

    fn put_root(&mut self, version: u64, root: Option<Hash>) -> Result<(), StoreError> {
        let mut value = Vec::with_capacity(33);
        match root {
            None => value.push(0x00),
            Some(h) => {
                value.push(0x01);
                value.extend_from_slice(&h);
            }
        }
        self.db
            .put(Self::root_key(version), value)
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    fn get_root(&self, version: u64) -> Result<Option<Option<Hash>>, StoreError> {
        let raw = self
            .db
            .get(Self::root_key(version))
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        match raw {
            None => Ok(None),
            Some(v) if v.first() == Some(&0x00) => Ok(Some(None)),
            Some(v) if v.len() == 33 && v[0] == 0x01 => {
                let mut h = [0u8; 32];
                h.copy_from_slice(&v[1..]);
                Ok(Some(Some(h)))
            }
            Some(v) => Err(StoreError::Backend(format!(
                "corrupt root marker for version {version}: {} bytes",
                v.len()
            ))),
        }
    }

    fn delete_root(&mut self, version: u64) -> Result<(), StoreError> {
        self.db
            .delete(Self::root_key(version))
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    fn root_versions(&self) -> Result<Vec<u64>, StoreError> {
        let mode = IteratorMode::From(&[ROOT_PREFIX, b':'], Direction::Forward);
        let mut out = Vec::new();
        for item in self.db.iterator(mode) {
            let (key, _) = item.map_err(|e| StoreError::Backend(e.to_string()))?;
            if key.first() != Some(&ROOT_PREFIX) {
                break;
            }
            if key.len() == 10 {
                let mut be = [0u8; 8];
                be.copy_from_slice(&key[2..]);
                out.push(u64::from_be_bytes(be));
            }
        }
        Ok(out)
    }
}
