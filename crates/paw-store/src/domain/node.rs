//! # Tree Nodes
//!
//! Node model for the versioned Merkle tree. Nodes are immutable once
//! hashed and are stored in the backend keyed by their hash, so identical
//! subtrees are shared across versions for free.
//!
//! ## Hashing
//!
//! Each node hash is a SHA-256 digest over a canonical, length-prefixed
//! encoding that commits to the node kind, key, version, and either the
//! value digest (leaves) or both child hashes (inner nodes). Two trees with
//! equal root hashes therefore hold identical data at identical versions.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// 32-byte node / root digest.
pub type Hash = [u8; 32];

/// A node of the versioned tree.
///
/// Leaves carry the data; inner nodes carry the split key (the smallest key
/// reachable in their right subtree), so lookups compare against `key` and
/// descend left when strictly smaller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Node {
    Leaf {
        key: Vec<u8>,
        value: Vec<u8>,
        /// Version at which this leaf was written.
        version: u64,
    },
    Inner {
        /// Smallest key of the right subtree.
        key: Vec<u8>,
        /// AVL height; leaves are height 0.
        height: u8,
        /// Number of leaves below this node.
        size: u64,
        /// Version at which this node was created.
        version: u64,
        left: Hash,
        right: Hash,
    },
}

impl Node {
    pub fn height(&self) -> u8 {
        match self {
            Node::Leaf { .. } => 0,
            Node::Inner { height, .. } => *height,
        }
    }

    pub fn size(&self) -> u64 {
        match self {
            Node::Leaf { .. } => 1,
            Node::Inner { size, .. } => *size,
        }
    }

    pub fn key(&self) -> &[u8] {
        match self {
            Node::Leaf { key, .. } => key,
            Node::Inner { key, .. } => key,
        }
    }

    /// Canonical SHA-256 digest of this node.
    pub fn hash(&self) -> Hash {
        let mut h = Sha256::new();
        match self {
            Node::Leaf { key, value, version } => {
                h.update([0x00]);
                h.update(version.to_be_bytes());
                h.update((key.len() as u32).to_be_bytes());
                h.update(key);
                let value_digest: Hash = Sha256::digest(value).into();
                h.update(value_digest);
            }
            Node::Inner {
                key,
                height,
                size,
                version,
                left,
                right,
            } => {
                h.update([0x01]);
                h.update([*height]);
                h.update(size.to_be_bytes());
                h.update(version.to_be_bytes());
                h.update((key.len() as u32).to_be_bytes());
                h.update(key);
                h.update(left);
                h.update(right);
            }
        }
        h.finalize().into()
    }
}

/// Root hash reported for an empty tree.
pub fn empty_root() -> Hash {
    Sha256::digest(b"paw/store/empty").into()
}
