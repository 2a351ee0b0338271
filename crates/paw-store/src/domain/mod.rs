//! Core store domain: node model, versioned tree, multi-store, errors.

pub mod errors;
pub mod multistore;
pub mod node;
pub mod tree;

pub use errors::StoreError;
pub use multistore::{MultiStore, StoreConfig};
pub use node::{Hash, Node};
pub use tree::VersionedTree;
