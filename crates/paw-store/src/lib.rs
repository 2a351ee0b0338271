//! # paw-store
//!
//! The deterministic state engine every PAW module runs on.
//!
//! ## Role in System
//!
//! - **Single Source of Truth**: all persistent module state lives here.
//! - **Namespace partition**: every key begins with the owning module's
//!   namespace byte; the store rejects out-of-namespace access.
//! - **Versioned Merkle tree**: the root hash after applying block N is the
//!   block's application hash, identical on every validator.
//! - **Cache scopes**: nested transactional overlays are the only rollback
//!   primitive in the system; there are no compensating writes anywhere.
//!
//! ## Determinism
//!
//! The tree is keyed by full binary keys in lexicographic order, mutations
//! are applied in sorted order at commit, and node hashes commit to key,
//! value, children, and version. Nothing in this crate consults a clock,
//! an RNG, or unordered map iteration.

pub mod adapters;
pub mod codec;
pub mod ctx;
pub mod domain;
pub mod ledger;
pub mod ports;

pub use ctx::Ctx;
pub use domain::errors::StoreError;
pub use domain::multistore::{MultiStore, StoreConfig};
pub use domain::node::Hash;
pub use ledger::{Ledger, LedgerError};
