//! # Store Error Types
//!
//! Every store failure is classified: most are validation-grade and surface
//! to the caller; a commit failure is fatal because a half-committed version
//! could diverge the chain.

use shared_types::{ChainError, ErrorKind, Module};
use thiserror::Error;

/// Errors raised by the keyed store layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A key's namespace byte does not match the module performing the
    /// access. This is a programming error in the calling module and is
    /// treated as an invariant violation.
    #[error("namespace violation: module {module} touched key 0x{}", hex::encode(key))]
    NamespaceViolation { module: Module, key: Vec<u8> },

    /// A key was submitted without a namespace byte.
    #[error("empty key")]
    EmptyKey,

    /// Referenced tree node is missing from the backend. Data corruption.
    #[error("missing tree node {}", hex::encode(hash))]
    MissingNode { hash: [u8; 32] },

    /// Requested version is not available (pruned or never committed).
    #[error("version {version} not found (latest {latest})")]
    VersionNotFound { version: u64, latest: u64 },

    /// `commit_version` was called with open cache scopes.
    /// The orchestrator must resolve every scope before committing.
    #[error("commit with {open} open cache scope(s)")]
    OpenScopes { open: usize },

    /// Scope stack underflow: commit/discard without a matching begin.
    #[error("no open cache scope")]
    NoOpenScope,

    /// The persistence backend failed. Fatal: the node halts rather than
    /// commit a partial state.
    #[error("backend failure: {0}")]
    Backend(String),

    /// Value failed to decode as its expected entity type.
    #[error("corrupt value under key 0x{}: {reason}", hex::encode(key))]
    CorruptValue { key: Vec<u8>, reason: String },
}

impl ChainError for StoreError {
    fn kind(&self) -> ErrorKind {
        match self {
            StoreError::NamespaceViolation { .. } => ErrorKind::Invariant,
            StoreError::EmptyKey => ErrorKind::Validation,
            StoreError::VersionNotFound { .. } => ErrorKind::Validation,
            StoreError::NoOpenScope => ErrorKind::Invariant,
            StoreError::MissingNode { .. }
            | StoreError::OpenScopes { .. }
            | StoreError::Backend(_)
            | StoreError::CorruptValue { .. } => ErrorKind::Fatal,
        }
    }
}
