//! # Events
//!
//! Typed event records emitted by handlers and block hooks. Events are not
//! state: they are collected per block, exposed to operators, and dropped
//! with a discarded scope if the emitting operation fails.

use serde::{Deserialize, Serialize};

/// A single emitted event: a kind tag plus ordered key/value attributes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub kind: String,
    pub attributes: Vec<(String, String)>,
}

impl Event {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            attributes: Vec::new(),
        }
    }

    /// Append an attribute, builder-style.
    pub fn attr(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.attributes.push((key.into(), value.to_string()));
        self
    }

    /// Look up the first attribute with the given key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Event kinds with cross-module meaning. Module-local kinds are plain
/// strings defined next to their emitters.
pub mod kinds {
    /// Emitted by the runtime when a begin/end blocker reports an error.
    pub const BLOCKER_ERROR: &str = "abci_blocker_error";
    /// Emitted by the oracle when aggregation served a fallback tier.
    pub const ORACLE_FALLBACK: &str = "oracle_fallback";
}
