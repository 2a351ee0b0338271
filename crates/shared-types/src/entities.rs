//! # Core Entities
//!
//! Addresses, denominations, coins, block context, and module namespaces.
//!
//! Amounts are `u128` base units throughout. Intermediate arithmetic that can
//! overflow 128 bits (AMM products) is done in `U256` by the DEX crate; the
//! types here never silently wrap.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Bech32-style account address.
///
/// The consensus runtime has already verified the signature that binds a
/// message to its sender, so at this layer an address is an opaque,
/// non-empty, ASCII identifier. Ordering is plain byte order, which makes
/// addresses usable inside store keys.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address(String);

impl Address {
    /// Maximum encoded length accepted anywhere in the system.
    pub const MAX_LEN: usize = 90;

    /// Create an address, rejecting empty or oversized input.
    pub fn new(s: impl Into<String>) -> Option<Self> {
        let s = s.into();
        if s.is_empty() || s.len() > Self::MAX_LEN || !s.is_ascii() {
            return None;
        }
        Some(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Coin denomination (e.g. `upaw`, `uusdt`).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Denom(String);

impl Denom {
    /// Create a denomination. Lowercase ASCII, 2..=32 chars.
    pub fn new(s: impl Into<String>) -> Option<Self> {
        let s = s.into();
        let ok = (2..=32).contains(&s.len())
            && s.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit());
        ok.then_some(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Denom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single-denomination amount.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub denom: Denom,
    pub amount: u128,
}

impl Coin {
    pub fn new(denom: Denom, amount: u128) -> Self {
        Self { denom, amount }
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

/// Block execution context handed to every handler.
///
/// Height and timestamp come from the committed block header; they are the
/// only time sources any module may consult.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockCtx {
    /// Height of the block being executed.
    pub height: u64,
    /// Block timestamp, Unix seconds, as agreed by consensus.
    pub time_unix: u64,
}

impl BlockCtx {
    pub fn new(height: u64, time_unix: u64) -> Self {
        Self { height, time_unix }
    }
}

/// Module namespaces.
///
/// Every persisted key begins with the owning module's namespace byte. The
/// store rejects writes whose first byte does not match the writing module.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Module {
    /// Ambient balance ledger (accounts and module accounts).
    Bank,
    /// Compute-verification marketplace.
    Compute,
    /// Constant-product decentralized exchange.
    Dex,
    /// Validator-voted price oracle.
    Oracle,
}

impl Module {
    /// Namespace byte prefixed to every key the module persists.
    pub const fn namespace(self) -> u8 {
        match self {
            Module::Bank => 0x00,
            Module::Compute => 0x01,
            Module::Dex => 0x02,
            Module::Oracle => 0x03,
        }
    }

    /// Resolve a namespace byte back to its module.
    pub const fn from_namespace(b: u8) -> Option<Self> {
        match b {
            0x00 => Some(Module::Bank),
            0x01 => Some(Module::Compute),
            0x02 => Some(Module::Dex),
            0x03 => Some(Module::Oracle),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Module::Bank => "bank",
            Module::Compute => "compute",
            Module::Dex => "dex",
            Module::Oracle => "oracle",
        }
    }

    /// The module's own account address, holder of escrowed and pooled funds.
    pub fn account(self) -> Address {
        Address(format!("paw1module{}", self.name()))
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
