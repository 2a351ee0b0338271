//! # paw-dex
//!
//! Constant-product decentralized exchange.
//!
//! ## Role in System
//!
//! - Pool lifecycle, liquidity shares, swap execution (direct, batched,
//!   multi-hop), limit orders, and fee accounting.
//! - Commit–reveal pipeline for large swaps (MEV resistance).
//! - Defensive layer: reentrancy locks, per-caller rate limits, per-pool and
//!   global circuit breakers, TWAP price sanity.
//!
//! ## State
//!
//! Everything lives under namespace `0x02` in the multi-store; sub-prefixes
//! are defined in [`domain::keys`]. All mutations run inside the caller's
//! cache scope and roll back atomically on error.

pub mod algorithms;
pub mod domain;
pub mod engine;
pub mod events;
pub mod hooks;
pub mod msgs;
pub mod queries;

pub use domain::entities::{LimitOrder, OrderDirection, Pool, SwapCommitment};
pub use domain::errors::DexError;
pub use domain::params::DexParams;
pub use engine::DexEngine;
pub use hooks::{DexHooks, NoDexHooks, SwapFill};
pub use msgs::DexMsg;
