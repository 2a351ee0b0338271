//! # DEX Error Types
//!
//! One variant per rejectable condition. Invariant-class errors are
//! escalated by the runtime into a breaker trip that persists even though
//! the failing operation's scope is discarded.

use shared_types::{ChainError, Denom, ErrorKind};
use thiserror::Error;

use paw_store::{LedgerError, StoreError};

/// Errors raised by the DEX engine.
#[derive(Debug, Error)]
pub enum DexError {
    #[error("pool {pool_id} not found")]
    PoolNotFound { pool_id: u64 },

    #[error("pool for pair {token_a}/{token_b} already exists (pool {pool_id})")]
    PoolExists {
        token_a: Denom,
        token_b: Denom,
        pool_id: u64,
    },

    #[error("invalid token pair: {reason}")]
    InvalidPair { reason: String },

    #[error("amount must be positive")]
    ZeroAmount,

    #[error("denomination {denom} does not belong to pool {pool_id}")]
    DenomNotInPool { pool_id: u64, denom: Denom },

    #[error("insufficient liquidity in pool {pool_id}")]
    InsufficientLiquidity { pool_id: u64 },

    #[error("no liquidity share found for this address in pool {pool_id}")]
    ShareNotFound { pool_id: u64 },

    #[error("share amount {requested} exceeds held {held}")]
    InsufficientShares { requested: u128, held: u128 },

    #[error("slippage exceeded: output {actual} below minimum {min_out}")]
    SlippageExceeded { min_out: u128, actual: u128 },

    #[error("trade of {amount_in} exceeds {max_bps} bps of reserve {reserve}")]
    TradeTooLarge {
        amount_in: u128,
        reserve: u128,
        max_bps: u32,
    },

    #[error(
        "swap of {amount_in} exceeds {threshold_bps} bps of reserve; use commit-reveal"
    )]
    CommitRequired {
        amount_in: u128,
        threshold_bps: u32,
    },

    #[error("operation would leave a reserve below the {minimum} floor")]
    BelowMinimumReserves { minimum: u128 },

    #[error("rate limit exhausted: {used}/{limit} operations in the current window")]
    RateLimited { used: u32, limit: u32 },

    #[error("reentrant call into pool {pool_id} blocked")]
    Reentrancy { pool_id: u64 },

    #[error("circuit breaker open for {scope}")]
    BreakerOpen { scope: String },

    #[error("swap commitment not found")]
    CommitNotFound,

    #[error("duplicate swap commitment")]
    DuplicateCommit,

    #[error("commitment not yet revealable: matures at height {mature_at}")]
    CommitNotMature { mature_at: u64 },

    #[error("commitment expired at height {expiry}")]
    CommitExpired { expiry: u64 },

    #[error("reveal does not match the stored commitment")]
    CommitMismatch,

    #[error("revealed amount {amount_in} exceeds committed bound {bound}")]
    CommitBoundExceeded { amount_in: u128, bound: u128 },

    #[error("limit order {order_id} not found")]
    OrderNotFound { order_id: u64 },

    #[error("sender does not own order {order_id}")]
    NotOrderOwner { order_id: u64 },

    #[error("order expiry must be in the future")]
    OrderExpiryInPast,

    #[error("price must be positive")]
    ZeroPrice,

    #[error("batch of {got} exceeds the {max} swap limit")]
    BatchTooLarge { got: usize, max: usize },

    #[error("empty batch")]
    EmptyBatch,

    #[error("TWAP for pool {pool_id} is stale (last sample at height {last})")]
    TwapStale { pool_id: u64, last: u64 },

    /// Execution price diverged from TWAP. The runtime escalates this into
    /// a pool breaker trip before the swap's scope is discarded.
    #[error("price deviation of {deviation_bps} bps from TWAP on pool {pool_id}")]
    PriceDeviation { pool_id: u64, deviation_bps: u32 },

    #[error("no route from {from} to {to} within {max_hops} hops")]
    NoRoute {
        from: Denom,
        to: Denom,
        max_hops: usize,
    },

    #[error("unauthorized: {reason}")]
    Unauthorized { reason: String },

    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    /// Constant-product or share-conservation violation detected.
    #[error("invariant violation on pool {pool_id}: {detail}")]
    InvariantViolation { pool_id: u64, detail: String },

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ChainError for DexError {
    fn kind(&self) -> ErrorKind {
        use DexError::*;
        match self {
            PoolNotFound { .. }
            | PoolExists { .. }
            | InvalidPair { .. }
            | ZeroAmount
            | DenomNotInPool { .. }
            | OrderNotFound { .. }
            | OrderExpiryInPast
            | ZeroPrice
            | BatchTooLarge { .. }
            | EmptyBatch
            | NoRoute { .. }
            | InvalidParams(_)
            | CommitBoundExceeded { .. } => ErrorKind::Validation,
            Unauthorized { .. } | NotOrderOwner { .. } => ErrorKind::Authorization,
            InsufficientLiquidity { .. }
            | ShareNotFound { .. }
            | InsufficientShares { .. }
            | SlippageExceeded { .. }
            | TradeTooLarge { .. }
            | CommitRequired { .. }
            | BelowMinimumReserves { .. }
            | RateLimited { .. }
            | TwapStale { .. } => ErrorKind::Resource,
            Reentrancy { .. }
            | BreakerOpen { .. }
            | CommitNotFound
            | DuplicateCommit
            | CommitNotMature { .. }
            | CommitExpired { .. }
            | CommitMismatch => ErrorKind::Contention,
            PriceDeviation { .. } | InvariantViolation { .. } => ErrorKind::Invariant,
            Ledger(e) => e.kind(),
            Store(e) => e.kind(),
        }
    }

    fn remediation(&self) -> Option<String> {
        match self {
            DexError::SlippageExceeded { actual, .. } => {
                Some(format!("lower min_amount_out to at most {actual} or retry later"))
            }
            DexError::CommitRequired { .. } => {
                Some("submit via CommitSwap and reveal after the delay".into())
            }
            DexError::BreakerOpen { .. } => {
                Some("wait for circuit breaker auto-recovery".into())
            }
            DexError::RateLimited { .. } => Some("wait for the next rate window".into()),
            DexError::CommitNotMature { mature_at } => {
                Some(format!("reveal at or after height {mature_at}"))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(
            DexError::PoolNotFound { pool_id: 1 }.kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            DexError::Reentrancy { pool_id: 1 }.kind(),
            ErrorKind::Contention
        );
        assert_eq!(
            DexError::PriceDeviation {
                pool_id: 1,
                deviation_bps: 6000
            }
            .kind(),
            ErrorKind::Invariant
        );
    }

    #[test]
    fn test_remediation_mentions_actual_output() {
        let e = DexError::SlippageExceeded {
            min_out: 100,
            actual: 90,
        };
        assert!(e.remediation().unwrap().contains("90"));
    }
}
