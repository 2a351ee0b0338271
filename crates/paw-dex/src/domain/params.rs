//! # DEX Parameters
//!
//! Governance-mutable module parameters. `minimum_liquidity` is immutable
//! after genesis; the update path rejects changes to it.

use serde::{Deserialize, Serialize};
use shared_types::Denom;

/// All DEX parameters, stored as one record under the params key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DexParams {
    /// Default swap fee for new pools, basis points.
    pub swap_fee_bps: u32,
    /// Share of each swap fee diverted to the protocol, basis points of the
    /// fee itself. Zero keeps the whole fee in reserves for LPs.
    pub protocol_fee_share_bps: u32,
    /// Circuit breaker auto-recovery delay, seconds of block time.
    pub circuit_breaker_duration_secs: u64,
    /// Shares permanently locked to the pool on first deposit.
    /// Immutable after genesis.
    pub minimum_liquidity: u128,
    /// Floor each reserve must keep after any operation.
    pub minimum_reserves: u128,
    /// TWAP window used for the flash-loan deviation check, blocks.
    pub flash_loan_protection_blocks: u64,
    /// Order-matching iteration budget per block.
    pub max_liquidity_iterations: u32,
    /// Guarded operations allowed per caller per window.
    pub rate_limit_ops: u32,
    /// Rate-limit window length, blocks.
    pub rate_limit_window_blocks: u64,
    /// Swaps above this fraction of the input reserve (bps) must use
    /// commit–reveal.
    pub large_swap_fraction_bps: u32,
    /// Hard cap on any single trade as a fraction of the input reserve (bps).
    pub max_trade_fraction_bps: u32,
    /// Blocks from commit to expiry.
    pub commit_expiry_blocks: u64,
    /// Minimum blocks between commit and reveal.
    pub commit_reveal_delay_blocks: u64,
    /// Deposit required with each commitment.
    pub commit_deposit_amount: u128,
    pub commit_deposit_denom: Denom,
    /// Fee retained when a commitment is cancelled before expiry.
    pub commit_cancel_fee: u128,
    /// Reentrancy locks self-heal after this many blocks.
    pub lock_expiration_blocks: u64,
    /// A TWAP older than this many blocks is rejected as a price source.
    pub twap_max_staleness_blocks: u64,
    /// Deviation from TWAP (bps) beyond which the pool breaker trips.
    pub twap_deviation_limit_bps: u32,
    /// Expired orders archived per block in the end blocker.
    pub order_archive_per_block: u32,
    /// Archived orders retained this many blocks (30 days at 6s blocks).
    pub order_retention_blocks: u64,
    /// Maximum swaps in one batch message.
    pub max_batch_swaps: usize,
}

impl Default for DexParams {
    fn default() -> Self {
        Self {
            swap_fee_bps: 30,
            protocol_fee_share_bps: 0,
            circuit_breaker_duration_secs: 3_600,
            minimum_liquidity: 1_000,
            minimum_reserves: 1_000_000,
            flash_loan_protection_blocks: 100,
            max_liquidity_iterations: 10_000,
            rate_limit_ops: 10,
            rate_limit_window_blocks: 100,
            large_swap_fraction_bps: 500,
            max_trade_fraction_bps: 5_000,
            commit_expiry_blocks: 50,
            commit_reveal_delay_blocks: 2,
            commit_deposit_amount: 1_000_000,
            commit_deposit_denom: Denom::new("upaw").expect("static denom"),
            commit_cancel_fee: 10_000,
            lock_expiration_blocks: 2,
            twap_max_staleness_blocks: 100,
            twap_deviation_limit_bps: 5_000,
            order_archive_per_block: 50,
            order_retention_blocks: 432_000,
            max_batch_swaps: 10,
        }
    }
}

impl DexParams {
    /// Structural validation applied at genesis and on every update.
    pub fn validate(&self) -> Result<(), String> {
        if self.swap_fee_bps >= 10_000 {
            return Err("swap fee must be below 100%".into());
        }
        if self.protocol_fee_share_bps > 10_000 {
            return Err("protocol fee share cannot exceed 100%".into());
        }
        if self.minimum_liquidity == 0 {
            return Err("minimum liquidity must be positive".into());
        }
        if self.minimum_reserves == 0 {
            return Err("minimum reserves must be positive".into());
        }
        if self.large_swap_fraction_bps == 0 || self.large_swap_fraction_bps > 10_000 {
            return Err("large swap fraction must be within (0, 100%]".into());
        }
        if self.max_trade_fraction_bps < self.large_swap_fraction_bps {
            return Err("max trade fraction cannot be below the commit threshold".into());
        }
        if self.commit_reveal_delay_blocks >= self.commit_expiry_blocks {
            return Err("reveal delay must be shorter than commit expiry".into());
        }
        if self.rate_limit_window_blocks == 0 || self.rate_limit_ops == 0 {
            return Err("rate limit window and budget must be positive".into());
        }
        if self.max_batch_swaps == 0 {
            return Err("batch size must be positive".into());
        }
        Ok(())
    }

    /// Governance update guard: fields immutable after genesis.
    pub fn check_update(&self, next: &DexParams) -> Result<(), String> {
        if self.minimum_liquidity != next.minimum_liquidity {
            return Err("minimum_liquidity is immutable after genesis".into());
        }
        next.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_valid() {
        DexParams::default().validate().unwrap();
    }

    #[test]
    fn test_minimum_liquidity_immutable() {
        let base = DexParams::default();
        let mut next = base.clone();
        next.minimum_liquidity += 1;
        assert!(base.check_update(&next).is_err());
        next.minimum_liquidity = base.minimum_liquidity;
        next.swap_fee_bps = 50;
        base.check_update(&next).unwrap();
    }

    #[test]
    fn test_reveal_delay_bound() {
        let mut p = DexParams::default();
        p.commit_reveal_delay_blocks = p.commit_expiry_blocks;
        assert!(p.validate().is_err());
    }
}
