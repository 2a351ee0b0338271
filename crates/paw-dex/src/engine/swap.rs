//! # Swap Execution
//!
//! Guard order is fixed: breakers → rate limit → reentrancy lock → size
//! bounds → pricing → reserve floor → TWAP deviation. A deviation beyond
//! the limit surfaces as an invariant-class error that the runtime
//! escalates into a persistent breaker trip even though the swap itself
//! rolls back.

use primitive_types::U256;
use shared_types::{Address, Coin, Denom, Event, Module};

use paw_store::{Ctx, Ledger};

use crate::algorithms::amm::{self, BPS};
use crate::domain::errors::DexError;
use crate::domain::params::DexParams;
use crate::events;
use crate::hooks::{DexHooks, SwapFill};

use super::DexEngine;

/// One requested swap.
#[derive(Clone, Debug)]
pub struct SwapSpec {
    pub trader: Address,
    pub pool_id: u64,
    pub token_in: Denom,
    pub amount_in: u128,
    pub min_amount_out: u128,
}

impl DexEngine {
    /// Execute a direct swap with every guard applied.
    pub fn swap(
        &self,
        ctx: &mut Ctx,
        hooks: &dyn DexHooks,
        spec: &SwapSpec,
    ) -> Result<SwapFill, DexError> {
        let params = Self::params(ctx)?;
        Self::check_breakers(ctx, spec.pool_id, &params)?;
        ctx.scoped(|ctx| {
            Self::charge_rate(ctx, &spec.trader, &params)?;
            Self::with_pool_lock(ctx, spec.pool_id, &params, |ctx| {
                self.execute_swap(ctx, hooks, spec, &params, false)
            })
        })
    }

    /// Up to `max_batch_swaps` swaps, all-or-nothing.
    pub fn batch_swap(
        &self,
        ctx: &mut Ctx,
        hooks: &dyn DexHooks,
        swaps: &[SwapSpec],
    ) -> Result<Vec<SwapFill>, DexError> {
        let params = Self::params(ctx)?;
        if swaps.is_empty() {
            return Err(DexError::EmptyBatch);
        }
        if swaps.len() > params.max_batch_swaps {
            return Err(DexError::BatchTooLarge {
                got: swaps.len(),
                max: params.max_batch_swaps,
            });
        }
        ctx.scoped(|ctx| {
            let mut fills = Vec::with_capacity(swaps.len());
            for spec in swaps {
                fills.push(self.swap(ctx, hooks, spec)?);
            }
            Ok(fills)
        })
    }

    /// Core pricing and settlement. Runs under the pool lock; `via_commit`
    /// marks reveals, which are exempt from the commit-reveal size gate but
    /// not from any other guard.
    pub(crate) fn execute_swap(
        &self,
        ctx: &mut Ctx,
        hooks: &dyn DexHooks,
        spec: &SwapSpec,
        params: &DexParams,
        via_commit: bool,
    ) -> Result<SwapFill, DexError> {
        if spec.amount_in == 0 {
            return Err(DexError::ZeroAmount);
        }
        let mut pool = Self::load_pool(ctx, spec.pool_id)?;
        let token_out = pool
            .other_side(&spec.token_in)
            .ok_or_else(|| DexError::DenomNotInPool {
                pool_id: spec.pool_id,
                denom: spec.token_in.clone(),
            })?
            .clone();
        let in_is_a = spec.token_in == pool.token_a;
        let (reserve_in, reserve_out) = if in_is_a {
            (pool.reserve_a, pool.reserve_b)
        } else {
            (pool.reserve_b, pool.reserve_a)
        };

        let scaled_in = U256::from(spec.amount_in) * U256::from(BPS);
        if !via_commit
            && scaled_in > U256::from(reserve_in) * U256::from(params.large_swap_fraction_bps)
        {
            return Err(DexError::CommitRequired {
                amount_in: spec.amount_in,
                threshold_bps: params.large_swap_fraction_bps,
            });
        }
        if scaled_in > U256::from(reserve_in) * U256::from(params.max_trade_fraction_bps) {
            return Err(DexError::TradeTooLarge {
                amount_in: spec.amount_in,
                reserve: reserve_in,
                max_bps: params.max_trade_fraction_bps,
            });
        }

        let amount_out =
            amm::swap_output(reserve_in, reserve_out, spec.amount_in, pool.swap_fee_bps);
        if amount_out == 0 {
            return Err(DexError::InsufficientLiquidity {
                pool_id: spec.pool_id,
            });
        }
        if amount_out < spec.min_amount_out {
            return Err(DexError::SlippageExceeded {
                min_out: spec.min_amount_out,
                actual: amount_out,
            });
        }
        if reserve_out - amount_out < params.minimum_reserves {
            return Err(DexError::BelowMinimumReserves {
                minimum: params.minimum_reserves,
            });
        }

        // Protocol's cut of the swap fee leaves the reserves.
        let fee_total = (U256::from(spec.amount_in) * U256::from(pool.swap_fee_bps)
            / U256::from(BPS))
        .as_u128();
        let protocol_cut = (U256::from(fee_total) * U256::from(params.protocol_fee_share_bps)
            / U256::from(BPS))
        .as_u128();

        let new_in = reserve_in + spec.amount_in - protocol_cut;
        let new_out = reserve_out - amount_out;

        // Constant-product bound with truncation slack:
        // x'·y' ≥ x·y·(1−f)².
        let fee_keep = U256::from(BPS - pool.swap_fee_bps as u128);
        let lhs = U256::from(new_in) * U256::from(new_out) * U256::from(BPS) * U256::from(BPS);
        let rhs = U256::from(reserve_in) * U256::from(reserve_out) * fee_keep * fee_keep;
        if lhs < rhs {
            return Err(DexError::InvariantViolation {
                pool_id: spec.pool_id,
                detail: "constant product decreased beyond fee bound".into(),
            });
        }

        if in_is_a {
            pool.reserve_a = new_in;
            pool.reserve_b = new_out;
        } else {
            pool.reserve_b = new_in;
            pool.reserve_a = new_out;
        }

        // Deviation gate runs before any write lands.
        let new_spot = pool.spot_price_micro();
        let twap = Self::load_twap(ctx, spec.pool_id)?
            .average(ctx.block.height, params.flash_loan_protection_blocks);
        if let Some(twap) = twap {
            if twap > 0 {
                let diff = new_spot.abs_diff(twap);
                let deviation_bps = diff.saturating_mul(BPS) / twap;
                if deviation_bps > params.twap_deviation_limit_bps as u128 {
                    return Err(DexError::PriceDeviation {
                        pool_id: spec.pool_id,
                        deviation_bps: deviation_bps.min(u32::MAX as u128) as u32,
                    });
                }
            }
        }

        let module_account = Module::Dex.account();
        Ledger::transfer(
            ctx.store,
            &spec.trader,
            &module_account,
            &[Coin::new(spec.token_in.clone(), spec.amount_in)],
        )?;
        Ledger::transfer(
            ctx.store,
            &module_account,
            &spec.trader,
            &[Coin::new(token_out.clone(), amount_out)],
        )?;
        Self::accrue_protocol_fee(ctx, spec.token_in.as_str(), protocol_cut)?;
        Self::save_pool(ctx, &pool)?;

        let mut twap_buf = Self::load_twap(ctx, spec.pool_id)?;
        twap_buf.record(ctx.block.height, new_spot);
        Self::save_twap(ctx, spec.pool_id, &twap_buf)?;

        ctx.emit(
            Event::new(events::SWAP)
                .attr("pool_id", spec.pool_id)
                .attr("trader", &spec.trader)
                .attr("token_in", &spec.token_in)
                .attr("amount_in", spec.amount_in)
                .attr("token_out", &token_out)
                .attr("amount_out", amount_out),
        );
        let fill = SwapFill {
            pool_id: spec.pool_id,
            trader: spec.trader.clone(),
            token_in: spec.token_in.clone(),
            amount_in: spec.amount_in,
            token_out,
            amount_out,
            spot_price_micro: new_spot,
        };
        hooks.after_swap(ctx, &fill)?;

        // The price moved; fill any resting orders it crossed.
        self.match_pool_orders(ctx, spec.pool_id, params)?;
        Ok(fill)
    }
}
