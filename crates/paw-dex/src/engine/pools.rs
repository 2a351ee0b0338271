//! # Pool Lifecycle & Liquidity
//!
//! Pool creation, deposits, and withdrawals. Share conservation is updated
//! atomically with reserves: both live in the same scope, so either the
//! whole operation lands or none of it does.

use shared_types::{Address, Coin, Denom, Event, Module};

use paw_store::codec::{get_typed, put_typed};
use paw_store::{Ctx, Ledger};

use crate::algorithms::amm;
use crate::domain::entities::{LiquidityShare, Pool, TwapBuffer};
use crate::domain::errors::DexError;
use crate::domain::keys;
use crate::events;
use crate::hooks::DexHooks;

use super::DexEngine;

impl DexEngine {
    /// Create a pool seeded with the creator's initial deposit. The first
    /// `minimum_liquidity` shares are locked to the module account forever.
    pub fn create_pool(
        &self,
        ctx: &mut Ctx,
        hooks: &dyn DexHooks,
        creator: &Address,
        token_a: Denom,
        token_b: Denom,
        amount_a: u128,
        amount_b: u128,
    ) -> Result<u64, DexError> {
        if token_a == token_b {
            return Err(DexError::InvalidPair {
                reason: "identical denominations".into(),
            });
        }
        // Canonical order: token_a < token_b.
        let (token_a, token_b, amount_a, amount_b) = if token_a < token_b {
            (token_a, token_b, amount_a, amount_b)
        } else {
            (token_b, token_a, amount_b, amount_a)
        };
        let params = Self::params(ctx)?;
        if amount_a < params.minimum_reserves || amount_b < params.minimum_reserves {
            return Err(DexError::BelowMinimumReserves {
                minimum: params.minimum_reserves,
            });
        }
        let pair_key = keys::pool_by_pair_key(token_a.as_str(), token_b.as_str());
        if let Some(existing) = get_typed::<u64>(ctx.store, Module::Dex, &pair_key)? {
            return Err(DexError::PoolExists {
                token_a,
                token_b,
                pool_id: existing,
            });
        }
        let shares = amm::initial_shares(amount_a, amount_b);
        if shares <= params.minimum_liquidity {
            return Err(DexError::InsufficientLiquidity { pool_id: 0 });
        }

        ctx.scoped(|ctx| {
            let pool_id = Self::next_pool_id(ctx)?;
            let module_account = Module::Dex.account();
            Ledger::transfer(
                ctx.store,
                creator,
                &module_account,
                &[
                    Coin::new(token_a.clone(), amount_a),
                    Coin::new(token_b.clone(), amount_b),
                ],
            )?;

            let pool = Pool {
                id: pool_id,
                token_a: token_a.clone(),
                token_b: token_b.clone(),
                reserve_a: amount_a,
                reserve_b: amount_b,
                total_shares: shares,
                swap_fee_bps: params.swap_fee_bps,
                created_height: ctx.block.height,
            };
            Self::save_pool(ctx, &pool)?;
            put_typed(ctx.store, Module::Dex, pair_key.clone(), &pool_id)?;

            // Permanently locked dust share, held by the module itself.
            Self::write_share(
                ctx,
                pool_id,
                &module_account,
                params.minimum_liquidity,
                ctx.block.height,
            )?;
            Self::write_share(
                ctx,
                pool_id,
                creator,
                shares - params.minimum_liquidity,
                ctx.block.height,
            )?;

            let mut twap = TwapBuffer::default();
            twap.record(ctx.block.height, pool.spot_price_micro());
            Self::save_twap(ctx, pool_id, &twap)?;
            Self::mark_routes_dirty(ctx)?;

            ctx.emit(
                Event::new(events::POOL_CREATED)
                    .attr("pool_id", pool_id)
                    .attr("token_a", &token_a)
                    .attr("token_b", &token_b)
                    .attr("creator", creator),
            );
            hooks.after_pool_created(ctx, &pool)?;
            tracing::info!(pool_id, %token_a, %token_b, "pool created");
            Ok(pool_id)
        })
    }

    /// Deposit both tokens and mint shares at the limiting ratio.
    pub fn add_liquidity(
        &self,
        ctx: &mut Ctx,
        hooks: &dyn DexHooks,
        provider: &Address,
        pool_id: u64,
        amount_a: u128,
        amount_b: u128,
    ) -> Result<u128, DexError> {
        if amount_a == 0 || amount_b == 0 {
            return Err(DexError::ZeroAmount);
        }
        ctx.scoped(|ctx| {
            let mut pool = Self::load_pool(ctx, pool_id)?;
            let minted = amm::shares_for_deposit(
                pool.total_shares,
                pool.reserve_a,
                pool.reserve_b,
                amount_a,
                amount_b,
            );
            if minted == 0 {
                return Err(DexError::InsufficientLiquidity { pool_id });
            }
            Ledger::transfer(
                ctx.store,
                provider,
                &Module::Dex.account(),
                &[
                    Coin::new(pool.token_a.clone(), amount_a),
                    Coin::new(pool.token_b.clone(), amount_b),
                ],
            )?;
            pool.reserve_a += amount_a;
            pool.reserve_b += amount_b;
            pool.total_shares += minted;
            Self::save_pool(ctx, &pool)?;

            let held = Self::share_of(ctx, pool_id, provider)?;
            Self::write_share(ctx, pool_id, provider, held + minted, ctx.block.height)?;

            ctx.emit(
                Event::new(events::LIQUIDITY_ADDED)
                    .attr("pool_id", pool_id)
                    .attr("provider", provider)
                    .attr("shares", minted),
            );
            hooks.after_liquidity_changed(ctx, pool_id, provider)?;
            Ok(minted)
        })
    }

    /// Burn shares and withdraw pro-rata, keeping both reserves at or above
    /// the configured floor. Withdrawal within the flash-loan protection
    /// window of the provider's last action is refused.
    pub fn remove_liquidity(
        &self,
        ctx: &mut Ctx,
        hooks: &dyn DexHooks,
        provider: &Address,
        pool_id: u64,
        shares: u128,
    ) -> Result<(u128, u128), DexError> {
        if shares == 0 {
            return Err(DexError::ZeroAmount);
        }
        ctx.scoped(|ctx| {
            let mut pool = Self::load_pool(ctx, pool_id)?;
            let params = Self::params(ctx)?;
            let record = get_typed::<LiquidityShare>(
                ctx.store,
                Module::Dex,
                &keys::share_key(pool_id, provider),
            )?
            .ok_or(DexError::ShareNotFound { pool_id })?;
            if shares > record.shares {
                return Err(DexError::InsufficientShares {
                    requested: shares,
                    held: record.shares,
                });
            }
            if ctx.block.height
                < record.last_action_height + params.flash_loan_protection_blocks
            {
                return Err(DexError::Unauthorized {
                    reason: format!(
                        "liquidity locked until height {}",
                        record.last_action_height + params.flash_loan_protection_blocks
                    ),
                });
            }
            let (out_a, out_b) =
                amm::withdraw_amounts(pool.total_shares, pool.reserve_a, pool.reserve_b, shares);
            if out_a == 0 && out_b == 0 {
                return Err(DexError::ZeroAmount);
            }
            let next_a = pool.reserve_a - out_a;
            let next_b = pool.reserve_b - out_b;
            if next_a < params.minimum_reserves || next_b < params.minimum_reserves {
                return Err(DexError::BelowMinimumReserves {
                    minimum: params.minimum_reserves,
                });
            }
            pool.reserve_a = next_a;
            pool.reserve_b = next_b;
            pool.total_shares -= shares;
            Self::save_pool(ctx, &pool)?;
            Self::write_share(
                ctx,
                pool_id,
                provider,
                record.shares - shares,
                ctx.block.height,
            )?;
            Ledger::transfer(
                ctx.store,
                &Module::Dex.account(),
                provider,
                &[
                    Coin::new(pool.token_a.clone(), out_a),
                    Coin::new(pool.token_b.clone(), out_b),
                ],
            )?;
            ctx.emit(
                Event::new(events::LIQUIDITY_REMOVED)
                    .attr("pool_id", pool_id)
                    .attr("provider", provider)
                    .attr("shares", shares),
            );
            hooks.after_liquidity_changed(ctx, pool_id, provider)?;
            Ok((out_a, out_b))
        })
    }

    pub(crate) fn share_of(
        ctx: &Ctx,
        pool_id: u64,
        owner: &Address,
    ) -> Result<u128, DexError> {
        Ok(get_typed::<LiquidityShare>(
            ctx.store,
            Module::Dex,
            &keys::share_key(pool_id, owner),
        )?
        .map(|s| s.shares)
        .unwrap_or(0))
    }

    /// Write or clear a share record; zero-share records are deleted.
    fn write_share(
        ctx: &mut Ctx,
        pool_id: u64,
        owner: &Address,
        shares: u128,
        height: u64,
    ) -> Result<(), DexError> {
        let key = keys::share_key(pool_id, owner);
        if shares == 0 {
            ctx.store.delete(Module::Dex, key)?;
        } else {
            let record = LiquidityShare {
                pool_id,
                owner: owner.clone(),
                shares,
                last_action_height: height,
            };
            put_typed(ctx.store, Module::Dex, key, &record)?;
        }
        Ok(())
    }

    /// Share-conservation check used by tests and genesis import:
    /// the per-holder sum must equal the pool's total.
    pub fn check_share_conservation(ctx: &Ctx, pool_id: u64) -> Result<(), DexError> {
        let pool = Self::load_pool(ctx, pool_id)?;
        let held: u128 = ctx
            .store
            .range(Module::Dex, &keys::share_prefix(pool_id))?
            .into_iter()
            .filter_map(|(_, v)| bincode::deserialize::<LiquidityShare>(&v).ok())
            .map(|s| s.shares)
            .sum();
        if held != pool.total_shares {
            return Err(DexError::InvariantViolation {
                pool_id,
                detail: format!("share sum {held} != total {}", pool.total_shares),
            });
        }
        Ok(())
    }
}
