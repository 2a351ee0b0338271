//! # Limit Orders
//!
//! A per-pool book keyed so ascending scans visit the best price first.
//! Orders execute against the pool itself when the spot price crosses their
//! limit; input funds are escrowed with the module at placement, so a fill
//! only moves the output leg. Expired orders are archived in bounded
//! batches by the end blocker and pruned after the retention window.

use shared_types::{Address, Coin, Event, Module};

use paw_store::codec::{get_typed, put_typed};
use paw_store::{Ctx, Ledger};

use crate::algorithms::amm::{self, BPS};
use crate::domain::entities::{
    ArchiveReason, ArchivedOrder, LimitOrder, OrderDirection, PRICE_SCALE,
};
use crate::domain::errors::DexError;
use crate::domain::keys;
use crate::domain::params::DexParams;
use crate::events;

use super::DexEngine;

impl DexEngine {
    /// Place a limit order, escrowing the input amount.
    pub fn place_limit_order(
        &self,
        ctx: &mut Ctx,
        owner: &Address,
        pool_id: u64,
        direction: OrderDirection,
        amount_in: u128,
        price_micro: u128,
        expiry_height: u64,
    ) -> Result<u64, DexError> {
        if amount_in == 0 {
            return Err(DexError::ZeroAmount);
        }
        if price_micro == 0 {
            return Err(DexError::ZeroPrice);
        }
        if expiry_height <= ctx.block.height {
            return Err(DexError::OrderExpiryInPast);
        }
        let params = Self::params(ctx)?;
        Self::check_breakers(ctx, pool_id, &params)?;
        ctx.scoped(|ctx| {
            Self::charge_rate(ctx, owner, &params)?;
            let pool = Self::load_pool(ctx, pool_id)?;
            let token_in = match direction {
                OrderDirection::SellBase => pool.token_a.clone(),
                OrderDirection::BuyBase => pool.token_b.clone(),
            };
            Ledger::transfer(
                ctx.store,
                owner,
                &Module::Dex.account(),
                &[Coin::new(token_in, amount_in)],
            )?;
            let order_id = Self::next_order_id(ctx)?;
            let order = LimitOrder {
                id: order_id,
                owner: owner.clone(),
                pool_id,
                direction,
                amount_in,
                price_micro,
                created_height: ctx.block.height,
                expiry_height,
            };
            Self::index_order(ctx, &order)?;
            ctx.emit(
                Event::new(events::ORDER_PLACED)
                    .attr("order_id", order_id)
                    .attr("pool_id", pool_id)
                    .attr("owner", owner)
                    .attr("price_micro", price_micro),
            );
            // The order may already be marketable.
            self.match_pool_orders(ctx, pool_id, &params)?;
            Ok(order_id)
        })
    }

    /// Cancel a resting order and refund its escrow.
    pub fn cancel_limit_order(
        &self,
        ctx: &mut Ctx,
        sender: &Address,
        order_id: u64,
    ) -> Result<(), DexError> {
        ctx.scoped(|ctx| {
            let order = get_typed::<LimitOrder>(ctx.store, Module::Dex, &keys::order_key(order_id))?
                .ok_or(DexError::OrderNotFound { order_id })?;
            if order.owner != *sender {
                return Err(DexError::NotOrderOwner { order_id });
            }
            let pool = Self::load_pool(ctx, order.pool_id)?;
            let token_in = match order.direction {
                OrderDirection::SellBase => pool.token_a.clone(),
                OrderDirection::BuyBase => pool.token_b.clone(),
            };
            Ledger::transfer(
                ctx.store,
                &Module::Dex.account(),
                sender,
                &[Coin::new(token_in, order.amount_in)],
            )?;
            Self::deindex_order(ctx, &order)?;
            Self::archive_order(ctx, order, ArchiveReason::Cancelled, 0)?;
            ctx.emit(Event::new(events::ORDER_CANCELLED).attr("order_id", order_id));
            Ok(())
        })
    }

    /// Walk both book sides best-price-first and fill every marketable
    /// order, bounded by the iteration budget.
    pub(crate) fn match_pool_orders(
        &self,
        ctx: &mut Ctx,
        pool_id: u64,
        params: &DexParams,
    ) -> Result<u32, DexError> {
        let mut iterations = 0u32;
        let mut filled = 0u32;
        for direction in [OrderDirection::SellBase, OrderDirection::BuyBase] {
            loop {
                if iterations >= params.max_liquidity_iterations {
                    return Ok(filled);
                }
                iterations += 1;
                let book = ctx.store.range(
                    Module::Dex,
                    &keys::order_book_prefix(pool_id, direction.as_byte()),
                )?;
                // Best-priced live order, skipping entries expiring this block.
                let Some((_, id_bytes)) = book.into_iter().next() else {
                    break;
                };
                let order_id: u64 = bincode::deserialize(&id_bytes).map_err(|e| {
                    DexError::Store(paw_store::StoreError::CorruptValue {
                        key: keys::order_book_prefix(pool_id, direction.as_byte()),
                        reason: e.to_string(),
                    })
                })?;
                let Some(order) =
                    get_typed::<LimitOrder>(ctx.store, Module::Dex, &keys::order_key(order_id))?
                else {
                    break;
                };
                if order.expiry_height <= ctx.block.height {
                    // Leave expiry handling to the end blocker.
                    break;
                }
                if !self.try_fill_order(ctx, &order, params)? {
                    // Best order not marketable; the rest are worse.
                    break;
                }
                filled += 1;
            }
        }
        Ok(filled)
    }

    /// Fill `order` against the pool if its limit is satisfied for the full
    /// amount. Returns whether it filled.
    fn try_fill_order(
        &self,
        ctx: &mut Ctx,
        order: &LimitOrder,
        params: &DexParams,
    ) -> Result<bool, DexError> {
        let mut pool = Self::load_pool(ctx, order.pool_id)?;
        let (reserve_in, reserve_out, token_out) = match order.direction {
            OrderDirection::SellBase => {
                (pool.reserve_a, pool.reserve_b, pool.token_b.clone())
            }
            OrderDirection::BuyBase => (pool.reserve_b, pool.reserve_a, pool.token_a.clone()),
        };
        let amount_out =
            amm::swap_output(reserve_in, reserve_out, order.amount_in, pool.swap_fee_bps);
        if amount_out == 0 || reserve_out - amount_out < params.minimum_reserves {
            return Ok(false);
        }
        // Execution price in micro token_b per token_a.
        let marketable = match order.direction {
            OrderDirection::SellBase => {
                let price = amount_out.saturating_mul(PRICE_SCALE) / order.amount_in;
                price >= order.price_micro
            }
            OrderDirection::BuyBase => {
                let price = order.amount_in.saturating_mul(PRICE_SCALE) / amount_out;
                price <= order.price_micro
            }
        };
        if !marketable {
            return Ok(false);
        }
        // Constant-product sanity on the fill.
        let new_in = reserve_in + order.amount_in;
        let new_out = reserve_out - amount_out;
        let fee_keep = BPS - pool.swap_fee_bps as u128;
        let lhs = primitive_types::U256::from(new_in)
            * primitive_types::U256::from(new_out)
            * primitive_types::U256::from(BPS)
            * primitive_types::U256::from(BPS);
        let rhs = primitive_types::U256::from(reserve_in)
            * primitive_types::U256::from(reserve_out)
            * primitive_types::U256::from(fee_keep)
            * primitive_types::U256::from(fee_keep);
        if lhs < rhs {
            return Err(DexError::InvariantViolation {
                pool_id: order.pool_id,
                detail: "order fill broke constant product".into(),
            });
        }
        match order.direction {
            OrderDirection::SellBase => {
                pool.reserve_a = new_in;
                pool.reserve_b = new_out;
            }
            OrderDirection::BuyBase => {
                pool.reserve_b = new_in;
                pool.reserve_a = new_out;
            }
        }
        Self::save_pool(ctx, &pool)?;
        // Escrowed input is already with the module; deliver the output leg.
        Ledger::transfer(
            ctx.store,
            &Module::Dex.account(),
            &order.owner,
            &[Coin::new(token_out, amount_out)],
        )?;
        let mut twap = Self::load_twap(ctx, order.pool_id)?;
        twap.record(ctx.block.height, pool.spot_price_micro());
        Self::save_twap(ctx, order.pool_id, &twap)?;

        Self::deindex_order(ctx, order)?;
        Self::archive_order(ctx, order.clone(), ArchiveReason::Filled, amount_out)?;
        ctx.emit(
            Event::new(events::ORDER_FILLED)
                .attr("order_id", order.id)
                .attr("pool_id", order.pool_id)
                .attr("amount_out", amount_out),
        );
        Ok(true)
    }

    /// End blocker: archive expired orders (bounded per block) and prune
    /// archives past retention.
    pub fn expire_orders(&self, ctx: &mut Ctx, params: &DexParams) -> Result<(), DexError> {
        let due = ctx.store.range_between(
            Module::Dex,
            &keys::order_expiry_prefix(),
            Some(&keys::order_expiry_end(ctx.block.height)),
        )?;
        for (index_key, _) in due.into_iter().take(params.order_archive_per_block as usize) {
            // index key = ns, sub, expiry_be(8), order_id_be(8)
            if index_key.len() != 18 {
                continue;
            }
            let mut id_be = [0u8; 8];
            id_be.copy_from_slice(&index_key[10..18]);
            let order_id = u64::from_be_bytes(id_be);
            let Some(order) =
                get_typed::<LimitOrder>(ctx.store, Module::Dex, &keys::order_key(order_id))?
            else {
                ctx.store.delete(Module::Dex, index_key)?;
                continue;
            };
            let pool = Self::load_pool(ctx, order.pool_id)?;
            let token_in = match order.direction {
                OrderDirection::SellBase => pool.token_a.clone(),
                OrderDirection::BuyBase => pool.token_b.clone(),
            };
            Ledger::transfer(
                ctx.store,
                &Module::Dex.account(),
                &order.owner,
                &[Coin::new(token_in, order.amount_in)],
            )?;
            Self::deindex_order(ctx, &order)?;
            let order_id = order.id;
            Self::archive_order(ctx, order, ArchiveReason::Expired, 0)?;
            ctx.emit(Event::new(events::ORDER_ARCHIVED).attr("order_id", order_id));
        }

        // Retention sweep over old archives.
        if let Some(cutoff) = ctx.block.height.checked_sub(params.order_retention_blocks) {
            let stale = ctx.store.range_between(
                Module::Dex,
                &keys::order_archive_prefix(),
                Some(&keys::order_archive_end(cutoff)),
            )?;
            for (key, _) in stale
                .into_iter()
                .take(params.order_archive_per_block as usize)
            {
                ctx.store.delete(Module::Dex, key)?;
            }
        }
        Ok(())
    }

    fn index_order(ctx: &mut Ctx, order: &LimitOrder) -> Result<(), DexError> {
        put_typed(ctx.store, Module::Dex, keys::order_key(order.id), order)?;
        put_typed(
            ctx.store,
            Module::Dex,
            keys::order_book_key(
                order.pool_id,
                order.direction.as_byte(),
                order.direction.price_rank(order.price_micro),
                order.id,
            ),
            &order.id,
        )?;
        put_typed(
            ctx.store,
            Module::Dex,
            keys::order_expiry_key(order.expiry_height, order.id),
            &(),
        )?;
        Ok(())
    }

    fn deindex_order(ctx: &mut Ctx, order: &LimitOrder) -> Result<(), DexError> {
        ctx.store.delete(Module::Dex, keys::order_key(order.id))?;
        ctx.store.delete(
            Module::Dex,
            keys::order_book_key(
                order.pool_id,
                order.direction.as_byte(),
                order.direction.price_rank(order.price_micro),
                order.id,
            ),
        )?;
        ctx.store
            .delete(Module::Dex, keys::order_expiry_key(order.expiry_height, order.id))?;
        Ok(())
    }

    fn archive_order(
        ctx: &mut Ctx,
        order: LimitOrder,
        reason: ArchiveReason,
        amount_out: u128,
    ) -> Result<(), DexError> {
        let record = ArchivedOrder {
            archived_height: ctx.block.height,
            reason,
            amount_out,
            order,
        };
        put_typed(
            ctx.store,
            Module::Dex,
            keys::order_archive_key(record.archived_height, record.order.id),
            &record,
        )?;
        Ok(())
    }
}
