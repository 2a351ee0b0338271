//! # DEX Queries
//!
//! Read-only endpoints. None of these write state: when the cached route
//! graph is dirty, `find_best_route` rebuilds it in memory and leaves the
//! cache for the end blocker.

use serde::{Deserialize, Serialize};
use shared_types::{Address, Denom, Module};

use paw_store::codec::get_typed;
use paw_store::Ctx;

use crate::algorithms::routing::{self, Route, TokenGraph};
use crate::algorithms::amm;
use crate::domain::entities::{LimitOrder, Pool, TwapBuffer};
use crate::domain::errors::DexError;
use crate::domain::keys;
use crate::engine::DexEngine;

/// Paginated pool listing.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PoolPage {
    pub pools: Vec<Pool>,
    pub total: usize,
}

/// Swap simulation result.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SwapEstimate {
    pub amount_out: u128,
    pub spot_price_micro_after: u128,
    pub commit_required: bool,
}

impl DexEngine {
    pub fn query_pool(ctx: &Ctx, pool_id: u64) -> Result<Pool, DexError> {
        Self::load_pool(ctx, pool_id)
    }

    pub fn query_pools(ctx: &Ctx, offset: usize, limit: usize) -> Result<PoolPage, DexError> {
        let all: Vec<Pool> = ctx
            .store
            .range(Module::Dex, &keys::pool_prefix())?
            .into_iter()
            .filter_map(|(_, v)| bincode::deserialize(&v).ok())
            .collect();
        let total = all.len();
        let pools = all.into_iter().skip(offset).take(limit.max(1)).collect();
        Ok(PoolPage { pools, total })
    }

    pub fn query_pool_by_tokens(
        ctx: &Ctx,
        token_a: &Denom,
        token_b: &Denom,
    ) -> Result<Pool, DexError> {
        let id: u64 = get_typed(
            ctx.store,
            Module::Dex,
            &keys::pool_by_pair_key(token_a.as_str(), token_b.as_str()),
        )?
        .ok_or(DexError::PoolNotFound { pool_id: 0 })?;
        Self::load_pool(ctx, id)
    }

    pub fn query_liquidity(
        ctx: &Ctx,
        pool_id: u64,
        addr: &Address,
    ) -> Result<u128, DexError> {
        Self::share_of(ctx, pool_id, addr)
    }

    /// Price a swap without executing it.
    pub fn simulate_swap(
        ctx: &Ctx,
        pool_id: u64,
        token_in: &Denom,
        amount_in: u128,
    ) -> Result<SwapEstimate, DexError> {
        let pool = Self::load_pool(ctx, pool_id)?;
        let params = Self::params(ctx)?;
        let in_is_a = *token_in == pool.token_a;
        if !in_is_a && *token_in != pool.token_b {
            return Err(DexError::DenomNotInPool {
                pool_id,
                denom: token_in.clone(),
            });
        }
        let (reserve_in, reserve_out) = if in_is_a {
            (pool.reserve_a, pool.reserve_b)
        } else {
            (pool.reserve_b, pool.reserve_a)
        };
        let amount_out = amm::swap_output(reserve_in, reserve_out, amount_in, pool.swap_fee_bps);
        let (new_a, new_b) = if in_is_a {
            (pool.reserve_a + amount_in, pool.reserve_b - amount_out.min(pool.reserve_b))
        } else {
            (pool.reserve_a - amount_out.min(pool.reserve_a), pool.reserve_b + amount_in)
        };
        let spot_after = if new_a == 0 {
            0
        } else {
            new_b.saturating_mul(crate::domain::entities::PRICE_SCALE) / new_a
        };
        let commit_required = primitive_types::U256::from(amount_in)
            * primitive_types::U256::from(amm::BPS)
            > primitive_types::U256::from(reserve_in)
                * primitive_types::U256::from(params.large_swap_fraction_bps);
        Ok(SwapEstimate {
            amount_out,
            spot_price_micro_after: spot_after,
            commit_required,
        })
    }

    /// Output-maximizing route of at most four hops.
    pub fn find_best_route(
        ctx: &Ctx,
        token_in: &Denom,
        token_out: &Denom,
        amount_in: u128,
    ) -> Result<Route, DexError> {
        let dirty: bool =
            get_typed(ctx.store, Module::Dex, &keys::route_dirty_key())?.unwrap_or(false);
        let graph: TokenGraph = if dirty {
            Self::build_route_graph(ctx)?
        } else {
            get_typed(ctx.store, Module::Dex, &keys::route_graph_key())?
                .unwrap_or_else(TokenGraph::default)
        };
        let pools: std::collections::BTreeMap<u64, Pool> = ctx
            .store
            .range(Module::Dex, &keys::pool_prefix())?
            .into_iter()
            .filter_map(|(_, v)| bincode::deserialize::<Pool>(&v).ok())
            .map(|p| (p.id, p))
            .collect();
        routing::find_best_route(&graph, &pools, token_in, token_out, amount_in).ok_or(
            DexError::NoRoute {
                from: token_in.clone(),
                to: token_out.clone(),
                max_hops: routing::MAX_HOPS,
            },
        )
    }

    pub fn query_order(ctx: &Ctx, order_id: u64) -> Result<LimitOrder, DexError> {
        get_typed(ctx.store, Module::Dex, &keys::order_key(order_id))?
            .ok_or(DexError::OrderNotFound { order_id })
    }

    /// Both book sides, best price first.
    pub fn query_order_book(
        ctx: &Ctx,
        pool_id: u64,
    ) -> Result<(Vec<LimitOrder>, Vec<LimitOrder>), DexError> {
        let mut sides = Vec::with_capacity(2);
        for direction in [0u8, 1u8] {
            let mut out = Vec::new();
            for (_, id_bytes) in ctx
                .store
                .range(Module::Dex, &keys::order_book_prefix(pool_id, direction))?
            {
                if let Ok(order_id) = bincode::deserialize::<u64>(&id_bytes) {
                    if let Some(order) =
                        get_typed::<LimitOrder>(ctx.store, Module::Dex, &keys::order_key(order_id))?
                    {
                        out.push(order);
                    }
                }
            }
            sides.push(out);
        }
        let buys = sides.pop().unwrap_or_default();
        let sells = sides.pop().unwrap_or_default();
        Ok((sells, buys))
    }

    /// Time-weighted average price; stale buffers are refused.
    pub fn query_twap(ctx: &Ctx, pool_id: u64, window: u64) -> Result<u128, DexError> {
        let params = Self::params(ctx)?;
        let buf: TwapBuffer = Self::load_twap(ctx, pool_id)?;
        let last = buf.latest_height().unwrap_or(0);
        if last + params.twap_max_staleness_blocks < ctx.block.height {
            return Err(DexError::TwapStale { pool_id, last });
        }
        buf.average(ctx.block.height, window)
            .ok_or(DexError::TwapStale { pool_id, last })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::NoDexHooks;
    use paw_store::{Ledger, MultiStore};
    use shared_types::{BlockCtx, Coin};

    fn denom(s: &str) -> Denom {
        Denom::new(s).unwrap()
    }

    fn setup(store: &mut MultiStore) -> u64 {
        let creator = Address::new("paw1creator").unwrap();
        for d in ["upaw", "uusdt"] {
            Ledger::mint(store, &creator, &Coin::new(denom(d), 50_000_000)).unwrap();
        }
        let mut events = Vec::new();
        let mut ctx = Ctx::new(store, BlockCtx::new(1, 1_000), &mut events);
        DexEngine::new()
            .create_pool(
                &mut ctx,
                &NoDexHooks,
                &creator,
                denom("upaw"),
                denom("uusdt"),
                1_000_000,
                2_000_000,
            )
            .unwrap()
    }

    #[test]
    fn test_simulate_matches_reference() {
        let mut store = MultiStore::in_memory();
        let pool_id = setup(&mut store);
        let mut events = Vec::new();
        let ctx = Ctx::new(&mut store, BlockCtx::new(2, 1_006), &mut events);
        let est = DexEngine::simulate_swap(&ctx, pool_id, &denom("upaw"), 10_000).unwrap();
        assert_eq!(est.amount_out, 19_742);
        assert!(!est.commit_required);
        let est_large = DexEngine::simulate_swap(&ctx, pool_id, &denom("upaw"), 60_000).unwrap();
        assert!(est_large.commit_required);
    }

    #[test]
    fn test_pool_by_tokens_either_order() {
        let mut store = MultiStore::in_memory();
        let pool_id = setup(&mut store);
        let mut events = Vec::new();
        let ctx = Ctx::new(&mut store, BlockCtx::new(2, 1_006), &mut events);
        let p1 = DexEngine::query_pool_by_tokens(&ctx, &denom("upaw"), &denom("uusdt")).unwrap();
        let p2 = DexEngine::query_pool_by_tokens(&ctx, &denom("uusdt"), &denom("upaw")).unwrap();
        assert_eq!(p1.id, pool_id);
        assert_eq!(p2.id, pool_id);
    }

    #[test]
    fn test_twap_stale_rejected() {
        let mut store = MultiStore::in_memory();
        let pool_id = setup(&mut store);
        let mut events = Vec::new();
        // Far in the future with no new samples.
        let ctx = Ctx::new(&mut store, BlockCtx::new(5_000, 9_000), &mut events);
        let err = DexEngine::query_twap(&ctx, pool_id, 100).unwrap_err();
        assert!(matches!(err, DexError::TwapStale { .. }));
    }

    #[test]
    fn test_route_query_with_dirty_graph() {
        let mut store = MultiStore::in_memory();
        let _ = setup(&mut store);
        let mut events = Vec::new();
        // Dirty flag still set (no end blocker ran); query must still route.
        let ctx = Ctx::new(&mut store, BlockCtx::new(2, 1_006), &mut events);
        let route =
            DexEngine::find_best_route(&ctx, &denom("upaw"), &denom("uusdt"), 10_000).unwrap();
        assert_eq!(route.amount_out, 19_742);
    }
}
