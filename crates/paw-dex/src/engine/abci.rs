//! # DEX Block Hooks
//!
//! Begin: lock self-healing. End: breaker recovery, expired-commitment
//! forfeiture, order archival, rate-window pruning, and the route-graph
//! rebuild when a pool creation marked it dirty.

use shared_types::Module;

use paw_store::codec::{get_typed, put_typed};
use paw_store::Ctx;

use crate::algorithms::routing::TokenGraph;
use crate::domain::entities::Pool;
use crate::domain::errors::DexError;
use crate::domain::keys;

use super::DexEngine;

/// Expired commitments processed per block.
const COMMIT_CLEANUP_BUDGET: usize = 50;

impl DexEngine {
    pub fn begin_block(&self, ctx: &mut Ctx) -> Result<(), DexError> {
        let params = Self::params(ctx)?;
        Self::expire_stale_locks(ctx, &params)?;
        Ok(())
    }

    pub fn end_block(&self, ctx: &mut Ctx) -> Result<(), DexError> {
        let params = Self::params(ctx)?;
        Self::recover_breakers(ctx)?;
        self.cleanup_expired_commitments(ctx, &params, COMMIT_CLEANUP_BUDGET)?;
        self.expire_orders(ctx, &params)?;
        Self::prune_rate_windows(ctx, &params)?;
        self.rebuild_routes_if_dirty(ctx)?;
        Ok(())
    }

    /// Rebuild and cache the token graph when flagged dirty.
    pub(crate) fn rebuild_routes_if_dirty(&self, ctx: &mut Ctx) -> Result<(), DexError> {
        let dirty: bool =
            get_typed(ctx.store, Module::Dex, &keys::route_dirty_key())?.unwrap_or(false);
        if !dirty {
            return Ok(());
        }
        let graph = Self::build_route_graph(ctx)?;
        put_typed(ctx.store, Module::Dex, keys::route_graph_key(), &graph)?;
        ctx.store.delete(Module::Dex, keys::route_dirty_key())?;
        tracing::debug!(tokens = graph.adjacency.len(), "route graph rebuilt");
        Ok(())
    }

    /// Scan all pools into a fresh graph. Used by the end blocker and by
    /// read-only queries when the cached copy is stale.
    pub(crate) fn build_route_graph(ctx: &Ctx) -> Result<TokenGraph, DexError> {
        let pools: Vec<Pool> = ctx
            .store
            .range(Module::Dex, &keys::pool_prefix())?
            .into_iter()
            .filter_map(|(_, v)| bincode::deserialize(&v).ok())
            .collect();
        Ok(TokenGraph::from_pools(pools.iter()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::NoDexHooks;
    use paw_store::{Ctx, Ledger, MultiStore};
    use shared_types::{Address, BlockCtx, Coin, Denom};

    #[test]
    fn test_route_graph_rebuilds_on_dirty() {
        let mut store = MultiStore::in_memory();
        let creator = Address::new("paw1creator").unwrap();
        for d in ["upaw", "uusdt"] {
            Ledger::mint(
                &mut store,
                &creator,
                &Coin::new(Denom::new(d).unwrap(), 10_000_000),
            )
            .unwrap();
        }
        let mut events = Vec::new();
        let mut ctx = Ctx::new(&mut store, BlockCtx::new(1, 1_000), &mut events);
        DexEngine::new()
            .create_pool(
                &mut ctx,
                &NoDexHooks,
                &creator,
                Denom::new("upaw").unwrap(),
                Denom::new("uusdt").unwrap(),
                2_000_000,
                2_000_000,
            )
            .unwrap();
        // Creation marks dirty; end blocker materializes the cache.
        assert_eq!(
            get_typed::<bool>(ctx.store, Module::Dex, &keys::route_dirty_key()).unwrap(),
            Some(true)
        );
        DexEngine::new().end_block(&mut ctx).unwrap();
        let cached: TokenGraph =
            get_typed(ctx.store, Module::Dex, &keys::route_graph_key())
                .unwrap()
                .unwrap();
        assert_eq!(cached.adjacency.len(), 2);
        assert_eq!(
            get_typed::<bool>(ctx.store, Module::Dex, &keys::route_dirty_key()).unwrap(),
            None
        );
    }
}
