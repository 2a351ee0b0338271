//! # Defensive Guards
//!
//! Circuit breakers, the per-caller rate limiter, and the per-pool
//! reentrancy lock. Lock acquisition is a check-and-set inside the caller's
//! scope; a failed operation discards the lock together with its writes,
//! and a lock that somehow survives (a panicked handler mid-hook) expires
//! after `lock_expiration_blocks`.

use shared_types::{Address, Event, Module};

use paw_store::codec::{get_typed, put_typed};
use paw_store::Ctx;

use crate::domain::entities::{BreakerReason, CircuitBreaker};
use crate::domain::errors::DexError;
use crate::domain::keys;
use crate::domain::params::DexParams;
use crate::events;

use super::DexEngine;

impl DexEngine {
    /// Reject when the global or per-pool breaker is open.
    pub fn check_breakers(
        ctx: &Ctx,
        pool_id: u64,
        _params: &DexParams,
    ) -> Result<(), DexError> {
        for (key, scope) in [
            (keys::breaker_key(None), "global".to_string()),
            (keys::breaker_key(Some(pool_id)), format!("pool {pool_id}")),
        ] {
            if let Some(b) = get_typed::<CircuitBreaker>(ctx.store, Module::Dex, &key)? {
                if ctx.block.time_unix < b.recover_at_unix {
                    return Err(DexError::BreakerOpen { scope });
                }
            }
        }
        Ok(())
    }

    /// Trip a breaker. Persists in the current scope; the runtime calls
    /// this in a fresh scope when escalating an invariant-class failure so
    /// the trip outlives the discarded operation.
    pub fn trip_breaker(
        ctx: &mut Ctx,
        pool_id: Option<u64>,
        reason: BreakerReason,
        params: &DexParams,
    ) -> Result<(), DexError> {
        let breaker = CircuitBreaker {
            reason: reason.clone(),
            tripped_height: ctx.block.height,
            tripped_time_unix: ctx.block.time_unix,
            recover_at_unix: ctx.block.time_unix + params.circuit_breaker_duration_secs,
        };
        put_typed(ctx.store, Module::Dex, keys::breaker_key(pool_id), &breaker)?;
        let scope = pool_id.map_or("global".to_string(), |id| format!("pool {id}"));
        tracing::warn!(%scope, ?reason, "dex circuit breaker tripped");
        ctx.emit(
            Event::new(events::BREAKER_TRIPPED)
                .attr("scope", &scope)
                .attr("height", ctx.block.height),
        );
        Ok(())
    }

    /// End-blocker sweep: clear breakers whose recovery time has passed.
    pub fn recover_breakers(ctx: &mut Ctx) -> Result<(), DexError> {
        let prefix = vec![keys::NS, keys::SUB_BREAKER];
        let entries = ctx.store.range(Module::Dex, &prefix)?;
        for (key, value) in entries {
            let breaker: CircuitBreaker =
                bincode::deserialize(&value).map_err(|e| {
                    DexError::Store(paw_store::StoreError::CorruptValue {
                        key: key.clone(),
                        reason: e.to_string(),
                    })
                })?;
            if ctx.block.time_unix >= breaker.recover_at_unix {
                ctx.store.delete(Module::Dex, key.clone())?;
                ctx.emit(Event::new(events::BREAKER_RECOVERED).attr("height", ctx.block.height));
            }
        }
        Ok(())
    }

    /// Count one guarded operation against the caller's window budget.
    pub fn charge_rate(
        ctx: &mut Ctx,
        caller: &Address,
        params: &DexParams,
    ) -> Result<(), DexError> {
        let window = params.rate_limit_window_blocks;
        let window_start = ctx.block.height - ctx.block.height % window;
        let key = keys::rate_key(caller, window_start);
        let used: u32 = get_typed(ctx.store, Module::Dex, &key)?.unwrap_or(0);
        if used >= params.rate_limit_ops {
            return Err(DexError::RateLimited {
                used,
                limit: params.rate_limit_ops,
            });
        }
        put_typed(ctx.store, Module::Dex, key, &(used + 1))?;
        put_typed(
            ctx.store,
            Module::Dex,
            keys::rate_index_key(window_start, caller),
            &(),
        )?;
        Ok(())
    }

    /// End-blocker sweep: drop counters from windows past retention.
    /// The height index avoids scanning every caller's counters.
    pub fn prune_rate_windows(ctx: &mut Ctx, params: &DexParams) -> Result<(), DexError> {
        let window = params.rate_limit_window_blocks;
        let current_start = ctx.block.height - ctx.block.height % window;
        // Keep the current and previous window.
        let Some(cutoff) = current_start.checked_sub(window) else {
            return Ok(());
        };
        let stale = ctx.store.range_between(
            Module::Dex,
            &keys::rate_index_prefix(),
            Some(&keys::rate_index_end(cutoff)),
        )?;
        for (index_key, _) in stale {
            // index key = ns, sub, window_be(8), len, addr
            if index_key.len() < 11 {
                continue;
            }
            let mut be = [0u8; 8];
            be.copy_from_slice(&index_key[2..10]);
            let window_start = u64::from_be_bytes(be);
            let addr_bytes = &index_key[11..];
            if let Some(addr) = std::str::from_utf8(addr_bytes)
                .ok()
                .and_then(Address::new)
            {
                ctx.store
                    .delete(Module::Dex, keys::rate_key(&addr, window_start))?;
            }
            ctx.store.delete(Module::Dex, index_key)?;
        }
        Ok(())
    }

    /// Run `f` holding the pool's reentrancy lock.
    pub(crate) fn with_pool_lock<T>(
        ctx: &mut Ctx,
        pool_id: u64,
        params: &DexParams,
        f: impl FnOnce(&mut Ctx) -> Result<T, DexError>,
    ) -> Result<T, DexError> {
        ctx.scoped(|ctx| {
            Self::acquire_lock(ctx, pool_id, params)?;
            let out = f(ctx)?;
            Self::release_lock(ctx, pool_id)?;
            Ok(out)
        })
    }

    fn acquire_lock(ctx: &mut Ctx, pool_id: u64, params: &DexParams) -> Result<(), DexError> {
        let key = keys::lock_key(pool_id);
        if let Some(held_at) = get_typed::<u64>(ctx.store, Module::Dex, &key)? {
            if held_at + params.lock_expiration_blocks > ctx.block.height {
                return Err(DexError::Reentrancy { pool_id });
            }
        }
        put_typed(ctx.store, Module::Dex, key, &ctx.block.height)?;
        Ok(())
    }

    fn release_lock(ctx: &mut Ctx, pool_id: u64) -> Result<(), DexError> {
        ctx.store.delete(Module::Dex, keys::lock_key(pool_id))?;
        Ok(())
    }

    /// Begin-blocker housekeeping: clear locks past their expiration.
    pub fn expire_stale_locks(ctx: &mut Ctx, params: &DexParams) -> Result<(), DexError> {
        let prefix = vec![keys::NS, keys::SUB_LOCK];
        let locks = ctx.store.range(Module::Dex, &prefix)?;
        for (key, value) in locks {
            let held_at: u64 = bincode::deserialize(&value).unwrap_or(0);
            if held_at + params.lock_expiration_blocks <= ctx.block.height {
                ctx.store.delete(Module::Dex, key)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paw_store::MultiStore;
    use shared_types::BlockCtx;

    fn addr(s: &str) -> Address {
        Address::new(s).unwrap()
    }

    #[test]
    fn test_rate_limit_budget() {
        let mut store = MultiStore::in_memory();
        let mut events = Vec::new();
        let mut ctx = Ctx::new(&mut store, BlockCtx::new(50, 0), &mut events);
        let params = DexParams::default();
        let caller = addr("paw1caller");
        for _ in 0..params.rate_limit_ops {
            DexEngine::charge_rate(&mut ctx, &caller, &params).unwrap();
        }
        let err = DexEngine::charge_rate(&mut ctx, &caller, &params).unwrap_err();
        assert!(matches!(err, DexError::RateLimited { used: 10, .. }));
    }

    #[test]
    fn test_rate_limit_resets_next_window() {
        let mut store = MultiStore::in_memory();
        let mut events = Vec::new();
        let params = DexParams::default();
        let caller = addr("paw1caller");
        {
            let mut ctx = Ctx::new(&mut store, BlockCtx::new(50, 0), &mut events);
            for _ in 0..params.rate_limit_ops {
                DexEngine::charge_rate(&mut ctx, &caller, &params).unwrap();
            }
        }
        let mut ctx = Ctx::new(&mut store, BlockCtx::new(150, 0), &mut events);
        DexEngine::charge_rate(&mut ctx, &caller, &params).unwrap();
    }

    #[test]
    fn test_rate_window_pruned_via_index() {
        let mut store = MultiStore::in_memory();
        let mut events = Vec::new();
        let params = DexParams::default();
        let caller = addr("paw1caller");
        {
            let mut ctx = Ctx::new(&mut store, BlockCtx::new(10, 0), &mut events);
            DexEngine::charge_rate(&mut ctx, &caller, &params).unwrap();
        }
        {
            let mut ctx = Ctx::new(&mut store, BlockCtx::new(350, 0), &mut events);
            DexEngine::prune_rate_windows(&mut ctx, &params).unwrap();
        }
        // Window-0 counter and index gone.
        assert!(store
            .get(Module::Dex, &keys::rate_key(&caller, 0))
            .unwrap()
            .is_none());
        assert!(store
            .range(Module::Dex, &keys::rate_index_prefix())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_reentrancy_lock_blocks_nested() {
        let mut store = MultiStore::in_memory();
        let mut events = Vec::new();
        let mut ctx = Ctx::new(&mut store, BlockCtx::new(5, 0), &mut events);
        let params = DexParams::default();
        let result: Result<(), DexError> =
            DexEngine::with_pool_lock(&mut ctx, 1, &params, |ctx| {
                // Nested acquisition of the same pool must fail.
                let nested: Result<(), DexError> =
                    DexEngine::with_pool_lock(ctx, 1, &params, |_| Ok(()));
                assert!(matches!(nested, Err(DexError::Reentrancy { pool_id: 1 })));
                // A different pool is fine.
                DexEngine::with_pool_lock(ctx, 2, &params, |_| Ok(()))
            });
        result.unwrap();
        // All locks released.
        assert!(store
            .get(Module::Dex, &keys::lock_key(1))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_lock_self_heals_after_expiration() {
        let mut store = MultiStore::in_memory();
        let mut events = Vec::new();
        let params = DexParams::default();
        // Simulate a lock leaked at height 5.
        {
            let mut ctx = Ctx::new(&mut store, BlockCtx::new(5, 0), &mut events);
            put_typed(ctx.store, Module::Dex, keys::lock_key(9), &5u64).unwrap();
        }
        // Two blocks later the lock no longer blocks.
        let mut ctx = Ctx::new(&mut store, BlockCtx::new(7, 0), &mut events);
        DexEngine::with_pool_lock(&mut ctx, 9, &params, |_| Ok::<(), DexError>(())).unwrap();
    }

    #[test]
    fn test_breaker_trip_and_recover() {
        let mut store = MultiStore::in_memory();
        let mut events = Vec::new();
        let params = DexParams::default();
        {
            let mut ctx = Ctx::new(&mut store, BlockCtx::new(10, 1_000), &mut events);
            DexEngine::trip_breaker(
                &mut ctx,
                Some(3),
                BreakerReason::Governance,
                &params,
            )
            .unwrap();
            let err = DexEngine::check_breakers(&ctx, 3, &params).unwrap_err();
            assert!(matches!(err, DexError::BreakerOpen { .. }));
            // Other pools unaffected.
            DexEngine::check_breakers(&ctx, 4, &params).unwrap();
        }
        // After the recovery window the end blocker clears it.
        let later = 1_000 + params.circuit_breaker_duration_secs;
        let mut ctx = Ctx::new(&mut store, BlockCtx::new(700, later), &mut events);
        DexEngine::recover_breakers(&mut ctx).unwrap();
        DexEngine::check_breakers(&ctx, 3, &params).unwrap();
    }
}
