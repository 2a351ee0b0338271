//! # Hook Wiring
//!
//! Receivers are registered once at startup and fan out synchronously in
//! registration order, inside the calling scope: a failing receiver fails
//! the triggering operation. Cross-module reactions go through these typed
//! interfaces, never through a peer's keeper or raw keys.

use shared_types::Address;

use paw_store::Ctx;

use paw_compute::{ComputeError, ComputeHooks};
use paw_dex::{DexEngine, DexError, DexHooks, Pool, SwapFill};
use paw_oracle::{OracleError, OracleHooks};

/// Oracle → DEX: keep a same-block reference price in the DEX namespace.
pub struct DexPriceRecorder;

impl OracleHooks for DexPriceRecorder {
    fn after_price_update(
        &self,
        ctx: &mut Ctx,
        asset: &str,
        price_micro: u128,
    ) -> Result<(), OracleError> {
        DexEngine::record_reference_price(ctx, asset, price_micro)
            .map_err(|e| OracleError::Hook(e.to_string()))
    }
}

/// Fan-out over registered DEX hook receivers.
#[derive(Default)]
pub struct DexHookSet {
    receivers: Vec<Box<dyn DexHooks + Send + Sync>>,
}

impl DexHookSet {
    pub fn register(&mut self, receiver: Box<dyn DexHooks + Send + Sync>) {
        self.receivers.push(receiver);
    }
}

impl DexHooks for DexHookSet {
    fn after_pool_created(&self, ctx: &mut Ctx, pool: &Pool) -> Result<(), DexError> {
        for r in &self.receivers {
            r.after_pool_created(ctx, pool)?;
        }
        Ok(())
    }

    fn after_swap(&self, ctx: &mut Ctx, fill: &SwapFill) -> Result<(), DexError> {
        for r in &self.receivers {
            r.after_swap(ctx, fill)?;
        }
        Ok(())
    }

    fn after_liquidity_changed(
        &self,
        ctx: &mut Ctx,
        pool_id: u64,
        provider: &Address,
    ) -> Result<(), DexError> {
        for r in &self.receivers {
            r.after_liquidity_changed(ctx, pool_id, provider)?;
        }
        Ok(())
    }
}

/// Fan-out over registered oracle hook receivers.
#[derive(Default)]
pub struct OracleHookSet {
    receivers: Vec<Box<dyn OracleHooks + Send + Sync>>,
}

impl OracleHookSet {
    pub fn register(&mut self, receiver: Box<dyn OracleHooks + Send + Sync>) {
        self.receivers.push(receiver);
    }
}

impl OracleHooks for OracleHookSet {
    fn after_price_update(
        &self,
        ctx: &mut Ctx,
        asset: &str,
        price_micro: u128,
    ) -> Result<(), OracleError> {
        for r in &self.receivers {
            r.after_price_update(ctx, asset, price_micro)?;
        }
        Ok(())
    }
}

/// Fan-out over registered compute hook receivers.
#[derive(Default)]
pub struct ComputeHookSet {
    receivers: Vec<Box<dyn ComputeHooks + Send + Sync>>,
}

impl ComputeHookSet {
    pub fn register(&mut self, receiver: Box<dyn ComputeHooks + Send + Sync>) {
        self.receivers.push(receiver);
    }
}

impl ComputeHooks for ComputeHookSet {
    fn after_result_verified(
        &self,
        ctx: &mut Ctx,
        request_id: u64,
        provider: &Address,
    ) -> Result<(), ComputeError> {
        for r in &self.receivers {
            r.after_result_verified(ctx, request_id, provider)?;
        }
        Ok(())
    }

    fn after_provider_slashed(
        &self,
        ctx: &mut Ctx,
        provider: &Address,
        amount: u128,
    ) -> Result<(), ComputeError> {
        for r in &self.receivers {
            r.after_provider_slashed(ctx, provider, amount)?;
        }
        Ok(())
    }
}
