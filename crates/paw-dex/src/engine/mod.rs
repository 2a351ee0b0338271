//! # DEX Engine
//!
//! Stateful operations over the DEX namespace. The engine itself is a unit
//! struct: all state lives in the store, so the runtime can hand the same
//! engine to message dispatch, block hooks, and peer-module hook receivers.

pub mod abci;
pub mod commit_reveal;
pub mod guards;
pub mod orders;
pub mod pools;
pub mod swap;

use shared_types::Module;

use paw_store::codec::{get_typed, put_typed};
use paw_store::Ctx;

use crate::domain::entities::{Pool, TwapBuffer};
use crate::domain::errors::DexError;
use crate::domain::keys;
use crate::domain::params::DexParams;

/// The DEX module engine.
#[derive(Clone, Copy, Default)]
pub struct DexEngine;

impl DexEngine {
    pub fn new() -> Self {
        Self
    }

    /// Load module parameters, falling back to defaults before genesis has
    /// written them.
    pub fn params(ctx: &Ctx) -> Result<DexParams, DexError> {
        Ok(get_typed(ctx.store, Module::Dex, &keys::params_key())?.unwrap_or_default())
    }

    /// Persist parameters (genesis and governance path).
    pub fn set_params(ctx: &mut Ctx, params: &DexParams) -> Result<(), DexError> {
        params.validate().map_err(DexError::InvalidParams)?;
        put_typed(ctx.store, Module::Dex, keys::params_key(), params)?;
        Ok(())
    }

    /// Governance parameter update honoring immutable fields.
    pub fn update_params(ctx: &mut Ctx, next: &DexParams) -> Result<(), DexError> {
        let current = Self::params(ctx)?;
        current.check_update(next).map_err(DexError::InvalidParams)?;
        put_typed(ctx.store, Module::Dex, keys::params_key(), next)?;
        Ok(())
    }

    pub(crate) fn load_pool(ctx: &Ctx, pool_id: u64) -> Result<Pool, DexError> {
        get_typed(ctx.store, Module::Dex, &keys::pool_key(pool_id))?
            .ok_or(DexError::PoolNotFound { pool_id })
    }

    pub(crate) fn save_pool(ctx: &mut Ctx, pool: &Pool) -> Result<(), DexError> {
        put_typed(ctx.store, Module::Dex, keys::pool_key(pool.id), pool)?;
        Ok(())
    }

    pub(crate) fn next_pool_id(ctx: &mut Ctx) -> Result<u64, DexError> {
        let next: u64 =
            get_typed(ctx.store, Module::Dex, &keys::pool_seq_key())?.unwrap_or(0) + 1;
        put_typed(ctx.store, Module::Dex, keys::pool_seq_key(), &next)?;
        Ok(next)
    }

    pub(crate) fn next_order_id(ctx: &mut Ctx) -> Result<u64, DexError> {
        let next: u64 =
            get_typed(ctx.store, Module::Dex, &keys::order_seq_key())?.unwrap_or(0) + 1;
        put_typed(ctx.store, Module::Dex, keys::order_seq_key(), &next)?;
        Ok(next)
    }

    pub(crate) fn load_twap(ctx: &Ctx, pool_id: u64) -> Result<TwapBuffer, DexError> {
        Ok(get_typed(ctx.store, Module::Dex, &keys::twap_key(pool_id))?.unwrap_or_default())
    }

    pub(crate) fn save_twap(
        ctx: &mut Ctx,
        pool_id: u64,
        buf: &TwapBuffer,
    ) -> Result<(), DexError> {
        put_typed(ctx.store, Module::Dex, keys::twap_key(pool_id), buf)?;
        Ok(())
    }

    /// Accrue protocol fee in `denom`.
    pub(crate) fn accrue_protocol_fee(
        ctx: &mut Ctx,
        denom: &str,
        amount: u128,
    ) -> Result<(), DexError> {
        if amount == 0 {
            return Ok(());
        }
        let key = keys::protocol_fee_key(denom);
        let current: u128 = get_typed(ctx.store, Module::Dex, &key)?.unwrap_or(0);
        put_typed(
            ctx.store,
            Module::Dex,
            key,
            &current.saturating_add(amount),
        )?;
        Ok(())
    }

    /// Mark the route graph for rebuild at the next end blocker.
    pub(crate) fn mark_routes_dirty(ctx: &mut Ctx) -> Result<(), DexError> {
        put_typed(ctx.store, Module::Dex, keys::route_dirty_key(), &true)?;
        Ok(())
    }

    /// Record the oracle's freshly published price as a DEX-side reference.
    /// Wired as the DEX's oracle-hook receiver, so the reference updates in
    /// the same block the price is aggregated.
    pub fn record_reference_price(
        ctx: &mut Ctx,
        asset: &str,
        price_micro: u128,
    ) -> Result<(), DexError> {
        put_typed(
            ctx.store,
            Module::Dex,
            keys::reference_price_key(asset),
            &(price_micro, ctx.block.height),
        )?;
        Ok(())
    }

    /// Latest oracle reference price recorded for `asset`, with the height
    /// it arrived at.
    pub fn reference_price(ctx: &Ctx, asset: &str) -> Result<Option<(u128, u64)>, DexError> {
        Ok(get_typed(
            ctx.store,
            Module::Dex,
            &keys::reference_price_key(asset),
        )?)
    }
}
