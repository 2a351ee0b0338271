//! # DEX Hooks
//!
//! Typed callbacks fired synchronously inside the triggering operation's
//! scope. A failing hook fails the operation; receivers are registered once
//! at startup by the runtime.

use shared_types::{Address, Denom};

use paw_store::Ctx;

use crate::domain::entities::Pool;
use crate::domain::errors::DexError;

/// Completed swap facts passed to hook receivers.
#[derive(Clone, Debug)]
pub struct SwapFill {
    pub pool_id: u64,
    pub trader: Address,
    pub token_in: Denom,
    pub amount_in: u128,
    pub token_out: Denom,
    pub amount_out: u128,
    /// Pool spot price after the fill, micro token_b per token_a.
    pub spot_price_micro: u128,
}

/// Notifications other modules may subscribe to.
pub trait DexHooks {
    fn after_pool_created(&self, ctx: &mut Ctx, pool: &Pool) -> Result<(), DexError> {
        let _ = (ctx, pool);
        Ok(())
    }

    fn after_swap(&self, ctx: &mut Ctx, fill: &SwapFill) -> Result<(), DexError> {
        let _ = (ctx, fill);
        Ok(())
    }

    fn after_liquidity_changed(
        &self,
        ctx: &mut Ctx,
        pool_id: u64,
        provider: &Address,
    ) -> Result<(), DexError> {
        let _ = (ctx, pool_id, provider);
        Ok(())
    }
}

/// Default receiver: no subscribers.
pub struct NoDexHooks;

impl DexHooks for NoDexHooks {}
