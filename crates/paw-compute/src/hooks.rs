//! # Compute Hooks

use shared_types::Address;

use paw_store::Ctx;

use crate::domain::errors::ComputeError;

/// Notifications other modules may subscribe to.
pub trait ComputeHooks {
    fn after_result_verified(
        &self,
        ctx: &mut Ctx,
        request_id: u64,
        provider: &Address,
    ) -> Result<(), ComputeError> {
        let _ = (ctx, request_id, provider);
        Ok(())
    }

    fn after_provider_slashed(
        &self,
        ctx: &mut Ctx,
        provider: &Address,
        amount: u128,
    ) -> Result<(), ComputeError> {
        let _ = (ctx, provider, amount);
        Ok(())
    }
}

/// Default receiver: no subscribers.
pub struct NoComputeHooks;

impl ComputeHooks for NoComputeHooks {}
