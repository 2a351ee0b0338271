//! # Oracle Hooks
//!
//! Fired synchronously when a canonical price lands, inside the publishing
//! scope. The DEX subscribes to keep a same-block reference price.

use paw_store::Ctx;

use crate::domain::errors::OracleError;

/// Notifications other modules may subscribe to.
pub trait OracleHooks {
    fn after_price_update(
        &self,
        ctx: &mut Ctx,
        asset: &str,
        price_micro: u128,
    ) -> Result<(), OracleError> {
        let _ = (ctx, asset, price_micro);
        Ok(())
    }
}

/// Default receiver: no subscribers.
pub struct NoOracleHooks;

impl OracleHooks for NoOracleHooks {}
