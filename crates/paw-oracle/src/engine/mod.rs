//! # Oracle Engine

pub mod abci;
pub mod aggregate;
pub mod registry;
pub mod slashing;
pub mod submissions;

use shared_types::{Address, Event, Module};

use paw_store::codec::{get_typed, put_typed};
use paw_store::Ctx;

use crate::domain::entities::{OracleBreaker, OracleValidator};
use crate::domain::errors::OracleError;
use crate::domain::keys;
use crate::domain::params::OracleParams;
use crate::events;

/// The oracle module engine.
#[derive(Clone, Copy, Default)]
pub struct OracleEngine;

impl OracleEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn params(ctx: &Ctx) -> Result<OracleParams, OracleError> {
        Ok(get_typed(ctx.store, Module::Oracle, &keys::params_key())?.unwrap_or_default())
    }

    pub fn set_params(ctx: &mut Ctx, params: &OracleParams) -> Result<(), OracleError> {
        params.validate().map_err(OracleError::InvalidParams)?;
        put_typed(ctx.store, Module::Oracle, keys::params_key(), params)?;
        Ok(())
    }

    pub fn update_params(ctx: &mut Ctx, next: &OracleParams) -> Result<(), OracleError> {
        let current = Self::params(ctx)?;
        current
            .check_update(next)
            .map_err(OracleError::InvalidParams)?;
        put_typed(ctx.store, Module::Oracle, keys::params_key(), next)?;
        Ok(())
    }

    pub(crate) fn load_validator(
        ctx: &Ctx,
        addr: &Address,
    ) -> Result<OracleValidator, OracleError> {
        get_typed(ctx.store, Module::Oracle, &keys::validator_key(addr))?
            .ok_or(OracleError::ValidatorNotFound)
    }

    pub(crate) fn save_validator(
        ctx: &mut Ctx,
        validator: &OracleValidator,
    ) -> Result<(), OracleError> {
        put_typed(
            ctx.store,
            Module::Oracle,
            keys::validator_key(&validator.addr),
            validator,
        )?;
        Ok(())
    }

    pub(crate) fn all_validators(ctx: &Ctx) -> Result<Vec<OracleValidator>, OracleError> {
        Ok(ctx
            .store
            .range(Module::Oracle, &keys::validator_prefix())?
            .into_iter()
            .filter_map(|(_, v)| bincode::deserialize(&v).ok())
            .collect())
    }

    /// Reject when the global or per-asset breaker is open.
    pub fn check_breakers(ctx: &Ctx, asset: Option<&str>) -> Result<(), OracleError> {
        let mut checks = vec![(keys::breaker_key(None), "global".to_string())];
        if let Some(a) = asset {
            checks.push((keys::breaker_key(Some(a)), format!("asset {a}")));
        }
        for (key, scope) in checks {
            if let Some(b) = get_typed::<OracleBreaker>(ctx.store, Module::Oracle, &key)? {
                if ctx.block.height < b.recover_at_height {
                    return Err(OracleError::BreakerOpen { scope });
                }
            }
        }
        Ok(())
    }

    pub fn trip_breaker(
        ctx: &mut Ctx,
        asset: Option<&str>,
        reason: impl Into<String>,
        params: &OracleParams,
    ) -> Result<(), OracleError> {
        let reason = reason.into();
        let breaker = OracleBreaker {
            reason: reason.clone(),
            tripped_height: ctx.block.height,
            recover_at_height: ctx.block.height + params.breaker_quiet_blocks,
        };
        put_typed(ctx.store, Module::Oracle, keys::breaker_key(asset), &breaker)?;
        let scope = asset.map_or("global".to_string(), |a| format!("asset {a}"));
        tracing::warn!(%scope, %reason, "oracle circuit breaker tripped");
        ctx.emit(
            Event::new(events::BREAKER_TRIPPED)
                .attr("scope", scope)
                .attr("reason", reason),
        );
        Ok(())
    }

    /// Clear breakers whose quiet window elapsed with no retrigger.
    pub fn recover_breakers(ctx: &mut Ctx) -> Result<(), OracleError> {
        let entries = ctx.store.range(Module::Oracle, &keys::breaker_prefix())?;
        for (key, value) in entries {
            let breaker: OracleBreaker = match bincode::deserialize(&value) {
                Ok(b) => b,
                Err(_) => continue,
            };
            if ctx.block.height >= breaker.recover_at_height {
                ctx.store.delete(Module::Oracle, key)?;
                ctx.emit(Event::new(events::BREAKER_RECOVERED).attr("height", ctx.block.height));
            }
        }
        Ok(())
    }
}
