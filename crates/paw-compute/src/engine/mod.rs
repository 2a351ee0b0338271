//! # Compute Engine

pub mod abci;
pub mod disputes;
pub mod failures;
pub mod providers;
pub mod requests;
pub mod results;
pub mod selection;
pub mod timeouts;

use shared_types::{Address, Module};

use paw_store::codec::{get_typed, put_typed};
use paw_store::Ctx;

use crate::domain::entities::{ComputeRequest, Escrow, Provider};
use crate::domain::errors::ComputeError;
use crate::domain::keys;
use crate::domain::params::ComputeParams;

/// Voting power source for dispute resolution. The runtime wires this to
/// the oracle validator set; tests plug in fixed maps.
pub trait VotingPowerView {
    fn power_of(&self, ctx: &Ctx, voter: &Address) -> Result<u128, ComputeError>;
    fn total_power(&self, ctx: &Ctx) -> Result<u128, ComputeError>;
}

/// The compute module engine.
#[derive(Clone, Copy, Default)]
pub struct ComputeEngine;

impl ComputeEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn params(ctx: &Ctx) -> Result<ComputeParams, ComputeError> {
        Ok(get_typed(ctx.store, Module::Compute, &keys::params_key())?.unwrap_or_default())
    }

    pub fn set_params(ctx: &mut Ctx, params: &ComputeParams) -> Result<(), ComputeError> {
        params.validate().map_err(ComputeError::InvalidParams)?;
        put_typed(ctx.store, Module::Compute, keys::params_key(), params)?;
        Ok(())
    }

    /// Governance: register the Groth16 verifying key for a circuit.
    pub fn register_verifying_key(
        ctx: &mut Ctx,
        sender: &Address,
        circuit_id: &str,
        vk_bytes: Vec<u8>,
    ) -> Result<(), ComputeError> {
        let params = Self::params(ctx)?;
        if *sender != params.authority {
            return Err(ComputeError::Unauthorized {
                reason: "only the compute authority may register verifying keys".into(),
            });
        }
        ctx.store
            .set(Module::Compute, keys::verifying_key_key(circuit_id), vk_bytes)?;
        tracing::info!(circuit_id, "verifying key registered");
        Ok(())
    }

    pub(crate) fn verifying_key_bytes(
        ctx: &Ctx,
        circuit_id: &str,
    ) -> Result<Vec<u8>, ComputeError> {
        ctx.store
            .get(Module::Compute, &keys::verifying_key_key(circuit_id))?
            .ok_or_else(|| ComputeError::VerifyingKeyMissing {
                circuit_id: circuit_id.to_string(),
            })
    }

    pub(crate) fn load_provider(ctx: &Ctx, addr: &Address) -> Result<Provider, ComputeError> {
        get_typed(ctx.store, Module::Compute, &keys::provider_key(addr))?
            .ok_or(ComputeError::ProviderNotFound)
    }

    pub(crate) fn save_provider(
        ctx: &mut Ctx,
        provider: &Provider,
    ) -> Result<(), ComputeError> {
        put_typed(
            ctx.store,
            Module::Compute,
            keys::provider_key(&provider.addr),
            provider,
        )?;
        Ok(())
    }

    pub(crate) fn load_request(
        ctx: &Ctx,
        request_id: u64,
    ) -> Result<ComputeRequest, ComputeError> {
        get_typed(ctx.store, Module::Compute, &keys::request_key(request_id))?
            .ok_or(ComputeError::RequestNotFound { request_id })
    }

    pub(crate) fn save_request(
        ctx: &mut Ctx,
        request: &ComputeRequest,
    ) -> Result<(), ComputeError> {
        put_typed(
            ctx.store,
            Module::Compute,
            keys::request_key(request.id),
            request,
        )?;
        Ok(())
    }

    pub(crate) fn load_escrow(ctx: &Ctx, request_id: u64) -> Result<Escrow, ComputeError> {
        get_typed(ctx.store, Module::Compute, &keys::escrow_key(request_id))?
            .ok_or(ComputeError::EscrowNotFound { request_id })
    }

    pub(crate) fn save_escrow(ctx: &mut Ctx, escrow: &Escrow) -> Result<(), ComputeError> {
        put_typed(
            ctx.store,
            Module::Compute,
            keys::escrow_key(escrow.request_id),
            escrow,
        )?;
        Ok(())
    }

    pub(crate) fn next_id(ctx: &mut Ctx, seq_key: Vec<u8>) -> Result<u64, ComputeError> {
        let next: u64 = get_typed(ctx.store, Module::Compute, &seq_key)?.unwrap_or(0) + 1;
        put_typed(ctx.store, Module::Compute, seq_key, &next)?;
        Ok(next)
    }

    /// Module-wide pause: the compute module's global circuit breaker.
    /// Set by the runtime when an invariant-class failure escalates, or by
    /// governance; cleared by governance.
    pub fn set_paused(ctx: &mut Ctx, paused: bool) -> Result<(), ComputeError> {
        if paused {
            ctx.store
                .set(Module::Compute, keys::paused_key(), vec![1])?;
            tracing::warn!("compute module paused");
        } else {
            ctx.store.delete(Module::Compute, keys::paused_key())?;
            tracing::info!("compute module unpaused");
        }
        Ok(())
    }

    pub(crate) fn check_not_paused(ctx: &Ctx) -> Result<(), ComputeError> {
        if ctx.store.get(Module::Compute, &keys::paused_key())?.is_some() {
            return Err(ComputeError::ModulePaused);
        }
        Ok(())
    }
}
