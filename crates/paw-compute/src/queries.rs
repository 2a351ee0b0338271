//! # Compute Queries

use serde::{Deserialize, Serialize};
use shared_types::{Address, Coin};

use paw_store::Ctx;

use crate::domain::entities::{
    CatastrophicFailure, ComputeRequest, Dispute, Escrow, JobSpec, Provider,
};
use crate::domain::errors::ComputeError;
use crate::engine::ComputeEngine;

/// Dry-run result for a prospective request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RequestEstimate {
    pub provider: Address,
    pub timeout_height: u64,
    pub timeout_time_unix: u64,
}

impl ComputeEngine {
    pub fn query_provider(ctx: &Ctx, addr: &Address) -> Result<Provider, ComputeError> {
        Self::load_provider(ctx, addr)
    }

    pub fn query_providers(ctx: &Ctx) -> Result<Vec<Provider>, ComputeError> {
        Self::all_providers(ctx)
    }

    pub fn query_request(ctx: &Ctx, request_id: u64) -> Result<ComputeRequest, ComputeError> {
        Self::load_request(ctx, request_id)
    }

    pub fn query_escrow(ctx: &Ctx, request_id: u64) -> Result<Escrow, ComputeError> {
        Self::load_escrow(ctx, request_id)
    }

    pub fn query_dispute(ctx: &Ctx, dispute_id: u64) -> Result<Dispute, ComputeError> {
        Self::load_dispute(ctx, dispute_id)
    }

    pub fn query_failures(ctx: &Ctx) -> Result<Vec<CatastrophicFailure>, ComputeError> {
        Self::all_failures(ctx)
    }

    /// Validate a request without executing it: checks the spec, the
    /// verifying key, the payment balance, and resolves the provider that
    /// selection would pick.
    pub fn simulate_request(
        &self,
        ctx: &Ctx,
        requester: &Address,
        spec: &JobSpec,
        payment: &Coin,
    ) -> Result<RequestEstimate, ComputeError> {
        let params = Self::params(ctx)?;
        if payment.amount == 0 {
            return Err(ComputeError::InvalidJobSpec {
                reason: "payment must be positive".into(),
            });
        }
        Self::verifying_key_bytes(ctx, &spec.circuit_id)?;
        let available = paw_store::Ledger::balance(ctx.store, requester, &payment.denom)?;
        if available < payment.amount {
            return Err(ComputeError::Ledger(
                paw_store::LedgerError::InsufficientBalance {
                    denom: payment.denom.clone(),
                    required: payment.amount,
                    available,
                },
            ));
        }
        let provider = self.select_provider(ctx, &spec.capability)?;
        Ok(RequestEstimate {
            provider,
            timeout_height: ctx.block.height + params.escrow_timeout_blocks,
            timeout_time_unix: ctx.block.time_unix + params.escrow_timeout_seconds,
        })
    }
}
