//! # Request Submission & Escrow
//!
//! Opening an escrow is one atomic scope: payment transfer, the `LOCKED`
//! record, and both timeout indices (forward for the end-blocker scan,
//! reverse for O(1) lookup). If any step fails nothing lands — the escrow
//! integrity invariant depends on it.

use shared_types::{Address, Coin, Event, Module};

use paw_store::codec::put_typed;
use paw_store::{Ctx, Ledger};

use crate::domain::entities::{
    ComputeRequest, Escrow, EscrowStatus, JobSpec, RequestStatus,
};
use crate::domain::errors::ComputeError;
use crate::domain::keys;
use crate::events;

use super::ComputeEngine;

impl ComputeEngine {
    /// Submit a job request with escrowed payment. The provider is chosen
    /// by the caller or, when `provider` is `None`, by seeded selection.
    pub fn submit_request(
        &self,
        ctx: &mut Ctx,
        requester: &Address,
        spec: JobSpec,
        payment: Coin,
        provider: Option<Address>,
    ) -> Result<u64, ComputeError> {
        let params = Self::params(ctx)?;
        Self::check_not_paused(ctx)?;
        if payment.amount == 0 {
            return Err(ComputeError::InvalidJobSpec {
                reason: "payment must be positive".into(),
            });
        }
        if spec.capability.is_empty() || spec.circuit_id.is_empty() {
            return Err(ComputeError::InvalidJobSpec {
                reason: "capability and circuit are required".into(),
            });
        }
        // Verifying key must exist before anyone escrows against it.
        Self::verifying_key_bytes(ctx, &spec.circuit_id)?;

        // Balance check before any escrow write.
        let available = Ledger::balance(ctx.store, requester, &payment.denom)?;
        if available < payment.amount {
            return Err(ComputeError::Ledger(
                paw_store::LedgerError::InsufficientBalance {
                    denom: payment.denom.clone(),
                    required: payment.amount,
                    available,
                },
            ));
        }

        let provider_addr = match provider {
            Some(addr) => {
                let p = Self::load_provider(ctx, &addr)?;
                if p.jailed {
                    return Err(ComputeError::ProviderJailed);
                }
                if !p.capabilities.contains(&spec.capability) {
                    return Err(ComputeError::NoCapableProvider {
                        capability: spec.capability.clone(),
                    });
                }
                addr
            }
            None => self.select_provider(ctx, &spec.capability)?,
        };

        ctx.scoped(|ctx| {
            let request_id = Self::next_id(ctx, keys::request_seq_key())?;
            Ledger::transfer(
                ctx.store,
                requester,
                &Module::Compute.account(),
                &[payment.clone()],
            )?;
            let timeout_height = ctx.block.height + params.escrow_timeout_blocks;
            let timeout_time = ctx.block.time_unix + params.escrow_timeout_seconds;
            let escrow = Escrow {
                request_id,
                amount: payment.clone(),
                status: EscrowStatus::Locked,
                timeout_height,
                timeout_time_unix: timeout_time,
                release_height: None,
                release_time_unix: None,
            };
            Self::save_escrow(ctx, &escrow)?;
            put_typed(
                ctx.store,
                Module::Compute,
                keys::timeout_fwd_key(timeout_height, request_id),
                &(),
            )?;
            put_typed(
                ctx.store,
                Module::Compute,
                keys::timeout_rev_key(request_id),
                &timeout_height,
            )?;
            let request = ComputeRequest {
                id: request_id,
                requester: requester.clone(),
                provider: provider_addr.clone(),
                spec,
                payment,
                status: RequestStatus::Pending,
                created_height: ctx.block.height,
                result_hash: None,
                completed_height: None,
            };
            Self::save_request(ctx, &request)?;
            ctx.emit(
                Event::new(events::REQUEST_SUBMITTED)
                    .attr("request_id", request_id)
                    .attr("requester", requester)
                    .attr("provider", &provider_addr)
                    .attr("timeout_height", timeout_height),
            );
            Ok(request_id)
        })
    }

    /// Up to `max_batch_requests` requests, all-or-nothing.
    pub fn submit_batch_requests(
        &self,
        ctx: &mut Ctx,
        requester: &Address,
        requests: Vec<(JobSpec, Coin, Option<Address>)>,
    ) -> Result<Vec<u64>, ComputeError> {
        let params = Self::params(ctx)?;
        if requests.is_empty() {
            return Err(ComputeError::EmptyBatch);
        }
        if requests.len() > params.max_batch_requests {
            return Err(ComputeError::BatchTooLarge {
                got: requests.len(),
                max: params.max_batch_requests,
            });
        }
        ctx.scoped(|ctx| {
            let mut ids = Vec::with_capacity(requests.len());
            for (spec, payment, provider) in requests {
                ids.push(self.submit_request(ctx, requester, spec, payment, provider)?);
            }
            Ok(ids)
        })
    }

    /// Cancel a pending request and refund its escrow.
    pub fn cancel_request(
        &self,
        ctx: &mut Ctx,
        sender: &Address,
        request_id: u64,
    ) -> Result<(), ComputeError> {
        ctx.scoped(|ctx| {
            let mut request = Self::load_request(ctx, request_id)?;
            if request.requester != *sender {
                return Err(ComputeError::NotRequester { request_id });
            }
            if request.status != RequestStatus::Pending {
                return Err(ComputeError::RequestNotPending { request_id });
            }
            let mut escrow = Self::load_escrow(ctx, request_id)?;
            if escrow.status != EscrowStatus::Locked {
                return Err(ComputeError::EscrowWrongStatus {
                    request_id,
                    status: format!("{:?}", escrow.status),
                });
            }
            Ledger::transfer(
                ctx.store,
                &Module::Compute.account(),
                sender,
                &[escrow.amount.clone()],
            )?;
            escrow.status = EscrowStatus::Refunded;
            Self::save_escrow(ctx, &escrow)?;
            Self::drop_timeout_indices(ctx, request_id, escrow.timeout_height)?;
            request.status = RequestStatus::Cancelled;
            Self::save_request(ctx, &request)?;
            ctx.emit(Event::new(events::REQUEST_CANCELLED).attr("request_id", request_id));
            Ok(())
        })
    }

    pub(crate) fn drop_timeout_indices(
        ctx: &mut Ctx,
        request_id: u64,
        timeout_height: u64,
    ) -> Result<(), ComputeError> {
        ctx.store.delete(
            Module::Compute,
            keys::timeout_fwd_key(timeout_height, request_id),
        )?;
        ctx.store
            .delete(Module::Compute, keys::timeout_rev_key(request_id))?;
        Ok(())
    }

    /// Escrow integrity check used by tests and genesis import: the module
    /// balance must cover every open escrow.
    pub fn check_escrow_integrity(ctx: &Ctx) -> Result<(), ComputeError> {
        use std::collections::BTreeMap;
        let mut owed: BTreeMap<String, u128> = BTreeMap::new();
        for (_, v) in ctx.store.range(Module::Compute, &keys::escrow_prefix())? {
            let escrow: Escrow = match bincode::deserialize(&v) {
                Ok(e) => e,
                Err(_) => continue,
            };
            if matches!(escrow.status, EscrowStatus::Locked | EscrowStatus::Challenged) {
                *owed.entry(escrow.amount.denom.to_string()).or_insert(0) +=
                    escrow.amount.amount;
            }
        }
        let module = Module::Compute.account();
        for (denom, amount) in owed {
            let denom = shared_types::Denom::new(denom.clone()).ok_or_else(|| {
                ComputeError::InvariantViolation {
                    detail: format!("bad denom {denom} in escrow"),
                }
            })?;
            let held = Ledger::balance(ctx.store, &module, &denom)?;
            if held < amount {
                return Err(ComputeError::InvariantViolation {
                    detail: format!(
                        "module holds {held} {denom} but owes {amount} in open escrows"
                    ),
                });
            }
        }
        Ok(())
    }
}
