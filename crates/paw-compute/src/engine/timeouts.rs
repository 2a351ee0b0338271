//! # Escrow Timeouts & Releases
//!
//! End-blocker settlement, both directions driven by height-keyed forward
//! indices and double-checked against the wall-clock deadline so a few
//! seconds of block-time drift cannot force an early settlement:
//!
//! - timeout scan: refund `LOCKED` escrows whose request never completed;
//! - release scan: pay out completed requests whose dispute window closed.

use shared_types::{Event, Module};

use paw_store::{Ctx, Ledger};

use crate::domain::entities::{EscrowStatus, RequestStatus};
use crate::domain::errors::ComputeError;
use crate::domain::keys;
use crate::events;

use super::ComputeEngine;

impl ComputeEngine {
    /// Refund escrows whose dual timeout deadline has passed.
    pub(crate) fn process_timeouts(&self, ctx: &mut Ctx) -> Result<u32, ComputeError> {
        let due = ctx.store.range_between(
            Module::Compute,
            &keys::timeout_fwd_prefix(),
            Some(&keys::timeout_fwd_end(ctx.block.height)),
        )?;
        let mut refunded = 0u32;
        for (index_key, _) in due {
            if index_key.len() != 18 {
                continue;
            }
            let mut id_be = [0u8; 8];
            id_be.copy_from_slice(&index_key[10..18]);
            let request_id = u64::from_be_bytes(id_be);
            let escrow = match Self::load_escrow(ctx, request_id) {
                Ok(e) => e,
                Err(_) => {
                    ctx.store.delete(Module::Compute, index_key)?;
                    continue;
                }
            };
            if escrow.status != EscrowStatus::Locked {
                ctx.store.delete(Module::Compute, index_key)?;
                continue;
            }
            // Height deadline passed (the scan guarantees it); the
            // wall-clock deadline must agree before any refund.
            if !escrow.timeout_due(ctx.block.height, ctx.block.time_unix) {
                continue;
            }
            let outcome: Result<(), ComputeError> = ctx.scoped(|ctx| {
                let mut escrow = Self::load_escrow(ctx, request_id)?;
                let mut request = Self::load_request(ctx, request_id)?;
                if request.status != RequestStatus::Pending {
                    // Completed while the index entry lingered.
                    Self::drop_timeout_indices(ctx, request_id, escrow.timeout_height)?;
                    return Ok(());
                }
                Ledger::transfer(
                    ctx.store,
                    &Module::Compute.account(),
                    &request.requester,
                    &[escrow.amount.clone()],
                )?;
                escrow.status = EscrowStatus::Refunded;
                Self::save_escrow(ctx, &escrow)?;
                Self::drop_timeout_indices(ctx, request_id, escrow.timeout_height)?;
                request.status = RequestStatus::TimedOut;
                Self::save_request(ctx, &request)?;
                self.record_failure(
                    ctx,
                    &request.provider,
                    request_id,
                    "escrow timeout: no result before deadline",
                )?;
                ctx.emit(
                    Event::new(events::ESCROW_REFUNDED)
                        .attr("request_id", request_id)
                        .attr("amount", &escrow.amount)
                        .attr("requester", &request.requester),
                );
                tracing::info!(request_id, "escrow timed out and refunded");
                Ok(())
            });
            outcome?;
            refunded += 1;
        }
        Ok(refunded)
    }

    /// Pay out completed requests whose release window has fully elapsed.
    pub(crate) fn process_releases(&self, ctx: &mut Ctx) -> Result<u32, ComputeError> {
        let params = Self::params(ctx)?;
        let due = ctx.store.range_between(
            Module::Compute,
            &keys::release_fwd_prefix(),
            Some(&keys::release_fwd_end(ctx.block.height)),
        )?;
        let mut released = 0u32;
        for (index_key, _) in due {
            if index_key.len() != 18 {
                continue;
            }
            let mut id_be = [0u8; 8];
            id_be.copy_from_slice(&index_key[10..18]);
            let request_id = u64::from_be_bytes(id_be);
            let escrow = match Self::load_escrow(ctx, request_id) {
                Ok(e) => e,
                Err(_) => {
                    ctx.store.delete(Module::Compute, index_key)?;
                    continue;
                }
            };
            match escrow.status {
                // Dispute in flight: resolution settles the escrow.
                EscrowStatus::Challenged => continue,
                EscrowStatus::Locked => {}
                _ => {
                    ctx.store.delete(Module::Compute, index_key)?;
                    continue;
                }
            }
            if !escrow.release_due(ctx.block.height, ctx.block.time_unix) {
                continue;
            }
            ctx.scoped(|ctx| {
                self.settle_release(ctx, request_id, &params)?;
                ctx.store.delete(Module::Compute, index_key.clone())?;
                Ok::<(), ComputeError>(())
            })?;
            released += 1;
        }
        Ok(released)
    }

    /// Move a `LOCKED` escrow of a completed request to `RELEASED` and pay
    /// the provider, minus the protocol fee.
    pub(crate) fn settle_release(
        &self,
        ctx: &mut Ctx,
        request_id: u64,
        params: &crate::domain::params::ComputeParams,
    ) -> Result<(), ComputeError> {
        let mut escrow = Self::load_escrow(ctx, request_id)?;
        let request = Self::load_request(ctx, request_id)?;
        let fee = escrow.amount.amount.saturating_mul(params.protocol_fee_bps as u128) / 10_000;
        let payout = escrow.amount.amount - fee;
        Ledger::transfer(
            ctx.store,
            &Module::Compute.account(),
            &request.provider,
            &[shared_types::Coin::new(escrow.amount.denom.clone(), payout)],
        )?;
        escrow.status = EscrowStatus::Released;
        Self::save_escrow(ctx, &escrow)?;
        ctx.emit(
            Event::new(events::ESCROW_RELEASED)
                .attr("request_id", request_id)
                .attr("provider", &request.provider)
                .attr("amount", payout),
        );
        Ok(())
    }
}
