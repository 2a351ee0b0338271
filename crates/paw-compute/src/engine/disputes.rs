//! # Dispute Workflow
//!
//! A challenge against a verified result freezes its escrow in
//! `CHALLENGED` until validator-weighted voting resolves it:
//!
//! - upheld (> quorum of weight against the provider): the provider is
//!   slashed 1% of stake and the escrow refunds to the requester;
//! - rejected: the escrow releases to the provider.
//!
//! The loser may appeal once; the appeal re-runs review at a higher quorum
//! and its decision is terminal.

use sha2::{Digest, Sha256};
use shared_types::{Address, Event, Module};

use paw_store::codec::{get_typed, put_typed};
use paw_store::{Ctx, Ledger};

use crate::domain::entities::{
    Dispute, DisputeStatus, EscrowStatus, RequestStatus,
};
use crate::domain::errors::ComputeError;
use crate::domain::keys;
use crate::events;
use crate::hooks::ComputeHooks;

use super::{ComputeEngine, VotingPowerView};

impl ComputeEngine {
    /// Open a dispute against a completed request.
    pub fn submit_dispute(
        &self,
        ctx: &mut Ctx,
        sender: &Address,
        request_id: u64,
        evidence: &[u8],
    ) -> Result<u64, ComputeError> {
        let params = Self::params(ctx)?;
        if evidence.len() > params.max_evidence_size_bytes {
            return Err(ComputeError::EvidenceTooLarge {
                got: evidence.len(),
                max: params.max_evidence_size_bytes,
            });
        }
        ctx.scoped(|ctx| {
            let request = Self::load_request(ctx, request_id)?;
            if request.requester != *sender {
                return Err(ComputeError::NotRequester { request_id });
            }
            if request.status != RequestStatus::Completed {
                return Err(ComputeError::RequestNotPending { request_id });
            }
            let mut escrow = Self::load_escrow(ctx, request_id)?;
            if escrow.status != EscrowStatus::Locked {
                return Err(ComputeError::EscrowWrongStatus {
                    request_id,
                    status: format!("{:?}", escrow.status),
                });
            }
            escrow.status = EscrowStatus::Challenged;
            Self::save_escrow(ctx, &escrow)?;

            let dispute_id = Self::next_id(ctx, keys::dispute_seq_key())?;
            let dispute = Dispute {
                id: dispute_id,
                request_id,
                challenger: sender.clone(),
                provider: request.provider.clone(),
                evidence_hash: Sha256::digest(evidence).into(),
                evidence_size: evidence.len(),
                status: DisputeStatus::Open,
                weight_for: 0,
                weight_against: 0,
                voters: Vec::new(),
                opened_height: ctx.block.height,
                appeal_of: None,
            };
            Self::save_dispute(ctx, &dispute)?;
            put_typed(
                ctx.store,
                Module::Compute,
                keys::dispute_by_request_key(request_id, dispute_id),
                &(),
            )?;
            ctx.emit(
                Event::new(events::DISPUTE_OPENED)
                    .attr("dispute_id", dispute_id)
                    .attr("request_id", request_id)
                    .attr("challenger", sender),
            );
            Ok(dispute_id)
        })
    }

    /// Cast a validator vote. `support` sides with the challenger (i.e.
    /// against the provider). Resolution triggers as soon as either side
    /// clears the quorum.
    pub fn vote_dispute(
        &self,
        ctx: &mut Ctx,
        hooks: &dyn ComputeHooks,
        powers: &dyn VotingPowerView,
        sender: &Address,
        dispute_id: u64,
        support: bool,
    ) -> Result<(), ComputeError> {
        let params = Self::params(ctx)?;
        ctx.scoped(|ctx| {
            let mut dispute = Self::load_dispute(ctx, dispute_id)?;
            if dispute.status.is_terminal() {
                return Err(ComputeError::DisputeClosed { dispute_id });
            }
            if dispute.voters.contains(sender) {
                return Err(ComputeError::AlreadyVoted { dispute_id });
            }
            let power = powers.power_of(ctx, sender)?;
            if power == 0 {
                return Err(ComputeError::NoVotingPower);
            }
            if dispute.status == DisputeStatus::Open {
                dispute.status = DisputeStatus::UnderReview;
            }
            dispute.voters.push(sender.clone());
            if support {
                dispute.weight_for += power;
            } else {
                dispute.weight_against += power;
            }
            ctx.emit(
                Event::new(events::DISPUTE_VOTE)
                    .attr("dispute_id", dispute_id)
                    .attr("voter", sender)
                    .attr("support", support),
            );

            let total = powers.total_power(ctx)?.max(1);
            let quorum_bps = if dispute.appeal_of.is_some() {
                params.appeal_quorum_bps
            } else {
                params.dispute_quorum_bps
            } as u128;
            let threshold = total.saturating_mul(quorum_bps) / 10_000;
            if dispute.weight_for > threshold {
                self.resolve(ctx, hooks, &mut dispute, true, &params)?;
            } else if dispute.weight_against > threshold {
                self.resolve(ctx, hooks, &mut dispute, false, &params)?;
            }
            Self::save_dispute(ctx, &dispute)?;
            Ok(())
        })
    }

    fn resolve(
        &self,
        ctx: &mut Ctx,
        hooks: &dyn ComputeHooks,
        dispute: &mut Dispute,
        upheld: bool,
        params: &crate::domain::params::ComputeParams,
    ) -> Result<(), ComputeError> {
        let next = if upheld {
            DisputeStatus::Upheld
        } else {
            DisputeStatus::Rejected
        };
        if !dispute.status.can_transition_to(next) {
            return Err(ComputeError::DisputeClosed {
                dispute_id: dispute.id,
            });
        }
        dispute.status = next;
        let mut escrow = Self::load_escrow(ctx, dispute.request_id)?;
        if escrow.status != EscrowStatus::Challenged {
            return Err(ComputeError::EscrowWrongStatus {
                request_id: dispute.request_id,
                status: format!("{:?}", escrow.status),
            });
        }
        if upheld {
            let provider_addr = dispute.provider.clone();
            let slashed = self.slash_provider(ctx, &provider_addr, params.dispute_slash_bps)?;
            Ledger::transfer(
                ctx.store,
                &Module::Compute.account(),
                &dispute.challenger,
                &[escrow.amount.clone()],
            )?;
            escrow.status = EscrowStatus::Refunded;
            Self::save_escrow(ctx, &escrow)?;
            let mut request = Self::load_request(ctx, dispute.request_id)?;
            request.status = RequestStatus::Failed;
            Self::save_request(ctx, &request)?;
            self.record_failure(
                ctx,
                &dispute.provider,
                dispute.request_id,
                "dispute upheld against provider",
            )?;
            ctx.emit(
                Event::new(events::DISPUTE_UPHELD)
                    .attr("dispute_id", dispute.id)
                    .attr("provider", &dispute.provider)
                    .attr("slashed", slashed),
            );
            hooks.after_provider_slashed(ctx, &dispute.provider, slashed)?;
        } else {
            self.settle_release(ctx, dispute.request_id, params)?;
            ctx.emit(
                Event::new(events::DISPUTE_REJECTED)
                    .attr("dispute_id", dispute.id)
                    .attr("provider", &dispute.provider),
            );
        }
        Ok(())
    }

    /// Appeal a decided dispute. Only the losing side may appeal, only
    /// once; the appeal reviews at the higher quorum.
    pub fn appeal(
        &self,
        ctx: &mut Ctx,
        sender: &Address,
        dispute_id: u64,
    ) -> Result<u64, ComputeError> {
        ctx.scoped(|ctx| {
            let original = Self::load_dispute(ctx, dispute_id)?;
            if original.appeal_of.is_some() {
                return Err(ComputeError::NotAppealable { dispute_id });
            }
            let loser = match original.status {
                DisputeStatus::Upheld => &original.provider,
                DisputeStatus::Rejected => &original.challenger,
                _ => {
                    return Err(ComputeError::NotAppealable { dispute_id });
                }
            };
            if sender != loser {
                return Err(ComputeError::Unauthorized {
                    reason: "only the losing side may appeal".into(),
                });
            }
            // Claw the settled leg back into escrow so the appeal's
            // decision has funds to settle with. The beneficiary of the
            // first decision fronts it; an underfunded beneficiary blocks
            // the appeal.
            let mut escrow = Self::load_escrow(ctx, original.request_id)?;
            let beneficiary = match original.status {
                DisputeStatus::Upheld => &original.challenger,
                _ => &original.provider,
            };
            Ledger::transfer(
                ctx.store,
                beneficiary,
                &Module::Compute.account(),
                &[escrow.amount.clone()],
            )?;
            escrow.status = EscrowStatus::Challenged;
            Self::save_escrow(ctx, &escrow)?;

            let appeal_id = Self::next_id(ctx, keys::dispute_seq_key())?;
            let appeal = Dispute {
                id: appeal_id,
                request_id: original.request_id,
                challenger: original.challenger.clone(),
                provider: original.provider.clone(),
                evidence_hash: original.evidence_hash,
                evidence_size: original.evidence_size,
                status: DisputeStatus::Open,
                weight_for: 0,
                weight_against: 0,
                voters: Vec::new(),
                opened_height: ctx.block.height,
                appeal_of: Some(dispute_id),
            };
            Self::save_dispute(ctx, &appeal)?;
            put_typed(
                ctx.store,
                Module::Compute,
                keys::dispute_by_request_key(original.request_id, appeal_id),
                &(),
            )?;
            ctx.emit(
                Event::new(events::DISPUTE_APPEALED)
                    .attr("dispute_id", dispute_id)
                    .attr("appeal_id", appeal_id),
            );
            Ok(appeal_id)
        })
    }

    pub(crate) fn load_dispute(ctx: &Ctx, dispute_id: u64) -> Result<Dispute, ComputeError> {
        get_typed(ctx.store, Module::Compute, &keys::dispute_key(dispute_id))?
            .ok_or(ComputeError::DisputeNotFound { dispute_id })
    }

    pub(crate) fn save_dispute(ctx: &mut Ctx, dispute: &Dispute) -> Result<(), ComputeError> {
        put_typed(
            ctx.store,
            Module::Compute,
            keys::dispute_key(dispute.id),
            dispute,
        )?;
        Ok(())
    }
}
