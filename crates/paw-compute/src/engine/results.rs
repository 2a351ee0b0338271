//! # Result Submission
//!
//! The most defended path in the module. Order matters:
//!
//! 1. request and provider checks (cheap rejections first),
//! 2. nonce reservation — written before the expensive verification so a
//!    duplicate inside the same block is caught instantly,
//! 3. ed25519 signature against the *registered* key (strict verification,
//!    low-order points rejected),
//! 4. Groth16 proof against the circuit's registered verifying key,
//! 5. settlement: request completed, escrow moved into its release window,
//!    timeout indices dropped, nonce upgraded to used.

use shared_types::{Address, Event, Module};

use paw_store::codec::put_typed;
use paw_store::Ctx;

use crate::crypto::{groth16, signing};
use crate::domain::entities::{EscrowStatus, RequestStatus};
use crate::domain::errors::ComputeError;
use crate::domain::keys;
use crate::events;
use crate::hooks::ComputeHooks;

use super::ComputeEngine;

/// Nonce lifecycle markers.
const NONCE_RESERVED: u8 = 0;
const NONCE_USED: u8 = 1;

impl ComputeEngine {
    /// Submit a verified result for a pending request.
    #[allow(clippy::too_many_arguments)]
    pub fn submit_result(
        &self,
        ctx: &mut Ctx,
        hooks: &dyn ComputeHooks,
        sender: &Address,
        channel: &str,
        request_id: u64,
        result_hash: [u8; 32],
        proof: &[u8],
        nonce: u64,
        signature: &[u8],
    ) -> Result<(), ComputeError> {
        let params = Self::params(ctx)?;
        Self::check_not_paused(ctx)?;
        let mut request = Self::load_request(ctx, request_id)?;
        if request.status != RequestStatus::Pending {
            return Err(ComputeError::RequestNotPending { request_id });
        }
        if request.provider != *sender {
            return Err(ComputeError::WrongProvider { request_id });
        }
        let mut provider = Self::load_provider(ctx, sender)?;
        if provider.jailed {
            return Err(ComputeError::ProviderJailed);
        }
        let Some(signing_key) = provider.signing_key else {
            return Err(ComputeError::SigningKeyMissing);
        };

        // Reserve the nonce before the expensive verification; any record
        // under this key, reserved or used, is a replay.
        let nonce_key = keys::nonce_key(channel, sender, nonce);
        if ctx.store.get(Module::Compute, &nonce_key)?.is_some() {
            return Err(ComputeError::NonceReplayed { nonce });
        }
        ctx.store
            .set(Module::Compute, nonce_key.clone(), vec![NONCE_RESERVED])?;

        // Signature over the canonical message, then the proof.
        let message = signing::result_message(request_id, &result_hash, nonce, sender);
        signing::verify_result_signature(&signing_key, &message, signature)?;
        let vk_bytes = Self::verifying_key_bytes(ctx, &request.spec.circuit_id)?;
        let inputs = groth16::public_inputs(request_id, &result_hash, sender);
        groth16::verify(&vk_bytes, proof, &inputs)?;

        ctx.scoped(|ctx| {
            let mut escrow = Self::load_escrow(ctx, request_id)?;
            if escrow.status != EscrowStatus::Locked {
                return Err(ComputeError::EscrowWrongStatus {
                    request_id,
                    status: format!("{:?}", escrow.status),
                });
            }
            // The job can no longer time out; it now waits for release.
            Self::drop_timeout_indices(ctx, request_id, escrow.timeout_height)?;
            let release_height = ctx.block.height + params.escrow_release_delay_blocks;
            let release_time = ctx.block.time_unix + params.escrow_release_delay_seconds;
            escrow.release_height = Some(release_height);
            escrow.release_time_unix = Some(release_time);
            Self::save_escrow(ctx, &escrow)?;
            put_typed(
                ctx.store,
                Module::Compute,
                keys::release_fwd_key(release_height, request_id),
                &(),
            )?;

            request.status = RequestStatus::Completed;
            request.result_hash = Some(result_hash);
            request.completed_height = Some(ctx.block.height);
            Self::save_request(ctx, &request)?;

            provider.jobs_completed += 1;
            provider.reputation = (provider.reputation + 1).min(1_000);
            Self::save_provider(ctx, &provider)?;

            ctx.store
                .set(Module::Compute, nonce_key.clone(), vec![NONCE_USED])?;

            ctx.emit(
                Event::new(events::RESULT_VERIFIED)
                    .attr("request_id", request_id)
                    .attr("provider", sender)
                    .attr("result_hash", hex::encode(result_hash))
                    .attr("release_height", release_height),
            );
            hooks.after_result_verified(ctx, request_id, sender)?;
            tracing::info!(request_id, provider = %sender, "result verified");
            Ok(())
        })
    }
}
