//! # Compute Messages

use serde::{Deserialize, Serialize};
use shared_types::{Address, Coin};

use paw_store::Ctx;

use crate::domain::entities::JobSpec;
use crate::domain::errors::ComputeError;
use crate::engine::{ComputeEngine, VotingPowerView};
use crate::hooks::ComputeHooks;

/// One request inside a batch.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RequestLeg {
    pub spec: JobSpec,
    pub payment: Coin,
    pub provider: Option<Address>,
}

/// All compute operations.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum ComputeMsg {
    RegisterProvider {
        sender: Address,
        stake: u128,
        capabilities: Vec<String>,
        endpoint: String,
    },
    RegisterSigningKey {
        sender: Address,
        pubkey: [u8; 32],
    },
    SubmitRequest {
        sender: Address,
        spec: JobSpec,
        payment: Coin,
        provider: Option<Address>,
    },
    SubmitBatchRequests {
        sender: Address,
        requests: Vec<RequestLeg>,
    },
    SubmitResult {
        sender: Address,
        request_id: u64,
        result_hash: [u8; 32],
        proof: Vec<u8>,
        nonce: u64,
        signature: Vec<u8>,
    },
    CancelRequest {
        sender: Address,
        request_id: u64,
    },
    SubmitDispute {
        sender: Address,
        request_id: u64,
        evidence: Vec<u8>,
    },
    VoteDispute {
        sender: Address,
        dispute_id: u64,
        support: bool,
    },
    Appeal {
        sender: Address,
        dispute_id: u64,
    },
}

impl ComputeMsg {
    pub fn sender(&self) -> &Address {
        match self {
            ComputeMsg::RegisterProvider { sender, .. }
            | ComputeMsg::RegisterSigningKey { sender, .. }
            | ComputeMsg::SubmitRequest { sender, .. }
            | ComputeMsg::SubmitBatchRequests { sender, .. }
            | ComputeMsg::SubmitResult { sender, .. }
            | ComputeMsg::CancelRequest { sender, .. }
            | ComputeMsg::SubmitDispute { sender, .. }
            | ComputeMsg::VoteDispute { sender, .. }
            | ComputeMsg::Appeal { sender, .. } => sender,
        }
    }
}

impl ComputeEngine {
    /// Execute one message. Direct (non-IBC) submissions use the `local`
    /// replay channel.
    pub fn handle(
        &self,
        ctx: &mut Ctx,
        hooks: &dyn ComputeHooks,
        powers: &dyn VotingPowerView,
        msg: &ComputeMsg,
    ) -> Result<(), ComputeError> {
        match msg {
            ComputeMsg::RegisterProvider {
                sender,
                stake,
                capabilities,
                endpoint,
            } => self.register_provider(
                ctx,
                sender,
                *stake,
                capabilities.clone(),
                endpoint.clone(),
            ),
            ComputeMsg::RegisterSigningKey { sender, pubkey } => {
                self.register_signing_key(ctx, sender, *pubkey)
            }
            ComputeMsg::SubmitRequest {
                sender,
                spec,
                payment,
                provider,
            } => self
                .submit_request(ctx, sender, spec.clone(), payment.clone(), provider.clone())
                .map(|_| ()),
            ComputeMsg::SubmitBatchRequests { sender, requests } => {
                let legs = requests
                    .iter()
                    .map(|r| (r.spec.clone(), r.payment.clone(), r.provider.clone()))
                    .collect();
                self.submit_batch_requests(ctx, sender, legs).map(|_| ())
            }
            ComputeMsg::SubmitResult {
                sender,
                request_id,
                result_hash,
                proof,
                nonce,
                signature,
            } => self.submit_result(
                ctx,
                hooks,
                sender,
                "local",
                *request_id,
                *result_hash,
                proof,
                *nonce,
                signature,
            ),
            ComputeMsg::CancelRequest { sender, request_id } => {
                self.cancel_request(ctx, sender, *request_id)
            }
            ComputeMsg::SubmitDispute {
                sender,
                request_id,
                evidence,
            } => self
                .submit_dispute(ctx, sender, *request_id, evidence)
                .map(|_| ()),
            ComputeMsg::VoteDispute {
                sender,
                dispute_id,
                support,
            } => self.vote_dispute(ctx, hooks, powers, sender, *dispute_id, *support),
            ComputeMsg::Appeal { sender, dispute_id } => {
                self.appeal(ctx, sender, *dispute_id).map(|_| ())
            }
        }
    }
}
