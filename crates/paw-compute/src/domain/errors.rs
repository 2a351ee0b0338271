//! # Compute Error Types

use shared_types::{ChainError, ErrorKind};
use thiserror::Error;

use paw_store::{LedgerError, StoreError};

/// Errors raised by the compute engine.
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("provider already registered")]
    ProviderExists,

    #[error("provider not registered")]
    ProviderNotFound,

    #[error("provider registry full ({max} providers)")]
    ProviderCapReached { max: u64 },

    #[error("stake {got} below the {min} minimum")]
    StakeTooLow { got: u128, min: u128 },

    #[error("endpoint must be HTTPS (loopback exempt): {endpoint}")]
    EndpointNotHttps { endpoint: String },

    #[error("provider is jailed")]
    ProviderJailed,

    /// The module-wide breaker is engaged; new work is refused.
    #[error("compute module paused")]
    ModulePaused,

    #[error("provider has no registered signing key")]
    SigningKeyMissing,

    #[error("signing key is malformed or weak")]
    BadKey,

    #[error("result signature invalid")]
    BadSignature,

    #[error("no provider offers capability {capability}")]
    NoCapableProvider { capability: String },

    #[error("request {request_id} not found")]
    RequestNotFound { request_id: u64 },

    #[error("request {request_id} is not awaiting a result")]
    RequestNotPending { request_id: u64 },

    #[error("sender is not the assigned provider for request {request_id}")]
    WrongProvider { request_id: u64 },

    #[error("sender is not the requester of request {request_id}")]
    NotRequester { request_id: u64 },

    #[error("escrow for request {request_id} not found")]
    EscrowNotFound { request_id: u64 },

    #[error("escrow for request {request_id} is {status}")]
    EscrowWrongStatus { request_id: u64, status: String },

    #[error("nonce {nonce} already seen for this sender")]
    NonceReplayed { nonce: u64 },

    #[error("no verifying key registered for circuit {circuit_id}")]
    VerifyingKeyMissing { circuit_id: String },

    #[error("verifying key or proof bytes malformed: {reason}")]
    MalformedProof { reason: String },

    #[error("Groth16 proof rejected")]
    ProofRejected,

    /// The verifier itself failed, which no honest input can cause.
    #[error("proof verifier internal failure: {reason}")]
    VerifierFailure { reason: String },

    #[error("evidence of {got} bytes exceeds the {max} byte cap")]
    EvidenceTooLarge { got: usize, max: usize },

    #[error("dispute {dispute_id} not found")]
    DisputeNotFound { dispute_id: u64 },

    #[error("dispute {dispute_id} is closed")]
    DisputeClosed { dispute_id: u64 },

    #[error("duplicate vote on dispute {dispute_id}")]
    AlreadyVoted { dispute_id: u64 },

    #[error("voter has no voting power")]
    NoVotingPower,

    #[error("dispute {dispute_id} is not appealable")]
    NotAppealable { dispute_id: u64 },

    #[error("batch of {got} exceeds the {max} request limit")]
    BatchTooLarge { got: usize, max: usize },

    #[error("empty batch")]
    EmptyBatch,

    #[error("invalid job spec: {reason}")]
    InvalidJobSpec { reason: String },

    #[error("unauthorized: {reason}")]
    Unauthorized { reason: String },

    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    /// Module escrow accounting no longer matches held balances.
    #[error("escrow invariant violation: {detail}")]
    InvariantViolation { detail: String },

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ChainError for ComputeError {
    fn kind(&self) -> ErrorKind {
        use ComputeError::*;
        match self {
            ProviderExists
            | ProviderNotFound
            | EndpointNotHttps { .. }
            | BadKey
            | RequestNotFound { .. }
            | EscrowNotFound { .. }
            | VerifyingKeyMissing { .. }
            | MalformedProof { .. }
            | EvidenceTooLarge { .. }
            | DisputeNotFound { .. }
            | NotAppealable { .. }
            | BatchTooLarge { .. }
            | EmptyBatch
            | InvalidJobSpec { .. }
            | InvalidParams(_) => ErrorKind::Validation,
            Unauthorized { .. }
            | WrongProvider { .. }
            | NotRequester { .. }
            | SigningKeyMissing
            | BadSignature
            | ProofRejected => ErrorKind::Authorization,
            ProviderCapReached { .. }
            | StakeTooLow { .. }
            | ProviderJailed
            | NoCapableProvider { .. }
            | NoVotingPower => ErrorKind::Resource,
            RequestNotPending { .. }
            | EscrowWrongStatus { .. }
            | NonceReplayed { .. }
            | DisputeClosed { .. }
            | AlreadyVoted { .. }
            | ModulePaused => ErrorKind::Contention,
            InvariantViolation { .. } => ErrorKind::Invariant,
            VerifierFailure { .. } => ErrorKind::Fatal,
            Ledger(e) => e.kind(),
            Store(e) => e.kind(),
        }
    }

    fn remediation(&self) -> Option<String> {
        match self {
            ComputeError::SigningKeyMissing => {
                Some("call RegisterSigningKey before submitting results".into())
            }
            ComputeError::NonceReplayed { nonce } => {
                Some(format!("resubmit with a nonce above {nonce}"))
            }
            _ => None,
        }
    }
}
