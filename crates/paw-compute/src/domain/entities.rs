//! # Compute Entities

use serde::{Deserialize, Serialize};
use shared_types::{Address, Coin};

/// A registered compute provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    pub addr: Address,
    pub stake: u128,
    /// Capabilities offered (e.g. `gpu`, `zk-prover`).
    pub capabilities: Vec<String>,
    /// HTTPS endpoint (loopback exempt from the HTTPS requirement).
    pub endpoint: String,
    /// Registered ed25519 result-signing key. Results are rejected until
    /// one is registered; there is no trust-on-first-use.
    pub signing_key: Option<[u8; 32]>,
    /// Starts at 100; moves with job outcomes and disputes.
    pub reputation: i64,
    pub jobs_completed: u64,
    pub jobs_failed: u64,
    pub jailed: bool,
    pub registered_height: u64,
}

/// Job specification carried by a request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSpec {
    /// Capability the provider must offer.
    pub capability: String,
    /// Circuit whose governance-registered verifying key checks results.
    pub circuit_id: String,
    /// Hash of the job input payload.
    pub input_hash: [u8; 32],
}

/// Request lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestStatus {
    /// Escrow locked, waiting for the provider's result.
    Pending,
    /// Result verified; escrow awaiting its release window.
    Completed,
    Cancelled,
    TimedOut,
    /// Dispute upheld against the provider.
    Failed,
}

/// An escrowed compute request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputeRequest {
    pub id: u64,
    pub requester: Address,
    pub provider: Address,
    pub spec: JobSpec,
    pub payment: Coin,
    pub status: RequestStatus,
    pub created_height: u64,
    /// Verified result hash, set on completion.
    pub result_hash: Option<[u8; 32]>,
    pub completed_height: Option<u64>,
}

/// Escrow status machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EscrowStatus {
    Locked,
    Challenged,
    Released,
    Refunded,
}

/// Payment held by the module for a pending request. Settlement requires
/// both the height and the wall-clock deadline to have passed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Escrow {
    pub request_id: u64,
    pub amount: Coin,
    pub status: EscrowStatus,
    pub timeout_height: u64,
    pub timeout_time_unix: u64,
    /// Set when a verified result starts the release window.
    pub release_height: Option<u64>,
    pub release_time_unix: Option<u64>,
}

impl Escrow {
    /// Whether the dual timeout deadline has passed.
    pub fn timeout_due(&self, height: u64, time_unix: u64) -> bool {
        height >= self.timeout_height && time_unix >= self.timeout_time_unix
    }

    /// Whether the dual release deadline has passed.
    pub fn release_due(&self, height: u64, time_unix: u64) -> bool {
        match (self.release_height, self.release_time_unix) {
            (Some(h), Some(t)) => height >= h && time_unix >= t,
            _ => false,
        }
    }
}

/// Dispute status machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisputeStatus {
    Open,
    UnderReview,
    Upheld,
    Rejected,
}

impl DisputeStatus {
    /// Legal transitions; everything else is refused.
    pub fn can_transition_to(self, next: DisputeStatus) -> bool {
        matches!(
            (self, next),
            (DisputeStatus::Open, DisputeStatus::UnderReview)
                | (DisputeStatus::UnderReview, DisputeStatus::Upheld)
                | (DisputeStatus::UnderReview, DisputeStatus::Rejected)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, DisputeStatus::Upheld | DisputeStatus::Rejected)
    }
}

/// A challenge against a verified result.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dispute {
    pub id: u64,
    pub request_id: u64,
    pub challenger: Address,
    pub provider: Address,
    /// SHA-256 of the submitted evidence.
    pub evidence_hash: [u8; 32],
    pub evidence_size: usize,
    pub status: DisputeStatus,
    /// Weight voting against the provider.
    pub weight_for: u128,
    /// Weight voting for the provider.
    pub weight_against: u128,
    pub voters: Vec<Address>,
    pub opened_height: u64,
    /// Set when this dispute is the appeal of an earlier one. Appeals are
    /// terminal: no second appeal.
    pub appeal_of: Option<u64>,
}

/// Persistent record of a catastrophic provider failure. Exported and
/// re-imported by genesis.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatastrophicFailure {
    pub id: u64,
    pub provider: Address,
    pub request_id: u64,
    pub reason: String,
    pub height: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispute_transitions() {
        assert!(DisputeStatus::Open.can_transition_to(DisputeStatus::UnderReview));
        assert!(DisputeStatus::UnderReview.can_transition_to(DisputeStatus::Upheld));
        assert!(!DisputeStatus::Open.can_transition_to(DisputeStatus::Upheld));
        assert!(!DisputeStatus::Upheld.can_transition_to(DisputeStatus::Rejected));
        assert!(DisputeStatus::Upheld.is_terminal());
    }

    #[test]
    fn test_escrow_dual_deadline() {
        let escrow = Escrow {
            request_id: 1,
            amount: Coin::new(shared_types::Denom::new("upaw").unwrap(), 100),
            status: EscrowStatus::Locked,
            timeout_height: 100,
            timeout_time_unix: 600,
            release_height: None,
            release_time_unix: None,
        };
        assert!(!escrow.timeout_due(99, 600));
        assert!(!escrow.timeout_due(100, 599));
        assert!(escrow.timeout_due(100, 600));
        assert!(!escrow.release_due(1_000, 1_000));
    }
}
