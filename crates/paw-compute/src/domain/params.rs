//! # Compute Parameters

use serde::{Deserialize, Serialize};
use shared_types::Address;

/// Governance-mutable compute parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputeParams {
    /// Account allowed to register verifying keys and update params.
    pub authority: Address,
    pub min_provider_stake: u128,
    /// Hard provider-count cap, enforced via an O(1) counter.
    pub max_providers: u64,
    /// Evidence payload cap, bytes (1 MiB).
    pub max_evidence_size_bytes: usize,
    /// Escrow timeout, blocks after request creation.
    pub escrow_timeout_blocks: u64,
    /// Escrow timeout, seconds of block time after creation.
    pub escrow_timeout_seconds: u64,
    /// Dispute window between a verified result and payment release,
    /// blocks.
    pub escrow_release_delay_blocks: u64,
    /// Same window in seconds of block time.
    pub escrow_release_delay_seconds: u64,
    /// Quorum fraction to decide a dispute, basis points of total power.
    pub dispute_quorum_bps: u32,
    /// Higher quorum for appeals, basis points.
    pub appeal_quorum_bps: u32,
    /// Provider slash on an upheld dispute, basis points of stake (1%).
    pub dispute_slash_bps: u32,
    /// Protocol's cut of released payments, basis points.
    pub protocol_fee_bps: u32,
    pub max_batch_requests: usize,
    /// Reject non-HTTPS endpoints (loopback exempt, always).
    pub require_https: bool,
}

impl Default for ComputeParams {
    fn default() -> Self {
        Self {
            authority: Address::new("paw1gov").expect("static address"),
            min_provider_stake: 1_000_000,
            max_providers: 10_000,
            max_evidence_size_bytes: 1_048_576,
            escrow_timeout_blocks: 100,
            escrow_timeout_seconds: 600,
            escrow_release_delay_blocks: 50,
            escrow_release_delay_seconds: 300,
            dispute_quorum_bps: 5_000,
            appeal_quorum_bps: 6_667,
            dispute_slash_bps: 100,
            protocol_fee_bps: 0,
            max_batch_requests: 20,
            require_https: true,
        }
    }
}

impl ComputeParams {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_providers == 0 {
            return Err("provider cap must be positive".into());
        }
        if self.escrow_timeout_blocks == 0 || self.escrow_timeout_seconds == 0 {
            return Err("escrow timeouts must be positive".into());
        }
        if self.dispute_quorum_bps == 0 || self.dispute_quorum_bps > 10_000 {
            return Err("dispute quorum must be within (0, 100%]".into());
        }
        if self.appeal_quorum_bps < self.dispute_quorum_bps || self.appeal_quorum_bps > 10_000 {
            return Err("appeal quorum must be at least the dispute quorum".into());
        }
        if self.dispute_slash_bps > 10_000 || self.protocol_fee_bps > 10_000 {
            return Err("fractions cannot exceed 100%".into());
        }
        if self.max_batch_requests == 0 {
            return Err("batch size must be positive".into());
        }
        Ok(())
    }
}
