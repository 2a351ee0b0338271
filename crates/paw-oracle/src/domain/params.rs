//! # Oracle Parameters
//!
//! `min_validators_for_security` and `min_geographic_regions` are immutable
//! after genesis; the update path refuses to change them.

use serde::{Deserialize, Serialize};
use shared_types::Address;

/// Governance-mutable oracle parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleParams {
    /// Account allowed to whitelist assets and set price overrides.
    pub authority: Address,
    /// Blocks per vote period.
    pub vote_period_blocks: u64,
    /// Minimum surviving submissions for a secure aggregation. Immutable.
    pub min_validators_for_security: u32,
    /// Minimum distinct regions across the validator set. Immutable.
    pub min_geographic_regions: u32,
    /// Maximum validators sharing one IP.
    pub max_validators_per_ip: u32,
    /// Maximum validators sharing one ASN.
    pub max_validators_per_asn: u32,
    /// Minimum stake to register.
    pub min_validator_stake: u128,
    /// Minimum blocks between submissions from one validator.
    pub min_blocks_between_submissions: u64,
    /// Submissions older than this many blocks are discarded.
    pub max_data_staleness_blocks: u64,
    /// Submission budget per rate window.
    pub max_submissions_per_window: u32,
    /// Rate window length, blocks.
    pub rate_limit_window: u64,
    /// Byzantine violations are warnings during the first N blocks.
    pub bootstrap_grace_period_blocks: u64,
    /// Outlier history retention, blocks.
    pub max_outlier_history_blocks: u64,
    /// Require verified region claims and diversity floors at submission.
    pub require_geographic_diversity: bool,
    /// Diversity floor: complement of the Herfindahl-Hirschman
    /// concentration index over regions, basis points.
    pub min_diversity_index_bps: u32,
    /// Outlier slash, parts per million of stake (100 ppm = 0.01%).
    pub outlier_slash_ppm: u32,
    /// Missed-period slash, parts per million of stake (1 ppm = 0.0001%).
    pub miss_slash_ppm: u32,
    /// Snapshots retained, in periods.
    pub snapshot_retention_periods: u64,
    /// Breaker trips on a single-aggregation move beyond this, bps.
    pub breaker_deviation_bps: u32,
    /// Breaker auto-recovery after this many quiet blocks.
    pub breaker_quiet_blocks: u64,
    /// Minimum validator age (blocks since registration) before its
    /// submissions count.
    pub min_validator_age_blocks: u64,
}

impl Default for OracleParams {
    fn default() -> Self {
        Self {
            authority: Address::new("paw1gov").expect("static address"),
            vote_period_blocks: 10,
            min_validators_for_security: 7,
            min_geographic_regions: 3,
            max_validators_per_ip: 2,
            max_validators_per_asn: 3,
            min_validator_stake: 1_000_000,
            min_blocks_between_submissions: 1,
            max_data_staleness_blocks: 100,
            max_submissions_per_window: 10,
            rate_limit_window: 100,
            bootstrap_grace_period_blocks: 10_000,
            max_outlier_history_blocks: 1_000,
            require_geographic_diversity: false,
            min_diversity_index_bps: 4_000,
            outlier_slash_ppm: 100,
            miss_slash_ppm: 1,
            snapshot_retention_periods: 5,
            breaker_deviation_bps: 5_000,
            breaker_quiet_blocks: 100,
            min_validator_age_blocks: 0,
        }
    }
}

impl OracleParams {
    pub fn validate(&self) -> Result<(), String> {
        if self.vote_period_blocks == 0 {
            return Err("vote period must be positive".into());
        }
        if self.min_validators_for_security == 0 {
            return Err("security quorum must be positive".into());
        }
        if self.rate_limit_window == 0 || self.max_submissions_per_window == 0 {
            return Err("rate window and budget must be positive".into());
        }
        if self.outlier_slash_ppm > 1_000_000 || self.miss_slash_ppm > 1_000_000 {
            return Err("slash fractions cannot exceed 100%".into());
        }
        if self.snapshot_retention_periods == 0 {
            return Err("snapshot retention must be positive".into());
        }
        Ok(())
    }

    pub fn check_update(&self, next: &OracleParams) -> Result<(), String> {
        if self.min_validators_for_security != next.min_validators_for_security {
            return Err("min_validators_for_security is immutable after genesis".into());
        }
        if self.min_geographic_regions != next.min_geographic_regions {
            return Err("min_geographic_regions is immutable after genesis".into());
        }
        next.validate()
    }

    /// Vote period containing `height`.
    pub fn period_of(&self, height: u64) -> u64 {
        height / self.vote_period_blocks
    }

    /// Whether `height` opens a new vote period.
    pub fn is_vote_period_start(&self, height: u64) -> bool {
        height % self.vote_period_blocks == 0
    }

    /// Whether `height` is the last block of its vote period.
    pub fn is_vote_period_end(&self, height: u64) -> bool {
        (height + 1) % self.vote_period_blocks == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_valid() {
        OracleParams::default().validate().unwrap();
    }

    #[test]
    fn test_period_arithmetic() {
        let p = OracleParams::default();
        assert_eq!(p.period_of(0), 0);
        assert_eq!(p.period_of(9), 0);
        assert_eq!(p.period_of(10), 1);
        assert!(p.is_vote_period_start(0));
        assert!(p.is_vote_period_start(10));
        assert!(!p.is_vote_period_start(11));
        assert!(p.is_vote_period_end(9));
        assert!(!p.is_vote_period_end(10));
    }

    #[test]
    fn test_immutable_fields() {
        let base = OracleParams::default();
        let mut next = base.clone();
        next.min_validators_for_security = 5;
        assert!(base.check_update(&next).is_err());
    }
}
