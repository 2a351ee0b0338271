//! # Oracle Entities
//!
//! Prices are micro-units (`price_micro = price × 1_000_000`), which maps
//! the accepted range `[1e-6, 1e9]` onto `[1, 1e15]` in integers.

use serde::{Deserialize, Serialize};
use shared_types::Address;

/// Micro scaling for prices.
pub const PRICE_SCALE: u128 = 1_000_000;

/// Smallest accepted price: 1e-6 units.
pub const MIN_PRICE_MICRO: u128 = 1;

/// Largest accepted price: 1e9 units.
pub const MAX_PRICE_MICRO: u128 = 1_000_000_000 * PRICE_SCALE;

/// A registered oracle validator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleValidator {
    pub addr: Address,
    /// Stake backing submissions; slashed on misbehavior.
    pub stake: u128,
    /// Region code claimed at registration (verified against the local
    /// GeoIP database when geographic diversity is required).
    pub region: String,
    pub ip: String,
    pub asn: u32,
    /// Registered ed25519 verifying key for submission signatures.
    pub pubkey: [u8; 32],
    /// Delegated feeder allowed to submit on this validator's behalf.
    pub feeder: Option<Address>,
    /// Starts at 100; decays non-linearly with repeat offenses.
    pub reputation: i64,
    pub outlier_count: u64,
    pub submissions_total: u64,
    pub submissions_accepted: u64,
    pub registered_height: u64,
}

impl OracleValidator {
    /// Power used for weighting is the live stake at snapshot time.
    pub fn power(&self) -> u128 {
        self.stake
    }
}

/// One validator's price for one asset in one vote period.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceSubmission {
    pub asset: String,
    pub validator: Address,
    pub vote_period: u64,
    pub price_micro: u128,
    pub submission_height: u64,
}

/// Which tier produced a served price.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AggregationTier {
    FilteredMedian,
    UnfilteredMedian,
    LastKnownGood,
    /// Governance emergency override.
    Override,
}

impl AggregationTier {
    pub const fn as_str(self) -> &'static str {
        match self {
            AggregationTier::FilteredMedian => "filtered_median",
            AggregationTier::UnfilteredMedian => "unfiltered_median",
            AggregationTier::LastKnownGood => "last_known_good",
            AggregationTier::Override => "override",
        }
    }
}

/// Canonical aggregated price for an asset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedPrice {
    pub asset: String,
    pub price_micro: u128,
    /// Share of snapshot weight that agreed, basis points.
    pub confidence_bps: u32,
    pub vote_period: u64,
    pub height: u64,
    pub tier: AggregationTier,
    pub validator_count: u32,
}

/// Voting power frozen at a period start.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerSnapshot {
    pub vote_period: u64,
    pub validator: Address,
    pub power: u128,
}

/// Whitelisted asset record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetInfo {
    pub asset: String,
    pub whitelisted_height: u64,
}

/// A recorded outlier event, retained for a bounded window.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlierRecord {
    pub validator: Address,
    pub asset: String,
    pub vote_period: u64,
    pub height: u64,
    pub price_micro: u128,
    pub band_low: u128,
    pub band_high: u128,
}

/// Oracle circuit breaker record. Present = tripped; recovery is by quiet
/// blocks, not wall-clock.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleBreaker {
    pub reason: String,
    pub tripped_height: u64,
    /// Height at which the breaker may clear if no new trigger occurred.
    pub recover_at_height: u64,
}
