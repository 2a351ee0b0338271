//! Oracle event kinds.

pub const VALIDATOR_REGISTERED: &str = "oracle_validator_registered";
pub const FEEDER_DELEGATED: &str = "oracle_feeder_delegated";
pub const ASSET_WHITELISTED: &str = "oracle_asset_whitelisted";
pub const PRICE_SUBMITTED: &str = "oracle_price_submitted";
pub const PRICE_AGGREGATED: &str = "oracle_price_aggregated";
pub const PRICE_OVERRIDDEN: &str = "oracle_price_overridden";
/// Served from a degraded tier; tagged with the tier used.
pub const FALLBACK: &str = shared_types::events::kinds::ORACLE_FALLBACK;
pub const OUTLIER_SLASHED: &str = "oracle_outlier_slashed";
pub const MISS_SLASHED: &str = "oracle_miss_slashed";
pub const BYZANTINE_WARNING: &str = "oracle_byzantine_warning";
pub const BREAKER_TRIPPED: &str = "oracle_breaker_tripped";
pub const BREAKER_RECOVERED: &str = "oracle_breaker_recovered";
