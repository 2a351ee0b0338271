//! # Oracle Error Types

use shared_types::{ChainError, ErrorKind};
use thiserror::Error;

use paw_store::{LedgerError, StoreError};

/// Errors raised by the oracle engine.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("validator already registered")]
    AlreadyRegistered,

    #[error("validator not registered")]
    ValidatorNotFound,

    #[error("stake {got} below the {min} minimum")]
    StakeTooLow { got: u128, min: u128 },

    #[error("IP {ip} already backs {count} validators (max {max})")]
    IpSaturated { ip: String, count: u32, max: u32 },

    #[error("ASN {asn} already backs {count} validators (max {max})")]
    AsnSaturated { asn: u32, count: u32, max: u32 },

    #[error("region code must be non-empty")]
    MissingRegion,

    #[error("region claim for {region} failed GeoIP verification")]
    RegionClaimRejected { region: String },

    #[error("validator set spans {regions} regions; {min} required")]
    InsufficientRegions { regions: u32, min: u32 },

    #[error("diversity index {got_bps} bps below the {min_bps} floor")]
    DiversityTooLow { got_bps: u32, min_bps: u32 },

    #[error("validator too young: registered at {registered}, usable from {usable_from}")]
    ValidatorTooYoung { registered: u64, usable_from: u64 },

    #[error("asset {asset} is not whitelisted")]
    AssetNotWhitelisted { asset: String },

    #[error("price {price_micro} outside accepted range")]
    PriceOutOfRange { price_micro: u128 },

    #[error("submission too soon: last at height {last}, next allowed at {next}")]
    SubmissionTooSoon { last: u64, next: u64 },

    #[error("submission window exhausted: {used}/{limit}")]
    WindowExhausted { used: u32, limit: u32 },

    #[error("sender is neither the validator nor its delegated feeder")]
    NotFeeder,

    #[error("submission signature invalid")]
    BadSignature,

    #[error("registered key is malformed or weak")]
    BadKey,

    #[error("circuit breaker open for {scope}")]
    BreakerOpen { scope: String },

    #[error("no price available for {asset}")]
    NoPrice { asset: String },

    #[error("unauthorized: {reason}")]
    Unauthorized { reason: String },

    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    /// More than a third of snapshot weight submitted outliers.
    #[error("byzantine violation on {asset}: outlier weight {outlier_weight} of {total_weight}")]
    ByzantineViolation {
        asset: String,
        outlier_weight: u128,
        total_weight: u128,
    },

    /// A peer module's hook receiver failed.
    #[error("hook failed: {0}")]
    Hook(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ChainError for OracleError {
    fn kind(&self) -> ErrorKind {
        use OracleError::*;
        match self {
            AlreadyRegistered
            | ValidatorNotFound
            | MissingRegion
            | AssetNotWhitelisted { .. }
            | PriceOutOfRange { .. }
            | InvalidParams(_)
            | BadKey => ErrorKind::Validation,
            NotFeeder | Unauthorized { .. } | BadSignature | RegionClaimRejected { .. } => {
                ErrorKind::Authorization
            }
            StakeTooLow { .. }
            | IpSaturated { .. }
            | AsnSaturated { .. }
            | InsufficientRegions { .. }
            | DiversityTooLow { .. }
            | ValidatorTooYoung { .. }
            | WindowExhausted { .. }
            | NoPrice { .. } => ErrorKind::Resource,
            SubmissionTooSoon { .. } | BreakerOpen { .. } => ErrorKind::Contention,
            ByzantineViolation { .. } => ErrorKind::Invariant,
            Hook(_) => ErrorKind::Invariant,
            Ledger(e) => e.kind(),
            Store(e) => e.kind(),
        }
    }

    fn remediation(&self) -> Option<String> {
        match self {
            OracleError::SubmissionTooSoon { next, .. } => {
                Some(format!("resubmit at or after height {next}"))
            }
            OracleError::WindowExhausted { .. } => {
                Some("wait for the next submission window".into())
            }
            OracleError::BreakerOpen { .. } => {
                Some("wait for quiet-block auto-recovery".into())
            }
            _ => None,
        }
    }
}
