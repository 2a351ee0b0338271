//! # Oracle Key Layout
//!
//! Namespace `0x03`. Sub-prefixes `0x7E`/`0x7F` are reserved by the IBC
//! ingress guard.

use shared_types::{Address, Module};

pub const NS: u8 = 0x03; // Module::Oracle.namespace()

pub const SUB_PARAMS: u8 = 0x01;
pub const SUB_VALIDATOR: u8 = 0x02;
pub const SUB_IP_COUNT: u8 = 0x03;
pub const SUB_ASN_COUNT: u8 = 0x04;
pub const SUB_ASSET: u8 = 0x05;
pub const SUB_SUBMISSION: u8 = 0x06;
pub const SUB_AGGREGATED: u8 = 0x07;
pub const SUB_LAST_GOOD: u8 = 0x08;
pub const SUB_SNAPSHOT: u8 = 0x09;
pub const SUB_SNAPSHOT_TOTAL: u8 = 0x0A;
pub const SUB_BREAKER: u8 = 0x0B;
pub const SUB_OUTLIER: u8 = 0x0C;
pub const SUB_WINDOW: u8 = 0x0D;
pub const SUB_LAST_SUBMISSION: u8 = 0x0E;
pub const SUB_BYZANTINE_STREAK: u8 = 0x0F;

fn addr_pfx(k: &mut Vec<u8>, addr: &Address) {
    k.push(addr.as_bytes().len() as u8);
    k.extend_from_slice(addr.as_bytes());
}

pub fn params_key() -> Vec<u8> {
    vec![NS, SUB_PARAMS]
}

pub fn validator_key(addr: &Address) -> Vec<u8> {
    let mut k = vec![NS, SUB_VALIDATOR];
    addr_pfx(&mut k, addr);
    k
}

pub fn validator_prefix() -> Vec<u8> {
    vec![NS, SUB_VALIDATOR]
}

pub fn ip_count_key(ip: &str) -> Vec<u8> {
    let mut k = vec![NS, SUB_IP_COUNT];
    k.extend_from_slice(ip.as_bytes());
    k
}

pub fn asn_count_key(asn: u32) -> Vec<u8> {
    let mut k = vec![NS, SUB_ASN_COUNT];
    k.extend_from_slice(&asn.to_be_bytes());
    k
}

pub fn asset_key(asset: &str) -> Vec<u8> {
    let mut k = vec![NS, SUB_ASSET];
    k.extend_from_slice(asset.as_bytes());
    k
}

pub fn asset_prefix() -> Vec<u8> {
    vec![NS, SUB_ASSET]
}

pub fn submission_key(asset: &str, validator: &Address, vote_period: u64) -> Vec<u8> {
    let mut k = vec![NS, SUB_SUBMISSION];
    k.push(asset.len() as u8);
    k.extend_from_slice(asset.as_bytes());
    k.extend_from_slice(&vote_period.to_be_bytes());
    addr_pfx(&mut k, validator);
    k
}

/// All submissions for one asset in one period.
pub fn submission_prefix(asset: &str, vote_period: u64) -> Vec<u8> {
    let mut k = vec![NS, SUB_SUBMISSION];
    k.push(asset.len() as u8);
    k.extend_from_slice(asset.as_bytes());
    k.extend_from_slice(&vote_period.to_be_bytes());
    k
}

pub fn aggregated_key(asset: &str) -> Vec<u8> {
    let mut k = vec![NS, SUB_AGGREGATED];
    k.extend_from_slice(asset.as_bytes());
    k
}

pub fn last_good_key(asset: &str) -> Vec<u8> {
    let mut k = vec![NS, SUB_LAST_GOOD];
    k.extend_from_slice(asset.as_bytes());
    k
}

pub fn snapshot_key(vote_period: u64, validator: &Address) -> Vec<u8> {
    let mut k = vec![NS, SUB_SNAPSHOT];
    k.extend_from_slice(&vote_period.to_be_bytes());
    addr_pfx(&mut k, validator);
    k
}

pub fn snapshot_prefix(vote_period: u64) -> Vec<u8> {
    let mut k = vec![NS, SUB_SNAPSHOT];
    k.extend_from_slice(&vote_period.to_be_bytes());
    k
}

pub fn snapshot_total_key(vote_period: u64) -> Vec<u8> {
    let mut k = vec![NS, SUB_SNAPSHOT_TOTAL];
    k.extend_from_slice(&vote_period.to_be_bytes());
    k
}

/// Breaker scope: global or per asset.
pub fn breaker_key(asset: Option<&str>) -> Vec<u8> {
    let mut k = vec![NS, SUB_BREAKER];
    match asset {
        None => k.push(0x00),
        Some(a) => {
            k.push(0x01);
            k.extend_from_slice(a.as_bytes());
        }
    }
    k
}

pub fn breaker_prefix() -> Vec<u8> {
    vec![NS, SUB_BREAKER]
}

/// Outlier history keyed by height for bounded retention.
pub fn outlier_key(height: u64, validator: &Address, seq: u32) -> Vec<u8> {
    let mut k = vec![NS, SUB_OUTLIER];
    k.extend_from_slice(&height.to_be_bytes());
    addr_pfx(&mut k, validator);
    k.extend_from_slice(&seq.to_be_bytes());
    k
}

pub fn outlier_prefix() -> Vec<u8> {
    vec![NS, SUB_OUTLIER]
}

pub fn outlier_end(height: u64) -> Vec<u8> {
    let mut k = vec![NS, SUB_OUTLIER];
    k.extend_from_slice(&(height + 1).to_be_bytes());
    k
}

/// Per-validator submission window counter.
pub fn window_key(validator: &Address, window_start: u64) -> Vec<u8> {
    let mut k = vec![NS, SUB_WINDOW];
    addr_pfx(&mut k, validator);
    k.extend_from_slice(&window_start.to_be_bytes());
    k
}

/// Last submission facts per validator (height for pacing, period for miss
/// tracking).
pub fn last_submission_key(validator: &Address) -> Vec<u8> {
    let mut k = vec![NS, SUB_LAST_SUBMISSION];
    addr_pfx(&mut k, validator);
    k
}

/// Consecutive Byzantine-violation detections per asset.
pub fn byzantine_streak_key(asset: &str) -> Vec<u8> {
    let mut k = vec![NS, SUB_BYZANTINE_STREAK];
    k.extend_from_slice(asset.as_bytes());
    k
}
