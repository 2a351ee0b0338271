//! # Compute Key Layout
//!
//! Namespace `0x01`. The escrow timeout and release indices are keyed by
//! height first, so the end blocker's range scan reads exactly the entries
//! due at or before the current block. Sub-prefixes `0x7E`/`0x7F` are
//! reserved by the IBC ingress guard.

use shared_types::{Address, Module};

pub const NS: u8 = 0x01; // Module::Compute.namespace()

pub const SUB_PARAMS: u8 = 0x01;
pub const SUB_PROVIDER: u8 = 0x02;
pub const SUB_PROVIDER_COUNT: u8 = 0x03;
pub const SUB_REQUEST: u8 = 0x04;
pub const SUB_REQUEST_SEQ: u8 = 0x05;
pub const SUB_ESCROW: u8 = 0x06;
pub const SUB_TIMEOUT_FWD: u8 = 0x07;
pub const SUB_TIMEOUT_REV: u8 = 0x08;
pub const SUB_RELEASE_FWD: u8 = 0x09;
pub const SUB_NONCE: u8 = 0x0A;
pub const SUB_DISPUTE: u8 = 0x0B;
pub const SUB_DISPUTE_SEQ: u8 = 0x0C;
pub const SUB_DISPUTE_BY_REQUEST: u8 = 0x0D;
pub const SUB_FAILURE: u8 = 0x0E;
pub const SUB_FAILURE_SEQ: u8 = 0x0F;
pub const SUB_FAILURE_BY_HEIGHT: u8 = 0x10;
pub const SUB_VERIFYING_KEY: u8 = 0x11;
pub const SUB_RANDOMNESS: u8 = 0x12;
pub const SUB_PAUSED: u8 = 0x13;

fn addr_pfx(k: &mut Vec<u8>, addr: &Address) {
    k.push(addr.as_bytes().len() as u8);
    k.extend_from_slice(addr.as_bytes());
}

pub fn params_key() -> Vec<u8> {
    vec![NS, SUB_PARAMS]
}

pub fn provider_key(addr: &Address) -> Vec<u8> {
    let mut k = vec![NS, SUB_PROVIDER];
    addr_pfx(&mut k, addr);
    k
}

pub fn provider_prefix() -> Vec<u8> {
    vec![NS, SUB_PROVIDER]
}

pub fn provider_count_key() -> Vec<u8> {
    vec![NS, SUB_PROVIDER_COUNT]
}

pub fn request_key(request_id: u64) -> Vec<u8> {
    let mut k = vec![NS, SUB_REQUEST];
    k.extend_from_slice(&request_id.to_be_bytes());
    k
}

pub fn request_prefix() -> Vec<u8> {
    vec![NS, SUB_REQUEST]
}

pub fn request_seq_key() -> Vec<u8> {
    vec![NS, SUB_REQUEST_SEQ]
}

pub fn escrow_key(request_id: u64) -> Vec<u8> {
    let mut k = vec![NS, SUB_ESCROW];
    k.extend_from_slice(&request_id.to_be_bytes());
    k
}

pub fn escrow_prefix() -> Vec<u8> {
    vec![NS, SUB_ESCROW]
}

pub fn timeout_fwd_key(timeout_height: u64, request_id: u64) -> Vec<u8> {
    let mut k = vec![NS, SUB_TIMEOUT_FWD];
    k.extend_from_slice(&timeout_height.to_be_bytes());
    k.extend_from_slice(&request_id.to_be_bytes());
    k
}

pub fn timeout_fwd_prefix() -> Vec<u8> {
    vec![NS, SUB_TIMEOUT_FWD]
}

pub fn timeout_fwd_end(height: u64) -> Vec<u8> {
    let mut k = vec![NS, SUB_TIMEOUT_FWD];
    k.extend_from_slice(&(height + 1).to_be_bytes());
    k
}

pub fn timeout_rev_key(request_id: u64) -> Vec<u8> {
    let mut k = vec![NS, SUB_TIMEOUT_REV];
    k.extend_from_slice(&request_id.to_be_bytes());
    k
}

pub fn timeout_rev_prefix() -> Vec<u8> {
    vec![NS, SUB_TIMEOUT_REV]
}

pub fn release_fwd_key(release_height: u64, request_id: u64) -> Vec<u8> {
    let mut k = vec![NS, SUB_RELEASE_FWD];
    k.extend_from_slice(&release_height.to_be_bytes());
    k.extend_from_slice(&request_id.to_be_bytes());
    k
}

pub fn release_fwd_prefix() -> Vec<u8> {
    vec![NS, SUB_RELEASE_FWD]
}

pub fn release_fwd_end(height: u64) -> Vec<u8> {
    let mut k = vec![NS, SUB_RELEASE_FWD];
    k.extend_from_slice(&(height + 1).to_be_bytes());
    k
}

/// Result-submission replay nonces, scoped to `(channel, sender)`.
pub fn nonce_key(channel: &str, sender: &Address, nonce: u64) -> Vec<u8> {
    let mut k = vec![NS, SUB_NONCE];
    k.push(channel.len() as u8);
    k.extend_from_slice(channel.as_bytes());
    addr_pfx(&mut k, sender);
    k.extend_from_slice(&nonce.to_be_bytes());
    k
}

pub fn dispute_key(dispute_id: u64) -> Vec<u8> {
    let mut k = vec![NS, SUB_DISPUTE];
    k.extend_from_slice(&dispute_id.to_be_bytes());
    k
}

pub fn dispute_prefix() -> Vec<u8> {
    vec![NS, SUB_DISPUTE]
}

pub fn dispute_seq_key() -> Vec<u8> {
    vec![NS, SUB_DISPUTE_SEQ]
}

pub fn dispute_by_request_key(request_id: u64, dispute_id: u64) -> Vec<u8> {
    let mut k = vec![NS, SUB_DISPUTE_BY_REQUEST];
    k.extend_from_slice(&request_id.to_be_bytes());
    k.extend_from_slice(&dispute_id.to_be_bytes());
    k
}

pub fn dispute_by_request_prefix(request_id: u64) -> Vec<u8> {
    let mut k = vec![NS, SUB_DISPUTE_BY_REQUEST];
    k.extend_from_slice(&request_id.to_be_bytes());
    k
}

pub fn failure_key(failure_id: u64) -> Vec<u8> {
    let mut k = vec![NS, SUB_FAILURE];
    k.extend_from_slice(&failure_id.to_be_bytes());
    k
}

pub fn failure_prefix() -> Vec<u8> {
    vec![NS, SUB_FAILURE]
}

pub fn failure_seq_key() -> Vec<u8> {
    vec![NS, SUB_FAILURE_SEQ]
}

pub fn failure_by_height_key(height: u64, failure_id: u64) -> Vec<u8> {
    let mut k = vec![NS, SUB_FAILURE_BY_HEIGHT];
    k.extend_from_slice(&height.to_be_bytes());
    k.extend_from_slice(&failure_id.to_be_bytes());
    k
}

pub fn failure_by_height_prefix() -> Vec<u8> {
    vec![NS, SUB_FAILURE_BY_HEIGHT]
}

/// Groth16 verifying key per circuit.
pub fn verifying_key_key(circuit_id: &str) -> Vec<u8> {
    let mut k = vec![NS, SUB_VERIFYING_KEY];
    k.extend_from_slice(circuit_id.as_bytes());
    k
}

/// Rolling per-block randomness seed for provider selection.
pub fn randomness_key() -> Vec<u8> {
    vec![NS, SUB_RANDOMNESS]
}

/// Module-wide pause marker (the compute module's global breaker).
pub fn paused_key() -> Vec<u8> {
    vec![NS, SUB_PAUSED]
}
