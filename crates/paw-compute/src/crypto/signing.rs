//! # Result Signatures
//!
//! Ed25519 over a canonical message, verified strictly against the
//! provider's *registered* key. `verify_strict` rejects signatures
//! involving any of the eight known low-order points, and weak verifying
//! keys are refused at registration as well.

use ed25519_dalek::{Signature, VerifyingKey};
use shared_types::Address;

use crate::domain::errors::ComputeError;

/// Canonical message a provider signs over a result.
pub fn result_message(
    request_id: u64,
    result_hash: &[u8; 32],
    nonce: u64,
    provider: &Address,
) -> Vec<u8> {
    let mut m = Vec::with_capacity(64 + provider.as_bytes().len());
    m.extend_from_slice(b"paw/compute/result");
    m.extend_from_slice(&request_id.to_be_bytes());
    m.extend_from_slice(result_hash);
    m.extend_from_slice(&nonce.to_be_bytes());
    m.extend_from_slice(provider.as_bytes());
    m
}

/// Parse and vet a verifying key: must decode and must not be one of the
/// low-order points.
pub fn parse_key(bytes: &[u8; 32]) -> Result<VerifyingKey, ComputeError> {
    let key = VerifyingKey::from_bytes(bytes).map_err(|_| ComputeError::BadKey)?;
    if key.is_weak() {
        return Err(ComputeError::BadKey);
    }
    Ok(key)
}

/// Strict signature verification over the canonical message.
pub fn verify_result_signature(
    key_bytes: &[u8; 32],
    message: &[u8],
    signature: &[u8],
) -> Result<(), ComputeError> {
    let key = parse_key(key_bytes)?;
    let sig_bytes: [u8; 64] = signature
        .try_into()
        .map_err(|_| ComputeError::BadSignature)?;
    let sig = Signature::from_bytes(&sig_bytes);
    key.verify_strict(message, &sig)
        .map_err(|_| ComputeError::BadSignature)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};

    fn addr(s: &str) -> Address {
        Address::new(s).unwrap()
    }

    #[test]
    fn test_round_trip() {
        let sk = SigningKey::from_bytes(&[3u8; 32]);
        let provider = addr("paw1provider");
        let msg = result_message(9, &[0x44; 32], 1, &provider);
        let sig = sk.sign(&msg);
        verify_result_signature(&sk.verifying_key().to_bytes(), &msg, &sig.to_bytes()).unwrap();
    }

    #[test]
    fn test_wrong_key_rejected() {
        let sk = SigningKey::from_bytes(&[3u8; 32]);
        let other = SigningKey::from_bytes(&[4u8; 32]);
        let msg = result_message(9, &[0x44; 32], 1, &addr("paw1provider"));
        let sig = sk.sign(&msg);
        assert!(matches!(
            verify_result_signature(&other.verifying_key().to_bytes(), &msg, &sig.to_bytes()),
            Err(ComputeError::BadSignature)
        ));
    }

    #[test]
    fn test_low_order_key_rejected() {
        // The identity element, encoded: first of the small-order points.
        let weak: [u8; 32] = [
            1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
            0, 0, 0, 0, 0,
        ];
        assert!(matches!(parse_key(&weak), Err(ComputeError::BadKey)));
    }

    #[test]
    fn test_message_binds_nonce() {
        let a = result_message(9, &[0x44; 32], 1, &addr("paw1provider"));
        let b = result_message(9, &[0x44; 32], 2, &addr("paw1provider"));
        assert_ne!(a, b);
    }
}
