//! # Groth16 Verification (BN254)
//!
//! Result proofs are verified against the circuit's governance-registered
//! verifying key. Public inputs are field elements derived from the
//! request facts, so a proof binds one `(request, result, provider)`
//! triple and cannot be replayed across requests.
//!
//! Verification is deliberately priced high at the gas layer; this module
//! only performs it.

use ark_bn254::{Bn254, Fr};
use ark_ff::PrimeField;
use ark_groth16::{prepare_verifying_key, Groth16, Proof, VerifyingKey};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use sha2::{Digest, Sha256};
use shared_types::Address;

use crate::domain::errors::ComputeError;

/// Derive the three public inputs binding a proof to its request:
/// `H(request_id)`, `H(result_hash)`, `H(provider)`, each reduced into Fr.
pub fn public_inputs(request_id: u64, result_hash: &[u8; 32], provider: &Address) -> Vec<Fr> {
    let mut id_hasher = Sha256::new();
    id_hasher.update(b"paw/compute/request");
    id_hasher.update(request_id.to_be_bytes());
    let id_digest = id_hasher.finalize();

    let mut provider_hasher = Sha256::new();
    provider_hasher.update(b"paw/compute/provider");
    provider_hasher.update(provider.as_bytes());
    let provider_digest = provider_hasher.finalize();

    vec![
        Fr::from_le_bytes_mod_order(&id_digest),
        Fr::from_le_bytes_mod_order(result_hash),
        Fr::from_le_bytes_mod_order(&provider_digest),
    ]
}

/// Serialize a verifying key for storage (governance registration path).
pub fn encode_verifying_key(vk: &VerifyingKey<Bn254>) -> Result<Vec<u8>, ComputeError> {
    let mut bytes = Vec::new();
    vk.serialize_compressed(&mut bytes)
        .map_err(|e| ComputeError::MalformedProof {
            reason: format!("verifying key encode: {e}"),
        })?;
    Ok(bytes)
}

/// Serialize a proof for the wire.
pub fn encode_proof(proof: &Proof<Bn254>) -> Result<Vec<u8>, ComputeError> {
    let mut bytes = Vec::new();
    proof
        .serialize_compressed(&mut bytes)
        .map_err(|e| ComputeError::MalformedProof {
            reason: format!("proof encode: {e}"),
        })?;
    Ok(bytes)
}

/// Verify `proof_bytes` against `vk_bytes` and the given public inputs.
pub fn verify(
    vk_bytes: &[u8],
    proof_bytes: &[u8],
    inputs: &[Fr],
) -> Result<(), ComputeError> {
    let vk = VerifyingKey::<Bn254>::deserialize_compressed(vk_bytes).map_err(|e| {
        ComputeError::MalformedProof {
            reason: format!("verifying key decode: {e}"),
        }
    })?;
    let proof = Proof::<Bn254>::deserialize_compressed(proof_bytes).map_err(|e| {
        ComputeError::MalformedProof {
            reason: format!("proof decode: {e}"),
        }
    })?;
    let pvk = prepare_verifying_key(&vk);
    let ok = Groth16::<Bn254>::verify_proof(&pvk, &proof, inputs).map_err(|e| {
        ComputeError::VerifierFailure {
            reason: e.to_string(),
        }
    })?;
    if !ok {
        return Err(ComputeError::ProofRejected);
    }
    Ok(())
}

#[cfg(any(test, feature = "test-support"))]
pub mod test_support {
    //! A minimal circuit for exercising the full setup/prove/verify path:
    //! public inputs `(a, b, c)` and witness `w` with `a + b + c = w`.

    use super::*;
    use ark_relations::lc;
    use ark_relations::r1cs::{
        ConstraintSynthesizer, ConstraintSystemRef, SynthesisError, Variable,
    };
    use ark_snark::SNARK;
    use ark_std::rand::rngs::StdRng;
    use ark_std::rand::SeedableRng;

    #[derive(Clone)]
    pub struct SumCircuit {
        pub a: Option<Fr>,
        pub b: Option<Fr>,
        pub c: Option<Fr>,
        pub w: Option<Fr>,
    }

    impl ConstraintSynthesizer<Fr> for SumCircuit {
        fn generate_constraints(
            self,
            cs: ConstraintSystemRef<Fr>,
        ) -> Result<(), SynthesisError> {
            let a = cs.new_input_variable(|| self.a.ok_or(SynthesisError::AssignmentMissing))?;
            let b = cs.new_input_variable(|| self.b.ok_or(SynthesisError::AssignmentMissing))?;
            let c = cs.new_input_variable(|| self.c.ok_or(SynthesisError::AssignmentMissing))?;
            let w =
                cs.new_witness_variable(|| self.w.ok_or(SynthesisError::AssignmentMissing))?;
            cs.enforce_constraint(lc!() + a + b + c, lc!() + Variable::One, lc!() + w)?;
            Ok(())
        }
    }

    /// Deterministic keypair for the sum circuit.
    pub fn setup() -> (ark_groth16::ProvingKey<Bn254>, VerifyingKey<Bn254>) {
        let mut rng = StdRng::seed_from_u64(0);
        let blank = SumCircuit {
            a: None,
            b: None,
            c: None,
            w: None,
        };
        Groth16::<Bn254>::circuit_specific_setup(blank, &mut rng).expect("setup")
    }

    /// Prove the sum circuit for the given public inputs.
    pub fn prove(
        pk: &ark_groth16::ProvingKey<Bn254>,
        inputs: &[Fr],
    ) -> Proof<Bn254> {
        let mut rng = StdRng::seed_from_u64(0);
        let circuit = SumCircuit {
            a: Some(inputs[0]),
            b: Some(inputs[1]),
            c: Some(inputs[2]),
            w: Some(inputs[0] + inputs[1] + inputs[2]),
        };
        Groth16::<Bn254>::prove(pk, circuit, &mut rng).expect("prove")
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    fn addr(s: &str) -> Address {
        Address::new(s).unwrap()
    }

    #[test]
    fn test_valid_proof_accepted() {
        let (pk, vk) = setup();
        let inputs = public_inputs(7, &[0xAB; 32], &addr("paw1provider"));
        let proof = prove(&pk, &inputs);
        let vk_bytes = encode_verifying_key(&vk).unwrap();
        let proof_bytes = encode_proof(&proof).unwrap();
        verify(&vk_bytes, &proof_bytes, &inputs).unwrap();
    }

    #[test]
    fn test_proof_bound_to_request() {
        let (pk, vk) = setup();
        let inputs = public_inputs(7, &[0xAB; 32], &addr("paw1provider"));
        let proof = prove(&pk, &inputs);
        let vk_bytes = encode_verifying_key(&vk).unwrap();
        let proof_bytes = encode_proof(&proof).unwrap();
        // Same proof against a different request's inputs fails.
        let other = public_inputs(8, &[0xAB; 32], &addr("paw1provider"));
        assert!(matches!(
            verify(&vk_bytes, &proof_bytes, &other),
            Err(ComputeError::ProofRejected)
        ));
    }

    #[test]
    fn test_garbage_proof_rejected() {
        let (_, vk) = setup();
        let vk_bytes = encode_verifying_key(&vk).unwrap();
        let inputs = public_inputs(1, &[0; 32], &addr("paw1provider"));
        assert!(matches!(
            verify(&vk_bytes, &[0u8; 64], &inputs),
            Err(ComputeError::MalformedProof { .. })
        ));
    }

    #[test]
    fn test_inputs_differ_by_provider() {
        let a = public_inputs(1, &[1; 32], &addr("paw1prov1"));
        let b = public_inputs(1, &[1; 32], &addr("paw1prov2"));
        assert_ne!(a[2], b[2]);
        assert_eq!(a[0], b[0]);
    }
}
