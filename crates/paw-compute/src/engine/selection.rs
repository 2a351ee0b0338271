//! # Provider Selection
//!
//! Deterministic selection over the eligible provider set, seeded by a
//! rolling digest that folds in each block height. Folding aggregated
//! validator randomness (rather than a raw block hash) keeps the next
//! assignment unpredictable to any single proposer while staying identical
//! on every node.

use sha2::{Digest, Sha256};
use shared_types::Module;

use paw_store::Ctx;

use crate::domain::errors::ComputeError;
use crate::domain::keys;

use super::ComputeEngine;

impl ComputeEngine {
    /// Advance the rolling seed; called once per block from the begin
    /// blocker with the consensus-supplied entropy for the block.
    pub fn fold_randomness(ctx: &mut Ctx, entropy: &[u8]) -> Result<(), ComputeError> {
        let previous = ctx
            .store
            .get(Module::Compute, &keys::randomness_key())?
            .unwrap_or_default();
        let mut h = Sha256::new();
        h.update(b"paw/compute/seed");
        h.update(&previous);
        h.update(ctx.block.height.to_be_bytes());
        h.update(entropy);
        ctx.store.set(
            Module::Compute,
            keys::randomness_key(),
            h.finalize().to_vec(),
        )?;
        Ok(())
    }

    /// Pick an eligible provider for `capability` using the current seed.
    /// Candidates are sorted by address; the seed indexes into them.
    pub(crate) fn select_provider(
        &self,
        ctx: &Ctx,
        capability: &str,
    ) -> Result<shared_types::Address, ComputeError> {
        let candidates: Vec<_> = Self::all_providers(ctx)?
            .into_iter()
            .filter(|p| {
                !p.jailed
                    && p.signing_key.is_some()
                    && p.capabilities.iter().any(|c| c == capability)
            })
            .collect();
        if candidates.is_empty() {
            return Err(ComputeError::NoCapableProvider {
                capability: capability.to_string(),
            });
        }
        let seed = ctx
            .store
            .get(Module::Compute, &keys::randomness_key())?
            .unwrap_or_default();
        let mut h = Sha256::new();
        h.update(&seed);
        h.update(capability.as_bytes());
        let digest = h.finalize();
        let mut be = [0u8; 8];
        be.copy_from_slice(&digest[..8]);
        let index = (u64::from_be_bytes(be) as usize) % candidates.len();
        Ok(candidates[index].addr.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paw_store::MultiStore;
    use shared_types::BlockCtx;

    #[test]
    fn test_fold_randomness_deterministic() {
        let mut a = MultiStore::in_memory();
        let mut b = MultiStore::in_memory();
        for store in [&mut a, &mut b] {
            let mut events = Vec::new();
            let mut ctx = Ctx::new(store, BlockCtx::new(5, 30), &mut events);
            ComputeEngine::fold_randomness(&mut ctx, b"vrf-agg").unwrap();
        }
        assert_eq!(
            a.get(Module::Compute, &keys::randomness_key()).unwrap(),
            b.get(Module::Compute, &keys::randomness_key()).unwrap()
        );
    }

    #[test]
    fn test_seed_changes_per_block() {
        let mut store = MultiStore::in_memory();
        let mut events = Vec::new();
        let first = {
            let mut ctx = Ctx::new(&mut store, BlockCtx::new(5, 30), &mut events);
            ComputeEngine::fold_randomness(&mut ctx, b"vrf-agg").unwrap();
            ctx.store
                .get(Module::Compute, &keys::randomness_key())
                .unwrap()
        };
        let mut ctx = Ctx::new(&mut store, BlockCtx::new(6, 36), &mut events);
        ComputeEngine::fold_randomness(&mut ctx, b"vrf-agg").unwrap();
        let second = ctx
            .store
            .get(Module::Compute, &keys::randomness_key())
            .unwrap();
        assert_ne!(first, second);
    }
}
