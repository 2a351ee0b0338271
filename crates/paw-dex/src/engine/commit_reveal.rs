//! # Commit–Reveal Swaps
//!
//! Mandatory path for swaps above the large-swap fraction. The commitment
//! binds every execution parameter plus a caller-chosen salt; between the
//! reveal delay and expiry the trader discloses the preimage and the swap
//! executes with the disclosed parameters. Deposits discourage spray
//! commitments: returned on reveal, docked on cancel, forfeited on expiry.

use sha2::{Digest, Sha256};
use shared_types::{Address, Coin, Denom, Event, Module};

use paw_store::codec::{get_typed, put_typed};
use paw_store::{Ctx, Ledger};

use crate::domain::entities::SwapCommitment;
use crate::domain::errors::DexError;
use crate::domain::keys;
use crate::domain::params::DexParams;
use crate::engine::swap::SwapSpec;
use crate::events;
use crate::hooks::DexHooks;

use super::DexEngine;

/// Parameters disclosed at reveal time.
#[derive(Clone, Debug)]
pub struct RevealSpec {
    pub pool_id: u64,
    pub token_in: Denom,
    pub token_out: Denom,
    pub amount_in: u128,
    pub min_amount_out: u128,
    pub salt: [u8; 32],
}

/// Canonical commitment digest.
pub fn commit_hash(
    pool_id: u64,
    token_in: &Denom,
    token_out: &Denom,
    amount_in: u128,
    min_amount_out: u128,
    salt: &[u8; 32],
    trader: &Address,
) -> [u8; 32] {
    let mut h = Sha256::new();
    h.update(pool_id.to_be_bytes());
    h.update(token_in.as_str().as_bytes());
    h.update([0x00]);
    h.update(token_out.as_str().as_bytes());
    h.update([0x00]);
    h.update(amount_in.to_be_bytes());
    h.update(min_amount_out.to_be_bytes());
    h.update(salt);
    h.update(trader.as_bytes());
    h.finalize().into()
}

impl DexEngine {
    /// Record a commitment and take the deposit.
    pub fn commit_swap(
        &self,
        ctx: &mut Ctx,
        trader: &Address,
        pool_id: u64,
        hash: [u8; 32],
        amount_in_bound: u128,
    ) -> Result<(), DexError> {
        if amount_in_bound == 0 {
            return Err(DexError::ZeroAmount);
        }
        let params = Self::params(ctx)?;
        Self::check_breakers(ctx, pool_id, &params)?;
        ctx.scoped(|ctx| {
            Self::charge_rate(ctx, trader, &params)?;
            // Pool must exist before anyone parks a deposit against it.
            Self::load_pool(ctx, pool_id)?;
            let key = keys::commit_key(trader, &hash);
            if get_typed::<SwapCommitment>(ctx.store, Module::Dex, &key)?.is_some() {
                return Err(DexError::DuplicateCommit);
            }
            Ledger::transfer(
                ctx.store,
                trader,
                &Module::Dex.account(),
                &[Coin::new(
                    params.commit_deposit_denom.clone(),
                    params.commit_deposit_amount,
                )],
            )?;
            let commitment = SwapCommitment {
                trader: trader.clone(),
                commit_hash: hash,
                pool_id,
                amount_in_bound,
                deposit: params.commit_deposit_amount,
                created_height: ctx.block.height,
                expiry_height: ctx.block.height + params.commit_expiry_blocks,
            };
            put_typed(ctx.store, Module::Dex, key, &commitment)?;
            put_typed(
                ctx.store,
                Module::Dex,
                keys::commit_expiry_key(commitment.expiry_height, trader, &hash),
                &(),
            )?;
            ctx.emit(
                Event::new(events::SWAP_COMMITTED)
                    .attr("trader", trader)
                    .attr("pool_id", pool_id)
                    .attr("expiry_height", commitment.expiry_height),
            );
            Ok(())
        })
    }

    /// Disclose the preimage and execute the committed swap.
    pub fn reveal_and_swap(
        &self,
        ctx: &mut Ctx,
        hooks: &dyn DexHooks,
        trader: &Address,
        reveal: &RevealSpec,
    ) -> Result<u128, DexError> {
        let hash = commit_hash(
            reveal.pool_id,
            &reveal.token_in,
            &reveal.token_out,
            reveal.amount_in,
            reveal.min_amount_out,
            &reveal.salt,
            trader,
        );
        let key = keys::commit_key(trader, &hash);
        let commitment = get_typed::<SwapCommitment>(ctx.store, Module::Dex, &key)?
            .ok_or(DexError::CommitNotFound)?;
        let params = Self::params(ctx)?;
        let mature_at = commitment.created_height + params.commit_reveal_delay_blocks;
        if ctx.block.height < mature_at {
            return Err(DexError::CommitNotMature { mature_at });
        }
        if ctx.block.height >= commitment.expiry_height {
            return Err(DexError::CommitExpired {
                expiry: commitment.expiry_height,
            });
        }
        if reveal.pool_id != commitment.pool_id {
            return Err(DexError::CommitMismatch);
        }
        if reveal.amount_in > commitment.amount_in_bound {
            return Err(DexError::CommitBoundExceeded {
                amount_in: reveal.amount_in,
                bound: commitment.amount_in_bound,
            });
        }
        Self::check_breakers(ctx, reveal.pool_id, &params)?;
        ctx.scoped(|ctx| {
            Self::charge_rate(ctx, trader, &params)?;
            let spec = SwapSpec {
                trader: trader.clone(),
                pool_id: reveal.pool_id,
                token_in: reveal.token_in.clone(),
                amount_in: reveal.amount_in,
                min_amount_out: reveal.min_amount_out,
            };
            let fill = Self::with_pool_lock(ctx, reveal.pool_id, &params, |ctx| {
                self.execute_swap(ctx, hooks, &spec, &params, true)
            })?;
            // Swap done: return the deposit and consume the commitment.
            Ledger::transfer(
                ctx.store,
                &Module::Dex.account(),
                trader,
                &[Coin::new(params.commit_deposit_denom.clone(), commitment.deposit)],
            )?;
            ctx.store.delete(Module::Dex, key.clone())?;
            ctx.store.delete(
                Module::Dex,
                keys::commit_expiry_key(commitment.expiry_height, trader, &hash),
            )?;
            ctx.emit(
                Event::new(events::SWAP_REVEALED)
                    .attr("trader", trader)
                    .attr("pool_id", reveal.pool_id)
                    .attr("amount_out", fill.amount_out),
            );
            Ok(fill.amount_out)
        })
    }

    /// Cancel an unrevealed commitment before expiry; the deposit comes
    /// back minus the cancellation fee.
    pub fn cancel_commitment(
        &self,
        ctx: &mut Ctx,
        trader: &Address,
        hash: [u8; 32],
    ) -> Result<(), DexError> {
        let key = keys::commit_key(trader, &hash);
        let commitment = get_typed::<SwapCommitment>(ctx.store, Module::Dex, &key)?
            .ok_or(DexError::CommitNotFound)?;
        if ctx.block.height >= commitment.expiry_height {
            return Err(DexError::CommitExpired {
                expiry: commitment.expiry_height,
            });
        }
        let params = Self::params(ctx)?;
        ctx.scoped(|ctx| {
            let fee = params.commit_cancel_fee.min(commitment.deposit);
            let refund = commitment.deposit - fee;
            Ledger::transfer(
                ctx.store,
                &Module::Dex.account(),
                trader,
                &[Coin::new(params.commit_deposit_denom.clone(), refund)],
            )?;
            Self::accrue_protocol_fee(ctx, params.commit_deposit_denom.as_str(), fee)?;
            ctx.store.delete(Module::Dex, key.clone())?;
            ctx.store.delete(
                Module::Dex,
                keys::commit_expiry_key(commitment.expiry_height, trader, &hash),
            )?;
            ctx.emit(
                Event::new(events::COMMITMENT_CANCELLED)
                    .attr("trader", trader)
                    .attr("refund", refund),
            );
            Ok(())
        })
    }

    /// End blocker: forfeit deposits of expired commitments, bounded per
    /// block. Both the primary record and the expiry index entry go.
    pub fn cleanup_expired_commitments(
        &self,
        ctx: &mut Ctx,
        params: &DexParams,
        budget: usize,
    ) -> Result<usize, DexError> {
        let due = ctx.store.range_between(
            Module::Dex,
            &keys::commit_expiry_prefix(),
            Some(&keys::commit_expiry_end(ctx.block.height)),
        )?;
        let mut cleaned = 0usize;
        for (index_key, _) in due.into_iter().take(budget) {
            // index key = ns, sub, expiry_be(8), len, trader, hash(32)
            if index_key.len() < 11 + 32 {
                ctx.store.delete(Module::Dex, index_key)?;
                continue;
            }
            let addr_len = index_key[10] as usize;
            if index_key.len() != 11 + addr_len + 32 {
                ctx.store.delete(Module::Dex, index_key)?;
                continue;
            }
            let trader_bytes = &index_key[11..11 + addr_len];
            let mut hash = [0u8; 32];
            hash.copy_from_slice(&index_key[11 + addr_len..11 + addr_len + 32]);
            let Some(trader) = std::str::from_utf8(trader_bytes).ok().and_then(Address::new)
            else {
                ctx.store.delete(Module::Dex, index_key)?;
                continue;
            };
            let key = keys::commit_key(&trader, &hash);
            if let Some(commitment) =
                get_typed::<SwapCommitment>(ctx.store, Module::Dex, &key)?
            {
                Self::accrue_protocol_fee(
                    ctx,
                    params.commit_deposit_denom.as_str(),
                    commitment.deposit,
                )?;
                ctx.store.delete(Module::Dex, key)?;
                ctx.emit(
                    Event::new(events::COMMITMENT_EXPIRED)
                        .attr("trader", &trader)
                        .attr("forfeited", commitment.deposit),
                );
            }
            ctx.store.delete(Module::Dex, index_key)?;
            cleaned += 1;
        }
        Ok(cleaned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::NoDexHooks;
    use paw_store::MultiStore;
    use shared_types::BlockCtx;

    fn addr(s: &str) -> Address {
        Address::new(s).unwrap()
    }

    fn denom(s: &str) -> Denom {
        Denom::new(s).unwrap()
    }

    fn setup_large_pool(store: &mut MultiStore) -> u64 {
        let creator = addr("paw1creator");
        for (d, amount) in [("upaw", 100_000_000u128), ("uusdt", 100_000_000u128)] {
            Ledger::mint(store, &creator, &Coin::new(denom(d), amount)).unwrap();
        }
        let mut events = Vec::new();
        let mut ctx = Ctx::new(store, BlockCtx::new(1, 1_000), &mut events);
        DexEngine::new()
            .create_pool(
                &mut ctx,
                &NoDexHooks,
                &creator,
                denom("upaw"),
                denom("uusdt"),
                10_000_000,
                20_000_000,
            )
            .unwrap()
    }

    fn reveal_spec(pool_id: u64) -> RevealSpec {
        RevealSpec {
            pool_id,
            token_in: denom("upaw"),
            token_out: denom("uusdt"),
            amount_in: 1_000_000,
            min_amount_out: 1_800_000,
            salt: [7u8; 32],
        }
    }

    fn committed(store: &mut MultiStore, pool_id: u64, trader: &Address) -> [u8; 32] {
        // Deposit funding plus the swap input.
        Ledger::mint(store, trader, &Coin::new(denom("upaw"), 3_000_000)).unwrap();
        let r = reveal_spec(pool_id);
        let hash = commit_hash(
            pool_id,
            &r.token_in,
            &r.token_out,
            r.amount_in,
            r.min_amount_out,
            &r.salt,
            trader,
        );
        let mut events = Vec::new();
        let mut ctx = Ctx::new(store, BlockCtx::new(5, 1_030), &mut events);
        DexEngine::new()
            .commit_swap(&mut ctx, trader, pool_id, hash, 1_000_000)
            .unwrap();
        hash
    }

    #[test]
    fn test_commit_reveal_large_swap() {
        let mut store = MultiStore::in_memory();
        let pool_id = setup_large_pool(&mut store);
        let trader = addr("paw1whale");
        committed(&mut store, pool_id, &trader);
        let before = Ledger::balance(&store, &trader, &denom("upaw")).unwrap();

        let mut events = Vec::new();
        let mut ctx = Ctx::new(&mut store, BlockCtx::new(7, 1_042), &mut events);
        let out = DexEngine::new()
            .reveal_and_swap(&mut ctx, &NoDexHooks, &trader, &reveal_spec(pool_id))
            .unwrap();
        assert_eq!(out, 1_812_727);
        // Deposit returned; the 1,000,000 swap input out is offset by the
        // 1,000,000 deposit refund, so the upaw balance is unchanged.
        assert_eq!(
            Ledger::balance(ctx.store, &trader, &denom("upaw")).unwrap(),
            before
        );
        assert_eq!(
            Ledger::balance(ctx.store, &trader, &denom("uusdt")).unwrap(),
            1_812_727
        );
        // Second reveal of the same preimage fails.
        let err = DexEngine::new()
            .reveal_and_swap(&mut ctx, &NoDexHooks, &trader, &reveal_spec(pool_id))
            .unwrap_err();
        assert!(matches!(err, DexError::CommitNotFound));
    }

    #[test]
    fn test_reveal_too_early() {
        let mut store = MultiStore::in_memory();
        let pool_id = setup_large_pool(&mut store);
        let trader = addr("paw1whale");
        committed(&mut store, pool_id, &trader);
        let mut events = Vec::new();
        let mut ctx = Ctx::new(&mut store, BlockCtx::new(6, 1_036), &mut events);
        let err = DexEngine::new()
            .reveal_and_swap(&mut ctx, &NoDexHooks, &trader, &reveal_spec(pool_id))
            .unwrap_err();
        assert!(matches!(err, DexError::CommitNotMature { mature_at: 7 }));
    }

    #[test]
    fn test_reveal_with_wrong_salt_not_found() {
        let mut store = MultiStore::in_memory();
        let pool_id = setup_large_pool(&mut store);
        let trader = addr("paw1whale");
        committed(&mut store, pool_id, &trader);
        let mut events = Vec::new();
        let mut ctx = Ctx::new(&mut store, BlockCtx::new(8, 1_048), &mut events);
        let mut r = reveal_spec(pool_id);
        r.salt = [8u8; 32];
        let err = DexEngine::new()
            .reveal_and_swap(&mut ctx, &NoDexHooks, &trader, &r)
            .unwrap_err();
        assert!(matches!(err, DexError::CommitNotFound));
    }

    #[test]
    fn test_duplicate_commit_rejected() {
        let mut store = MultiStore::in_memory();
        let pool_id = setup_large_pool(&mut store);
        let trader = addr("paw1whale");
        let hash = committed(&mut store, pool_id, &trader);
        let mut events = Vec::new();
        let mut ctx = Ctx::new(&mut store, BlockCtx::new(6, 1_036), &mut events);
        let err = DexEngine::new()
            .commit_swap(&mut ctx, &trader, pool_id, hash, 1_000_000)
            .unwrap_err();
        assert!(matches!(err, DexError::DuplicateCommit));
    }

    #[test]
    fn test_cancel_refunds_minus_fee() {
        let mut store = MultiStore::in_memory();
        let pool_id = setup_large_pool(&mut store);
        let trader = addr("paw1whale");
        let hash = committed(&mut store, pool_id, &trader);
        let before = Ledger::balance(&store, &trader, &denom("upaw")).unwrap();
        let mut events = Vec::new();
        let mut ctx = Ctx::new(&mut store, BlockCtx::new(10, 1_060), &mut events);
        DexEngine::new()
            .cancel_commitment(&mut ctx, &trader, hash)
            .unwrap();
        let params = DexEngine::params(&ctx).unwrap();
        assert_eq!(
            Ledger::balance(ctx.store, &trader, &denom("upaw")).unwrap(),
            before + params.commit_deposit_amount - params.commit_cancel_fee
        );
        // No index entries remain.
        assert!(ctx
            .store
            .range(Module::Dex, &keys::commit_expiry_prefix())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_expiry_forfeits_deposit() {
        let mut store = MultiStore::in_memory();
        let pool_id = setup_large_pool(&mut store);
        let trader = addr("paw1whale");
        let hash = committed(&mut store, pool_id, &trader);
        let params = DexParams::default();
        let mut events = Vec::new();
        // Past expiry (committed at 5, expiry 55).
        let mut ctx = Ctx::new(&mut store, BlockCtx::new(60, 1_400), &mut events);
        let cleaned = DexEngine::new()
            .cleanup_expired_commitments(&mut ctx, &params, 50)
            .unwrap();
        assert_eq!(cleaned, 1);
        let key = keys::commit_key(&trader, &hash);
        assert!(
            get_typed::<SwapCommitment>(ctx.store, Module::Dex, &key)
                .unwrap()
                .is_none()
        );
        // Deposit accrued to protocol fees.
        let fees: u128 = get_typed(
            ctx.store,
            Module::Dex,
            &keys::protocol_fee_key(params.commit_deposit_denom.as_str()),
        )
        .unwrap()
        .unwrap();
        assert_eq!(fees, params.commit_deposit_amount);
    }
}
