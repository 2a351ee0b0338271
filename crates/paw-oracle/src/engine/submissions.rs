//! # Price Submissions
//!
//! Validators (or their delegated feeders) submit one price per asset per
//! vote period, signed with the validator's registered ed25519 key. Pacing
//! and window budgets are enforced per validator; the diversity floors are
//! re-checked here so a set that degraded after registration stops being
//! accepted.

use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use shared_types::{Address, Event, Module};

use paw_store::codec::{get_typed, put_typed};
use paw_store::Ctx;

use crate::domain::entities::{
    PriceSubmission, MAX_PRICE_MICRO, MIN_PRICE_MICRO,
};
use crate::domain::errors::OracleError;
use crate::domain::keys;
use crate::events;

use super::OracleEngine;

/// Pacing record per validator.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct LastSubmission {
    pub height: u64,
    pub vote_period: u64,
}

/// Canonical bytes signed by the validator's registered key.
pub fn submission_message(
    asset: &str,
    price_micro: u128,
    vote_period: u64,
    validator: &Address,
) -> Vec<u8> {
    let mut m = Vec::with_capacity(32 + asset.len() + validator.as_bytes().len());
    m.extend_from_slice(b"paw/oracle/price");
    m.extend_from_slice(asset.as_bytes());
    m.push(0x00);
    m.extend_from_slice(&price_micro.to_be_bytes());
    m.extend_from_slice(&vote_period.to_be_bytes());
    m.extend_from_slice(validator.as_bytes());
    m
}

impl OracleEngine {
    /// Accept one `(asset, price)` submission for the current vote period.
    #[allow(clippy::too_many_arguments)]
    pub fn submit_price(
        &self,
        ctx: &mut Ctx,
        sender: &Address,
        validator_addr: &Address,
        asset: &str,
        price_micro: u128,
        signature: &[u8],
    ) -> Result<(), OracleError> {
        let params = Self::params(ctx)?;
        let mut validator = Self::load_validator(ctx, validator_addr)?;

        let authorized = *sender == validator.addr
            || validator.feeder.as_ref() == Some(sender);
        if !authorized {
            return Err(OracleError::NotFeeder);
        }
        let usable_from = validator.registered_height + params.min_validator_age_blocks;
        if ctx.block.height < usable_from {
            return Err(OracleError::ValidatorTooYoung {
                registered: validator.registered_height,
                usable_from,
            });
        }
        if !Self::is_whitelisted(ctx, asset)? {
            return Err(OracleError::AssetNotWhitelisted {
                asset: asset.to_string(),
            });
        }
        if !(MIN_PRICE_MICRO..=MAX_PRICE_MICRO).contains(&price_micro) {
            return Err(OracleError::PriceOutOfRange { price_micro });
        }
        Self::check_breakers(ctx, Some(asset))?;
        Self::check_diversity(ctx)?;

        // Pacing: at least `min_blocks_between_submissions` between
        // accepted submissions from one validator.
        let last: LastSubmission = get_typed(
            ctx.store,
            Module::Oracle,
            &keys::last_submission_key(validator_addr),
        )?
        .unwrap_or_default();
        if last.height != 0
            && ctx.block.height < last.height + params.min_blocks_between_submissions
        {
            return Err(OracleError::SubmissionTooSoon {
                last: last.height,
                next: last.height + params.min_blocks_between_submissions,
            });
        }

        // Window budget.
        let window_start = ctx.block.height - ctx.block.height % params.rate_limit_window;
        let used: u32 = get_typed(
            ctx.store,
            Module::Oracle,
            &keys::window_key(validator_addr, window_start),
        )?
        .unwrap_or(0);
        if used >= params.max_submissions_per_window {
            return Err(OracleError::WindowExhausted {
                used,
                limit: params.max_submissions_per_window,
            });
        }

        // Signature over the canonical message, against the registered key.
        let vote_period = params.period_of(ctx.block.height);
        let key =
            VerifyingKey::from_bytes(&validator.pubkey).map_err(|_| OracleError::BadKey)?;
        if key.is_weak() {
            return Err(OracleError::BadKey);
        }
        let sig_bytes: [u8; 64] = signature
            .try_into()
            .map_err(|_| OracleError::BadSignature)?;
        let sig = Signature::from_bytes(&sig_bytes);
        let message = submission_message(asset, price_micro, vote_period, validator_addr);
        key.verify(&message, &sig)
            .map_err(|_| OracleError::BadSignature)?;

        ctx.scoped(|ctx| {
            let submission = PriceSubmission {
                asset: asset.to_string(),
                validator: validator_addr.clone(),
                vote_period,
                price_micro,
                submission_height: ctx.block.height,
            };
            put_typed(
                ctx.store,
                Module::Oracle,
                keys::submission_key(asset, validator_addr, vote_period),
                &submission,
            )?;
            put_typed(
                ctx.store,
                Module::Oracle,
                keys::window_key(validator_addr, window_start),
                &(used + 1),
            )?;
            put_typed(
                ctx.store,
                Module::Oracle,
                keys::last_submission_key(validator_addr),
                &LastSubmission {
                    height: ctx.block.height,
                    vote_period,
                },
            )?;
            validator.submissions_total += 1;
            Self::save_validator(ctx, &validator)?;
            ctx.emit(
                Event::new(events::PRICE_SUBMITTED)
                    .attr("asset", asset)
                    .attr("validator", validator_addr)
                    .attr("price_micro", price_micro)
                    .attr("vote_period", vote_period),
            );
            Ok(())
        })
    }

    /// All submissions for `(asset, period)`, no staleness filter.
    pub(crate) fn submissions_for(
        ctx: &Ctx,
        asset: &str,
        vote_period: u64,
    ) -> Result<Vec<PriceSubmission>, OracleError> {
        Ok(ctx
            .store
            .range(Module::Oracle, &keys::submission_prefix(asset, vote_period))?
            .into_iter()
            .filter_map(|(_, v)| bincode::deserialize(&v).ok())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};
    use paw_store::{Ledger, MultiStore};
    use shared_types::{BlockCtx, Coin, Denom};

    fn addr(s: &str) -> Address {
        Address::new(s).unwrap()
    }

    fn register(store: &mut MultiStore, name: &str, seed: u8) -> (Address, SigningKey) {
        let v = addr(name);
        let sk = SigningKey::from_bytes(&[seed; 32]);
        Ledger::mint(
            store,
            &v,
            &Coin::new(Denom::new("upaw").unwrap(), 10_000_000),
        )
        .unwrap();
        let mut events = Vec::new();
        let mut ctx = Ctx::new(store, BlockCtx::new(1, 0), &mut events);
        OracleEngine::new()
            .register_validator(
                &mut ctx,
                &v,
                2_000_000,
                "us-east".into(),
                format!("10.0.0.{seed}"),
                65_000 + seed as u32,
                sk.verifying_key().to_bytes(),
            )
            .unwrap();
        OracleEngine::new()
            .whitelist_asset(&mut ctx, &addr("paw1gov"), "BTC/USD".into())
            .ok();
        (v, sk)
    }

    fn signed_submit(
        store: &mut MultiStore,
        v: &Address,
        sk: &SigningKey,
        height: u64,
        price: u128,
    ) -> Result<(), OracleError> {
        let mut events = Vec::new();
        let mut ctx = Ctx::new(store, BlockCtx::new(height, 0), &mut events);
        let params = OracleEngine::params(&ctx).unwrap();
        let period = params.period_of(height);
        let msg = submission_message("BTC/USD", price, period, v);
        let sig = sk.sign(&msg);
        OracleEngine::new().submit_price(&mut ctx, v, v, "BTC/USD", price, &sig.to_bytes())
    }

    #[test]
    fn test_submit_accepts_valid_signature() {
        let mut store = MultiStore::in_memory();
        let (v, sk) = register(&mut store, "paw1val1", 1);
        signed_submit(&mut store, &v, &sk, 5, 50_000 * 1_000_000).unwrap();
        let mut events = Vec::new();
        let ctx = Ctx::new(&mut store, BlockCtx::new(5, 0), &mut events);
        let subs = OracleEngine::submissions_for(&ctx, "BTC/USD", 0).unwrap();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].price_micro, 50_000 * 1_000_000);
    }

    #[test]
    fn test_submit_rejects_bad_signature() {
        let mut store = MultiStore::in_memory();
        let (v, _) = register(&mut store, "paw1val1", 1);
        let wrong = SigningKey::from_bytes(&[99; 32]);
        let err = signed_submit(&mut store, &v, &wrong, 5, 50_000 * 1_000_000).unwrap_err();
        assert!(matches!(err, OracleError::BadSignature));
    }

    #[test]
    fn test_submit_pacing() {
        let mut store = MultiStore::in_memory();
        let (v, sk) = register(&mut store, "paw1val1", 1);
        signed_submit(&mut store, &v, &sk, 5, 50_000 * 1_000_000).unwrap();
        // Same block: too soon with a 1-block minimum spacing.
        let err = signed_submit(&mut store, &v, &sk, 5, 50_100 * 1_000_000).unwrap_err();
        assert!(matches!(err, OracleError::SubmissionTooSoon { .. }));
        signed_submit(&mut store, &v, &sk, 6, 50_100 * 1_000_000).unwrap();
    }

    #[test]
    fn test_submission_window_budget() {
        let mut store = MultiStore::in_memory();
        let (v, sk) = register(&mut store, "paw1val1", 1);
        // Budget is 10 per 100-block window.
        for i in 0..10u64 {
            signed_submit(&mut store, &v, &sk, 5 + i, 50_000 * 1_000_000).unwrap();
        }
        let err = signed_submit(&mut store, &v, &sk, 20, 50_000 * 1_000_000).unwrap_err();
        assert!(matches!(err, OracleError::WindowExhausted { used: 10, .. }));
        // Fresh window, fresh budget.
        signed_submit(&mut store, &v, &sk, 101, 50_000 * 1_000_000).unwrap();
    }

    #[test]
    fn test_price_bounds() {
        let mut store = MultiStore::in_memory();
        let (v, sk) = register(&mut store, "paw1val1", 1);
        let err = signed_submit(&mut store, &v, &sk, 5, 0).unwrap_err();
        assert!(matches!(err, OracleError::PriceOutOfRange { .. }));
        let err = signed_submit(&mut store, &v, &sk, 5, MAX_PRICE_MICRO + 1).unwrap_err();
        assert!(matches!(err, OracleError::PriceOutOfRange { .. }));
    }

    #[test]
    fn test_feeder_delegation() {
        let mut store = MultiStore::in_memory();
        let (v, sk) = register(&mut store, "paw1val1", 1);
        let feeder = addr("paw1feeder");
        {
            let mut events = Vec::new();
            let mut ctx = Ctx::new(&mut store, BlockCtx::new(2, 0), &mut events);
            OracleEngine::new()
                .delegate_feeder(&mut ctx, &v, feeder.clone())
                .unwrap();
        }
        let mut events = Vec::new();
        let mut ctx = Ctx::new(&mut store, BlockCtx::new(5, 0), &mut events);
        let params = OracleEngine::params(&ctx).unwrap();
        let msg = submission_message("BTC/USD", 42 * 1_000_000, params.period_of(5), &v);
        let sig = sk.sign(&msg);
        // Feeder sends on the validator's behalf; stranger cannot.
        OracleEngine::new()
            .submit_price(&mut ctx, &feeder, &v, "BTC/USD", 42 * 1_000_000, &sig.to_bytes())
            .unwrap();
        let err = OracleEngine::new()
            .submit_price(
                &mut ctx,
                &addr("paw1rando"),
                &v,
                "BTC/USD",
                42 * 1_000_000,
                &sig.to_bytes(),
            )
            .unwrap_err();
        assert!(matches!(err, OracleError::NotFeeder));
    }
}
