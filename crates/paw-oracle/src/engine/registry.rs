//! # Validator Registry
//!
//! Registration under stake, key, and diversity constraints. IP and ASN
//! saturation counters are O(1) lookups keyed by the claimed value; the
//! full-set diversity floors are re-checked on the submission path, not
//! only here.

use ed25519_dalek::VerifyingKey;
use shared_types::{Address, Coin, Denom, Event, Module};

use paw_store::codec::{get_typed, put_typed};
use paw_store::{Ctx, Ledger};

use crate::algorithms::diversity;
use crate::domain::entities::{AssetInfo, OracleValidator};
use crate::domain::errors::OracleError;
use crate::domain::keys;
use crate::events;

use super::OracleEngine;

/// Denomination oracle stakes are posted in.
fn stake_denom() -> Denom {
    Denom::new("upaw").expect("static denom")
}

impl OracleEngine {
    /// Register the sender as an oracle validator.
    pub fn register_validator(
        &self,
        ctx: &mut Ctx,
        sender: &Address,
        stake: u128,
        region: String,
        ip: String,
        asn: u32,
        pubkey: [u8; 32],
    ) -> Result<(), OracleError> {
        let params = Self::params(ctx)?;
        if get_typed::<OracleValidator>(ctx.store, Module::Oracle, &keys::validator_key(sender))?
            .is_some()
        {
            return Err(OracleError::AlreadyRegistered);
        }
        if stake < params.min_validator_stake {
            return Err(OracleError::StakeTooLow {
                got: stake,
                min: params.min_validator_stake,
            });
        }
        if region.is_empty() {
            return Err(OracleError::MissingRegion);
        }
        if params.require_geographic_diversity && !diversity::verify_region_claim(&region) {
            return Err(OracleError::RegionClaimRejected { region });
        }
        let key = VerifyingKey::from_bytes(&pubkey).map_err(|_| OracleError::BadKey)?;
        if key.is_weak() {
            return Err(OracleError::BadKey);
        }

        let ip_count: u32 =
            get_typed(ctx.store, Module::Oracle, &keys::ip_count_key(&ip))?.unwrap_or(0);
        if ip_count >= params.max_validators_per_ip {
            return Err(OracleError::IpSaturated {
                ip,
                count: ip_count,
                max: params.max_validators_per_ip,
            });
        }
        let asn_count: u32 =
            get_typed(ctx.store, Module::Oracle, &keys::asn_count_key(asn))?.unwrap_or(0);
        if asn_count >= params.max_validators_per_asn {
            return Err(OracleError::AsnSaturated {
                asn,
                count: asn_count,
                max: params.max_validators_per_asn,
            });
        }

        ctx.scoped(|ctx| {
            Ledger::transfer(
                ctx.store,
                sender,
                &Module::Oracle.account(),
                &[Coin::new(stake_denom(), stake)],
            )?;
            put_typed(
                ctx.store,
                Module::Oracle,
                keys::ip_count_key(&ip),
                &(ip_count + 1),
            )?;
            put_typed(
                ctx.store,
                Module::Oracle,
                keys::asn_count_key(asn),
                &(asn_count + 1),
            )?;
            let validator = OracleValidator {
                addr: sender.clone(),
                stake,
                region,
                ip,
                asn,
                pubkey,
                feeder: None,
                reputation: 100,
                outlier_count: 0,
                submissions_total: 0,
                submissions_accepted: 0,
                registered_height: ctx.block.height,
            };
            Self::save_validator(ctx, &validator)?;
            ctx.emit(
                Event::new(events::VALIDATOR_REGISTERED)
                    .attr("validator", sender)
                    .attr("stake", stake),
            );
            tracing::info!(validator = %sender, %stake, "oracle validator registered");
            Ok(())
        })
    }

    /// Delegate submission rights to a feeder account.
    pub fn delegate_feeder(
        &self,
        ctx: &mut Ctx,
        sender: &Address,
        feeder: Address,
    ) -> Result<(), OracleError> {
        let mut validator = Self::load_validator(ctx, sender)?;
        validator.feeder = Some(feeder.clone());
        Self::save_validator(ctx, &validator)?;
        ctx.emit(
            Event::new(events::FEEDER_DELEGATED)
                .attr("validator", sender)
                .attr("feeder", feeder),
        );
        Ok(())
    }

    /// Governance: whitelist an asset for submissions.
    pub fn whitelist_asset(
        &self,
        ctx: &mut Ctx,
        sender: &Address,
        asset: String,
    ) -> Result<(), OracleError> {
        let params = Self::params(ctx)?;
        if *sender != params.authority {
            return Err(OracleError::Unauthorized {
                reason: "only the oracle authority may whitelist assets".into(),
            });
        }
        let info = AssetInfo {
            asset: asset.clone(),
            whitelisted_height: ctx.block.height,
        };
        put_typed(ctx.store, Module::Oracle, keys::asset_key(&asset), &info)?;
        ctx.emit(Event::new(events::ASSET_WHITELISTED).attr("asset", asset));
        Ok(())
    }

    pub(crate) fn is_whitelisted(ctx: &Ctx, asset: &str) -> Result<bool, OracleError> {
        Ok(get_typed::<AssetInfo>(ctx.store, Module::Oracle, &keys::asset_key(asset))?.is_some())
    }

    /// Runtime diversity floor over the whole registered set.
    pub(crate) fn check_diversity(ctx: &Ctx) -> Result<(), OracleError> {
        let params = Self::params(ctx)?;
        if !params.require_geographic_diversity {
            return Ok(());
        }
        let regions: Vec<String> = Self::all_validators(ctx)?
            .into_iter()
            .map(|v| v.region)
            .collect();
        let count = diversity::region_count(&regions);
        if count < params.min_geographic_regions {
            return Err(OracleError::InsufficientRegions {
                regions: count,
                min: params.min_geographic_regions,
            });
        }
        let index = diversity::diversity_index_bps(&regions);
        if index < params.min_diversity_index_bps {
            return Err(OracleError::DiversityTooLow {
                got_bps: index,
                min_bps: params.min_diversity_index_bps,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::SigningKey;
    use paw_store::MultiStore;
    use shared_types::BlockCtx;

    pub(crate) fn test_pubkey(seed: u8) -> [u8; 32] {
        SigningKey::from_bytes(&[seed; 32])
            .verifying_key()
            .to_bytes()
    }

    fn addr(s: &str) -> Address {
        Address::new(s).unwrap()
    }

    fn fund(store: &mut MultiStore, who: &Address, amount: u128) {
        Ledger::mint(store, who, &Coin::new(stake_denom(), amount)).unwrap();
    }

    #[test]
    fn test_register_takes_stake() {
        let mut store = MultiStore::in_memory();
        let v = addr("paw1val1");
        fund(&mut store, &v, 5_000_000);
        let mut events = Vec::new();
        let mut ctx = Ctx::new(&mut store, BlockCtx::new(1, 0), &mut events);
        OracleEngine::new()
            .register_validator(
                &mut ctx,
                &v,
                2_000_000,
                "us-east".into(),
                "10.1.1.1".into(),
                65_001,
                test_pubkey(1),
            )
            .unwrap();
        assert_eq!(
            Ledger::balance(ctx.store, &v, &stake_denom()).unwrap(),
            3_000_000
        );
        let stored = OracleEngine::load_validator(&ctx, &v).unwrap();
        assert_eq!(stored.stake, 2_000_000);
        assert_eq!(stored.reputation, 100);
    }

    #[test]
    fn test_register_rejects_low_stake() {
        let mut store = MultiStore::in_memory();
        let v = addr("paw1val1");
        fund(&mut store, &v, 5_000_000);
        let mut events = Vec::new();
        let mut ctx = Ctx::new(&mut store, BlockCtx::new(1, 0), &mut events);
        let err = OracleEngine::new()
            .register_validator(
                &mut ctx,
                &v,
                999_999,
                "us-east".into(),
                "10.1.1.1".into(),
                65_001,
                test_pubkey(1),
            )
            .unwrap_err();
        assert!(matches!(err, OracleError::StakeTooLow { .. }));
    }

    #[test]
    fn test_ip_saturation() {
        let mut store = MultiStore::in_memory();
        let mut events = Vec::new();
        for i in 0..2u8 {
            let v = addr(&format!("paw1val{i}"));
            fund(&mut store, &v, 5_000_000);
            let mut ctx = Ctx::new(&mut store, BlockCtx::new(1, 0), &mut events);
            OracleEngine::new()
                .register_validator(
                    &mut ctx,
                    &v,
                    2_000_000,
                    "us-east".into(),
                    "10.0.0.9".into(),
                    65_001,
                    test_pubkey(i + 1),
                )
                .unwrap();
        }
        let v3 = addr("paw1val9");
        fund(&mut store, &v3, 5_000_000);
        let mut ctx = Ctx::new(&mut store, BlockCtx::new(1, 0), &mut events);
        let err = OracleEngine::new()
            .register_validator(
                &mut ctx,
                &v3,
                2_000_000,
                "eu-west".into(),
                "10.0.0.9".into(),
                64_999,
                test_pubkey(9),
            )
            .unwrap_err();
        assert!(matches!(err, OracleError::IpSaturated { count: 2, .. }));
    }

    #[test]
    fn test_weak_key_rejected() {
        let mut store = MultiStore::in_memory();
        let v = addr("paw1val1");
        fund(&mut store, &v, 5_000_000);
        let mut events = Vec::new();
        let mut ctx = Ctx::new(&mut store, BlockCtx::new(1, 0), &mut events);
        // The identity point is one of the eight known low-order points.
        let weak: [u8; 32] = [
            1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
            0, 0, 0, 0, 0,
        ];
        let err = OracleEngine::new()
            .register_validator(
                &mut ctx,
                &v,
                2_000_000,
                "us-east".into(),
                "10.1.1.1".into(),
                65_001,
                weak,
            )
            .unwrap_err();
        assert!(matches!(err, OracleError::BadKey));
    }

    #[test]
    fn test_whitelist_requires_authority() {
        let mut store = MultiStore::in_memory();
        let mut events = Vec::new();
        let mut ctx = Ctx::new(&mut store, BlockCtx::new(1, 0), &mut events);
        let err = OracleEngine::new()
            .whitelist_asset(&mut ctx, &addr("paw1mallory"), "BTC/USD".into())
            .unwrap_err();
        assert!(matches!(err, OracleError::Unauthorized { .. }));
        OracleEngine::new()
            .whitelist_asset(&mut ctx, &addr("paw1gov"), "BTC/USD".into())
            .unwrap();
        assert!(OracleEngine::is_whitelisted(&ctx, "BTC/USD").unwrap());
    }
}
