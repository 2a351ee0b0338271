//! # Oracle Slashing
//!
//! Outliers lose 0.01% of stake per event (100 ppm); a validator that
//! submits nothing for a whole period loses 0.0001% (1 ppm). Reputation
//! decays quadratically with the running offense count. Slashed stake is
//! burned from the module account. Outlier history is bounded by height
//! with an end-blocker sweep.

use shared_types::{Address, Coin, Denom, Event, Module};

use paw_store::codec::{get_typed, put_typed};
use paw_store::{Ctx, Ledger};

use crate::domain::entities::OutlierRecord;
use crate::domain::errors::OracleError;
use crate::domain::keys;
use crate::domain::params::OracleParams;
use crate::engine::submissions::LastSubmission;
use crate::events;

use super::OracleEngine;

fn stake_denom() -> Denom {
    Denom::new("upaw").expect("static denom")
}

fn slash_amount(stake: u128, ppm: u32) -> u128 {
    stake.saturating_mul(ppm as u128) / 1_000_000
}

impl OracleEngine {
    /// Slash one outlier submission and record it in the bounded history.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn slash_outlier(
        &self,
        ctx: &mut Ctx,
        validator_addr: &Address,
        asset: &str,
        vote_period: u64,
        price_micro: u128,
        band: (u128, u128),
        params: &OracleParams,
        seq: u32,
    ) -> Result<(), OracleError> {
        let mut validator = match Self::load_validator(ctx, validator_addr) {
            Ok(v) => v,
            // Deregistered between submission and aggregation: nothing to
            // slash.
            Err(OracleError::ValidatorNotFound) => return Ok(()),
            Err(e) => return Err(e),
        };
        let amount = slash_amount(validator.stake, params.outlier_slash_ppm);
        validator.stake -= amount;
        validator.outlier_count += 1;
        let penalty = (validator.outlier_count as i64).saturating_pow(2);
        validator.reputation = (validator.reputation - penalty).max(0);
        Self::save_validator(ctx, &validator)?;
        if amount > 0 {
            Ledger::burn(
                ctx.store,
                &Module::Oracle.account(),
                &Coin::new(stake_denom(), amount),
            )?;
        }
        let record = OutlierRecord {
            validator: validator_addr.clone(),
            asset: asset.to_string(),
            vote_period,
            height: ctx.block.height,
            price_micro,
            band_low: band.0,
            band_high: band.1,
        };
        put_typed(
            ctx.store,
            Module::Oracle,
            keys::outlier_key(ctx.block.height, validator_addr, seq),
            &record,
        )?;
        ctx.emit(
            Event::new(events::OUTLIER_SLASHED)
                .attr("validator", validator_addr)
                .attr("asset", asset)
                .attr("amount", amount)
                .attr("outlier_count", validator.outlier_count),
        );
        tracing::info!(
            validator = %validator_addr,
            asset,
            %amount,
            "outlier slashed"
        );
        Ok(())
    }

    /// Slash validators that submitted nothing during the ended period.
    pub(crate) fn slash_misses(
        &self,
        ctx: &mut Ctx,
        params: &OracleParams,
        ended_period: u64,
    ) -> Result<(), OracleError> {
        let period_start = ended_period * params.vote_period_blocks;
        for mut validator in Self::all_validators(ctx)? {
            // Registered mid-period: no obligation yet.
            if validator.registered_height >= period_start {
                continue;
            }
            let last: LastSubmission = get_typed(
                ctx.store,
                Module::Oracle,
                &keys::last_submission_key(&validator.addr),
            )?
            .unwrap_or_default();
            if last.height != 0 && last.vote_period >= ended_period {
                continue;
            }
            let amount = slash_amount(validator.stake, params.miss_slash_ppm);
            if amount == 0 {
                continue;
            }
            validator.stake -= amount;
            let addr = validator.addr.clone();
            Self::save_validator(ctx, &validator)?;
            Ledger::burn(
                ctx.store,
                &Module::Oracle.account(),
                &Coin::new(stake_denom(), amount),
            )?;
            ctx.emit(
                Event::new(events::MISS_SLASHED)
                    .attr("validator", &addr)
                    .attr("period", ended_period)
                    .attr("amount", amount),
            );
        }
        Ok(())
    }

    /// Drop outlier records older than the retention window.
    pub(crate) fn cleanup_outlier_history(
        &self,
        ctx: &mut Ctx,
        params: &OracleParams,
    ) -> Result<(), OracleError> {
        let Some(cutoff) = ctx
            .block
            .height
            .checked_sub(params.max_outlier_history_blocks)
        else {
            return Ok(());
        };
        let stale = ctx.store.range_between(
            Module::Oracle,
            &keys::outlier_prefix(),
            Some(&keys::outlier_end(cutoff)),
        )?;
        for (key, _) in stale {
            ctx.store.delete(Module::Oracle, key)?;
        }
        Ok(())
    }
}
