//! # Vote-Period Snapshots & Aggregation
//!
//! At every period start the engine freezes each validator's voting power;
//! all weighting during the period reads that snapshot, never live stake,
//! so restaking mid-period cannot tilt the median.
//!
//! Aggregation fans the per-asset work over a small worker pool. Each
//! worker computes a pure function of the submissions collected for its
//! asset; results come back positionally, and state is applied in sorted
//! asset order, so worker scheduling cannot reorder anything observable.

use rayon::prelude::*;
use shared_types::{Address, Event, Module};

use paw_store::codec::{get_typed, put_typed};
use paw_store::Ctx;

use crate::algorithms::median::{self, WeightedPoint};
use crate::domain::entities::{
    AggregatedPrice, AggregationTier, AssetInfo, PowerSnapshot,
};
use crate::domain::errors::OracleError;
use crate::domain::keys;
use crate::domain::params::OracleParams;
use crate::events;
use crate::hooks::OracleHooks;

use super::OracleEngine;

/// Sigma multiple for the outlier band.
const OUTLIER_SIGMA: u128 = 3;
/// Band recomputation passes.
const OUTLIER_PASSES: usize = 2;
/// Worker pool width for per-asset aggregation.
const AGGREGATION_WORKERS: usize = 4;

/// Result of aggregating one asset, before any state is written.
#[derive(Clone, Debug)]
pub(crate) struct AssetOutcome {
    pub asset: String,
    /// `(price, tier, confidence_bps, validator_count)` if publishable.
    pub published: Option<(u128, AggregationTier, u32, u32)>,
    /// Outliers with the band they fell outside of.
    pub outliers: Vec<(Address, u128, u128, u128)>,
    /// `(outlier_weight, total_weight)` when more than a third of weight
    /// submitted outliers.
    pub byzantine: Option<(u128, u128)>,
}

/// Pure per-asset aggregation.
fn aggregate_asset(
    asset: &str,
    points: Vec<WeightedPoint>,
    params: &OracleParams,
    in_bootstrap: bool,
) -> AssetOutcome {
    if points.is_empty() {
        return AssetOutcome {
            asset: asset.to_string(),
            published: None,
            outliers: Vec::new(),
            byzantine: None,
        };
    }
    let total_weight: u128 = points.iter().map(|p| p.weight).sum();
    let band = median::outlier_band(&points, OUTLIER_SIGMA);
    let (kept, outliers) = median::strip_outliers(points.clone(), OUTLIER_SIGMA, OUTLIER_PASSES);
    let outlier_weight: u128 = outliers.iter().map(|p| p.weight).sum();
    let kept_weight: u128 = kept.iter().map(|p| p.weight).sum();
    let byzantine = outlier_weight.saturating_mul(3) > total_weight;

    let (band_low, band_high) = band.unwrap_or((0, u128::MAX));
    let outlier_records: Vec<(Address, u128, u128, u128)> = outliers
        .iter()
        .map(|p| (p.validator.clone(), p.price_micro, band_low, band_high))
        .collect();

    let published = if byzantine && !in_bootstrap {
        // Too much weight outside the band to trust any median.
        None
    } else if kept.len() as u32 >= params.min_validators_for_security {
        median::weighted_median(&kept).map(|price| {
            let confidence = if total_weight == 0 {
                0
            } else {
                (kept_weight.saturating_mul(10_000) / total_weight) as u32
            };
            (
                price,
                AggregationTier::FilteredMedian,
                confidence,
                kept.len() as u32,
            )
        })
    } else {
        // Filtered set too thin: fall back to the unfiltered median.
        median::weighted_median(&points).map(|price| {
            (
                price,
                AggregationTier::UnfilteredMedian,
                (kept_weight.saturating_mul(10_000) / total_weight.max(1)) as u32,
                points.len() as u32,
            )
        })
    };

    AssetOutcome {
        asset: asset.to_string(),
        published,
        outliers: outlier_records,
        byzantine: byzantine.then_some((outlier_weight, total_weight)),
    }
}

impl OracleEngine {
    /// Freeze every validator's power for the period beginning now, and
    /// prune snapshots past retention.
    pub fn snapshot_period(ctx: &mut Ctx, params: &OracleParams) -> Result<(), OracleError> {
        let period = params.period_of(ctx.block.height);
        let validators = Self::all_validators(ctx)?;
        let mut total: u128 = 0;
        for v in &validators {
            let snapshot = PowerSnapshot {
                vote_period: period,
                validator: v.addr.clone(),
                power: v.power(),
            };
            put_typed(
                ctx.store,
                Module::Oracle,
                keys::snapshot_key(period, &v.addr),
                &snapshot,
            )?;
            total = total.saturating_add(v.power());
        }
        put_typed(
            ctx.store,
            Module::Oracle,
            keys::snapshot_total_key(period),
            &total,
        )?;
        tracing::debug!(period, validators = validators.len(), %total, "power snapshot");

        // Retention sweep.
        if period >= params.snapshot_retention_periods {
            let cutoff = period - params.snapshot_retention_periods;
            for (key, _) in ctx
                .store
                .range(Module::Oracle, &[keys::NS, keys::SUB_SNAPSHOT])?
            {
                if key.len() >= 10 {
                    let mut be = [0u8; 8];
                    be.copy_from_slice(&key[2..10]);
                    if u64::from_be_bytes(be) < cutoff {
                        ctx.store.delete(Module::Oracle, key)?;
                    }
                }
            }
            for (key, _) in ctx
                .store
                .range(Module::Oracle, &[keys::NS, keys::SUB_SNAPSHOT_TOTAL])?
            {
                if key.len() >= 10 {
                    let mut be = [0u8; 8];
                    be.copy_from_slice(&key[2..10]);
                    if u64::from_be_bytes(be) < cutoff {
                        ctx.store.delete(Module::Oracle, key)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Snapshot power of one validator for a period.
    pub fn snapshot_power(
        ctx: &Ctx,
        period: u64,
        validator: &Address,
    ) -> Result<Option<u128>, OracleError> {
        Ok(get_typed::<PowerSnapshot>(
            ctx.store,
            Module::Oracle,
            &keys::snapshot_key(period, validator),
        )?
        .map(|s| s.power))
    }

    /// Aggregate every whitelisted asset for the ending vote period.
    pub fn aggregate_all(
        &self,
        ctx: &mut Ctx,
        hooks: &dyn OracleHooks,
        params: &OracleParams,
    ) -> Result<(), OracleError> {
        let period = params.period_of(ctx.block.height);
        let in_bootstrap = ctx.block.height < params.bootstrap_grace_period_blocks;

        // Collect per-asset weighted points, sorted by asset (range order).
        let assets: Vec<String> = ctx
            .store
            .range(Module::Oracle, &keys::asset_prefix())?
            .into_iter()
            .filter_map(|(_, v)| bincode::deserialize::<AssetInfo>(&v).ok())
            .map(|a| a.asset)
            .collect();
        let mut prepared: Vec<(String, Vec<WeightedPoint>)> = Vec::with_capacity(assets.len());
        for asset in assets {
            let mut points = Vec::new();
            for sub in Self::submissions_for(ctx, &asset, period)? {
                if sub.submission_height + params.max_data_staleness_blocks < ctx.block.height {
                    continue;
                }
                let Some(power) = Self::snapshot_power(ctx, period, &sub.validator)? else {
                    continue;
                };
                if power == 0 {
                    continue;
                }
                points.push(WeightedPoint {
                    validator: sub.validator,
                    price_micro: sub.price_micro,
                    weight: power,
                });
            }
            prepared.push((asset, points));
        }

        // Fan out pure aggregation; results return in input order.
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(AGGREGATION_WORKERS)
            .build()
            .map_err(|e| OracleError::InvalidParams(format!("worker pool: {e}")))?;
        let outcomes: Vec<AssetOutcome> = pool.install(|| {
            prepared
                .par_iter()
                .map(|(asset, points)| {
                    aggregate_asset(asset, points.clone(), params, in_bootstrap)
                })
                .collect()
        });

        for outcome in outcomes {
            self.apply_outcome(ctx, hooks, params, period, outcome)?;
        }
        Ok(())
    }

    fn apply_outcome(
        &self,
        ctx: &mut Ctx,
        hooks: &dyn OracleHooks,
        params: &OracleParams,
        period: u64,
        outcome: AssetOutcome,
    ) -> Result<(), OracleError> {
        // Outliers are slashed regardless of what gets published.
        for (seq, (validator, price, low, high)) in outcome.outliers.iter().enumerate() {
            self.slash_outlier(
                ctx,
                validator,
                &outcome.asset,
                period,
                *price,
                (*low, *high),
                params,
                seq as u32,
            )?;
        }

        // Byzantine bookkeeping: warnings during bootstrap, a breaker trip
        // after two consecutive violations in steady state.
        let streak_key = keys::byzantine_streak_key(&outcome.asset);
        if let Some((outlier_weight, total_weight)) = outcome.byzantine {
            ctx.emit(
                Event::new(events::BYZANTINE_WARNING)
                    .attr("asset", &outcome.asset)
                    .attr("outlier_weight", outlier_weight)
                    .attr("total_weight", total_weight),
            );
            tracing::warn!(
                asset = %outcome.asset,
                outlier_weight,
                total_weight,
                "byzantine-tolerance violation"
            );
            if ctx.block.height >= params.bootstrap_grace_period_blocks {
                let streak: u32 =
                    get_typed(ctx.store, Module::Oracle, &streak_key)?.unwrap_or(0) + 1;
                put_typed(ctx.store, Module::Oracle, streak_key.clone(), &streak)?;
                if streak >= 2 {
                    Self::trip_breaker(
                        ctx,
                        Some(outcome.asset.as_str()),
                        "consecutive byzantine violations",
                        params,
                    )?;
                }
            }
        } else {
            ctx.store.delete(Module::Oracle, streak_key)?;
        }

        let Some((price, tier, confidence, count)) = outcome.published else {
            // Nothing publishable this period: the stored canonical price
            // (last known good) keeps serving.
            ctx.emit(
                Event::new(events::FALLBACK)
                    .attr("asset", &outcome.asset)
                    .attr("tier", AggregationTier::LastKnownGood.as_str()),
            );
            return Ok(());
        };

        // Intra-block deviation breaker, checked before publishing.
        let previous: Option<AggregatedPrice> =
            get_typed(ctx.store, Module::Oracle, &keys::aggregated_key(&outcome.asset))?;
        if let Some(prev) = &previous {
            if prev.price_micro > 0 {
                let deviation_bps =
                    price.abs_diff(prev.price_micro).saturating_mul(10_000) / prev.price_micro;
                if deviation_bps > params.breaker_deviation_bps as u128 {
                    Self::trip_breaker(
                        ctx,
                        Some(outcome.asset.as_str()),
                        format!("aggregation moved {deviation_bps} bps"),
                        params,
                    )?;
                    return Ok(());
                }
            }
        }

        ctx.scoped(|ctx| {
            if let Some(prev) = previous.clone() {
                put_typed(
                    ctx.store,
                    Module::Oracle,
                    keys::last_good_key(&outcome.asset),
                    &prev,
                )?;
            }
            let aggregated = AggregatedPrice {
                asset: outcome.asset.clone(),
                price_micro: price,
                confidence_bps: confidence,
                vote_period: period,
                height: ctx.block.height,
                tier,
                validator_count: count,
            };
            put_typed(
                ctx.store,
                Module::Oracle,
                keys::aggregated_key(&outcome.asset),
                &aggregated,
            )?;
            ctx.emit(
                Event::new(events::PRICE_AGGREGATED)
                    .attr("asset", &outcome.asset)
                    .attr("price_micro", price)
                    .attr("tier", tier.as_str())
                    .attr("confidence_bps", confidence),
            );
            if tier != AggregationTier::FilteredMedian {
                ctx.emit(
                    Event::new(events::FALLBACK)
                        .attr("asset", &outcome.asset)
                        .attr("tier", tier.as_str()),
                );
            }
            hooks.after_price_update(ctx, &outcome.asset, price)?;
            Ok(())
        })
    }

    /// Governance emergency: set the canonical price directly.
    pub fn set_price_override(
        &self,
        ctx: &mut Ctx,
        sender: &Address,
        asset: &str,
        price_micro: u128,
        hooks: &dyn OracleHooks,
    ) -> Result<(), OracleError> {
        let params = Self::params(ctx)?;
        if *sender != params.authority {
            return Err(OracleError::Unauthorized {
                reason: "only the oracle authority may override prices".into(),
            });
        }
        ctx.scoped(|ctx| {
            let aggregated = AggregatedPrice {
                asset: asset.to_string(),
                price_micro,
                confidence_bps: 10_000,
                vote_period: params.period_of(ctx.block.height),
                height: ctx.block.height,
                tier: AggregationTier::Override,
                validator_count: 0,
            };
            put_typed(
                ctx.store,
                Module::Oracle,
                keys::aggregated_key(asset),
                &aggregated,
            )?;
            ctx.emit(
                Event::new(events::PRICE_OVERRIDDEN)
                    .attr("asset", asset)
                    .attr("price_micro", price_micro),
            );
            hooks.after_price_update(ctx, asset, price_micro)?;
            Ok(())
        })
    }
}
