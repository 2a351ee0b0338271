//! # Oracle Queries

use shared_types::{Address, Module};

use paw_store::codec::get_typed;
use paw_store::Ctx;

use crate::domain::entities::{AggregatedPrice, OracleValidator, PowerSnapshot};
use crate::domain::errors::OracleError;
use crate::domain::keys;
use crate::engine::OracleEngine;

impl OracleEngine {
    /// Canonical price for an asset. Refuses while the asset's breaker is
    /// open; callers that want the raw record use `query_aggregated_price`.
    pub fn query_price(ctx: &Ctx, asset: &str) -> Result<AggregatedPrice, OracleError> {
        Self::check_breakers(ctx, Some(asset))?;
        Self::query_aggregated_price(ctx, asset)
    }

    /// Latest aggregation record regardless of breaker state.
    pub fn query_aggregated_price(
        ctx: &Ctx,
        asset: &str,
    ) -> Result<AggregatedPrice, OracleError> {
        get_typed(ctx.store, Module::Oracle, &keys::aggregated_key(asset))?.ok_or(
            OracleError::NoPrice {
                asset: asset.to_string(),
            },
        )
    }

    /// Previous canonical price kept as the fallback of last resort.
    pub fn query_last_known_good(
        ctx: &Ctx,
        asset: &str,
    ) -> Result<AggregatedPrice, OracleError> {
        get_typed(ctx.store, Module::Oracle, &keys::last_good_key(asset))?.ok_or(
            OracleError::NoPrice {
                asset: asset.to_string(),
            },
        )
    }

    pub fn query_validator(ctx: &Ctx, addr: &Address) -> Result<OracleValidator, OracleError> {
        Self::load_validator(ctx, addr)
    }

    pub fn query_validators(ctx: &Ctx) -> Result<Vec<OracleValidator>, OracleError> {
        Self::all_validators(ctx)
    }

    /// Snapshot rows for one period, ascending by validator address.
    pub fn query_power_snapshot(
        ctx: &Ctx,
        vote_period: u64,
    ) -> Result<(Vec<PowerSnapshot>, u128), OracleError> {
        let rows: Vec<PowerSnapshot> = ctx
            .store
            .range(Module::Oracle, &keys::snapshot_prefix(vote_period))?
            .into_iter()
            .filter_map(|(_, v)| bincode::deserialize(&v).ok())
            .collect();
        let total: u128 =
            get_typed(ctx.store, Module::Oracle, &keys::snapshot_total_key(vote_period))?
                .unwrap_or(0);
        Ok((rows, total))
    }
}
