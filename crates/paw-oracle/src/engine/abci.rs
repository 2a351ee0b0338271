//! # Oracle Block Hooks
//!
//! Begin: breaker recovery, then the power snapshot when a vote period
//! opens. End: aggregation and miss slashing when a period closes, plus
//! outlier-history cleanup.

use paw_store::Ctx;

use crate::domain::errors::OracleError;
use crate::hooks::OracleHooks;

use super::OracleEngine;

impl OracleEngine {
    pub fn begin_block(&self, ctx: &mut Ctx) -> Result<(), OracleError> {
        let params = Self::params(ctx)?;
        Self::recover_breakers(ctx)?;
        if params.is_vote_period_start(ctx.block.height) {
            Self::snapshot_period(ctx, &params)?;
        }
        Ok(())
    }

    pub fn end_block(&self, ctx: &mut Ctx, hooks: &dyn OracleHooks) -> Result<(), OracleError> {
        let params = Self::params(ctx)?;
        if params.is_vote_period_end(ctx.block.height) {
            let period = params.period_of(ctx.block.height);
            self.aggregate_all(ctx, hooks, &params)?;
            self.slash_misses(ctx, &params, period)?;
        }
        self.cleanup_outlier_history(ctx, &params)?;
        Ok(())
    }
}
