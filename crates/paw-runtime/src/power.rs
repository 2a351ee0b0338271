//! # Dispute Voting Power
//!
//! Compute disputes are decided by the oracle validator set. The compute
//! engine never reads the oracle namespace itself; it goes through this
//! adapter, which uses the oracle's public read interface.

use shared_types::Address;

use paw_store::Ctx;

use paw_compute::{ComputeError, VotingPowerView};
use paw_oracle::{OracleEngine, OracleError};

/// Voting power sourced from registered oracle validators' stake.
pub struct OracleValidatorPowers;

impl VotingPowerView for OracleValidatorPowers {
    fn power_of(&self, ctx: &Ctx, voter: &Address) -> Result<u128, ComputeError> {
        match OracleEngine::query_validator(ctx, voter) {
            Ok(v) => Ok(v.stake),
            Err(OracleError::ValidatorNotFound) => Ok(0),
            Err(e) => Err(ComputeError::InvalidParams(format!(
                "voting power lookup: {e}"
            ))),
        }
    }

    fn total_power(&self, ctx: &Ctx) -> Result<u128, ComputeError> {
        let validators = OracleEngine::query_validators(ctx).map_err(|e| {
            ComputeError::InvalidParams(format!("voting power lookup: {e}"))
        })?;
        Ok(validators.iter().map(|v| v.stake).sum())
    }
}
