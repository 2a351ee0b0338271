//! # Compute Block Hooks
//!
//! Begin: fold the block's randomness into the selection seed. End: settle
//! due escrow timeouts and releases.

use paw_store::Ctx;

use crate::domain::errors::ComputeError;

use super::ComputeEngine;

impl ComputeEngine {
    pub fn begin_block(&self, ctx: &mut Ctx, entropy: &[u8]) -> Result<(), ComputeError> {
        Self::fold_randomness(ctx, entropy)?;
        Ok(())
    }

    pub fn end_block(&self, ctx: &mut Ctx) -> Result<(), ComputeError> {
        self.process_timeouts(ctx)?;
        self.process_releases(ctx)?;
        Ok(())
    }
}
