//! # Catastrophic Failures
//!
//! Persistent records with their own id sequence and a height-keyed
//! secondary index. These are part of consensus state: genesis export and
//! import round-trip them.

use shared_types::{Address, Event, Module};

use paw_store::codec::{get_typed, put_typed};
use paw_store::Ctx;

use crate::domain::entities::CatastrophicFailure;
use crate::domain::errors::ComputeError;
use crate::domain::keys;
use crate::events;

use super::ComputeEngine;

impl ComputeEngine {
    /// Record a catastrophic provider failure.
    pub(crate) fn record_failure(
        &self,
        ctx: &mut Ctx,
        provider: &Address,
        request_id: u64,
        reason: &str,
    ) -> Result<u64, ComputeError> {
        let failure_id = Self::next_id(ctx, keys::failure_seq_key())?;
        let record = CatastrophicFailure {
            id: failure_id,
            provider: provider.clone(),
            request_id,
            reason: reason.to_string(),
            height: ctx.block.height,
        };
        put_typed(
            ctx.store,
            Module::Compute,
            keys::failure_key(failure_id),
            &record,
        )?;
        put_typed(
            ctx.store,
            Module::Compute,
            keys::failure_by_height_key(ctx.block.height, failure_id),
            &(),
        )?;
        ctx.emit(
            Event::new(events::CATASTROPHIC_FAILURE)
                .attr("failure_id", failure_id)
                .attr("provider", provider)
                .attr("request_id", request_id)
                .attr("reason", reason),
        );
        Ok(failure_id)
    }

    /// All failure records, ascending by id.
    pub fn all_failures(ctx: &Ctx) -> Result<Vec<CatastrophicFailure>, ComputeError> {
        Ok(ctx
            .store
            .range(Module::Compute, &keys::failure_prefix())?
            .into_iter()
            .filter_map(|(_, v)| bincode::deserialize(&v).ok())
            .collect())
    }

    /// Import a failure record (genesis path), restoring both indices and
    /// keeping the id sequence ahead of every imported id.
    pub fn import_failure(
        ctx: &mut Ctx,
        record: &CatastrophicFailure,
    ) -> Result<(), ComputeError> {
        put_typed(
            ctx.store,
            Module::Compute,
            keys::failure_key(record.id),
            record,
        )?;
        put_typed(
            ctx.store,
            Module::Compute,
            keys::failure_by_height_key(record.height, record.id),
            &(),
        )?;
        let seq: u64 =
            get_typed(ctx.store, Module::Compute, &keys::failure_seq_key())?.unwrap_or(0);
        if record.id > seq {
            put_typed(ctx.store, Module::Compute, keys::failure_seq_key(), &record.id)?;
        }
        Ok(())
    }
}
