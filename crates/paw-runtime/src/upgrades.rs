//! # Upgrade Registry
//!
//! Named upgrade points registered at startup and executed at their
//! configured height, each inside a cache scope: a failing handler halts
//! the node rather than advance with a half-migrated state.

use std::collections::BTreeMap;

use paw_store::codec::put_typed;
use paw_store::Ctx;
use shared_types::Module;

/// An upgrade migration. `anyhow` is acceptable here: this is the
/// composition root and any error is terminal anyway.
pub type UpgradeHandler = Box<dyn Fn(&mut Ctx) -> anyhow::Result<()> + Send + Sync>;

/// Height-scheduled named upgrades.
#[derive(Default)]
pub struct UpgradeRegistry {
    planned: BTreeMap<u64, (String, UpgradeHandler)>,
}

impl UpgradeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `handler` under `name` at `height`. One upgrade per
    /// height; a later registration for the same height replaces the
    /// earlier one.
    pub fn register(&mut self, name: impl Into<String>, height: u64, handler: UpgradeHandler) {
        self.planned.insert(height, (name.into(), handler));
    }

    /// The upgrade due exactly at `height`, if any.
    pub fn due(&self, height: u64) -> Option<(&str, &UpgradeHandler)> {
        self.planned
            .get(&height)
            .map(|(name, handler)| (name.as_str(), handler))
    }
}

/// The `v1.2.0` migration: rebuild the escrow timeout reverse index from
/// escrow records after its key format changed. Forward entries are also
/// re-derived for open escrows, so a node upgraded mid-flight scans the
/// same set as a fresh one.
pub fn escrow_index_rebuild() -> UpgradeHandler {
    use paw_compute::domain::keys as ck;
    use paw_compute::{Escrow, EscrowStatus};

    Box::new(|ctx: &mut Ctx| {
        // Drop every existing index entry.
        for (key, _) in ctx.store.range(Module::Compute, &ck::timeout_rev_prefix())? {
            ctx.store.delete(Module::Compute, key)?;
        }
        for (key, _) in ctx.store.range(Module::Compute, &ck::timeout_fwd_prefix())? {
            ctx.store.delete(Module::Compute, key)?;
        }
        // Re-derive both sides from the escrow records themselves.
        let mut rebuilt = 0usize;
        for (_, value) in ctx.store.range(Module::Compute, &ck::escrow_prefix())? {
            let escrow: Escrow = bincode::deserialize(&value)?;
            if !matches!(escrow.status, EscrowStatus::Locked | EscrowStatus::Challenged) {
                continue;
            }
            // Completed escrows waiting on release keep no timeout entry.
            if escrow.release_height.is_some() {
                continue;
            }
            put_typed(
                ctx.store,
                Module::Compute,
                ck::timeout_fwd_key(escrow.timeout_height, escrow.request_id),
                &(),
            )?;
            put_typed(
                ctx.store,
                Module::Compute,
                ck::timeout_rev_key(escrow.request_id),
                &escrow.timeout_height,
            )?;
            rebuilt += 1;
        }
        tracing::info!(rebuilt, "escrow timeout indices rebuilt");
        Ok(())
    })
}
