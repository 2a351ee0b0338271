//! # Genesis Export / Import
//!
//! The genesis document carries the complete application state as
//! namespaced key/value entries — every entity, including catastrophic
//! failure records and escrow timeout indices, round-trips by
//! construction. Import re-validates the cross-entity invariants before
//! the first block so a hand-edited document cannot smuggle in an
//! inconsistent ledger.

use serde::{Deserialize, Serialize};
use shared_types::{BlockCtx, Module};

use paw_store::Ctx;

use paw_compute::ComputeEngine;
use paw_dex::domain::keys as dex_keys;
use paw_dex::DexEngine;

use crate::app::App;
use crate::errors::AppError;

/// One persisted entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisEntry {
    /// Namespace byte of the owning module.
    pub module: u8,
    /// Hex-encoded full key (namespace byte included).
    pub key: String,
    /// Hex-encoded value.
    pub value: String,
}

/// Complete exported application state.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisState {
    pub entries: Vec<GenesisEntry>,
}

impl GenesisState {
    pub fn to_json(&self) -> Result<String, AppError> {
        serde_json::to_string_pretty(self).map_err(|e| AppError::InvalidGenesis(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, AppError> {
        serde_json::from_str(json).map_err(|e| AppError::InvalidGenesis(e.to_string()))
    }
}

impl App {
    /// Export the full application state.
    pub fn export_genesis(&self) -> Result<GenesisState, AppError> {
        let mut entries = Vec::new();
        for module in [Module::Bank, Module::Compute, Module::Dex, Module::Oracle] {
            let pairs = self
                .store
                .range(module, &[module.namespace()])
                .map_err(|e| AppError::InvalidGenesis(e.to_string()))?;
            for (key, value) in pairs {
                entries.push(GenesisEntry {
                    module: module.namespace(),
                    key: hex::encode(key),
                    value: hex::encode(value),
                });
            }
        }
        Ok(GenesisState { entries })
    }

    /// Import a genesis document into an empty app and validate the state
    /// invariants it implies.
    pub fn import_genesis(&mut self, genesis: &GenesisState) -> Result<(), AppError> {
        for entry in &genesis.entries {
            let module = Module::from_namespace(entry.module).ok_or_else(|| {
                AppError::InvalidGenesis(format!("unknown namespace 0x{:02x}", entry.module))
            })?;
            let key = hex::decode(&entry.key)
                .map_err(|e| AppError::InvalidGenesis(format!("bad key hex: {e}")))?;
            let value = hex::decode(&entry.value)
                .map_err(|e| AppError::InvalidGenesis(format!("bad value hex: {e}")))?;
            if key.first() != Some(&module.namespace()) {
                return Err(AppError::InvalidGenesis(format!(
                    "entry key 0x{} does not start with its module namespace",
                    entry.key
                )));
            }
            self.store
                .set(module, key, value)
                .map_err(|e| AppError::InvalidGenesis(e.to_string()))?;
        }
        self.validate_invariants()?;
        Ok(())
    }

    /// Cross-entity invariant checks shared by genesis import and tests.
    pub fn validate_invariants(&mut self) -> Result<(), AppError> {
        let block = BlockCtx::new(0, 0);
        let mut events = Vec::new();
        let ctx = Ctx::new(&mut self.store, block, &mut events);

        // Per-pool share conservation.
        let pool_keys: Vec<u64> = ctx
            .store
            .range(Module::Dex, &dex_keys::pool_prefix())
            .map_err(|e| AppError::InvalidGenesis(e.to_string()))?
            .into_iter()
            .filter_map(|(key, _)| {
                key.get(2..10)
                    .and_then(|b| <[u8; 8]>::try_from(b).ok())
                    .map(u64::from_be_bytes)
            })
            .collect();
        for pool_id in pool_keys {
            DexEngine::check_share_conservation(&ctx, pool_id)
                .map_err(|e| AppError::InvalidGenesis(e.to_string()))?;
        }

        // Escrow obligations covered by the module balance.
        ComputeEngine::check_escrow_integrity(&ctx)
            .map_err(|e| AppError::InvalidGenesis(e.to_string()))?;
        Ok(())
    }
}
