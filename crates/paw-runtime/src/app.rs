//! # Application Wiring
//!
//! `App` is the composition root: the store, the three engines, hook
//! receivers, and the upgrade registry, wired once at startup. Default
//! wiring subscribes the DEX to oracle price updates, so every aggregated
//! price lands as a DEX reference price in the same block.

use shared_types::{Address, BlockCtx, Coin, Event};

use paw_store::{Ctx, Ledger, MultiStore};

use paw_compute::{ComputeEngine, ComputeParams};
use paw_dex::{DexEngine, DexParams};
use paw_oracle::{OracleEngine, OracleParams};

use crate::errors::AppError;
use crate::hooks::{ComputeHookSet, DexHookSet, DexPriceRecorder, OracleHookSet};
use crate::upgrades::{self, UpgradeRegistry};

/// The PAW application.
pub struct App {
    pub store: MultiStore,
    pub(crate) dex: DexEngine,
    pub(crate) oracle: OracleEngine,
    pub(crate) compute: ComputeEngine,
    pub(crate) dex_hooks: DexHookSet,
    pub(crate) oracle_hooks: OracleHookSet,
    pub(crate) compute_hooks: ComputeHookSet,
    pub(crate) upgrades: UpgradeRegistry,
}

impl App {
    /// Wire an app over the given store with the standard hook set and
    /// the known upgrade points.
    pub fn new(store: MultiStore) -> Self {
        let mut oracle_hooks = OracleHookSet::default();
        oracle_hooks.register(Box::new(DexPriceRecorder));
        let mut upgrades = UpgradeRegistry::new();
        // Heights are placeholders until governance schedules them; the
        // registry ignores upgrades whose height never arrives.
        upgrades.register("v1.2.0", u64::MAX, upgrades::escrow_index_rebuild());
        Self {
            store,
            dex: DexEngine::new(),
            oracle: OracleEngine::new(),
            compute: ComputeEngine::new(),
            dex_hooks: DexHookSet::default(),
            oracle_hooks,
            compute_hooks: ComputeHookSet::default(),
            upgrades,
        }
    }

    /// In-memory app for tests and tooling.
    pub fn in_memory() -> Self {
        Self::new(MultiStore::in_memory())
    }

    pub fn upgrades_mut(&mut self) -> &mut UpgradeRegistry {
        &mut self.upgrades
    }

    pub fn register_dex_hook(&mut self, hook: Box<dyn paw_dex::DexHooks + Send + Sync>) {
        self.dex_hooks.register(hook);
    }

    pub fn register_oracle_hook(&mut self, hook: Box<dyn paw_oracle::OracleHooks + Send + Sync>) {
        self.oracle_hooks.register(hook);
    }

    pub fn register_compute_hook(
        &mut self,
        hook: Box<dyn paw_compute::ComputeHooks + Send + Sync>,
    ) {
        self.compute_hooks.register(hook);
    }

    /// Run `f` with a context over the app's store, collecting its events
    /// into the returned vector. Genesis and tests use this; block
    /// execution builds its own contexts.
    pub fn with_ctx<T, E>(
        &mut self,
        block: BlockCtx,
        f: impl FnOnce(&mut Ctx) -> Result<T, E>,
    ) -> Result<(T, Vec<Event>), E> {
        let mut events = Vec::new();
        let mut ctx = Ctx::new(&mut self.store, block, &mut events);
        let out = f(&mut ctx)?;
        Ok((out, events))
    }

    /// Genesis funding helper.
    pub fn fund(&mut self, addr: &Address, coin: &Coin) -> Result<(), AppError> {
        Ledger::mint(&mut self.store, addr, coin)
            .map_err(|e| AppError::InvalidGenesis(e.to_string()))
    }

    /// Governance: update DEX parameters (immutable fields enforced).
    pub fn update_dex_params(
        &mut self,
        block: BlockCtx,
        next: &DexParams,
    ) -> Result<(), AppError> {
        self.with_ctx(block, |ctx| DexEngine::update_params(ctx, next))
            .map(|_| ())
            .map_err(|e| AppError::Governance(e.to_string()))
    }

    /// Governance: update oracle parameters.
    pub fn update_oracle_params(
        &mut self,
        block: BlockCtx,
        next: &OracleParams,
    ) -> Result<(), AppError> {
        self.with_ctx(block, |ctx| OracleEngine::update_params(ctx, next))
            .map(|_| ())
            .map_err(|e| AppError::Governance(e.to_string()))
    }

    /// Governance: update compute parameters.
    pub fn update_compute_params(
        &mut self,
        block: BlockCtx,
        next: &ComputeParams,
    ) -> Result<(), AppError> {
        self.with_ctx(block, |ctx| ComputeEngine::set_params(ctx, next))
            .map(|_| ())
            .map_err(|e| AppError::Governance(e.to_string()))
    }

    /// Governance: trip a DEX breaker manually (global when `pool_id` is
    /// `None`).
    pub fn trip_dex_breaker(
        &mut self,
        block: BlockCtx,
        pool_id: Option<u64>,
    ) -> Result<(), AppError> {
        self.with_ctx(block, |ctx| {
            let params = DexEngine::params(ctx)?;
            DexEngine::trip_breaker(
                ctx,
                pool_id,
                paw_dex::domain::entities::BreakerReason::Governance,
                &params,
            )
        })
        .map(|_| ())
        .map_err(|e: paw_dex::DexError| AppError::Governance(e.to_string()))
    }

    /// Write all three modules' parameters (genesis path).
    pub fn init_params(
        &mut self,
        block: BlockCtx,
        dex: &DexParams,
        oracle: &OracleParams,
        compute: &ComputeParams,
    ) -> Result<(), AppError> {
        self.with_ctx(block, |ctx| {
            DexEngine::set_params(ctx, dex)
                .map_err(|e| AppError::InvalidGenesis(e.to_string()))?;
            OracleEngine::set_params(ctx, oracle)
                .map_err(|e| AppError::InvalidGenesis(e.to_string()))?;
            ComputeEngine::set_params(ctx, compute)
                .map_err(|e| AppError::InvalidGenesis(e.to_string()))?;
            Ok(())
        })
        .map(|_| ())
    }
}
