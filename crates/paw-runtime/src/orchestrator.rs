//! # Block Orchestration
//!
//! One call per finalized block. The fixed order — upgrades, begin
//! blockers (Oracle → DEX → Compute), message dispatch, IBC packet
//! dispatch, end blockers (Oracle → DEX → Compute), commit — is the
//! consensus-visible contract of this crate; reordering it is a
//! chain-splitting change.
//!
//! Every message runs in its own cache scope: merged on success, discarded
//! whole on failure. Invariant-class failures additionally escalate into a
//! persistent breaker trip in the block-level scope, so the protection
//! outlives the discarded operation.

use shared_types::{BlockCtx, ChainError, ErrorKind, Event, Module};

use paw_ibc::{IbcError, IbcPacket, IngressGuard};
use paw_store::{Ctx, Hash};

use paw_compute::{ComputeError, ComputeMsg};
use paw_dex::domain::entities::BreakerReason;
use paw_dex::{DexEngine, DexError, DexMsg};
use paw_oracle::{OracleEngine, OracleError, OracleMsg};

use crate::app::App;
use crate::errors::{handle_blocker_error, AppError};
use crate::ibc_router::{ComputeRouter, DexRouter, OracleRouter};
use crate::power::OracleValidatorPowers;

/// One application message, already signature-verified by the consensus
/// runtime.
#[derive(Clone, Debug)]
pub enum Msg {
    Dex(DexMsg),
    Oracle(OracleMsg),
    Compute(ComputeMsg),
}

/// An inbound IBC packet with its transport coordinates.
#[derive(Clone, Debug)]
pub struct InboundPacket {
    pub port: String,
    pub channel: String,
    pub packet: IbcPacket,
}

/// Everything the consensus engine delivers for one block.
#[derive(Clone, Debug)]
pub struct BlockInput {
    pub height: u64,
    pub time_unix: u64,
    /// Aggregated validator randomness for this block.
    pub entropy: Vec<u8>,
    pub msgs: Vec<Msg>,
    pub packets: Vec<InboundPacket>,
}

impl BlockInput {
    pub fn empty(height: u64, time_unix: u64) -> Self {
        Self {
            height,
            time_unix,
            entropy: height.to_be_bytes().to_vec(),
            msgs: Vec::new(),
            packets: Vec::new(),
        }
    }
}

/// Failure surface for one rejected message or packet.
#[derive(Clone, Debug)]
pub struct MsgFailure {
    pub index: usize,
    pub module: Module,
    pub kind: &'static str,
    pub message: String,
    pub remediation: Option<String>,
}

impl MsgFailure {
    fn new(index: usize, module: Module, err: &dyn ChainError) -> Self {
        Self {
            index,
            module,
            kind: err.kind().code(),
            message: err.to_string(),
            remediation: err.remediation(),
        }
    }
}

/// Result of executing one block.
#[derive(Debug)]
pub struct BlockOutcome {
    pub version: u64,
    pub app_hash: Hash,
    pub events: Vec<Event>,
    /// One slot per message; `None` means success.
    pub msg_results: Vec<Option<MsgFailure>>,
    /// One slot per packet; `None` means accepted.
    pub packet_results: Vec<Option<MsgFailure>>,
}

impl App {
    /// Execute one finalized block and commit the next store version.
    pub fn run_block(&mut self, input: BlockInput) -> Result<BlockOutcome, AppError> {
        let block = BlockCtx::new(input.height, input.time_unix);
        let mut events: Vec<Event> = Vec::new();

        self.run_upgrades(block, &mut events)?;
        self.run_begin_blockers(block, &input.entropy, &mut events)?;
        let msg_results = self.dispatch_msgs(block, &input.msgs, &mut events);
        let packet_results = self.dispatch_packets(block, &input.packets, &mut events);
        self.run_end_blockers(block, &mut events)?;

        let (version, app_hash) = self
            .store
            .commit_version()
            .map_err(AppError::CommitFailed)?;
        tracing::debug!(
            height = input.height,
            version,
            app_hash = %hex::encode(app_hash),
            msgs = input.msgs.len(),
            "block committed"
        );
        Ok(BlockOutcome {
            version,
            app_hash,
            events,
            msg_results,
            packet_results,
        })
    }

    fn run_upgrades(&mut self, block: BlockCtx, events: &mut Vec<Event>) -> Result<(), AppError> {
        let Some((name, handler)) = self.upgrades.due(block.height) else {
            return Ok(());
        };
        let name = name.to_string();
        tracing::info!(%name, height = block.height, "executing upgrade");
        let mut ctx = Ctx::new(&mut self.store, block, events);
        let result: anyhow::Result<()> = ctx.scoped(|ctx| handler(ctx));
        result.map_err(|e| AppError::UpgradeFailed {
            name: name.clone(),
            height: block.height,
            message: e.to_string(),
        })?;
        events.push(
            Event::new("upgrade_executed")
                .attr("name", name)
                .attr("height", block.height),
        );
        Ok(())
    }

    fn run_begin_blockers(
        &mut self,
        block: BlockCtx,
        entropy: &[u8],
        events: &mut Vec<Event>,
    ) -> Result<(), AppError> {
        let oracle_result: Result<(), OracleError> = {
            let mut ctx = Ctx::new(&mut self.store, block, events);
            let oracle = self.oracle;
            ctx.scoped(|ctx| oracle.begin_block(ctx))
        };
        if let Err(e) = oracle_result {
            handle_blocker_error(Module::Oracle, "begin_block", &e, events)?;
        }

        let dex_result: Result<(), DexError> = {
            let mut ctx = Ctx::new(&mut self.store, block, events);
            let dex = self.dex;
            ctx.scoped(|ctx| dex.begin_block(ctx))
        };
        if let Err(e) = dex_result {
            handle_blocker_error(Module::Dex, "begin_block", &e, events)?;
        }

        let compute_result: Result<(), ComputeError> = {
            let mut ctx = Ctx::new(&mut self.store, block, events);
            let compute = self.compute;
            ctx.scoped(|ctx| compute.begin_block(ctx, entropy))
        };
        if let Err(e) = compute_result {
            handle_blocker_error(Module::Compute, "begin_block", &e, events)?;
        }
        Ok(())
    }

    fn dispatch_msgs(
        &mut self,
        block: BlockCtx,
        msgs: &[Msg],
        events: &mut Vec<Event>,
    ) -> Vec<Option<MsgFailure>> {
        let mut results = Vec::with_capacity(msgs.len());
        for (index, msg) in msgs.iter().enumerate() {
            let failure = match msg {
                Msg::Dex(m) => {
                    let result: Result<(), DexError> = {
                        let mut ctx = Ctx::new(&mut self.store, block, events);
                        let dex = self.dex;
                        let hooks = &self.dex_hooks;
                        ctx.scoped(|ctx| dex.handle(ctx, hooks, m))
                    };
                    match result {
                        Ok(()) => None,
                        Err(e) => {
                            if e.kind() == ErrorKind::Invariant {
                                self.escalate_dex(block, events, &e);
                            }
                            Some(MsgFailure::new(index, Module::Dex, &e))
                        }
                    }
                }
                Msg::Oracle(m) => {
                    let result: Result<(), OracleError> = {
                        let mut ctx = Ctx::new(&mut self.store, block, events);
                        let oracle = self.oracle;
                        let hooks = &self.oracle_hooks;
                        ctx.scoped(|ctx| oracle.handle(ctx, hooks, m))
                    };
                    match result {
                        Ok(()) => None,
                        Err(e) => {
                            if e.kind() == ErrorKind::Invariant {
                                self.escalate_oracle(block, events, &e);
                            }
                            Some(MsgFailure::new(index, Module::Oracle, &e))
                        }
                    }
                }
                Msg::Compute(m) => {
                    let result: Result<(), ComputeError> = {
                        let mut ctx = Ctx::new(&mut self.store, block, events);
                        let compute = self.compute;
                        let hooks = &self.compute_hooks;
                        ctx.scoped(|ctx| {
                            compute.handle(ctx, hooks, &OracleValidatorPowers, m)
                        })
                    };
                    match result {
                        Ok(()) => None,
                        Err(e) => {
                            if e.kind() == ErrorKind::Invariant {
                                self.escalate_compute(block, events, &e);
                            }
                            Some(MsgFailure::new(index, Module::Compute, &e))
                        }
                    }
                }
            };
            results.push(failure);
        }
        results
    }

    fn dispatch_packets(
        &mut self,
        block: BlockCtx,
        packets: &[InboundPacket],
        events: &mut Vec<Event>,
    ) -> Vec<Option<MsgFailure>> {
        let mut results = Vec::with_capacity(packets.len());
        for (index, inbound) in packets.iter().enumerate() {
            let target = Module::from_namespace(inbound.packet.module_namespace);
            let result: Result<(), IbcError> = {
                let mut ctx = Ctx::new(&mut self.store, block, events);
                match target {
                    Some(Module::Dex) => IngressGuard::on_recv_packet(
                        &mut ctx,
                        &DexRouter {
                            engine: &self.dex,
                            hooks: &self.dex_hooks,
                        },
                        &inbound.port,
                        &inbound.channel,
                        &inbound.packet,
                    ),
                    Some(Module::Oracle) => IngressGuard::on_recv_packet(
                        &mut ctx,
                        &OracleRouter {
                            engine: &self.oracle,
                            hooks: &self.oracle_hooks,
                        },
                        &inbound.port,
                        &inbound.channel,
                        &inbound.packet,
                    ),
                    Some(Module::Compute) => IngressGuard::on_recv_packet(
                        &mut ctx,
                        &ComputeRouter {
                            engine: &self.compute,
                            hooks: &self.compute_hooks,
                            powers: &OracleValidatorPowers,
                        },
                        &inbound.port,
                        &inbound.channel,
                        &inbound.packet,
                    ),
                    _ => Err(IbcError::UnknownNamespace {
                        namespace: inbound.packet.module_namespace,
                    }),
                }
            };
            results.push(match result {
                Ok(()) => None,
                Err(e) => {
                    let module = target.unwrap_or(Module::Bank);
                    Some(MsgFailure::new(index, module, &e))
                }
            });
        }
        results
    }

    fn run_end_blockers(
        &mut self,
        block: BlockCtx,
        events: &mut Vec<Event>,
    ) -> Result<(), AppError> {
        let oracle_result: Result<(), OracleError> = {
            let mut ctx = Ctx::new(&mut self.store, block, events);
            let oracle = self.oracle;
            let hooks = &self.oracle_hooks;
            ctx.scoped(|ctx| oracle.end_block(ctx, hooks))
        };
        if let Err(e) = oracle_result {
            handle_blocker_error(Module::Oracle, "end_block", &e, events)?;
        }

        let dex_result: Result<(), DexError> = {
            let mut ctx = Ctx::new(&mut self.store, block, events);
            let dex = self.dex;
            ctx.scoped(|ctx| dex.end_block(ctx))
        };
        if let Err(e) = dex_result {
            handle_blocker_error(Module::Dex, "end_block", &e, events)?;
        }

        let compute_result: Result<(), ComputeError> = {
            let mut ctx = Ctx::new(&mut self.store, block, events);
            let compute = self.compute;
            ctx.scoped(|ctx| compute.end_block(ctx))
        };
        if let Err(e) = compute_result {
            handle_blocker_error(Module::Compute, "end_block", &e, events)?;
        }
        Ok(())
    }

    /// Persist a breaker trip for an invariant-class DEX failure. Runs in
    /// the block-level scope so it survives the discarded message.
    fn escalate_dex(&mut self, block: BlockCtx, events: &mut Vec<Event>, err: &DexError) {
        let (pool, reason) = match err {
            DexError::PriceDeviation {
                pool_id,
                deviation_bps,
            } => (
                Some(*pool_id),
                BreakerReason::PriceDeviation {
                    deviation_bps: *deviation_bps,
                },
            ),
            DexError::InvariantViolation { pool_id, detail } => (
                Some(*pool_id),
                BreakerReason::InvariantViolation {
                    detail: detail.clone(),
                },
            ),
            _ => (None, BreakerReason::RepeatedFailures),
        };
        let mut ctx = Ctx::new(&mut self.store, block, events);
        let trip = DexEngine::params(&ctx)
            .and_then(|params| DexEngine::trip_breaker(&mut ctx, pool, reason, &params));
        if let Err(e) = trip {
            tracing::error!(error = %e, "failed to escalate dex breaker trip");
        }
    }

    fn escalate_oracle(&mut self, block: BlockCtx, events: &mut Vec<Event>, err: &OracleError) {
        let mut ctx = Ctx::new(&mut self.store, block, events);
        let trip = OracleEngine::params(&ctx).and_then(|params| {
            OracleEngine::trip_breaker(&mut ctx, None, err.to_string(), &params)
        });
        if let Err(e) = trip {
            tracing::error!(error = %e, "failed to escalate oracle breaker trip");
        }
    }

    fn escalate_compute(&mut self, block: BlockCtx, events: &mut Vec<Event>, err: &ComputeError) {
        tracing::error!(error = %err, "compute invariant failure; pausing module");
        let mut ctx = Ctx::new(&mut self.store, block, events);
        if let Err(e) = paw_compute::ComputeEngine::set_paused(&mut ctx, true) {
            tracing::error!(error = %e, "failed to pause compute module");
        }
    }
}
