//! # paw-runtime
//!
//! The composition root: owns the multi-store, the three module engines,
//! hook wiring, the upgrade registry, and the per-block orchestration that
//! turns an ordered block of messages into the next application hash.
//!
//! ## Fixed per-block order
//!
//! `Oracle.begin → DEX.begin → Compute.begin → message dispatch →
//! IBC packet dispatch → Oracle.end → DEX.end → Compute.end → commit`.
//!
//! Oracle runs first so the DEX sees prices published in the same block;
//! Compute runs last so its escrow settlement observes finalized DEX
//! state.

pub mod app;
pub mod errors;
pub mod genesis;
pub mod hooks;
pub mod ibc_router;
pub mod orchestrator;
pub mod power;
pub mod upgrades;

pub use app::App;
pub use errors::AppError;
pub use genesis::GenesisState;
pub use orchestrator::{BlockInput, BlockOutcome, InboundPacket, Msg, MsgFailure};
pub use upgrades::UpgradeRegistry;

/// Initialize structured logging for a node process. Test harnesses skip
/// this; embedding applications call it once at startup.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
