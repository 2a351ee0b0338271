//! # paw-compute
//!
//! Off-chain compute-verification marketplace.
//!
//! ## Role in System
//!
//! - Provider registry with explicit signing-key registration (no
//!   trust-on-first-use) and an O(1) capacity counter.
//! - Job requests with escrowed payment: transfer, escrow record, and both
//!   timeout indices land in one cache scope or not at all.
//! - Result submission verified twice: an ed25519 signature against the
//!   registered key (low-order points rejected) and a Groth16 proof on
//!   BN254 against the circuit's governance-registered verifying key.
//! - Dispute workflow with validator-weighted voting, appeals at a higher
//!   quorum, and catastrophic-failure records that survive genesis.

pub mod crypto;
pub mod domain;
pub mod engine;
pub mod events;
pub mod hooks;
pub mod msgs;
pub mod queries;

pub use domain::entities::{ComputeRequest, Dispute, Escrow, EscrowStatus, Provider};
pub use domain::errors::ComputeError;
pub use domain::params::ComputeParams;
pub use engine::{ComputeEngine, VotingPowerView};
pub use hooks::{ComputeHooks, NoComputeHooks};
pub use msgs::ComputeMsg;
