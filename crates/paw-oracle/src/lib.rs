//! # paw-oracle
//!
//! Validator-voted price oracle.
//!
//! ## Role in System
//!
//! - Registers oracle validators under stake, IP/ASN and geographic
//!   diversity constraints.
//! - Collects per-vote-period price submissions, weighted by a voting-power
//!   snapshot taken at the period start (never live power).
//! - Aggregates a Byzantine-resistant weighted median with 3-sigma outlier
//!   stripping, slashes outliers, and serves tiered fallbacks when quorum
//!   thins out.
//!
//! ## Determinism
//!
//! Aggregation fans out over assets with a worker pool, but each worker
//! computes a pure function of its collected submissions and results are
//! merged in sorted-asset order, so validator nodes agree byte-for-byte.

pub mod algorithms;
pub mod domain;
pub mod engine;
pub mod events;
pub mod hooks;
pub mod msgs;
pub mod queries;

pub use domain::entities::{AggregatedPrice, OracleValidator, PriceSubmission};
pub use domain::errors::OracleError;
pub use domain::params::OracleParams;
pub use engine::OracleEngine;
pub use hooks::{NoOracleHooks, OracleHooks};
pub use msgs::OracleMsg;
