//! # PAW Test Suite
//!
//! End-to-end scenarios driven through the full application: blocks in,
//! application hashes out. Unit coverage lives next to each crate's code;
//! this crate covers the cross-module behavior none of them can see alone.

pub mod support;

#[cfg(test)]
mod integration;

pub use support::*;
