//! End-to-end scenarios, one module per subsystem under test.

mod compute_scenarios;
mod dex_scenarios;
mod ibc_scenarios;
mod invariants;
mod oracle_scenarios;
