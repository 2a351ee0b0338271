//! # Runtime Errors & the Blocker Error Handler
//!
//! Per-block hook failures flow through one standardized path: log at the
//! severity-mapped level, emit an `abci_blocker_error` event for
//! operators, and keep going — unless the severity is `Critical`, which
//! halts the node. Correctness-by-halting beats a diverged chain.

use shared_types::{events::kinds, ChainError, Event, Module, Severity};
use thiserror::Error;

use paw_store::StoreError;

/// Fatal runtime conditions. Any of these halts the node.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("node halt: critical error in {module} {phase}: {message}")]
    Halt {
        module: Module,
        phase: &'static str,
        message: String,
    },

    #[error("store commit failed: {0}")]
    CommitFailed(StoreError),

    #[error("upgrade {name} failed at height {height}: {message}")]
    UpgradeFailed {
        name: String,
        height: u64,
        message: String,
    },

    #[error("genesis import invalid: {0}")]
    InvalidGenesis(String),

    #[error("governance action rejected: {0}")]
    Governance(String),
}

/// Standardized begin/end-blocker error handling.
///
/// Returns `Err` only for `Critical` severity; everything else is logged,
/// surfaced as an event, and survived.
pub fn handle_blocker_error(
    module: Module,
    phase: &'static str,
    err: &dyn ChainError,
    events: &mut Vec<Event>,
) -> Result<(), AppError> {
    let severity = err.severity();
    match severity {
        Severity::Low => {
            tracing::debug!(%module, phase, error = %err, "blocker error")
        }
        Severity::Medium => {
            tracing::warn!(%module, phase, error = %err, "blocker error")
        }
        Severity::High => {
            tracing::error!(%module, phase, error = %err, "blocker error")
        }
        Severity::Critical => {
            tracing::error!(%module, phase, error = %err, "critical blocker error; halting")
        }
    }
    events.push(
        Event::new(kinds::BLOCKER_ERROR)
            .attr("module", module)
            .attr("phase", phase)
            .attr("severity", severity)
            .attr("kind", err.kind())
            .attr("message", err),
    );
    if severity == Severity::Critical {
        return Err(AppError::Halt {
            module,
            phase,
            message: err.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use paw_store::LedgerError;
    use shared_types::Denom;

    #[test]
    fn test_noncritical_continues_and_emits() {
        let err = LedgerError::InsufficientBalance {
            denom: Denom::new("upaw").unwrap(),
            required: 10,
            available: 0,
        };
        let mut events = Vec::new();
        handle_blocker_error(Module::Dex, "end_block", &err, &mut events).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, kinds::BLOCKER_ERROR);
        assert_eq!(events[0].get("severity"), Some("low"));
    }

    #[test]
    fn test_critical_halts() {
        let err = LedgerError::Store(StoreError::Backend("disk on fire".into()));
        let mut events = Vec::new();
        let halted = handle_blocker_error(Module::Oracle, "end_block", &err, &mut events);
        assert!(matches!(halted, Err(AppError::Halt { .. })));
    }
}
