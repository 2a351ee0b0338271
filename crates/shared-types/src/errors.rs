//! # Error Taxonomy
//!
//! Every module error maps onto a stable [`ErrorKind`] and a [`Severity`].
//! Kinds are part of the external surface (clients match on them); severities
//! drive the per-block error handler in the runtime.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable error classification, by kind rather than by type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Malformed input, out-of-range numeric, unknown identifier.
    Validation,
    /// Wrong sender, missing registered key, revoked channel.
    Authorization,
    /// Insufficient balance, empty pool, liquidity too low, rate-limited.
    Resource,
    /// Reentrancy, nonce replay, expired commitment, open circuit breaker.
    Contention,
    /// A state invariant no longer holds. Escalates to a breaker trip.
    Invariant,
    /// Store commit failure, upgrade failure, impossible verifier output.
    /// The node halts rather than risk a diverged chain.
    Fatal,
}

impl ErrorKind {
    /// Default severity for the per-block error handler.
    pub const fn severity(self) -> Severity {
        match self {
            ErrorKind::Validation | ErrorKind::Resource | ErrorKind::Contention => Severity::Low,
            ErrorKind::Authorization => Severity::Medium,
            ErrorKind::Invariant => Severity::Critical,
            ErrorKind::Fatal => Severity::Critical,
        }
    }

    /// Stable wire code surfaced to clients.
    pub const fn code(self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Authorization => "authorization",
            ErrorKind::Resource => "resource",
            ErrorKind::Contention => "contention",
            ErrorKind::Invariant => "invariant",
            ErrorKind::Fatal => "fatal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Severity levels for block-hook error handling.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
    /// Halts the node.
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Low => f.write_str("low"),
            Severity::Medium => f.write_str("medium"),
            Severity::High => f.write_str("high"),
            Severity::Critical => f.write_str("critical"),
        }
    }
}

/// Contract every module error type implements so the runtime can classify
/// failures without knowing module internals.
pub trait ChainError: std::error::Error {
    /// Stable kind for this error.
    fn kind(&self) -> ErrorKind;

    /// Severity override; defaults to the kind's severity.
    fn severity(&self) -> Severity {
        self.kind().severity()
    }

    /// Optional remediation hint surfaced to the caller.
    fn remediation(&self) -> Option<String> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_severities() {
        assert_eq!(ErrorKind::Validation.severity(), Severity::Low);
        assert_eq!(ErrorKind::Authorization.severity(), Severity::Medium);
        assert_eq!(ErrorKind::Invariant.severity(), Severity::Critical);
        assert_eq!(ErrorKind::Fatal.severity(), Severity::Critical);
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::High < Severity::Critical);
    }
}
