//! # Ingress Guard Errors

use shared_types::{ChainError, ErrorKind, Module};
use thiserror::Error;

use paw_store::StoreError;

/// Failures while admitting an inbound packet.
#[derive(Debug, Error)]
pub enum IbcError {
    /// `(port, channel)` absent from the module's allow-list. An empty
    /// allow-list rejects everything by design.
    #[error("channel not authorized for {module}: {port}/{channel}")]
    ChannelNotAuthorized {
        module: Module,
        port: String,
        channel: String,
    },

    /// Sequence did not advance past the last accepted value.
    #[error("replay detected on {channel}: sequence {sequence} <= last seen {last_seen}")]
    ReplayDetected {
        channel: String,
        sequence: u64,
        last_seen: u64,
    },

    /// Packet names a namespace byte with no registered module.
    #[error("unknown module namespace 0x{namespace:02x}")]
    UnknownNamespace { namespace: u8 },

    /// Packet namespace does not match the receiving module.
    #[error("packet namespace 0x{got:02x} does not match module {module}")]
    NamespaceMismatch { module: Module, got: u8 },

    /// The target module rejected the payload. Sequence does not advance.
    #[error("{module} rejected packet: {message}")]
    Dispatch {
        module: Module,
        kind: ErrorKind,
        message: String,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ChainError for IbcError {
    fn kind(&self) -> ErrorKind {
        match self {
            IbcError::ChannelNotAuthorized { .. } => ErrorKind::Authorization,
            IbcError::ReplayDetected { .. } => ErrorKind::Contention,
            IbcError::UnknownNamespace { .. } | IbcError::NamespaceMismatch { .. } => {
                ErrorKind::Validation
            }
            IbcError::Dispatch { kind, .. } => *kind,
            IbcError::Store(e) => e.kind(),
        }
    }

    fn remediation(&self) -> Option<String> {
        match self {
            IbcError::ChannelNotAuthorized { .. } => {
                Some("submit a governance proposal authorizing the channel".into())
            }
            IbcError::ReplayDetected { last_seen, .. } => {
                Some(format!("resend with a sequence above {last_seen}"))
            }
            _ => None,
        }
    }
}
