//! # paw-ibc
//!
//! Ingress guard shared by all three application modules. Every inbound IBC
//! packet passes three gates before its payload reaches a module:
//!
//! 1. the `(port, channel)` pair is on the module's governance-managed
//!    allow-list (an empty list rejects everything, never "allow all");
//! 2. the packet's sequence strictly exceeds the last accepted sequence for
//!    `(namespace, channel, sender)`;
//! 3. the payload dispatches successfully — only then does the stored
//!    sequence advance, so a failed packet may be retried.

pub mod domain;
pub mod guard;

pub use domain::entities::IbcPacket;
pub use domain::errors::IbcError;
pub use guard::{IbcModule, IngressGuard};
