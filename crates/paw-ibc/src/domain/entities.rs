//! # Packet Schema
//!
//! The application-level view of an inbound IBC packet. Transport framing,
//! proofs, and acknowledgements belong to the relayer stack; by the time a
//! packet reaches this crate it is an ordered message within its receiving
//! block.

use serde::{Deserialize, Serialize};
use shared_types::Address;

/// Application payload of one inbound packet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IbcPacket {
    /// Target module namespace byte (`0x01` compute, `0x02` dex, `0x03` oracle).
    pub module_namespace: u8,
    /// Module-defined operation code.
    pub op: u16,
    /// Originating account on the counterparty chain.
    pub sender: Address,
    /// Per-`(channel, sender)` sequence; must strictly increase.
    pub sequence: u64,
    /// Opaque module payload.
    pub payload: Vec<u8>,
}

impl IbcPacket {
    /// Deterministic wire encoding used by tests and the relayer boundary.
    pub fn encode(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(bytes)
    }
}
