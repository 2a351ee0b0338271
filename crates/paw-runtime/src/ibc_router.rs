//! # IBC Packet Routers
//!
//! One router per module: each decodes the packet payload as the module's
//! message type, enforces that the embedded sender equals the packet
//! sender, and dispatches through the normal handler path, so IBC-borne
//! operations obey exactly the same guards as local ones.
//!
//! `op` is the payload schema tag; the only live schema is `1` (bincode
//! message body).

use shared_types::{Address, ChainError, ErrorKind, Module};

use paw_ibc::{IbcError, IbcModule};
use paw_store::Ctx;

use paw_compute::{ComputeEngine, ComputeHooks, ComputeMsg, VotingPowerView};
use paw_dex::{DexEngine, DexHooks, DexMsg};
use paw_oracle::{OracleEngine, OracleHooks, OracleMsg};

/// Payload schema: bincode-encoded module message.
pub const OP_BINCODE_MSG: u16 = 1;

fn bad_op(module: Module, op: u16) -> IbcError {
    IbcError::Dispatch {
        module,
        kind: ErrorKind::Validation,
        message: format!("unknown packet op {op}"),
    }
}

fn sender_mismatch(module: Module) -> IbcError {
    IbcError::Dispatch {
        module,
        kind: ErrorKind::Authorization,
        message: "payload sender does not match packet sender".into(),
    }
}

fn decode_err(module: Module, e: impl std::fmt::Display) -> IbcError {
    IbcError::Dispatch {
        module,
        kind: ErrorKind::Validation,
        message: format!("payload decode: {e}"),
    }
}

pub struct DexRouter<'a> {
    pub engine: &'a DexEngine,
    pub hooks: &'a dyn DexHooks,
}

impl IbcModule for DexRouter<'_> {
    fn module(&self) -> Module {
        Module::Dex
    }

    fn on_packet(
        &self,
        ctx: &mut Ctx,
        sender: &Address,
        op: u16,
        payload: &[u8],
    ) -> Result<(), IbcError> {
        if op != OP_BINCODE_MSG {
            return Err(bad_op(Module::Dex, op));
        }
        let msg: DexMsg =
            bincode::deserialize(payload).map_err(|e| decode_err(Module::Dex, e))?;
        if msg.sender() != sender {
            return Err(sender_mismatch(Module::Dex));
        }
        self.engine
            .handle(ctx, self.hooks, &msg)
            .map_err(|e| IbcError::Dispatch {
                module: Module::Dex,
                kind: e.kind(),
                message: e.to_string(),
            })
    }
}

pub struct OracleRouter<'a> {
    pub engine: &'a OracleEngine,
    pub hooks: &'a dyn OracleHooks,
}

impl IbcModule for OracleRouter<'_> {
    fn module(&self) -> Module {
        Module::Oracle
    }

    fn on_packet(
        &self,
        ctx: &mut Ctx,
        sender: &Address,
        op: u16,
        payload: &[u8],
    ) -> Result<(), IbcError> {
        if op != OP_BINCODE_MSG {
            return Err(bad_op(Module::Oracle, op));
        }
        let msg: OracleMsg =
            bincode::deserialize(payload).map_err(|e| decode_err(Module::Oracle, e))?;
        if msg.sender() != sender {
            return Err(sender_mismatch(Module::Oracle));
        }
        self.engine
            .handle(ctx, self.hooks, &msg)
            .map_err(|e| IbcError::Dispatch {
                module: Module::Oracle,
                kind: e.kind(),
                message: e.to_string(),
            })
    }
}

pub struct ComputeRouter<'a> {
    pub engine: &'a ComputeEngine,
    pub hooks: &'a dyn ComputeHooks,
    pub powers: &'a dyn VotingPowerView,
}

impl IbcModule for ComputeRouter<'_> {
    fn module(&self) -> Module {
        Module::Compute
    }

    fn on_packet(
        &self,
        ctx: &mut Ctx,
        sender: &Address,
        op: u16,
        payload: &[u8],
    ) -> Result<(), IbcError> {
        if op != OP_BINCODE_MSG {
            return Err(bad_op(Module::Compute, op));
        }
        let msg: ComputeMsg =
            bincode::deserialize(payload).map_err(|e| decode_err(Module::Compute, e))?;
        if msg.sender() != sender {
            return Err(sender_mismatch(Module::Compute));
        }
        self.engine
            .handle(ctx, self.hooks, self.powers, &msg)
            .map_err(|e| IbcError::Dispatch {
                module: Module::Compute,
                kind: e.kind(),
                message: e.to_string(),
            })
    }
}
