//! # Ingress Guard
//!
//! Allow-list and nonce bookkeeping live inside the *receiving* module's
//! namespace, under sub-prefixes reserved across all modules:
//!
//! - `(ns, 0x7E, len(channel), channel, sender)` → last accepted sequence
//! - `(ns, 0x7F, len(port), port, channel)`      → channel authorization marker
//!
//! The dispatch-then-advance step runs in one cache scope: a rejected
//! payload leaves the stored sequence untouched so the relayer can retry.

use shared_types::{Address, Event, Module};

use paw_store::{Ctx, StoreError};

use crate::domain::entities::IbcPacket;
use crate::domain::errors::IbcError;

/// Reserved sub-prefix for `(channel, sender)` sequence tracking.
const SUB_NONCE: u8 = 0x7E;
/// Reserved sub-prefix for the channel allow-list.
const SUB_CHANNEL: u8 = 0x7F;

/// Receiving side implemented by each application module.
pub trait IbcModule {
    fn module(&self) -> Module;

    /// Execute the packet payload. Runs inside the guard's scope; an error
    /// discards every write the handler made.
    fn on_packet(
        &self,
        ctx: &mut Ctx,
        sender: &Address,
        op: u16,
        payload: &[u8],
    ) -> Result<(), IbcError>;
}

/// Stateless guard functions over a module's namespace.
pub struct IngressGuard;

impl IngressGuard {
    fn nonce_key(module: Module, channel: &str, sender: &Address) -> Vec<u8> {
        let mut k = vec![module.namespace(), SUB_NONCE];
        k.push(channel.len() as u8);
        k.extend_from_slice(channel.as_bytes());
        k.extend_from_slice(sender.as_bytes());
        k
    }

    fn channel_key(module: Module, port: &str, channel: &str) -> Vec<u8> {
        let mut k = vec![module.namespace(), SUB_CHANNEL];
        k.push(port.len() as u8);
        k.extend_from_slice(port.as_bytes());
        k.extend_from_slice(channel.as_bytes());
        k
    }

    /// Governance: authorize a `(port, channel)` pair for a module.
    pub fn authorize_channel(
        ctx: &mut Ctx,
        module: Module,
        port: &str,
        channel: &str,
    ) -> Result<(), IbcError> {
        ctx.store
            .set(module, Self::channel_key(module, port, channel), vec![1])?;
        tracing::info!(%module, port, channel, "ibc channel authorized");
        Ok(())
    }

    /// Governance: revoke a `(port, channel)` pair.
    pub fn revoke_channel(
        ctx: &mut Ctx,
        module: Module,
        port: &str,
        channel: &str,
    ) -> Result<(), IbcError> {
        ctx.store
            .delete(module, Self::channel_key(module, port, channel))?;
        tracing::info!(%module, port, channel, "ibc channel revoked");
        Ok(())
    }

    pub fn is_authorized(
        ctx: &Ctx,
        module: Module,
        port: &str,
        channel: &str,
    ) -> Result<bool, IbcError> {
        Ok(ctx
            .store
            .get(module, &Self::channel_key(module, port, channel))?
            .is_some())
    }

    /// Last accepted sequence for `(channel, sender)`; zero if none.
    pub fn last_sequence(
        ctx: &Ctx,
        module: Module,
        channel: &str,
        sender: &Address,
    ) -> Result<u64, IbcError> {
        let key = Self::nonce_key(module, channel, sender);
        match ctx.store.get(module, &key)? {
            None => Ok(0),
            Some(bytes) => bincode::deserialize(&bytes).map_err(|e| {
                IbcError::Store(StoreError::CorruptValue {
                    key,
                    reason: e.to_string(),
                })
            }),
        }
    }

    /// Admit one inbound packet: allow-list, replay check, dispatch, and
    /// sequence advance — the last two atomically.
    pub fn on_recv_packet(
        ctx: &mut Ctx,
        target: &dyn IbcModule,
        port: &str,
        channel: &str,
        packet: &IbcPacket,
    ) -> Result<(), IbcError> {
        let module = target.module();
        if packet.module_namespace != module.namespace() {
            return Err(IbcError::NamespaceMismatch {
                module,
                got: packet.module_namespace,
            });
        }
        if !Self::is_authorized(ctx, module, port, channel)? {
            return Err(IbcError::ChannelNotAuthorized {
                module,
                port: port.to_string(),
                channel: channel.to_string(),
            });
        }
        let last_seen = Self::last_sequence(ctx, module, channel, &packet.sender)?;
        if packet.sequence <= last_seen {
            return Err(IbcError::ReplayDetected {
                channel: channel.to_string(),
                sequence: packet.sequence,
                last_seen,
            });
        }
        ctx.scoped(|ctx| {
            target.on_packet(ctx, &packet.sender, packet.op, &packet.payload)?;
            let key = Self::nonce_key(module, channel, &packet.sender);
            let bytes = bincode::serialize(&packet.sequence)
                .map_err(|e| IbcError::Store(StoreError::Backend(e.to_string())))?;
            ctx.store.set(module, key, bytes)?;
            ctx.emit(
                Event::new("ibc_packet_accepted")
                    .attr("module", module)
                    .attr("channel", channel)
                    .attr("sender", &packet.sender)
                    .attr("sequence", packet.sequence),
            );
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paw_store::MultiStore;
    use shared_types::BlockCtx;

    /// Test module that accepts payloads unless they start with 0xFF.
    struct Probe;

    impl IbcModule for Probe {
        fn module(&self) -> Module {
            Module::Dex
        }

        fn on_packet(
            &self,
            ctx: &mut Ctx,
            _sender: &Address,
            _op: u16,
            payload: &[u8],
        ) -> Result<(), IbcError> {
            if payload.first() == Some(&0xFF) {
                return Err(IbcError::Dispatch {
                    module: Module::Dex,
                    kind: shared_types::ErrorKind::Validation,
                    message: "poison payload".into(),
                });
            }
            ctx.store
                .set(Module::Dex, vec![Module::Dex.namespace(), 0x55], payload.to_vec())?;
            Ok(())
        }
    }

    fn packet(seq: u64, payload: Vec<u8>) -> IbcPacket {
        IbcPacket {
            module_namespace: Module::Dex.namespace(),
            op: 1,
            sender: Address::new("cosmos1addrx").unwrap(),
            sequence: seq,
            payload,
        }
    }

    #[test]
    fn test_empty_allowlist_rejects() {
        let mut store = MultiStore::in_memory();
        let mut events = Vec::new();
        let mut ctx = Ctx::new(&mut store, BlockCtx::new(1, 0), &mut events);
        let err =
            IngressGuard::on_recv_packet(&mut ctx, &Probe, "transfer", "channel-0", &packet(1, vec![]))
                .unwrap_err();
        assert!(matches!(err, IbcError::ChannelNotAuthorized { .. }));
    }

    #[test]
    fn test_replay_sequence_discipline() {
        let mut store = MultiStore::in_memory();
        let mut events = Vec::new();
        let mut ctx = Ctx::new(&mut store, BlockCtx::new(1, 0), &mut events);
        IngressGuard::authorize_channel(&mut ctx, Module::Dex, "transfer", "channel-0").unwrap();

        // seq 5 accepted.
        IngressGuard::on_recv_packet(&mut ctx, &Probe, "transfer", "channel-0", &packet(5, vec![1]))
            .unwrap();
        // seq 5 again rejected.
        let err = IngressGuard::on_recv_packet(
            &mut ctx,
            &Probe,
            "transfer",
            "channel-0",
            &packet(5, vec![1]),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            IbcError::ReplayDetected {
                sequence: 5,
                last_seen: 5,
                ..
            }
        ));
        // seq 7 accepted, then 6 rejected.
        IngressGuard::on_recv_packet(&mut ctx, &Probe, "transfer", "channel-0", &packet(7, vec![1]))
            .unwrap();
        let err = IngressGuard::on_recv_packet(
            &mut ctx,
            &Probe,
            "transfer",
            "channel-0",
            &packet(6, vec![1]),
        )
        .unwrap_err();
        assert!(matches!(err, IbcError::ReplayDetected { last_seen: 7, .. }));
    }

    #[test]
    fn test_failed_dispatch_does_not_advance() {
        let mut store = MultiStore::in_memory();
        let mut events = Vec::new();
        let mut ctx = Ctx::new(&mut store, BlockCtx::new(1, 0), &mut events);
        IngressGuard::authorize_channel(&mut ctx, Module::Dex, "transfer", "channel-0").unwrap();

        let err = IngressGuard::on_recv_packet(
            &mut ctx,
            &Probe,
            "transfer",
            "channel-0",
            &packet(3, vec![0xFF]),
        )
        .unwrap_err();
        assert!(matches!(err, IbcError::Dispatch { .. }));
        let sender = Address::new("cosmos1addrx").unwrap();
        assert_eq!(
            IngressGuard::last_sequence(&ctx, Module::Dex, "channel-0", &sender).unwrap(),
            0
        );
        // Retry with the same sequence now succeeds.
        IngressGuard::on_recv_packet(&mut ctx, &Probe, "transfer", "channel-0", &packet(3, vec![1]))
            .unwrap();
        assert_eq!(
            IngressGuard::last_sequence(&ctx, Module::Dex, "channel-0", &sender).unwrap(),
            3
        );
    }

    #[test]
    fn test_namespace_mismatch_rejected() {
        let mut store = MultiStore::in_memory();
        let mut events = Vec::new();
        let mut ctx = Ctx::new(&mut store, BlockCtx::new(1, 0), &mut events);
        IngressGuard::authorize_channel(&mut ctx, Module::Dex, "transfer", "channel-0").unwrap();
        let mut p = packet(1, vec![]);
        p.module_namespace = Module::Oracle.namespace();
        let err = IngressGuard::on_recv_packet(&mut ctx, &Probe, "transfer", "channel-0", &p)
            .unwrap_err();
        assert!(matches!(err, IbcError::NamespaceMismatch { .. }));
    }
}
