//! Ingress guard scenarios: the sequence-discipline reference case and
//! channel authorization through the full block path.

use crate::support::*;
use paw_dex::DexMsg;
use paw_ibc::IbcPacket;
use paw_ibc::IngressGuard;
use paw_runtime::{BlockInput, InboundPacket, Msg};
use shared_types::{BlockCtx, Module};

fn swap_packet(sender: &shared_types::Address, pool_id: u64, sequence: u64) -> InboundPacket {
    let msg = DexMsg::Swap {
        sender: sender.clone(),
        pool_id,
        token_in: denom("upaw"),
        amount_in: 1_000,
        min_amount_out: 0,
    };
    InboundPacket {
        port: "transfer".into(),
        channel: "channel-0".into(),
        packet: IbcPacket {
            module_namespace: Module::Dex.namespace(),
            op: 1,
            sender: sender.clone(),
            sequence,
            payload: bincode::serialize(&msg).unwrap(),
        },
    }
}

fn packets_block(height: u64, packets: Vec<InboundPacket>) -> BlockInput {
    BlockInput {
        height,
        time_unix: height * 6,
        entropy: height.to_be_bytes().to_vec(),
        msgs: Vec::new(),
        packets,
    }
}

#[test]
fn test_sequence_discipline_5_5_7_6() {
    let (mut app, _, pool_id) = app_with_pool(10_000_000, 20_000_000);
    let sender = addr("paw1relayuser");
    app.fund(&sender, &upaw(1_000_000)).unwrap();
    // Governance authorizes the channel for the DEX.
    app.with_ctx(BlockCtx::new(2, 12), |ctx| {
        IngressGuard::authorize_channel(ctx, Module::Dex, "transfer", "channel-0")
    })
    .unwrap();

    // seq 5 accepted, 5 replayed, 7 accepted, 6 stale.
    let outcome = app
        .run_block(packets_block(
            3,
            vec![
                swap_packet(&sender, pool_id, 5),
                swap_packet(&sender, pool_id, 5),
                swap_packet(&sender, pool_id, 7),
                swap_packet(&sender, pool_id, 6),
            ],
        ))
        .unwrap();
    assert!(outcome.packet_results[0].is_none());
    let replay = outcome.packet_results[1].as_ref().unwrap();
    assert_eq!(replay.kind, "contention");
    assert!(replay.message.contains("5"));
    assert!(outcome.packet_results[2].is_none());
    let stale = outcome.packet_results[3].as_ref().unwrap();
    assert!(stale.message.contains("last seen 7"));
}

#[test]
fn test_unauthorized_channel_rejected() {
    let (mut app, _, pool_id) = app_with_pool(10_000_000, 20_000_000);
    let sender = addr("paw1relayuser");
    app.fund(&sender, &upaw(1_000_000)).unwrap();
    // No authorization: the empty allow-list rejects, never allows.
    let outcome = app
        .run_block(packets_block(2, vec![swap_packet(&sender, pool_id, 1)]))
        .unwrap();
    let failure = outcome.packet_results[0].as_ref().unwrap();
    assert_eq!(failure.kind, "authorization");
}

#[test]
fn test_failed_payload_leaves_sequence_retryable() {
    let (mut app, _, _) = app_with_pool(10_000_000, 20_000_000);
    let sender = addr("paw1relayuser");
    app.fund(&sender, &upaw(1_000_000)).unwrap();
    app.with_ctx(BlockCtx::new(2, 12), |ctx| {
        IngressGuard::authorize_channel(ctx, Module::Dex, "transfer", "channel-0")
    })
    .unwrap();
    // Packet against a nonexistent pool fails dispatch; its sequence does
    // not advance, so the relayer can retry the same sequence.
    let outcome = app
        .run_block(packets_block(3, vec![swap_packet(&sender, 99, 1)]))
        .unwrap();
    assert!(outcome.packet_results[0].is_some());
    let (last, _) = app
        .with_ctx(BlockCtx::new(4, 24), |ctx| {
            IngressGuard::last_sequence(ctx, Module::Dex, "channel-0", &sender)
        })
        .unwrap();
    assert_eq!(last, 0);
    // Retry with a valid pool succeeds at the same sequence.
    let outcome = app
        .run_block(packets_block(4, vec![swap_packet(&sender, 1, 1)]))
        .unwrap();
    assert!(outcome.packet_results[0].is_none());
}
