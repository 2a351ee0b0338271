//! Compute block-level scenarios: the escrow timeout refund and the fully
//! verified result path with its release window.

use crate::support::*;
use ed25519_dalek::{Signer, SigningKey};
use paw_compute::crypto::groth16;
use paw_compute::crypto::signing::result_message;
use paw_compute::domain::entities::{EscrowStatus, JobSpec, RequestStatus};
use paw_compute::{ComputeEngine, ComputeMsg};
use paw_runtime::Msg;
use paw_store::Ledger;
use shared_types::{BlockCtx, Module};

fn register_provider_block(
    app: &mut paw_runtime::App,
    provider: &shared_types::Address,
    key: &SigningKey,
    vk_bytes: Vec<u8>,
    height: u64,
) {
    app.fund(provider, &upaw(10_000_000)).unwrap();
    let (_, _) = app
        .with_ctx(BlockCtx::new(height, height * 6), |ctx| {
            ComputeEngine::register_verifying_key(ctx, &addr("paw1gov"), "sum-v1", vk_bytes)
        })
        .unwrap();
    let outcome = app
        .run_block(block(
            height,
            vec![
                Msg::Compute(ComputeMsg::RegisterProvider {
                    sender: provider.clone(),
                    stake: 2_000_000,
                    capabilities: vec!["zk".into()],
                    endpoint: "https://prover.example.com".into(),
                }),
                Msg::Compute(ComputeMsg::RegisterSigningKey {
                    sender: provider.clone(),
                    pubkey: key.verifying_key().to_bytes(),
                }),
            ],
        ))
        .unwrap();
    for r in &outcome.msg_results {
        assert!(r.is_none(), "provider setup failed: {r:?}");
    }
}

#[test]
fn test_escrow_timeout_refunds_requester() {
    let mut app = paw_runtime::App::in_memory();
    let provider = addr("paw1provider");
    let requester = addr("paw1requester");
    let key = SigningKey::from_bytes(&[9; 32]);
    register_provider_block(&mut app, &provider, &key, vec![1, 2, 3], 5);
    app.fund(&requester, &upaw(5_000_000)).unwrap();

    // Block 10: request with payment 1,000,000; timeout at height 110.
    let outcome = app
        .run_block(block(
            10,
            vec![Msg::Compute(ComputeMsg::SubmitRequest {
                sender: requester.clone(),
                spec: JobSpec {
                    capability: "zk".into(),
                    circuit_id: "sum-v1".into(),
                    input_hash: [1; 32],
                },
                payment: upaw(1_000_000),
                provider: Some(provider.clone()),
            })],
        ))
        .unwrap();
    assert!(outcome.msg_results[0].is_none());
    let (module_balance, _) = app
        .with_ctx(BlockCtx::new(11, 66), |ctx| {
            Ledger::balance(ctx.store, &Module::Compute.account(), &denom("upaw"))
        })
        .unwrap();

    // Provider never responds. At height 110 (time 660 ≥ 60 + 600), the
    // end blocker refunds.
    let outcome = app.run_block(block(110, vec![])).unwrap();
    let refunded = outcome
        .events
        .iter()
        .find(|e| e.kind == "compute_escrow_refunded")
        .expect("refund event");
    assert_eq!(refunded.get("request_id"), Some("1"));

    let (state, _) = app
        .with_ctx(BlockCtx::new(111, 666), |ctx| {
            let escrow = ComputeEngine::query_escrow(ctx, 1)?;
            let request = ComputeEngine::query_request(ctx, 1)?;
            let requester_balance =
                Ledger::balance(ctx.store, &requester, &denom("upaw"))?;
            let module_after =
                Ledger::balance(ctx.store, &Module::Compute.account(), &denom("upaw"))?;
            Ok::<_, paw_compute::ComputeError>((escrow, request, requester_balance, module_after))
        })
        .unwrap();
    let (escrow, request, requester_balance, module_after) = state;
    assert_eq!(escrow.status, EscrowStatus::Refunded);
    assert_eq!(request.status, RequestStatus::TimedOut);
    // Requester made whole; module balance dropped by exactly the escrow.
    assert_eq!(requester_balance, 5_000_000);
    assert_eq!(module_after, module_balance - 1_000_000);
    // Both timeout indices gone.
    let (indices, _) = app
        .with_ctx(BlockCtx::new(111, 666), |ctx| {
            let fwd = ctx
                .store
                .range(Module::Compute, &paw_compute::domain::keys::timeout_fwd_prefix())?;
            let rev = ctx
                .store
                .range(Module::Compute, &paw_compute::domain::keys::timeout_rev_prefix())?;
            Ok::<_, paw_store::StoreError>((fwd.len(), rev.len()))
        })
        .unwrap();
    assert_eq!(indices, (0, 0));
}

#[test]
fn test_verified_result_pays_after_release_window() {
    let mut app = paw_runtime::App::in_memory();
    let provider = addr("paw1provider");
    let requester = addr("paw1requester");
    let key = SigningKey::from_bytes(&[9; 32]);
    let (pk, vk) = paw_compute::crypto::groth16::test_support::setup();
    register_provider_block(
        &mut app,
        &provider,
        &key,
        groth16::encode_verifying_key(&vk).unwrap(),
        5,
    );
    app.fund(&requester, &upaw(5_000_000)).unwrap();
    app.run_block(block(
        10,
        vec![Msg::Compute(ComputeMsg::SubmitRequest {
            sender: requester.clone(),
            spec: JobSpec {
                capability: "zk".into(),
                circuit_id: "sum-v1".into(),
                input_hash: [1; 32],
            },
            payment: upaw(1_000_000),
            provider: Some(provider.clone()),
        })],
    ))
    .unwrap();

    // Block 20: provider submits the proven result.
    let result_hash = [0xCD; 32];
    let inputs = groth16::public_inputs(1, &result_hash, &provider);
    let proof = paw_compute::crypto::groth16::test_support::prove(&pk, &inputs);
    let message = result_message(1, &result_hash, 1, &provider);
    let outcome = app
        .run_block(block(
            20,
            vec![Msg::Compute(ComputeMsg::SubmitResult {
                sender: provider.clone(),
                request_id: 1,
                result_hash,
                proof: groth16::encode_proof(&proof).unwrap(),
                nonce: 1,
                signature: key.sign(&message).to_bytes().to_vec(),
            })],
        ))
        .unwrap();
    assert!(
        outcome.msg_results[0].is_none(),
        "result rejected: {:?}",
        outcome.msg_results[0]
    );

    // Release window: 50 blocks / 300 seconds after completion. At height
    // 70 (time 420 ≥ 120 + 300), the end blocker pays out.
    let before = {
        let (bal, _) = app
            .with_ctx(BlockCtx::new(69, 414), |ctx| {
                Ledger::balance(ctx.store, &provider, &denom("upaw"))
            })
            .unwrap();
        bal
    };
    let outcome = app.run_block(block(70, vec![])).unwrap();
    assert!(outcome
        .events
        .iter()
        .any(|e| e.kind == "compute_escrow_released"));
    let (after, _) = app
        .with_ctx(BlockCtx::new(71, 426), |ctx| {
            Ledger::balance(ctx.store, &provider, &denom("upaw"))
        })
        .unwrap();
    assert_eq!(after, before + 1_000_000);
}
