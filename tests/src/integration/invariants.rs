//! Universal invariants over generated operation sequences, plus the
//! determinism law: two nodes executing the same blocks byte-for-byte
//! agree on every application hash.

use crate::support::*;
use paw_dex::{DexEngine, DexMsg};
use paw_runtime::{App, BlockInput, Msg};
use paw_store::Ledger;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared_types::{BlockCtx, Coin, Module};

/// Generated mix of swaps and liquidity operations, fixed seed.
fn generated_blocks(seed: u64, blocks: u64) -> Vec<BlockInput> {
    let mut rng = StdRng::seed_from_u64(seed);
    let trader = addr("paw1trader");
    let mut out = Vec::new();
    for height in 2..2 + blocks {
        let mut msgs = Vec::new();
        for _ in 0..rng.gen_range(0..3) {
            let amount_in = rng.gen_range(1_000..40_000u128);
            let token_in = if rng.gen_bool(0.5) { "upaw" } else { "uusdt" };
            msgs.push(Msg::Dex(DexMsg::Swap {
                sender: trader.clone(),
                pool_id: 1,
                token_in: denom(token_in),
                amount_in,
                min_amount_out: 0,
            }));
        }
        if rng.gen_bool(0.2) {
            msgs.push(Msg::Dex(DexMsg::AddLiquidity {
                sender: trader.clone(),
                pool_id: 1,
                amount_a: rng.gen_range(10_000..50_000),
                amount_b: rng.gen_range(10_000..50_000),
            }));
        }
        out.push(block(height, msgs));
    }
    out
}

fn funded_app() -> App {
    let (mut app, _, _) = app_with_pool(5_000_000, 8_000_000);
    let trader = addr("paw1trader");
    for d in ["upaw", "uusdt"] {
        app.fund(&trader, &Coin::new(denom(d), 100_000_000)).unwrap();
    }
    app
}

#[test]
fn test_pool_reality_and_share_conservation_hold() {
    let mut app = funded_app();
    for input in generated_blocks(7, 30) {
        app.run_block(input).unwrap();
    }
    let (checks, _) = app
        .with_ctx(BlockCtx::new(100, 600), |ctx| {
            let pool = DexEngine::query_pool(ctx, 1)?;
            let module = Module::Dex.account();
            let bal_a = Ledger::balance(ctx.store, &module, &pool.token_a)?;
            let bal_b = Ledger::balance(ctx.store, &module, &pool.token_b)?;
            DexEngine::check_share_conservation(ctx, 1)?;
            Ok::<_, paw_dex::DexError>((pool, bal_a, bal_b))
        })
        .unwrap();
    let (pool, bal_a, bal_b) = checks;
    // Module balance covers reserves (plus any accrued fees).
    assert!(bal_a >= pool.reserve_a);
    assert!(bal_b >= pool.reserve_b);
    // Reserve floors never breached.
    assert!(pool.reserve_a >= 1_000_000);
    assert!(pool.reserve_b >= 1_000_000);
}

#[test]
fn test_product_never_decreases_across_swaps() {
    let mut app = funded_app();
    let mut last_product = 5_000_000u128 * 8_000_000u128;
    for input in generated_blocks(11, 20) {
        let had_liquidity_change = input
            .msgs
            .iter()
            .any(|m| matches!(m, Msg::Dex(DexMsg::AddLiquidity { .. })));
        app.run_block(input).unwrap();
        let (pool, _) = app
            .with_ctx(BlockCtx::new(999, 5_994), |ctx| {
                DexEngine::query_pool(ctx, 1)
            })
            .unwrap();
        let product = pool.reserve_a * pool.reserve_b;
        if !had_liquidity_change {
            assert!(
                product >= last_product,
                "product shrank: {last_product} -> {product}"
            );
        }
        last_product = product;
    }
}

#[test]
fn test_identical_blocks_identical_app_hashes() {
    let mut a = funded_app();
    let mut b = funded_app();
    for input in generated_blocks(23, 25) {
        let ha = a.run_block(input.clone()).unwrap();
        let hb = b.run_block(input).unwrap();
        assert_eq!(ha.app_hash, hb.app_hash, "diverged at version {}", ha.version);
        assert_eq!(ha.version, hb.version);
    }
}

#[test]
fn test_failed_operations_do_not_change_app_hash_inputs() {
    // Two nodes: one receives an extra always-failing message. State must
    // not diverge because failed scopes discard completely.
    let mut a = funded_app();
    let mut b = funded_app();
    let trader = addr("paw1trader");
    let good = Msg::Dex(DexMsg::Swap {
        sender: trader.clone(),
        pool_id: 1,
        token_in: denom("upaw"),
        amount_in: 5_000,
        min_amount_out: 0,
    });
    let failing = Msg::Dex(DexMsg::Swap {
        sender: trader.clone(),
        pool_id: 42, // nonexistent
        token_in: denom("upaw"),
        amount_in: 5_000,
        min_amount_out: 0,
    });
    let ha = a.run_block(block(2, vec![good.clone(), failing])).unwrap();
    let hb = b.run_block(block(2, vec![good])).unwrap();
    assert_eq!(ha.app_hash, hb.app_hash);
}
