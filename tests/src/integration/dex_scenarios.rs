//! DEX block-level scenarios: the reference swap, commit–reveal for large
//! trades, and the reentrancy guard under hook re-entry.

use crate::support::*;
use paw_dex::engine::commit_reveal::commit_hash;
use paw_dex::{DexEngine, DexError, DexHooks, DexMsg, SwapFill};
use paw_runtime::Msg;
use paw_store::{Ctx, Ledger};
use shared_types::BlockCtx;

#[test]
fn test_create_pool_and_swap_reference_numbers() {
    let (mut app, creator, pool_id) = app_with_pool(1_000_000, 2_000_000);
    let outcome = app
        .run_block(block(
            2,
            vec![Msg::Dex(DexMsg::Swap {
                sender: creator.clone(),
                pool_id,
                token_in: denom("upaw"),
                amount_in: 10_000,
                min_amount_out: 19_000,
            })],
        ))
        .unwrap();
    assert!(outcome.msg_results[0].is_none());
    let swap = outcome
        .events
        .iter()
        .find(|e| e.kind == "swap")
        .expect("swap event");
    assert_eq!(swap.get("amount_out"), Some("19742"));

    let (pool, _) = app
        .with_ctx(BlockCtx::new(3, 18), |ctx| DexEngine::query_pool(ctx, pool_id))
        .unwrap();
    assert_eq!(pool.reserve_a, 1_010_000);
    assert_eq!(pool.reserve_b, 1_980_258);
    assert!(pool.reserve_a * pool.reserve_b >= 1_000_000u128 * 2_000_000u128);
}

#[test]
fn test_commit_reveal_large_swap_end_to_end() {
    let (mut app, creator, pool_id) = app_with_pool(10_000_000, 20_000_000);
    let salt = [0x5A; 32];
    let hash = commit_hash(
        pool_id,
        &denom("upaw"),
        &denom("uusdt"),
        1_000_000,
        1_800_000,
        &salt,
        &creator,
    );
    // Block 5: commit (1,000,000 is 10% of the reserve: mandatory path).
    let outcome = app
        .run_block(block(
            5,
            vec![Msg::Dex(DexMsg::CommitSwap {
                sender: creator.clone(),
                pool_id,
                commit_hash: hash,
                amount_in_bound: 1_000_000,
            })],
        ))
        .unwrap();
    assert!(outcome.msg_results[0].is_none());

    // Direct swap of the same size is refused outright.
    let outcome = app
        .run_block(block(
            6,
            vec![Msg::Dex(DexMsg::Swap {
                sender: creator.clone(),
                pool_id,
                token_in: denom("upaw"),
                amount_in: 1_000_000,
                min_amount_out: 0,
            })],
        ))
        .unwrap();
    assert_eq!(outcome.msg_results[0].as_ref().unwrap().kind, "resource");

    let reveal = DexMsg::RevealAndSwap {
        sender: creator.clone(),
        pool_id,
        token_in: denom("upaw"),
        token_out: denom("uusdt"),
        amount_in: 1_000_000,
        min_amount_out: 1_800_000,
        salt,
    };
    // Block 7 (two blocks after commit): reveal executes.
    let outcome = app.run_block(block(7, vec![Msg::Dex(reveal.clone())])).unwrap();
    assert!(outcome.msg_results[0].is_none());
    let revealed = outcome
        .events
        .iter()
        .find(|e| e.kind == "swap_revealed")
        .expect("reveal event");
    assert_eq!(revealed.get("amount_out"), Some("1812727"));

    // A second reveal of the same preimage finds no commitment.
    let outcome = app.run_block(block(8, vec![Msg::Dex(reveal)])).unwrap();
    let failure = outcome.msg_results[0].as_ref().unwrap();
    assert_eq!(failure.kind, "contention");
    assert!(failure.message.contains("commitment"));
}

#[test]
fn test_hook_reentry_blocked_and_swap_rolled_back() {
    struct Reenter;
    impl DexHooks for Reenter {
        fn after_swap(&self, ctx: &mut Ctx, fill: &SwapFill) -> Result<(), DexError> {
            let nested = paw_dex::engine::swap::SwapSpec {
                trader: fill.trader.clone(),
                pool_id: fill.pool_id,
                token_in: fill.token_in.clone(),
                amount_in: 1_000,
                min_amount_out: 0,
            };
            paw_dex::DexEngine::new().swap(ctx, &paw_dex::NoDexHooks, &nested)?;
            Ok(())
        }
    }

    let (mut app, creator, pool_id) = app_with_pool(1_000_000, 2_000_000);
    app.register_dex_hook(Box::new(Reenter));
    let before = {
        let (bal, _) = app
            .with_ctx(BlockCtx::new(2, 12), |ctx| {
                Ledger::balance(ctx.store, &creator, &denom("upaw"))
            })
            .unwrap();
        bal
    };
    let outcome = app
        .run_block(block(
            2,
            vec![Msg::Dex(DexMsg::Swap {
                sender: creator.clone(),
                pool_id,
                token_in: denom("upaw"),
                amount_in: 10_000,
                min_amount_out: 0,
            })],
        ))
        .unwrap();
    let failure = outcome.msg_results[0].as_ref().unwrap();
    assert!(failure.message.contains("reentrant"));

    // Pool and balances untouched.
    let (pool, _) = app
        .with_ctx(BlockCtx::new(3, 18), |ctx| DexEngine::query_pool(ctx, pool_id))
        .unwrap();
    assert_eq!(pool.reserve_a, 1_000_000);
    assert_eq!(pool.reserve_b, 2_000_000);
    let (after, _) = app
        .with_ctx(BlockCtx::new(3, 18), |ctx| {
            Ledger::balance(ctx.store, &creator, &denom("upaw"))
        })
        .unwrap();
    assert_eq!(before, after);
}

#[test]
fn test_add_remove_liquidity_round_trip() {
    let (mut app, _, pool_id) = app_with_pool(1_000_000, 2_000_000);
    let lp = addr("paw1lp");
    app.fund(&lp, &upaw(1_000_000)).unwrap();
    app.fund(&lp, &shared_types::Coin::new(denom("uusdt"), 1_000_000))
        .unwrap();
    let outcome = app
        .run_block(block(
            2,
            vec![Msg::Dex(DexMsg::AddLiquidity {
                sender: lp.clone(),
                pool_id,
                amount_a: 100_000,
                amount_b: 200_000,
            })],
        ))
        .unwrap();
    assert!(outcome.msg_results[0].is_none());
    let (minted, _) = app
        .with_ctx(BlockCtx::new(3, 18), |ctx| {
            DexEngine::query_liquidity(ctx, pool_id, &lp)
        })
        .unwrap();
    assert!(minted > 0);

    // Burn everything after the flash-loan window; reserves return to the
    // originals within truncation bounds.
    let outcome = app
        .run_block(block(
            200,
            vec![Msg::Dex(DexMsg::RemoveLiquidity {
                sender: lp.clone(),
                pool_id,
                shares: minted,
            })],
        ))
        .unwrap();
    assert!(outcome.msg_results[0].is_none());
    let (pool, _) = app
        .with_ctx(BlockCtx::new(201, 1_206), |ctx| {
            DexEngine::query_pool(ctx, pool_id)
        })
        .unwrap();
    assert!(pool.reserve_a >= 1_000_000 && pool.reserve_a <= 1_000_010);
    assert!(pool.reserve_b >= 2_000_000 && pool.reserve_b <= 2_000_010);
}
