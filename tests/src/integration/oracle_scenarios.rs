//! Oracle block-level scenarios: the seven-validator aggregation with an
//! outlier, snapshot-weighted aggregation, and the same-block price hook
//! into the DEX.

use crate::support::*;
use paw_dex::DexEngine;
use paw_oracle::OracleEngine;
use paw_runtime::Msg;
use shared_types::BlockCtx;

const ASSET: &str = "BTC/USD";
const M: u128 = 1_000_000;

#[test]
fn test_seven_validator_aggregation_with_outlier() {
    let mut app = paw_runtime::App::in_memory();
    let validators = register_validators(&mut app, 7, ASSET, 2);

    // Period 1 opens at height 10 (snapshot); submissions follow.
    app.run_block(block(10, vec![])).unwrap();
    let prices: [u128; 7] = [50_000, 50_100, 50_050, 49_950, 50_200, 49_900, 75_000];
    for (i, v) in validators.iter().enumerate() {
        let height = 11 + i as u64;
        let msg = price_msg(&mut app, v, ASSET, prices[i] * M, height);
        let outcome = app.run_block(block(height, vec![msg])).unwrap();
        assert!(
            outcome.msg_results[0].is_none(),
            "submission {i} failed: {:?}",
            outcome.msg_results[0]
        );
    }

    // Period closes at height 19: aggregation, slashing.
    let outcome = app.run_block(block(19, vec![])).unwrap();
    let aggregated = outcome
        .events
        .iter()
        .find(|e| e.kind == "oracle_price_aggregated")
        .expect("aggregation event");
    assert_eq!(aggregated.get("price_micro"), Some("50050000000"));

    let (validator6, _) = app
        .with_ctx(BlockCtx::new(20, 120), |ctx| {
            OracleEngine::query_validator(ctx, &validators[6].addr)
        })
        .unwrap();
    // 0.01% of 2,000,000 stake.
    assert_eq!(validator6.stake, 2_000_000 - 200);
    assert_eq!(validator6.outlier_count, 1);

    let (honest, _) = app
        .with_ctx(BlockCtx::new(20, 120), |ctx| {
            OracleEngine::query_validator(ctx, &validators[0].addr)
        })
        .unwrap();
    assert_eq!(honest.outlier_count, 0);
}

#[test]
fn test_aggregated_price_reaches_dex_same_block() {
    let mut app = paw_runtime::App::in_memory();
    let validators = register_validators(&mut app, 7, ASSET, 2);
    app.run_block(block(10, vec![])).unwrap();
    for (i, v) in validators.iter().enumerate() {
        let height = 11 + i as u64;
        let msg = price_msg(&mut app, v, ASSET, 50_000 * M, height);
        app.run_block(block(height, vec![msg])).unwrap();
    }
    app.run_block(block(19, vec![])).unwrap();

    // The oracle hook recorded the price into the DEX namespace during the
    // same end blocker.
    let (reference, _) = app
        .with_ctx(BlockCtx::new(20, 120), |ctx| {
            DexEngine::reference_price(ctx, ASSET)
        })
        .unwrap();
    let (price, height) = reference.expect("reference price recorded");
    assert_eq!(price, 50_000 * M);
    assert_eq!(height, 19);
}

#[test]
fn test_submission_replaced_within_period() {
    let mut app = paw_runtime::App::in_memory();
    let validators = register_validators(&mut app, 7, ASSET, 2);
    app.run_block(block(10, vec![])).unwrap();
    // Validator 0 submits twice in the period; the second value wins.
    let msg = price_msg(&mut app, &validators[0], ASSET, 40_000 * M, 11);
    app.run_block(block(11, vec![msg])).unwrap();
    let msg = price_msg(&mut app, &validators[0], ASSET, 41_000 * M, 13);
    let outcome = app.run_block(block(13, vec![msg])).unwrap();
    assert!(outcome.msg_results[0].is_none());

    let mut last_outcome = None;
    for (i, v) in validators.iter().enumerate().skip(1) {
        // Heights 14..=19; the height-19 block also closes the period.
        let height = 13 + i as u64;
        let msg = price_msg(&mut app, v, ASSET, 41_000 * M, height);
        last_outcome = Some(app.run_block(block(height, vec![msg])).unwrap());
    }
    let outcome = last_outcome.expect("submissions ran");
    let aggregated = outcome
        .events
        .iter()
        .find(|e| e.kind == "oracle_price_aggregated")
        .expect("aggregation event");
    assert_eq!(
        aggregated.get("price_micro"),
        Some(format!("{}", 41_000 * M).as_str())
    );
}
