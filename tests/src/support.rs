//! Shared fixtures for the integration suite.

use ed25519_dalek::{Signer, SigningKey};
use shared_types::{Address, BlockCtx, Coin, Denom};

use paw_dex::DexMsg;
use paw_oracle::engine::submissions::submission_message;
use paw_oracle::{OracleEngine, OracleMsg};
use paw_runtime::{App, BlockInput, Msg};

pub fn addr(s: &str) -> Address {
    Address::new(s).expect("test address")
}

pub fn denom(s: &str) -> Denom {
    Denom::new(s).expect("test denom")
}

pub fn upaw(amount: u128) -> Coin {
    Coin::new(denom("upaw"), amount)
}

/// Six seconds per block keeps height/time deadlines aligned.
pub fn block(height: u64, msgs: Vec<Msg>) -> BlockInput {
    BlockInput {
        height,
        time_unix: height * 6,
        entropy: height.to_be_bytes().to_vec(),
        msgs,
        packets: Vec::new(),
    }
}

/// Fresh app with a funded trader and the reference upaw/uusdt pool
/// created in block 1. Returns `(app, creator, pool_id)`.
pub fn app_with_pool(reserve_a: u128, reserve_b: u128) -> (App, Address, u64) {
    let mut app = App::in_memory();
    let creator = addr("paw1creator");
    for d in ["upaw", "uusdt"] {
        app.fund(&creator, &Coin::new(denom(d), 1_000_000_000)).unwrap();
    }
    let outcome = app
        .run_block(block(
            1,
            vec![Msg::Dex(DexMsg::CreatePool {
                sender: creator.clone(),
                token_a: denom("upaw"),
                token_b: denom("uusdt"),
                amount_a: reserve_a,
                amount_b: reserve_b,
            })],
        ))
        .unwrap();
    assert!(outcome.msg_results[0].is_none(), "pool creation failed");
    (app, creator, 1)
}

/// A funded oracle validator with its signing key.
pub struct TestValidator {
    pub addr: Address,
    pub key: SigningKey,
}

/// Register `n` oracle validators with equal stake across three regions
/// and whitelist `asset`. Runs in the given block heights starting at
/// `height`.
pub fn register_validators(app: &mut App, n: usize, asset: &str, height: u64) -> Vec<TestValidator> {
    let mut validators = Vec::with_capacity(n);
    let mut msgs = Vec::new();
    for i in 0..n {
        let v = TestValidator {
            addr: addr(&format!("paw1val{i}")),
            key: SigningKey::from_bytes(&[(i + 1) as u8; 32]),
        };
        app.fund(&v.addr, &upaw(10_000_000)).unwrap();
        msgs.push(Msg::Oracle(OracleMsg::RegisterValidator {
            sender: v.addr.clone(),
            stake: 2_000_000,
            region: ["us-east", "eu-west", "ap-east"][i % 3].into(),
            ip: format!("10.20.0.{i}"),
            asn: 64_000 + i as u32,
            pubkey: v.key.verifying_key().to_bytes(),
        }));
        validators.push(v);
    }
    msgs.push(Msg::Oracle(OracleMsg::WhitelistAsset {
        sender: addr("paw1gov"),
        asset: asset.to_string(),
    }));
    let outcome = app.run_block(block(height, msgs)).unwrap();
    for (i, r) in outcome.msg_results.iter().enumerate() {
        assert!(r.is_none(), "registration msg {i} failed: {r:?}");
    }
    validators
}

/// A signed SubmitPrice message for the period containing `height`.
pub fn price_msg(
    app: &mut App,
    validator: &TestValidator,
    asset: &str,
    price_micro: u128,
    height: u64,
) -> Msg {
    let period = {
        let (params, _) = app
            .with_ctx(BlockCtx::new(height, height * 6), |ctx| {
                OracleEngine::params(ctx)
            })
            .unwrap();
        params.period_of(height)
    };
    let message = submission_message(asset, price_micro, period, &validator.addr);
    let signature = validator.key.sign(&message).to_bytes().to_vec();
    Msg::Oracle(OracleMsg::SubmitPrice {
        sender: validator.addr.clone(),
        validator: validator.addr.clone(),
        asset: asset.to_string(),
        price_micro,
        signature,
    })
}
