//! # DEX Messages
//!
//! Wire-level operations delivered by the runtime, one enum variant per
//! operation. Dispatch maps each onto the engine; every handler call runs
//! inside the scope the runtime opened for the message.

use serde::{Deserialize, Serialize};
use shared_types::{Address, Denom};

use paw_store::Ctx;

use crate::domain::entities::OrderDirection;
use crate::domain::errors::DexError;
use crate::engine::commit_reveal::RevealSpec;
use crate::engine::swap::SwapSpec;
use crate::engine::DexEngine;
use crate::hooks::DexHooks;

/// One swap leg inside a batch.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SwapLeg {
    pub pool_id: u64,
    pub token_in: Denom,
    pub amount_in: u128,
    pub min_amount_out: u128,
}

/// All DEX operations.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum DexMsg {
    CreatePool {
        sender: Address,
        token_a: Denom,
        token_b: Denom,
        amount_a: u128,
        amount_b: u128,
    },
    AddLiquidity {
        sender: Address,
        pool_id: u64,
        amount_a: u128,
        amount_b: u128,
    },
    RemoveLiquidity {
        sender: Address,
        pool_id: u64,
        shares: u128,
    },
    Swap {
        sender: Address,
        pool_id: u64,
        token_in: Denom,
        amount_in: u128,
        min_amount_out: u128,
    },
    BatchSwap {
        sender: Address,
        swaps: Vec<SwapLeg>,
    },
    PlaceLimitOrder {
        sender: Address,
        pool_id: u64,
        direction: OrderDirection,
        amount_in: u128,
        price_micro: u128,
        expiry_height: u64,
    },
    CancelLimitOrder {
        sender: Address,
        order_id: u64,
    },
    CommitSwap {
        sender: Address,
        pool_id: u64,
        commit_hash: [u8; 32],
        amount_in_bound: u128,
    },
    RevealAndSwap {
        sender: Address,
        pool_id: u64,
        token_in: Denom,
        token_out: Denom,
        amount_in: u128,
        min_amount_out: u128,
        salt: [u8; 32],
    },
    CancelSwapCommitment {
        sender: Address,
        commit_hash: [u8; 32],
    },
}

impl DexMsg {
    pub fn sender(&self) -> &Address {
        match self {
            DexMsg::CreatePool { sender, .. }
            | DexMsg::AddLiquidity { sender, .. }
            | DexMsg::RemoveLiquidity { sender, .. }
            | DexMsg::Swap { sender, .. }
            | DexMsg::BatchSwap { sender, .. }
            | DexMsg::PlaceLimitOrder { sender, .. }
            | DexMsg::CancelLimitOrder { sender, .. }
            | DexMsg::CommitSwap { sender, .. }
            | DexMsg::RevealAndSwap { sender, .. }
            | DexMsg::CancelSwapCommitment { sender, .. } => sender,
        }
    }
}

impl DexEngine {
    /// Execute one message.
    pub fn handle(
        &self,
        ctx: &mut Ctx,
        hooks: &dyn DexHooks,
        msg: &DexMsg,
    ) -> Result<(), DexError> {
        match msg {
            DexMsg::CreatePool {
                sender,
                token_a,
                token_b,
                amount_a,
                amount_b,
            } => self
                .create_pool(
                    ctx,
                    hooks,
                    sender,
                    token_a.clone(),
                    token_b.clone(),
                    *amount_a,
                    *amount_b,
                )
                .map(|_| ()),
            DexMsg::AddLiquidity {
                sender,
                pool_id,
                amount_a,
                amount_b,
            } => self
                .add_liquidity(ctx, hooks, sender, *pool_id, *amount_a, *amount_b)
                .map(|_| ()),
            DexMsg::RemoveLiquidity {
                sender,
                pool_id,
                shares,
            } => self
                .remove_liquidity(ctx, hooks, sender, *pool_id, *shares)
                .map(|_| ()),
            DexMsg::Swap {
                sender,
                pool_id,
                token_in,
                amount_in,
                min_amount_out,
            } => self
                .swap(
                    ctx,
                    hooks,
                    &SwapSpec {
                        trader: sender.clone(),
                        pool_id: *pool_id,
                        token_in: token_in.clone(),
                        amount_in: *amount_in,
                        min_amount_out: *min_amount_out,
                    },
                )
                .map(|_| ()),
            DexMsg::BatchSwap { sender, swaps } => {
                let specs: Vec<SwapSpec> = swaps
                    .iter()
                    .map(|leg| SwapSpec {
                        trader: sender.clone(),
                        pool_id: leg.pool_id,
                        token_in: leg.token_in.clone(),
                        amount_in: leg.amount_in,
                        min_amount_out: leg.min_amount_out,
                    })
                    .collect();
                self.batch_swap(ctx, hooks, &specs).map(|_| ())
            }
            DexMsg::PlaceLimitOrder {
                sender,
                pool_id,
                direction,
                amount_in,
                price_micro,
                expiry_height,
            } => self
                .place_limit_order(
                    ctx,
                    sender,
                    *pool_id,
                    *direction,
                    *amount_in,
                    *price_micro,
                    *expiry_height,
                )
                .map(|_| ()),
            DexMsg::CancelLimitOrder { sender, order_id } => {
                self.cancel_limit_order(ctx, sender, *order_id)
            }
            DexMsg::CommitSwap {
                sender,
                pool_id,
                commit_hash,
                amount_in_bound,
            } => self.commit_swap(ctx, sender, *pool_id, *commit_hash, *amount_in_bound),
            DexMsg::RevealAndSwap {
                sender,
                pool_id,
                token_in,
                token_out,
                amount_in,
                min_amount_out,
                salt,
            } => self
                .reveal_and_swap(
                    ctx,
                    hooks,
                    sender,
                    &RevealSpec {
                        pool_id: *pool_id,
                        token_in: token_in.clone(),
                        token_out: token_out.clone(),
                        amount_in: *amount_in,
                        min_amount_out: *min_amount_out,
                        salt: *salt,
                    },
                )
                .map(|_| ()),
            DexMsg::CancelSwapCommitment {
                sender,
                commit_hash,
            } => self.cancel_commitment(ctx, sender, *commit_hash),
        }
    }
}
