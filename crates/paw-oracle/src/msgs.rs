//! # Oracle Messages

use serde::{Deserialize, Serialize};
use shared_types::Address;

use paw_store::Ctx;

use crate::domain::errors::OracleError;
use crate::engine::OracleEngine;
use crate::hooks::OracleHooks;

/// All oracle operations.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum OracleMsg {
    RegisterValidator {
        sender: Address,
        stake: u128,
        region: String,
        ip: String,
        asn: u32,
        pubkey: [u8; 32],
    },
    SubmitPrice {
        sender: Address,
        validator: Address,
        asset: String,
        price_micro: u128,
        signature: Vec<u8>,
    },
    DelegateFeeder {
        sender: Address,
        feeder: Address,
    },
    WhitelistAsset {
        sender: Address,
        asset: String,
    },
    SetPriceOverride {
        sender: Address,
        asset: String,
        price_micro: u128,
    },
}

impl OracleMsg {
    pub fn sender(&self) -> &Address {
        match self {
            OracleMsg::RegisterValidator { sender, .. }
            | OracleMsg::SubmitPrice { sender, .. }
            | OracleMsg::DelegateFeeder { sender, .. }
            | OracleMsg::WhitelistAsset { sender, .. }
            | OracleMsg::SetPriceOverride { sender, .. } => sender,
        }
    }
}

impl OracleEngine {
    /// Execute one message.
    pub fn handle(
        &self,
        ctx: &mut Ctx,
        hooks: &dyn OracleHooks,
        msg: &OracleMsg,
    ) -> Result<(), OracleError> {
        match msg {
            OracleMsg::RegisterValidator {
                sender,
                stake,
                region,
                ip,
                asn,
                pubkey,
            } => self.register_validator(
                ctx,
                sender,
                *stake,
                region.clone(),
                ip.clone(),
                *asn,
                *pubkey,
            ),
            OracleMsg::SubmitPrice {
                sender,
                validator,
                asset,
                price_micro,
                signature,
            } => self.submit_price(ctx, sender, validator, asset, *price_micro, signature),
            OracleMsg::DelegateFeeder { sender, feeder } => {
                self.delegate_feeder(ctx, sender, feeder.clone())
            }
            OracleMsg::WhitelistAsset { sender, asset } => {
                self.whitelist_asset(ctx, sender, asset.clone())
            }
            OracleMsg::SetPriceOverride {
                sender,
                asset,
                price_micro,
            } => self.set_price_override(ctx, sender, asset, *price_micro, hooks),
        }
    }
}
