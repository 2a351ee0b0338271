//! # Provider Lifecycle
//!
//! Registration under stake and endpoint rules, explicit signing-key
//! registration, jailing, and the O(1) provider counter that enforces the
//! registry cap.

use shared_types::{Address, Coin, Denom, Event, Module};

use paw_store::codec::{get_typed, put_typed};
use paw_store::{Ctx, Ledger};

use crate::crypto::signing;
use crate::domain::entities::Provider;
use crate::domain::errors::ComputeError;
use crate::domain::keys;
use crate::events;

use super::ComputeEngine;

fn stake_denom() -> Denom {
    Denom::new("upaw").expect("static denom")
}

/// Endpoint policy: HTTPS required everywhere, loopback exempt in every
/// network.
fn endpoint_allowed(endpoint: &str, require_https: bool) -> bool {
    if !require_https || endpoint.starts_with("https://") {
        return true;
    }
    endpoint.starts_with("http://127.0.0.1") || endpoint.starts_with("http://localhost")
}

impl ComputeEngine {
    /// Register the sender as a provider and lock its stake.
    pub fn register_provider(
        &self,
        ctx: &mut Ctx,
        sender: &Address,
        stake: u128,
        capabilities: Vec<String>,
        endpoint: String,
    ) -> Result<(), ComputeError> {
        let params = Self::params(ctx)?;
        if get_typed::<Provider>(ctx.store, Module::Compute, &keys::provider_key(sender))?
            .is_some()
        {
            return Err(ComputeError::ProviderExists);
        }
        if stake < params.min_provider_stake {
            return Err(ComputeError::StakeTooLow {
                got: stake,
                min: params.min_provider_stake,
            });
        }
        if capabilities.is_empty() {
            return Err(ComputeError::InvalidJobSpec {
                reason: "provider must declare at least one capability".into(),
            });
        }
        if !endpoint_allowed(&endpoint, params.require_https) {
            return Err(ComputeError::EndpointNotHttps { endpoint });
        }
        let count: u64 =
            get_typed(ctx.store, Module::Compute, &keys::provider_count_key())?.unwrap_or(0);
        if count >= params.max_providers {
            return Err(ComputeError::ProviderCapReached {
                max: params.max_providers,
            });
        }

        ctx.scoped(|ctx| {
            Ledger::transfer(
                ctx.store,
                sender,
                &Module::Compute.account(),
                &[Coin::new(stake_denom(), stake)],
            )?;
            put_typed(
                ctx.store,
                Module::Compute,
                keys::provider_count_key(),
                &(count + 1),
            )?;
            let provider = Provider {
                addr: sender.clone(),
                stake,
                capabilities,
                endpoint,
                signing_key: None,
                reputation: 100,
                jobs_completed: 0,
                jobs_failed: 0,
                jailed: false,
                registered_height: ctx.block.height,
            };
            Self::save_provider(ctx, &provider)?;
            ctx.emit(
                Event::new(events::PROVIDER_REGISTERED)
                    .attr("provider", sender)
                    .attr("stake", stake),
            );
            tracing::info!(provider = %sender, %stake, "compute provider registered");
            Ok(())
        })
    }

    /// Register the key that signs this provider's results. Mandatory
    /// before any result is accepted.
    pub fn register_signing_key(
        &self,
        ctx: &mut Ctx,
        sender: &Address,
        pubkey: [u8; 32],
    ) -> Result<(), ComputeError> {
        let mut provider = Self::load_provider(ctx, sender)?;
        signing::parse_key(&pubkey)?;
        provider.signing_key = Some(pubkey);
        Self::save_provider(ctx, &provider)?;
        ctx.emit(Event::new(events::SIGNING_KEY_REGISTERED).attr("provider", sender));
        Ok(())
    }

    /// Slash a provider's stake and burn it. Used by dispute resolution.
    pub(crate) fn slash_provider(
        &self,
        ctx: &mut Ctx,
        addr: &Address,
        slash_bps: u32,
    ) -> Result<u128, ComputeError> {
        let mut provider = Self::load_provider(ctx, addr)?;
        let amount = provider.stake.saturating_mul(slash_bps as u128) / 10_000;
        provider.stake -= amount;
        provider.jobs_failed += 1;
        provider.reputation = (provider.reputation - 10).max(0);
        if provider.reputation == 0 {
            provider.jailed = true;
        }
        Self::save_provider(ctx, &provider)?;
        if amount > 0 {
            Ledger::burn(
                ctx.store,
                &Module::Compute.account(),
                &Coin::new(stake_denom(), amount),
            )?;
        }
        ctx.emit(
            Event::new(events::PROVIDER_SLASHED)
                .attr("provider", addr)
                .attr("amount", amount),
        );
        tracing::warn!(provider = %addr, %amount, "provider slashed");
        Ok(amount)
    }

    /// All providers, ascending by address.
    pub(crate) fn all_providers(ctx: &Ctx) -> Result<Vec<Provider>, ComputeError> {
        Ok(ctx
            .store
            .range(Module::Compute, &keys::provider_prefix())?
            .into_iter()
            .filter_map(|(_, v)| bincode::deserialize(&v).ok())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::SigningKey;
    use paw_store::MultiStore;
    use shared_types::BlockCtx;

    fn addr(s: &str) -> Address {
        Address::new(s).unwrap()
    }

    fn fund(store: &mut MultiStore, who: &Address, amount: u128) {
        Ledger::mint(store, who, &Coin::new(stake_denom(), amount)).unwrap();
    }

    #[test]
    fn test_register_and_signing_key() {
        let mut store = MultiStore::in_memory();
        let p = addr("paw1provider");
        fund(&mut store, &p, 5_000_000);
        let mut events = Vec::new();
        let mut ctx = Ctx::new(&mut store, BlockCtx::new(1, 0), &mut events);
        ComputeEngine::new()
            .register_provider(
                &mut ctx,
                &p,
                2_000_000,
                vec!["zk-prover".into()],
                "https://prover.example.com".into(),
            )
            .unwrap();
        let stored = ComputeEngine::load_provider(&ctx, &p).unwrap();
        assert_eq!(stored.stake, 2_000_000);
        assert!(stored.signing_key.is_none());

        let key = SigningKey::from_bytes(&[5; 32]).verifying_key().to_bytes();
        ComputeEngine::new()
            .register_signing_key(&mut ctx, &p, key)
            .unwrap();
        assert_eq!(
            ComputeEngine::load_provider(&ctx, &p).unwrap().signing_key,
            Some(key)
        );
    }

    #[test]
    fn test_https_required_but_loopback_exempt() {
        let mut store = MultiStore::in_memory();
        let mut events = Vec::new();
        let p1 = addr("paw1prov1");
        let p2 = addr("paw1prov2");
        fund(&mut store, &p1, 5_000_000);
        fund(&mut store, &p2, 5_000_000);
        let mut ctx = Ctx::new(&mut store, BlockCtx::new(1, 0), &mut events);
        let err = ComputeEngine::new()
            .register_provider(
                &mut ctx,
                &p1,
                2_000_000,
                vec!["gpu".into()],
                "http://prover.example.com".into(),
            )
            .unwrap_err();
        assert!(matches!(err, ComputeError::EndpointNotHttps { .. }));
        ComputeEngine::new()
            .register_provider(
                &mut ctx,
                &p2,
                2_000_000,
                vec!["gpu".into()],
                "http://127.0.0.1:8080".into(),
            )
            .unwrap();
    }

    #[test]
    fn test_provider_cap() {
        let mut store = MultiStore::in_memory();
        let mut events = Vec::new();
        {
            let mut ctx = Ctx::new(&mut store, BlockCtx::new(1, 0), &mut events);
            let mut params = ComputeEngine::params(&ctx).unwrap();
            params.max_providers = 1;
            ComputeEngine::set_params(&mut ctx, &params).unwrap();
        }
        let p1 = addr("paw1prov1");
        let p2 = addr("paw1prov2");
        fund(&mut store, &p1, 5_000_000);
        fund(&mut store, &p2, 5_000_000);
        let mut ctx = Ctx::new(&mut store, BlockCtx::new(1, 0), &mut events);
        ComputeEngine::new()
            .register_provider(
                &mut ctx,
                &p1,
                2_000_000,
                vec!["gpu".into()],
                "https://a.example.com".into(),
            )
            .unwrap();
        let err = ComputeEngine::new()
            .register_provider(
                &mut ctx,
                &p2,
                2_000_000,
                vec!["gpu".into()],
                "https://b.example.com".into(),
            )
            .unwrap_err();
        assert!(matches!(err, ComputeError::ProviderCapReached { max: 1 }));
    }

    #[test]
    fn test_weak_signing_key_rejected() {
        let mut store = MultiStore::in_memory();
        let p = addr("paw1provider");
        fund(&mut store, &p, 5_000_000);
        let mut events = Vec::new();
        let mut ctx = Ctx::new(&mut store, BlockCtx::new(1, 0), &mut events);
        ComputeEngine::new()
            .register_provider(
                &mut ctx,
                &p,
                2_000_000,
                vec!["gpu".into()],
                "https://a.example.com".into(),
            )
            .unwrap();
        let weak: [u8; 32] = [
            1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
            0, 0, 0, 0, 0,
        ];
        assert!(matches!(
            ComputeEngine::new().register_signing_key(&mut ctx, &p, weak),
            Err(ComputeError::BadKey)
        ));
    }
}
