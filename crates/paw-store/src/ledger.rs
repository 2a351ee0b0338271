//! # Balance Ledger
//!
//! The ambient bank: balances of user accounts and module accounts, stored
//! under the bank namespace (`0x00`). Transfer is the only mutation path in
//! normal operation; mint and burn exist for genesis and for slashing.
//!
//! The ledger never performs its own rollback. Callers run transfers inside
//! a cache scope, so a failed operation discards any partial leg.

use shared_types::{Address, ChainError, Coin, Denom, ErrorKind, Module};
use thiserror::Error;

use crate::domain::multistore::MultiStore;
use crate::domain::StoreError;

/// Bank sub-prefix for balances.
const SUB_BALANCE: u8 = 0x01;

/// Errors from balance accounting.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("insufficient balance of {denom}: required {required}, available {available}")]
    InsufficientBalance {
        denom: Denom,
        required: u128,
        available: u128,
    },

    /// Balance arithmetic exceeded u128. Unreachable with sane supplies;
    /// refused rather than wrapped.
    #[error("balance overflow for {denom}")]
    Overflow { denom: Denom },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ChainError for LedgerError {
    fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::InsufficientBalance { .. } => ErrorKind::Resource,
            LedgerError::Overflow { .. } => ErrorKind::Invariant,
            LedgerError::Store(e) => e.kind(),
        }
    }

    fn remediation(&self) -> Option<String> {
        match self {
            LedgerError::InsufficientBalance { required, .. } => {
                Some(format!("fund the account with at least {required} base units"))
            }
            _ => None,
        }
    }
}

/// Stateless accessor over bank-namespace balances.
pub struct Ledger;

impl Ledger {
    fn balance_key(addr: &Address, denom: &Denom) -> Vec<u8> {
        let mut k = Vec::with_capacity(3 + addr.as_bytes().len() + denom.as_str().len());
        k.push(Module::Bank.namespace());
        k.push(SUB_BALANCE);
        k.push(addr.as_bytes().len() as u8);
        k.extend_from_slice(addr.as_bytes());
        k.extend_from_slice(denom.as_str().as_bytes());
        k
    }

    /// Current balance; absent key reads as zero.
    pub fn balance(
        store: &MultiStore,
        addr: &Address,
        denom: &Denom,
    ) -> Result<u128, LedgerError> {
        let raw = store.get(Module::Bank, &Self::balance_key(addr, denom))?;
        match raw {
            None => Ok(0),
            Some(bytes) => bincode::deserialize(&bytes).map_err(|e| {
                LedgerError::Store(StoreError::CorruptValue {
                    key: Self::balance_key(addr, denom),
                    reason: e.to_string(),
                })
            }),
        }
    }

    fn write_balance(
        store: &mut MultiStore,
        addr: &Address,
        denom: &Denom,
        amount: u128,
    ) -> Result<(), LedgerError> {
        let key = Self::balance_key(addr, denom);
        if amount == 0 {
            store.delete(Module::Bank, key)?;
        } else {
            let bytes = bincode::serialize(&amount)
                .map_err(|e| LedgerError::Store(StoreError::Backend(e.to_string())))?;
            store.set(Module::Bank, key, bytes)?;
        }
        Ok(())
    }

    /// Create supply out of thin air. Genesis and test funding only.
    pub fn mint(store: &mut MultiStore, to: &Address, coin: &Coin) -> Result<(), LedgerError> {
        let current = Self::balance(store, to, &coin.denom)?;
        let next = current
            .checked_add(coin.amount)
            .ok_or_else(|| LedgerError::Overflow {
                denom: coin.denom.clone(),
            })?;
        Self::write_balance(store, to, &coin.denom, next)
    }

    /// Destroy supply (slashing).
    pub fn burn(store: &mut MultiStore, from: &Address, coin: &Coin) -> Result<(), LedgerError> {
        let current = Self::balance(store, from, &coin.denom)?;
        let next = current
            .checked_sub(coin.amount)
            .ok_or_else(|| LedgerError::InsufficientBalance {
                denom: coin.denom.clone(),
                required: coin.amount,
                available: current,
            })?;
        Self::write_balance(store, from, &coin.denom, next)
    }

    /// Move coins between accounts. Fails on the first insufficient leg;
    /// run inside a scope for atomicity across multiple coins.
    pub fn transfer(
        store: &mut MultiStore,
        from: &Address,
        to: &Address,
        coins: &[Coin],
    ) -> Result<(), LedgerError> {
        for coin in coins {
            if coin.amount == 0 {
                continue;
            }
            Self::burn(store, from, coin)?;
            Self::mint(store, to, coin)?;
        }
        Ok(())
    }
}
