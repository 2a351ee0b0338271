//! # DEX Entities
//!
//! Persisted state of the exchange. Prices are micro-units of the quote
//! token per whole base token (`price_micro = quote * 1_000_000 / base`);
//! pools store denominations sorted so `token_a < token_b` and quote all
//! prices as `token_b` per `token_a`.

use serde::{Deserialize, Serialize};
use shared_types::{Address, Denom};

/// Price scaling factor: one million micro-units per unit.
pub const PRICE_SCALE: u128 = 1_000_000;

/// Number of samples kept in a pool's TWAP ring.
pub const TWAP_CAPACITY: usize = 64;

/// A constant-product liquidity pool.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool {
    pub id: u64,
    /// Lexicographically smaller denomination.
    pub token_a: Denom,
    pub token_b: Denom,
    pub reserve_a: u128,
    pub reserve_b: u128,
    /// Total liquidity shares, including the permanently locked minimum.
    pub total_shares: u128,
    /// Swap fee in basis points (30 = 0.30%).
    pub swap_fee_bps: u32,
    pub created_height: u64,
}

impl Pool {
    /// Spot price in micro `token_b` per `token_a`. Zero reserves price as
    /// zero rather than dividing by zero; callers treat that as unusable.
    pub fn spot_price_micro(&self) -> u128 {
        if self.reserve_a == 0 {
            return 0;
        }
        self.reserve_b.saturating_mul(PRICE_SCALE) / self.reserve_a
    }

    /// Reserve of the given denomination, if it belongs to this pool.
    pub fn reserve_of(&self, denom: &Denom) -> Option<u128> {
        if *denom == self.token_a {
            Some(self.reserve_a)
        } else if *denom == self.token_b {
            Some(self.reserve_b)
        } else {
            None
        }
    }

    /// The opposite denomination of `denom` within the pair.
    pub fn other_side(&self, denom: &Denom) -> Option<&Denom> {
        if *denom == self.token_a {
            Some(&self.token_b)
        } else if *denom == self.token_b {
            Some(&self.token_a)
        } else {
            None
        }
    }
}

/// One provider's stake in a pool.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidityShare {
    pub pool_id: u64,
    pub owner: Address,
    pub shares: u128,
    /// Height of the owner's last liquidity action (flash-loan guard input).
    pub last_action_height: u64,
}

/// Pending commit–reveal swap.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapCommitment {
    pub trader: Address,
    pub commit_hash: [u8; 32],
    pub pool_id: u64,
    /// Upper bound on the input the reveal may disclose.
    pub amount_in_bound: u128,
    pub deposit: u128,
    pub created_height: u64,
    pub expiry_height: u64,
}

/// Limit order direction, named from the perspective of `token_a`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderDirection {
    /// Sell `token_a` for `token_b`; executes when the pool pays at least
    /// the limit price.
    SellBase,
    /// Buy `token_a` with `token_b`; executes when the pool charges at most
    /// the limit price.
    BuyBase,
}

impl OrderDirection {
    pub const fn as_byte(self) -> u8 {
        match self {
            OrderDirection::SellBase => 0,
            OrderDirection::BuyBase => 1,
        }
    }

    /// Book rank so an ascending key scan sees the best price first:
    /// lowest ask for sells, highest bid for buys.
    pub const fn price_rank(self, price_micro: u128) -> u128 {
        match self {
            OrderDirection::SellBase => price_micro,
            OrderDirection::BuyBase => u128::MAX - price_micro,
        }
    }
}

/// A resting limit order. Funds are escrowed with the module on placement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitOrder {
    pub id: u64,
    pub owner: Address,
    pub pool_id: u64,
    pub direction: OrderDirection,
    /// Escrowed input amount (token_a for sells, token_b for buys).
    pub amount_in: u128,
    /// Limit in micro token_b per token_a.
    pub price_micro: u128,
    pub created_height: u64,
    pub expiry_height: u64,
}

/// Terminal state of an archived order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArchiveReason {
    Expired,
    Cancelled,
    Filled,
}

/// Archived order retained for the configured retention window.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchivedOrder {
    pub order: LimitOrder,
    pub reason: ArchiveReason,
    pub archived_height: u64,
    /// Output delivered, for filled orders.
    pub amount_out: u128,
}

/// Why a circuit breaker tripped.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BreakerReason {
    PriceDeviation { deviation_bps: u32 },
    InvariantViolation { detail: String },
    Governance,
    RepeatedFailures,
}

/// Per-pool or global circuit breaker record. Present = tripped.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitBreaker {
    pub reason: BreakerReason,
    pub tripped_height: u64,
    pub tripped_time_unix: u64,
    /// Block time at which the breaker may auto-recover.
    pub recover_at_unix: u64,
}

/// Circular buffer of `(height, price_micro)` samples.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TwapBuffer {
    pub samples: Vec<(u64, u128)>,
    /// Index of the slot the next sample overwrites once full.
    pub next: usize,
}

impl TwapBuffer {
    pub fn record(&mut self, height: u64, price_micro: u128) {
        if self.samples.len() < TWAP_CAPACITY {
            self.samples.push((height, price_micro));
        } else {
            self.samples[self.next] = (height, price_micro);
        }
        self.next = (self.next + 1) % TWAP_CAPACITY;
    }

    /// Height of the most recent sample.
    pub fn latest_height(&self) -> Option<u64> {
        self.samples.iter().map(|(h, _)| *h).max()
    }

    /// Block-weighted average price over samples within `window` blocks of
    /// `now`. Each sample is weighted by the span until the next sample.
    pub fn average(&self, now: u64, window: u64) -> Option<u128> {
        let from = now.saturating_sub(window);
        let mut pts: Vec<(u64, u128)> = self
            .samples
            .iter()
            .copied()
            .filter(|(h, _)| *h >= from && *h <= now)
            .collect();
        if pts.is_empty() {
            return None;
        }
        pts.sort_unstable();
        let mut weighted: u128 = 0;
        let mut total: u128 = 0;
        for (i, (h, p)) in pts.iter().enumerate() {
            let until = pts.get(i + 1).map(|(nh, _)| *nh).unwrap_or(now + 1);
            let span = (until - h).max(1) as u128;
            weighted = weighted.saturating_add(p.saturating_mul(span));
            total = total.saturating_add(span);
        }
        Some(weighted / total)
    }
}
