//! DEX event kinds.

pub const POOL_CREATED: &str = "pool_created";
pub const LIQUIDITY_ADDED: &str = "liquidity_added";
pub const LIQUIDITY_REMOVED: &str = "liquidity_removed";
pub const SWAP: &str = "swap";
pub const ORDER_PLACED: &str = "order_placed";
pub const ORDER_FILLED: &str = "order_filled";
pub const ORDER_CANCELLED: &str = "order_cancelled";
pub const ORDER_ARCHIVED: &str = "order_archived";
pub const SWAP_COMMITTED: &str = "swap_committed";
pub const SWAP_REVEALED: &str = "swap_revealed";
pub const COMMITMENT_CANCELLED: &str = "commitment_cancelled";
pub const COMMITMENT_EXPIRED: &str = "commitment_expired";
pub const BREAKER_TRIPPED: &str = "circuit_breaker_tripped";
pub const BREAKER_RECOVERED: &str = "circuit_breaker_recovered";
