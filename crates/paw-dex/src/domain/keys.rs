//! # DEX Key Layout
//!
//! Every key starts with the DEX namespace byte followed by a sub-prefix
//! identifying the entity family. Binary-lexicographic ordering of the
//! encoded keys gives the range scans the engine relies on: order books
//! walk best price first, expiry indexes walk oldest first.
//!
//! Sub-prefixes `0x7E`/`0x7F` are reserved by the IBC ingress guard.

use shared_types::{Address, Module};

pub const NS: u8 = 0x02; // Module::Dex.namespace()

pub const SUB_PARAMS: u8 = 0x01;
pub const SUB_POOL: u8 = 0x02;
pub const SUB_POOL_BY_PAIR: u8 = 0x03;
pub const SUB_POOL_SEQ: u8 = 0x04;
pub const SUB_SHARE: u8 = 0x05;
pub const SUB_COMMIT: u8 = 0x06;
pub const SUB_COMMIT_EXPIRY: u8 = 0x07;
pub const SUB_ORDER: u8 = 0x08;
pub const SUB_ORDER_BOOK: u8 = 0x09;
pub const SUB_ORDER_EXPIRY: u8 = 0x0A;
pub const SUB_ORDER_ARCHIVE: u8 = 0x0B;
pub const SUB_ORDER_SEQ: u8 = 0x0C;
pub const SUB_BREAKER: u8 = 0x0D;
pub const SUB_RATE: u8 = 0x0E;
pub const SUB_RATE_INDEX: u8 = 0x0F;
pub const SUB_LOCK: u8 = 0x10;
pub const SUB_TWAP: u8 = 0x11;
pub const SUB_PROTOCOL_FEE: u8 = 0x12;
pub const SUB_ROUTE_GRAPH: u8 = 0x13;
pub const SUB_ROUTE_DIRTY: u8 = 0x14;
pub const SUB_REFERENCE_PRICE: u8 = 0x15;

fn addr_pfx(k: &mut Vec<u8>, addr: &Address) {
    k.push(addr.as_bytes().len() as u8);
    k.extend_from_slice(addr.as_bytes());
}

pub fn params_key() -> Vec<u8> {
    vec![NS, SUB_PARAMS]
}

pub fn pool_key(pool_id: u64) -> Vec<u8> {
    let mut k = vec![NS, SUB_POOL];
    k.extend_from_slice(&pool_id.to_be_bytes());
    k
}

pub fn pool_prefix() -> Vec<u8> {
    vec![NS, SUB_POOL]
}

/// Pair index: denoms are stored sorted, so either order resolves.
pub fn pool_by_pair_key(token_a: &str, token_b: &str) -> Vec<u8> {
    let (first, second) = if token_a <= token_b {
        (token_a, token_b)
    } else {
        (token_b, token_a)
    };
    let mut k = vec![NS, SUB_POOL_BY_PAIR];
    k.push(first.len() as u8);
    k.extend_from_slice(first.as_bytes());
    k.extend_from_slice(second.as_bytes());
    k
}

pub fn pool_seq_key() -> Vec<u8> {
    vec![NS, SUB_POOL_SEQ]
}

pub fn share_key(pool_id: u64, addr: &Address) -> Vec<u8> {
    let mut k = vec![NS, SUB_SHARE];
    k.extend_from_slice(&pool_id.to_be_bytes());
    addr_pfx(&mut k, addr);
    k
}

pub fn share_prefix(pool_id: u64) -> Vec<u8> {
    let mut k = vec![NS, SUB_SHARE];
    k.extend_from_slice(&pool_id.to_be_bytes());
    k
}

pub fn commit_key(trader: &Address, hash: &[u8; 32]) -> Vec<u8> {
    let mut k = vec![NS, SUB_COMMIT];
    addr_pfx(&mut k, trader);
    k.extend_from_slice(hash);
    k
}

pub fn commit_expiry_key(expiry_height: u64, trader: &Address, hash: &[u8; 32]) -> Vec<u8> {
    let mut k = vec![NS, SUB_COMMIT_EXPIRY];
    k.extend_from_slice(&expiry_height.to_be_bytes());
    addr_pfx(&mut k, trader);
    k.extend_from_slice(hash);
    k
}

pub fn commit_expiry_prefix() -> Vec<u8> {
    vec![NS, SUB_COMMIT_EXPIRY]
}

/// Expiry index scan bound: everything expiring at or before `height`.
pub fn commit_expiry_end(height: u64) -> Vec<u8> {
    let mut k = vec![NS, SUB_COMMIT_EXPIRY];
    k.extend_from_slice(&(height + 1).to_be_bytes());
    k
}

pub fn order_key(order_id: u64) -> Vec<u8> {
    let mut k = vec![NS, SUB_ORDER];
    k.extend_from_slice(&order_id.to_be_bytes());
    k
}

pub fn order_seq_key() -> Vec<u8> {
    vec![NS, SUB_ORDER_SEQ]
}

/// Book key ordered so that an ascending scan visits the best price first:
/// sell side ascending by price, buy side by inverted price.
pub fn order_book_key(pool_id: u64, direction: u8, price_rank: u128, order_id: u64) -> Vec<u8> {
    let mut k = vec![NS, SUB_ORDER_BOOK];
    k.extend_from_slice(&pool_id.to_be_bytes());
    k.push(direction);
    k.extend_from_slice(&price_rank.to_be_bytes());
    k.extend_from_slice(&order_id.to_be_bytes());
    k
}

pub fn order_book_prefix(pool_id: u64, direction: u8) -> Vec<u8> {
    let mut k = vec![NS, SUB_ORDER_BOOK];
    k.extend_from_slice(&pool_id.to_be_bytes());
    k.push(direction);
    k
}

pub fn order_expiry_key(expiry_height: u64, order_id: u64) -> Vec<u8> {
    let mut k = vec![NS, SUB_ORDER_EXPIRY];
    k.extend_from_slice(&expiry_height.to_be_bytes());
    k.extend_from_slice(&order_id.to_be_bytes());
    k
}

pub fn order_expiry_prefix() -> Vec<u8> {
    vec![NS, SUB_ORDER_EXPIRY]
}

pub fn order_expiry_end(height: u64) -> Vec<u8> {
    let mut k = vec![NS, SUB_ORDER_EXPIRY];
    k.extend_from_slice(&(height + 1).to_be_bytes());
    k
}

/// Archive keyed by archival height for retention pruning.
pub fn order_archive_key(archived_height: u64, order_id: u64) -> Vec<u8> {
    let mut k = vec![NS, SUB_ORDER_ARCHIVE];
    k.extend_from_slice(&archived_height.to_be_bytes());
    k.extend_from_slice(&order_id.to_be_bytes());
    k
}

pub fn order_archive_prefix() -> Vec<u8> {
    vec![NS, SUB_ORDER_ARCHIVE]
}

pub fn order_archive_end(height: u64) -> Vec<u8> {
    let mut k = vec![NS, SUB_ORDER_ARCHIVE];
    k.extend_from_slice(&(height + 1).to_be_bytes());
    k
}

/// Breaker scope: global or per pool.
pub fn breaker_key(pool_id: Option<u64>) -> Vec<u8> {
    let mut k = vec![NS, SUB_BREAKER];
    match pool_id {
        None => k.push(0x00),
        Some(id) => {
            k.push(0x01);
            k.extend_from_slice(&id.to_be_bytes());
        }
    }
    k
}

pub fn rate_key(caller: &Address, window_start: u64) -> Vec<u8> {
    let mut k = vec![NS, SUB_RATE];
    addr_pfx(&mut k, caller);
    k.extend_from_slice(&window_start.to_be_bytes());
    k
}

pub fn rate_index_key(window_start: u64, caller: &Address) -> Vec<u8> {
    let mut k = vec![NS, SUB_RATE_INDEX];
    k.extend_from_slice(&window_start.to_be_bytes());
    addr_pfx(&mut k, caller);
    k
}

pub fn rate_index_prefix() -> Vec<u8> {
    vec![NS, SUB_RATE_INDEX]
}

pub fn rate_index_end(window_start: u64) -> Vec<u8> {
    let mut k = vec![NS, SUB_RATE_INDEX];
    k.extend_from_slice(&window_start.to_be_bytes());
    k
}

pub fn lock_key(pool_id: u64) -> Vec<u8> {
    let mut k = vec![NS, SUB_LOCK];
    k.extend_from_slice(&pool_id.to_be_bytes());
    k
}

pub fn twap_key(pool_id: u64) -> Vec<u8> {
    let mut k = vec![NS, SUB_TWAP];
    k.extend_from_slice(&pool_id.to_be_bytes());
    k
}

pub fn protocol_fee_key(denom: &str) -> Vec<u8> {
    let mut k = vec![NS, SUB_PROTOCOL_FEE];
    k.extend_from_slice(denom.as_bytes());
    k
}

pub fn protocol_fee_prefix() -> Vec<u8> {
    vec![NS, SUB_PROTOCOL_FEE]
}

pub fn route_graph_key() -> Vec<u8> {
    vec![NS, SUB_ROUTE_GRAPH]
}

pub fn route_dirty_key() -> Vec<u8> {
    vec![NS, SUB_ROUTE_DIRTY]
}

/// Latest oracle-published price recorded for a DEX-side sanity reference.
pub fn reference_price_key(asset: &str) -> Vec<u8> {
    let mut k = vec![NS, SUB_REFERENCE_PRICE];
    k.extend_from_slice(asset.as_bytes());
    k
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespace_byte_matches_module() {
        assert_eq!(NS, Module::Dex.namespace());
    }

    #[test]
    fn test_pair_key_order_independent() {
        assert_eq!(
            pool_by_pair_key("upaw", "uusdt"),
            pool_by_pair_key("uusdt", "upaw")
        );
    }

    #[test]
    fn test_expiry_index_orders_by_height() {
        let a = order_expiry_key(10, 99);
        let b = order_expiry_key(11, 1);
        assert!(a < b);
    }

    #[test]
    fn test_book_key_orders_by_rank_then_id() {
        let best = order_book_key(1, 0, 100, 7);
        let worse = order_book_key(1, 0, 101, 2);
        assert!(best < worse);
        let same_rank_lower_id = order_book_key(1, 0, 100, 2);
        assert!(same_rank_lower_id < best);
    }
}
