//! # Multi-Hop Route Search
//!
//! Bounded-depth search over the token graph for the output-maximizing
//! path. The graph is rebuilt from the pool set whenever a pool is created
//! (dirty flag) and cached in state. Determinism: adjacency lists are
//! sorted by pool id, candidate paths are compared by output first and by
//! pool-id sequence on ties.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use shared_types::Denom;

use super::amm;
use crate::domain::entities::Pool;

/// Hard bound on route length.
pub const MAX_HOPS: usize = 4;

/// Adjacency of the pool set: token → sorted `(peer token, pool id)` edges.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenGraph {
    pub adjacency: BTreeMap<Denom, Vec<(Denom, u64)>>,
}

impl TokenGraph {
    pub fn from_pools<'a>(pools: impl Iterator<Item = &'a Pool>) -> Self {
        let mut adjacency: BTreeMap<Denom, Vec<(Denom, u64)>> = BTreeMap::new();
        for pool in pools {
            adjacency
                .entry(pool.token_a.clone())
                .or_default()
                .push((pool.token_b.clone(), pool.id));
            adjacency
                .entry(pool.token_b.clone())
                .or_default()
                .push((pool.token_a.clone(), pool.id));
        }
        for edges in adjacency.values_mut() {
            edges.sort_by_key(|(_, id)| *id);
        }
        Self { adjacency }
    }

    fn neighbors(&self, token: &Denom) -> &[(Denom, u64)] {
        self.adjacency.get(token).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// One hop of a simulated route.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteHop {
    pub pool_id: u64,
    pub token_in: Denom,
    pub token_out: Denom,
    pub amount_in: u128,
    pub amount_out: u128,
}

/// Best route found, with the simulated per-hop amounts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub hops: Vec<RouteHop>,
    pub amount_out: u128,
}

/// Exhaustive bounded-depth search. Pools are read-only here; the caller
/// simulates execution against live state before committing to a route.
pub fn find_best_route(
    graph: &TokenGraph,
    pools: &BTreeMap<u64, Pool>,
    token_in: &Denom,
    token_out: &Denom,
    amount_in: u128,
) -> Option<Route> {
    if token_in == token_out || amount_in == 0 {
        return None;
    }
    let mut best: Option<Route> = None;
    let mut path: Vec<RouteHop> = Vec::new();
    let mut visited = vec![token_in.clone()];
    search(
        graph,
        pools,
        token_in,
        token_out,
        amount_in,
        &mut path,
        &mut visited,
        &mut best,
    );
    best
}

#[allow(clippy::too_many_arguments)]
fn search(
    graph: &TokenGraph,
    pools: &BTreeMap<u64, Pool>,
    current: &Denom,
    target: &Denom,
    amount: u128,
    path: &mut Vec<RouteHop>,
    visited: &mut Vec<Denom>,
    best: &mut Option<Route>,
) {
    if path.len() >= MAX_HOPS || amount == 0 {
        return;
    }
    for (peer, pool_id) in graph.neighbors(current) {
        if visited.contains(peer) {
            continue;
        }
        let Some(pool) = pools.get(pool_id) else {
            continue;
        };
        let (reserve_in, reserve_out) = if *current == pool.token_a {
            (pool.reserve_a, pool.reserve_b)
        } else {
            (pool.reserve_b, pool.reserve_a)
        };
        let out = amm::swap_output(reserve_in, reserve_out, amount, pool.swap_fee_bps);
        if out == 0 {
            continue;
        }
        path.push(RouteHop {
            pool_id: *pool_id,
            token_in: current.clone(),
            token_out: peer.clone(),
            amount_in: amount,
            amount_out: out,
        });
        if peer == target {
            consider(best, path, out);
        } else {
            visited.push(peer.clone());
            search(graph, pools, peer, target, out, path, visited, best);
            visited.pop();
        }
        path.pop();
    }
}

/// Keep the higher output; break ties toward the lower pool-id sequence.
fn consider(best: &mut Option<Route>, path: &[RouteHop], out: u128) {
    let candidate_ids: Vec<u64> = path.iter().map(|h| h.pool_id).collect();
    let replace = match best {
        None => true,
        Some(b) => {
            let best_ids: Vec<u64> = b.hops.iter().map(|h| h.pool_id).collect();
            out > b.amount_out || (out == b.amount_out && candidate_ids < best_ids)
        }
    };
    if replace {
        *best = Some(Route {
            hops: path.to_vec(),
            amount_out: out,
        });
    }
}
