//! # Versioned Merkle Tree
//!
//! A path-copying, self-balancing (AVL) ordered tree keyed by full binary
//! keys. Every committed block produces an immutable version; unchanged
//! subtrees are shared between versions because nodes are addressed by
//! hash in the backend.
//!
//! ## Invariants
//!
//! - Deterministic root: the same sorted write set applied to the same
//!   parent version yields the same root hash on every node.
//! - Immutable versions: a committed version is never mutated, only pruned.
//! - Balance: sibling subtree heights differ by at most one.
//!
//! ## Pruning
//!
//! Versions older than `keep_recent` are dropped except every
//! `keep_every`-th (retained for state-sync snapshots). A mark-and-sweep
//! from the retained roots reclaims unreachable nodes.

use std::collections::{BTreeMap, HashSet};
use std::num::NonZeroUsize;

use lru::LruCache;
use parking_lot::Mutex;

use super::node::{empty_root, Hash, Node};
use super::StoreError;
use crate::ports::NodeBackend;

/// Decoded-node cache size. Nodes are immutable, so the cache never needs
/// invalidation beyond the pruning sweep.
const NODE_CACHE_CAPACITY: usize = 16_384;

/// Versioned tree over a pluggable node backend.
pub struct VersionedTree {
    backend: Box<dyn NodeBackend>,
    cache: Mutex<LruCache<Hash, Node>>,
    /// Committed version → root (None = empty tree).
    versions: BTreeMap<u64, Option<Hash>>,
    latest: u64,
    keep_recent: u64,
    keep_every: u64,
}

impl VersionedTree {
    /// Open a tree over `backend`, resuming from any committed roots.
    pub fn open(
        backend: Box<dyn NodeBackend>,
        keep_recent: u64,
        keep_every: u64,
    ) -> Result<Self, StoreError> {
        let mut versions = BTreeMap::new();
        for v in backend.root_versions()? {
            if let Some(root) = backend.get_root(v)? {
                versions.insert(v, root);
            }
        }
        let latest = versions.keys().max().copied().unwrap_or(0);
        Ok(Self {
            backend,
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(NODE_CACHE_CAPACITY).expect("nonzero capacity"),
            )),
            versions,
            latest,
            keep_recent: keep_recent.max(1),
            keep_every,
        })
    }

    pub fn latest_version(&self) -> u64 {
        self.latest
    }

    /// Root hash for a committed version.
    pub fn root_hash(&self, version: u64) -> Result<Hash, StoreError> {
        match self.versions.get(&version) {
            Some(Some(h)) => Ok(*h),
            Some(None) => Ok(empty_root()),
            None => Err(StoreError::VersionNotFound {
                version,
                latest: self.latest,
            }),
        }
    }

    fn root(&self, version: u64) -> Result<Option<Hash>, StoreError> {
        if version == 0 {
            return Ok(None);
        }
        self.versions
            .get(&version)
            .copied()
            .ok_or(StoreError::VersionNotFound {
                version,
                latest: self.latest,
            })
    }

    /// Point lookup at a committed version.
    pub fn get(&self, version: u64, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        let Some(root) = self.root(version)? else {
            return Ok(None);
        };
        let mut cur = root;
        loop {
            match self.node(&cur)? {
                Node::Leaf { key: lk, value, .. } => {
                    return Ok((lk.as_slice() == key).then_some(value));
                }
                Node::Inner {
                    key: ik,
                    left,
                    right,
                    ..
                } => {
                    cur = if key < ik.as_slice() { left } else { right };
                }
            }
        }
    }

    /// Collect `[start, end)` at a committed version, ascending by key.
    /// `end = None` means unbounded.
    pub fn range(
        &self,
        version: u64,
        start: &[u8],
        end: Option<&[u8]>,
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        let mut out = Vec::new();
        if let Some(root) = self.root(version)? {
            self.collect_range(root, start, end, &mut out)?;
        }
        Ok(out)
    }

    fn collect_range(
        &self,
        h: Hash,
        start: &[u8],
        end: Option<&[u8]>,
        out: &mut Vec<(Vec<u8>, Vec<u8>)>,
    ) -> Result<(), StoreError> {
        match self.node(&h)? {
            Node::Leaf { key, value, .. } => {
                let in_range =
                    key.as_slice() >= start && end.map_or(true, |e| key.as_slice() < e);
                if in_range {
                    out.push((key, value));
                }
            }
            Node::Inner {
                key: ik,
                left,
                right,
                ..
            } => {
                if start < ik.as_slice() {
                    self.collect_range(left, start, end, out)?;
                }
                if end.map_or(true, |e| e > ik.as_slice()) {
                    self.collect_range(right, start, end, out)?;
                }
            }
        }
        Ok(())
    }

    /// Apply one block's write set (sorted by key, `None` = delete) on top
    /// of the latest version and commit the next version.
    pub fn apply(
        &mut self,
        writes: &BTreeMap<Vec<u8>, Option<Vec<u8>>>,
    ) -> Result<(u64, Hash), StoreError> {
        let version = self.latest + 1;
        let mut root = self.root(self.latest)?;
        for (key, value) in writes {
            root = match value {
                Some(v) => Some(match root {
                    None => self.save(Node::Leaf {
                        key: key.clone(),
                        value: v.clone(),
                        version,
                    })?,
                    Some(r) => self.insert_at(r, key, v, version)?,
                }),
                None => match root {
                    None => None,
                    Some(r) => self.remove_at(r, key, version)?.0,
                },
            };
        }
        self.backend.put_root(version, root)?;
        self.versions.insert(version, root);
        self.latest = version;
        Ok((version, root.map_or_else(empty_root, |h| h)))
    }

    fn insert_at(
        &mut self,
        h: Hash,
        key: &[u8],
        value: &[u8],
        version: u64,
    ) -> Result<Hash, StoreError> {
        match self.node(&h)? {
            Node::Leaf { key: lk, .. } => {
                if lk.as_slice() == key {
                    self.save(Node::Leaf {
                        key: lk,
                        value: value.to_vec(),
                        version,
                    })
                } else {
                    let new = self.save(Node::Leaf {
                        key: key.to_vec(),
                        value: value.to_vec(),
                        version,
                    })?;
                    let (left, right, split) = if key < lk.as_slice() {
                        (new, h, lk)
                    } else {
                        (h, new, key.to_vec())
                    };
                    self.join(split, left, right, version)
                }
            }
            Node::Inner {
                key: ik,
                left,
                right,
                ..
            } => {
                let joined = if key < ik.as_slice() {
                    let nl = self.insert_at(left, key, value, version)?;
                    self.join(ik, nl, right, version)?
                } else {
                    let nr = self.insert_at(right, key, value, version)?;
                    self.join(ik, left, nr, version)?
                };
                self.rebalance(joined, version)
            }
        }
    }

    /// Returns the replacement root (None if the subtree emptied) and
    /// whether the key existed.
    fn remove_at(
        &mut self,
        h: Hash,
        key: &[u8],
        version: u64,
    ) -> Result<(Option<Hash>, bool), StoreError> {
        match self.node(&h)? {
            Node::Leaf { key: lk, .. } => {
                if lk.as_slice() == key {
                    Ok((None, true))
                } else {
                    Ok((Some(h), false))
                }
            }
            Node::Inner {
                key: ik,
                left,
                right,
                ..
            } => {
                if key < ik.as_slice() {
                    let (nl, removed) = self.remove_at(left, key, version)?;
                    if !removed {
                        return Ok((Some(h), false));
                    }
                    match nl {
                        None => Ok((Some(right), true)),
                        Some(nl) => {
                            let joined = self.join(ik, nl, right, version)?;
                            Ok((Some(self.rebalance(joined, version)?), true))
                        }
                    }
                } else {
                    let (nr, removed) = self.remove_at(right, key, version)?;
                    if !removed {
                        return Ok((Some(h), false));
                    }
                    match nr {
                        None => Ok((Some(left), true)),
                        Some(nr) => {
                            let joined = self.join(ik, left, nr, version)?;
                            Ok((Some(self.rebalance(joined, version)?), true))
                        }
                    }
                }
            }
        }
    }

    /// Build and save an inner node from two child hashes.
    fn join(
        &mut self,
        split: Vec<u8>,
        left: Hash,
        right: Hash,
        version: u64,
    ) -> Result<Hash, StoreError> {
        let l = self.node(&left)?;
        let r = self.node(&right)?;
        self.save(Node::Inner {
            key: split,
            height: 1 + l.height().max(r.height()),
            size: l.size() + r.size(),
            version,
            left,
            right,
        })
    }

    /// Restore the AVL balance invariant at `h` after one insert/remove.
    fn rebalance(&mut self, h: Hash, version: u64) -> Result<Hash, StoreError> {
        let Node::Inner {
            key,
            left,
            right,
            ..
        } = self.node(&h)?
        else {
            return Ok(h);
        };
        let lh = self.node(&left)?.height() as i32;
        let rh = self.node(&right)?.height() as i32;
        let bf = lh - rh;
        if bf > 1 {
            let Node::Inner {
                key: lk,
                left: ll,
                right: lr,
                ..
            } = self.node(&left)?
            else {
                return Err(StoreError::Backend(
                    "rebalance: left-heavy node with leaf child".into(),
                ));
            };
            let lbf = self.node(&ll)?.height() as i32 - self.node(&lr)?.height() as i32;
            if lbf >= 0 {
                // Single right rotation.
                let new_right = self.join(key, lr, right, version)?;
                self.join(lk, ll, new_right, version)
            } else {
                // Left-right double rotation.
                let Node::Inner {
                    key: lrk,
                    left: lrl,
                    right: lrr,
                    ..
                } = self.node(&lr)?
                else {
                    return Err(StoreError::Backend(
                        "rebalance: malformed left-right subtree".into(),
                    ));
                };
                let new_left = self.join(lk, ll, lrl, version)?;
                let new_right = self.join(key, lrr, right, version)?;
                self.join(lrk, new_left, new_right, version)
            }
        } else if bf < -1 {
            let Node::Inner {
                key: rk,
                left: rl,
                right: rr,
                ..
            } = self.node(&right)?
            else {
                return Err(StoreError::Backend(
                    "rebalance: right-heavy node with leaf child".into(),
                ));
            };
            let rbf = self.node(&rl)?.height() as i32 - self.node(&rr)?.height() as i32;
            if rbf <= 0 {
                // Single left rotation.
                let new_left = self.join(key, left, rl, version)?;
                self.join(rk, new_left, rr, version)
            } else {
                // Right-left double rotation.
                let Node::Inner {
                    key: rlk,
                    left: rll,
                    right: rlr,
                    ..
                } = self.node(&rl)?
                else {
                    return Err(StoreError::Backend(
                        "rebalance: malformed right-left subtree".into(),
                    ));
                };
                let new_left = self.join(key, left, rll, version)?;
                let new_right = self.join(rk, rlr, rr, version)?;
                self.join(rlk, new_left, new_right, version)
            }
        } else {
            Ok(h)
        }
    }

    /// Drop prunable versions and sweep unreachable nodes.
    /// Returns the number of nodes reclaimed.
    pub fn prune(&mut self) -> Result<usize, StoreError> {
        if self.latest <= self.keep_recent {
            return Ok(0);
        }
        let cutoff = self.latest - self.keep_recent;
        let doomed: Vec<u64> = self
            .versions
            .keys()
            .copied()
            .filter(|v| *v <= cutoff && (self.keep_every == 0 || v % self.keep_every != 0))
            .collect();
        if doomed.is_empty() {
            return Ok(0);
        }
        for v in &doomed {
            self.versions.remove(v);
            self.backend.delete_root(*v)?;
        }
        let mut reachable = HashSet::new();
        let roots: Vec<Hash> = self.versions.values().filter_map(|r| *r).collect();
        for root in roots {
            self.mark(root, &mut reachable)?;
        }
        let mut swept = 0usize;
        for h in self.backend.node_hashes()? {
            if !reachable.contains(&h) {
                self.backend.delete_node(&h)?;
                self.cache.lock().pop(&h);
                swept += 1;
            }
        }
        tracing::debug!(
            versions_dropped = doomed.len(),
            nodes_swept = swept,
            latest = self.latest,
            "pruned store history"
        );
        Ok(swept)
    }

    fn mark(&self, h: Hash, seen: &mut HashSet<Hash>) -> Result<(), StoreError> {
        if !seen.insert(h) {
            return Ok(());
        }
        if let Node::Inner { left, right, .. } = self.node(&h)? {
            self.mark(left, seen)?;
            self.mark(right, seen)?;
        }
        Ok(())
    }

    fn node(&self, hash: &Hash) -> Result<Node, StoreError> {
        if let Some(n) = self.cache.lock().get(hash) {
            return Ok(n.clone());
        }
        let bytes = self
            .backend
            .get_node(hash)?
            .ok_or(StoreError::MissingNode { hash: *hash })?;
        let node: Node = bincode::deserialize(&bytes)
            .map_err(|e| StoreError::Backend(format!("node decode: {e}")))?;
        self.cache.lock().put(*hash, node.clone());
        Ok(node)
    }

    fn save(&mut self, node: Node) -> Result<Hash, StoreError> {
        let hash = node.hash();
        let bytes = bincode::serialize(&node)
            .map_err(|e| StoreError::Backend(format!("node encode: {e}")))?;
        self.backend.put_node(hash, bytes)?;
        self.cache.lock().put(hash, node);
        Ok(hash)
    }
}
