//! # Multi-Store
//!
//! The namespaced front door over the versioned tree. All handler reads and
//! writes go through here, which enforces two disciplines:
//!
//! - **Namespace isolation**: a key's first byte must match the module
//!   performing the access.
//! - **Scope atomicity**: writes buffer in nested overlay scopes; a scope
//!   either merges into its parent in full or is discarded in full.
//!
//! Range scans are materialized inside the call, so no iterator can outlive
//! a version or pin memory.

use std::collections::BTreeMap;

use shared_types::Module;

use super::node::Hash;
use super::tree::VersionedTree;
use super::StoreError;
use crate::adapters::MemoryDb;
use crate::ports::NodeBackend;

/// Store retention and pruning configuration.
#[derive(Clone, Copy, Debug)]
pub struct StoreConfig {
    /// Number of recent versions always retained.
    pub keep_recent: u64,
    /// Additionally retain every N-th version (0 disables).
    pub keep_every: u64,
    /// Run the pruning sweep every N commits (0 disables).
    pub prune_interval: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            keep_recent: 100,
            keep_every: 500,
            prune_interval: 100,
        }
    }
}

type Overlay = BTreeMap<Vec<u8>, Option<Vec<u8>>>;

/// Namespaced, versioned store with nested atomic scopes.
pub struct MultiStore {
    tree: VersionedTree,
    /// Block-level working set (scope depth zero).
    dirty: Overlay,
    /// Nested cache scopes, innermost last.
    scopes: Vec<Overlay>,
    config: StoreConfig,
}

impl MultiStore {
    /// In-memory store with default configuration. The standard choice for
    /// tests and tooling.
    pub fn in_memory() -> Self {
        Self::open(Box::new(MemoryDb::new()), StoreConfig::default())
            .expect("memory backend cannot fail to open")
    }

    /// Open over an arbitrary backend.
    pub fn open(backend: Box<dyn NodeBackend>, config: StoreConfig) -> Result<Self, StoreError> {
        let tree = VersionedTree::open(backend, config.keep_recent, config.keep_every)?;
        Ok(Self {
            tree,
            dirty: Overlay::new(),
            scopes: Vec::new(),
            config,
        })
    }

    fn check_key(module: Module, key: &[u8]) -> Result<(), StoreError> {
        match key.first() {
            None => Err(StoreError::EmptyKey),
            Some(&b) if b == module.namespace() => Ok(()),
            Some(_) => Err(StoreError::NamespaceViolation {
                module,
                key: key.to_vec(),
            }),
        }
    }

    /// Read a key, seeing all uncommitted writes in scope order.
    pub fn get(&self, module: Module, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        Self::check_key(module, key)?;
        for scope in self.scopes.iter().rev() {
            if let Some(entry) = scope.get(key) {
                return Ok(entry.clone());
            }
        }
        if let Some(entry) = self.dirty.get(key) {
            return Ok(entry.clone());
        }
        self.tree.get(self.tree.latest_version(), key)
    }

    /// Buffer a write in the innermost scope.
    pub fn set(&mut self, module: Module, key: Vec<u8>, value: Vec<u8>) -> Result<(), StoreError> {
        Self::check_key(module, &key)?;
        self.top_overlay().insert(key, Some(value));
        Ok(())
    }

    /// Buffer a deletion in the innermost scope.
    pub fn delete(&mut self, module: Module, key: Vec<u8>) -> Result<(), StoreError> {
        Self::check_key(module, &key)?;
        self.top_overlay().insert(key, None);
        Ok(())
    }

    fn top_overlay(&mut self) -> &mut Overlay {
        self.scopes.last_mut().unwrap_or(&mut self.dirty)
    }

    /// Materialized ascending scan of all keys starting with `prefix`.
    pub fn range(
        &self,
        module: Module,
        prefix: &[u8],
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        let end = prefix_successor(prefix);
        self.range_between(module, prefix, end.as_deref())
    }

    /// Materialized ascending scan of `[start, end)`.
    pub fn range_between(
        &self,
        module: Module,
        start: &[u8],
        end: Option<&[u8]>,
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        Self::check_key(module, start)?;
        if let Some(end) = end {
            Self::check_key(module, end)?;
        }
        let mut merged: BTreeMap<Vec<u8>, Option<Vec<u8>>> = self
            .tree
            .range(self.tree.latest_version(), start, end)?
            .into_iter()
            .map(|(k, v)| (k, Some(v)))
            .collect();
        let in_range = |k: &[u8]| k >= start && end.map_or(true, |e| k < e);
        for (k, v) in self.dirty.iter().filter(|(k, _)| in_range(k)) {
            merged.insert(k.clone(), v.clone());
        }
        for scope in &self.scopes {
            for (k, v) in scope.iter().filter(|(k, _)| in_range(k)) {
                merged.insert(k.clone(), v.clone());
            }
        }
        Ok(merged
            .into_iter()
            .filter_map(|(k, v)| v.map(|v| (k, v)))
            .collect())
    }

    /// Open a nested cache scope.
    pub fn begin_scope(&mut self) {
        self.scopes.push(Overlay::new());
    }

    /// Merge the innermost scope into its parent.
    pub fn commit_scope(&mut self) -> Result<(), StoreError> {
        let scope = self.scopes.pop().ok_or(StoreError::NoOpenScope)?;
        let parent = self.top_overlay();
        for (k, v) in scope {
            parent.insert(k, v);
        }
        Ok(())
    }

    /// Drop the innermost scope and everything buffered in it.
    pub fn discard_scope(&mut self) -> Result<(), StoreError> {
        self.scopes.pop().map(|_| ()).ok_or(StoreError::NoOpenScope)
    }

    /// Run `f` inside a fresh scope: commit on `Ok`, discard on `Err`.
    pub fn with_scope<T, E: From<StoreError>>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, E>,
    ) -> Result<T, E> {
        self.begin_scope();
        match f(self) {
            Ok(v) => {
                self.commit_scope().map_err(E::from)?;
                Ok(v)
            }
            Err(e) => {
                self.discard_scope().map_err(E::from)?;
                Err(e)
            }
        }
    }

    pub fn scope_depth(&self) -> usize {
        self.scopes.len()
    }

    /// Commit the block's working set as the next version and return
    /// `(version, application hash)`. Open scopes are a fatal bug.
    pub fn commit_version(&mut self) -> Result<(u64, Hash), StoreError> {
        if !self.scopes.is_empty() {
            return Err(StoreError::OpenScopes {
                open: self.scopes.len(),
            });
        }
        let writes = std::mem::take(&mut self.dirty);
        let (version, root) = self.tree.apply(&writes)?;
        if self.config.prune_interval != 0 && version % self.config.prune_interval == 0 {
            self.tree.prune()?;
        }
        Ok((version, root))
    }

    pub fn latest_version(&self) -> u64 {
        self.tree.latest_version()
    }

    /// Application hash of a committed version.
    pub fn root_hash(&self, version: u64) -> Result<Hash, StoreError> {
        self.tree.root_hash(version)
    }

    /// Historical point read, bounded by the pruning window.
    pub fn get_at(
        &self,
        version: u64,
        module: Module,
        key: &[u8],
    ) -> Result<Option<Vec<u8>>, StoreError> {
        Self::check_key(module, key)?;
        self.tree.get(version, key)
    }
}

/// Smallest key strictly greater than every key with `prefix`.
fn prefix_successor(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.last_mut() {
        if *last == 0xFF {
            end.pop();
        } else {
            *last += 1;
            return Some(end);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(module: Module, rest: &[u8]) -> Vec<u8> {
        let mut k = vec![module.namespace()];
        k.extend_from_slice(rest);
        k
    }

    #[test]
    fn test_namespace_isolation() {
        let mut s = MultiStore::in_memory();
        let dex_key = key(Module::Dex, b"pool/1");
        assert!(matches!(
            s.set(Module::Oracle, dex_key.clone(), vec![1]),
            Err(StoreError::NamespaceViolation { .. })
        ));
        s.set(Module::Dex, dex_key.clone(), vec![1]).unwrap();
        assert!(matches!(
            s.get(Module::Oracle, &dex_key),
            Err(StoreError::NamespaceViolation { .. })
        ));
    }

    #[test]
    fn test_scope_commit_and_discard() {
        let mut s = MultiStore::in_memory();
        let k = key(Module::Dex, b"a");
        s.begin_scope();
        s.set(Module::Dex, k.clone(), vec![1]).unwrap();
        assert_eq!(s.get(Module::Dex, &k).unwrap(), Some(vec![1]));
        s.discard_scope().unwrap();
        assert_eq!(s.get(Module::Dex, &k).unwrap(), None);

        s.begin_scope();
        s.set(Module::Dex, k.clone(), vec![2]).unwrap();
        s.commit_scope().unwrap();
        assert_eq!(s.get(Module::Dex, &k).unwrap(), Some(vec![2]));
    }

    #[test]
    fn test_nested_scopes() {
        let mut s = MultiStore::in_memory();
        let k = key(Module::Dex, b"n");
        s.set(Module::Dex, k.clone(), vec![0]).unwrap();
        s.begin_scope();
        s.set(Module::Dex, k.clone(), vec![1]).unwrap();
        s.begin_scope();
        s.set(Module::Dex, k.clone(), vec![2]).unwrap();
        assert_eq!(s.get(Module::Dex, &k).unwrap(), Some(vec![2]));
        s.discard_scope().unwrap();
        // Inner discarded, outer scope's write survives.
        assert_eq!(s.get(Module::Dex, &k).unwrap(), Some(vec![1]));
        s.commit_scope().unwrap();
        assert_eq!(s.get(Module::Dex, &k).unwrap(), Some(vec![1]));
    }

    #[test]
    fn test_with_scope_rolls_back_on_error() {
        let mut s = MultiStore::in_memory();
        let k = key(Module::Dex, b"w");
        let r: Result<(), StoreError> = s.with_scope(|s| {
            s.set(Module::Dex, k.clone(), vec![9])?;
            Err(StoreError::EmptyKey)
        });
        assert!(r.is_err());
        assert_eq!(s.get(Module::Dex, &k).unwrap(), None);
        assert_eq!(s.scope_depth(), 0);
    }

    #[test]
    fn test_commit_version_rejects_open_scopes() {
        let mut s = MultiStore::in_memory();
        s.begin_scope();
        assert!(matches!(
            s.commit_version(),
            Err(StoreError::OpenScopes { open: 1 })
        ));
    }

    #[test]
    fn test_commit_version_and_history() {
        let mut s = MultiStore::in_memory();
        let k = key(Module::Oracle, b"price/btc");
        s.set(Module::Oracle, k.clone(), vec![1]).unwrap();
        let (v1, h1) = s.commit_version().unwrap();
        s.set(Module::Oracle, k.clone(), vec![2]).unwrap();
        let (v2, h2) = s.commit_version().unwrap();
        assert_eq!((v1, v2), (1, 2));
        assert_ne!(h1, h2);
        assert_eq!(s.get_at(1, Module::Oracle, &k).unwrap(), Some(vec![1]));
        assert_eq!(s.get_at(2, Module::Oracle, &k).unwrap(), Some(vec![2]));
    }

    #[test]
    fn test_range_sees_pending_writes_and_tombstones() {
        let mut s = MultiStore::in_memory();
        for i in 0u8..4 {
            s.set(Module::Dex, key(Module::Dex, &[0x10, i]), vec![i])
                .unwrap();
        }
        s.commit_version().unwrap();
        s.delete(Module::Dex, key(Module::Dex, &[0x10, 1])).unwrap();
        s.begin_scope();
        s.set(Module::Dex, key(Module::Dex, &[0x10, 9]), vec![9])
            .unwrap();
        let got = s.range(Module::Dex, &key(Module::Dex, &[0x10])).unwrap();
        let suffixes: Vec<u8> = got.iter().map(|(k, _)| k[2]).collect();
        assert_eq!(suffixes, vec![0, 2, 3, 9]);
        s.discard_scope().unwrap();
    }

    #[test]
    fn test_prefix_successor() {
        assert_eq!(prefix_successor(&[1, 2]), Some(vec![1, 3]));
        assert_eq!(prefix_successor(&[1, 0xFF]), Some(vec![2]));
        assert_eq!(prefix_successor(&[0xFF, 0xFF]), None);
    }

    #[test]
    fn test_empty_block_still_commits() {
        let mut s = MultiStore::in_memory();
        let (v1, h1) = s.commit_version().unwrap();
        let (v2, h2) = s.commit_version().unwrap();
        assert_eq!((v1, v2), (1, 2));
        assert_eq!(h1, h2);
    }
}
