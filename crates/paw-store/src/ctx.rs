//! # Execution Context
//!
//! The bundle handed to every message handler and block hook: the store,
//! the block header facts, and the event sink. `scoped` is the sanctioned
//! unit of atomicity — events emitted inside a failed scope are dropped
//! together with its writes.

use shared_types::{BlockCtx, Event};

use crate::domain::multistore::MultiStore;
use crate::domain::StoreError;

/// Mutable execution context for one block.
pub struct Ctx<'a> {
    pub store: &'a mut MultiStore,
    pub block: BlockCtx,
    pub events: &'a mut Vec<Event>,
}

impl<'a> Ctx<'a> {
    pub fn new(store: &'a mut MultiStore, block: BlockCtx, events: &'a mut Vec<Event>) -> Self {
        Self {
            store,
            block,
            events,
        }
    }

    /// Emit an event. Dropped with the enclosing scope on failure.
    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    /// Run `f` in a nested cache scope; commit writes and keep events on
    /// `Ok`, discard both on `Err`.
    pub fn scoped<T, E: From<StoreError>>(
        &mut self,
        f: impl FnOnce(&mut Ctx) -> Result<T, E>,
    ) -> Result<T, E> {
        self.store.begin_scope();
        let mark = self.events.len();
        let result = {
            let mut inner = Ctx {
                store: &mut *self.store,
                block: self.block,
                events: &mut *self.events,
            };
            f(&mut inner)
        };
        match result {
            Ok(v) => {
                self.store.commit_scope().map_err(E::from)?;
                Ok(v)
            }
            Err(e) => {
                self.store.discard_scope().map_err(E::from)?;
                self.events.truncate(mark);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::Module;

    #[test]
    fn test_scoped_drops_events_on_error() {
        let mut store = MultiStore::in_memory();
        let mut events = Vec::new();
        let mut ctx = Ctx::new(&mut store, BlockCtx::new(1, 1_700_000_000), &mut events);

        ctx.emit(Event::new("kept"));
        let r: Result<(), StoreError> = ctx.scoped(|ctx| {
            ctx.emit(Event::new("dropped"));
            ctx.store
                .set(Module::Dex, vec![Module::Dex.namespace(), 1], vec![1])?;
            Err(StoreError::EmptyKey)
        });
        assert!(r.is_err());
        assert_eq!(ctx.events.len(), 1);
        assert_eq!(ctx.events[0].kind, "kept");
        assert_eq!(
            ctx.store
                .get(Module::Dex, &[Module::Dex.namespace(), 1])
                .unwrap(),
            None
        );
    }

    #[test]
    fn test_scoped_keeps_events_on_success() {
        let mut store = MultiStore::in_memory();
        let mut events = Vec::new();
        let mut ctx = Ctx::new(&mut store, BlockCtx::new(5, 0), &mut events);
        let r: Result<(), StoreError> = ctx.scoped(|ctx| {
            ctx.emit(Event::new("swap"));
            Ok(())
        });
        assert!(r.is_ok());
        assert_eq!(ctx.events.len(), 1);
    }
}
