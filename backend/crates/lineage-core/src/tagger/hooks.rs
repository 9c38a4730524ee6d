//! Collaborator interfaces invoked while tagging.
//!
//! - [`QueryAlterer`]: per-kind access alteration of a probe query. Returns whether it
//!   added a constraint; probes nobody constrained are dropped.
//! - [`TaggingListener`]: fire-and-forget notification, once per hierarchy level, with
//!   the listing query being tagged.

use super::query::ListingQuery;
use crate::error::Result;
use lineage_commons::EntityKind;
use parking_lot::RwLock;
use std::sync::Arc;

/// Adds access constraints to a probe selecting from `kind`'s base table.
pub trait QueryAlterer: Send + Sync {
    /// Returns `true` iff a constraint was added.
    fn alter(&self, kind: EntityKind, probe: &mut ListingQuery) -> Result<bool>;
}

impl<F> QueryAlterer for F
where
    F: Fn(EntityKind, &mut ListingQuery) -> Result<bool> + Send + Sync,
{
    fn alter(&self, kind: EntityKind, probe: &mut ListingQuery) -> Result<bool> {
        self(kind, probe)
    }
}

/// Alterer that never constrains anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAlterer;

impl QueryAlterer for NoopAlterer {
    fn alter(&self, _kind: EntityKind, _probe: &mut ListingQuery) -> Result<bool> {
        Ok(false)
    }
}

pub trait TaggingListener: Send + Sync {
    fn on_tag(&self, kind: EntityKind, query: &mut ListingQuery);
}

impl<F> TaggingListener for F
where
    F: Fn(EntityKind, &mut ListingQuery) + Send + Sync,
{
    fn on_tag(&self, kind: EntityKind, query: &mut ListingQuery) {
        self(kind, query)
    }
}

/// Registered tagging listeners, notified in registration order.
#[derive(Default)]
pub struct TaggingDispatcher {
    listeners: RwLock<Vec<Arc<dyn TaggingListener>>>,
}

impl TaggingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, listener: Arc<dyn TaggingListener>) {
        self.listeners.write().push(listener);
    }

    pub fn len(&self) -> usize {
        self.listeners.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.read().is_empty()
    }

    pub fn dispatch(&self, kind: EntityKind, query: &mut ListingQuery) {
        // Snapshot so listeners may register others without deadlocking.
        let listeners = self.listeners.read().clone();
        for listener in listeners {
            listener.on_tag(kind, query);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_dispatch_in_registration_order() {
        let dispatcher = TaggingDispatcher::new();
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));

        for name in ["first", "second"] {
            let seen = seen.clone();
            dispatcher.register(Arc::new(move |kind: EntityKind, _query: &mut ListingQuery| {
                seen.lock().push(format!("{}:{}", name, kind));
            }));
        }

        let mut query = ListingQuery::parse("SELECT mid FROM media").unwrap();
        dispatcher.dispatch(EntityKind::Wrapper, &mut query);
        assert_eq!(*seen.lock(), vec!["first:wrapper", "second:wrapper"]);
    }

    #[test]
    fn test_closure_alterer() {
        let calls = AtomicUsize::new(0);
        let alterer = |_kind: EntityKind, probe: &mut ListingQuery| -> Result<bool> {
            calls.fetch_add(1, Ordering::SeqCst);
            probe.add_condition_sql("base_node.nid = 1")?;
            Ok(true)
        };

        let mut probe = ListingQuery::parse("SELECT 1 FROM node base_node").unwrap();
        assert!(alterer.alter(EntityKind::Container, &mut probe).unwrap());
        assert!(probe.to_sql().contains("base_node.nid = 1"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!NoopAlterer.alter(EntityKind::Container, &mut probe).unwrap());
    }
}
