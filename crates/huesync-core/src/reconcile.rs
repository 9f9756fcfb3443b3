// ── Reconciliation ──
//
// Diffs a freshly fetched snapshot set against the cache, updates the
// cache, and emits one classification per divergence.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use crate::model::Entity;
use crate::store::EntityCache;

/// A classified divergence between the hub and the cache.
#[derive(Debug, Clone)]
pub enum EntityEvent<E> {
    /// First sighting of this id.
    Added(Arc<E>),
    /// Known id, different state.
    Changed(Arc<E>),
    /// Cached id missing from the latest fetch.
    Removed(Arc<E>),
    /// The hub reported the id as not available during a write.
    Gone(String),
}

impl<E: Entity> EntityEvent<E> {
    pub fn id(&self) -> &str {
        match self {
            Self::Added(e) | Self::Changed(e) | Self::Removed(e) => e.id(),
            Self::Gone(id) => id,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Added(_) => "added",
            Self::Changed(_) => "changed",
            Self::Removed(_) => "removed",
            Self::Gone(_) => "gone",
        }
    }
}

/// Counts from one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub added: usize,
    pub changed: usize,
    pub removed: usize,
}

impl ReconcileSummary {
    pub fn is_quiet(&self) -> bool {
        self.added == 0 && self.changed == 0 && self.removed == 0
    }
}

/// Apply `fetched` to `cache`, calling `emit` for every classification.
///
/// Additions and changes are emitted in fetch order. Removals follow,
/// in ascending id order (see [`compare_ids`]). An id the hub reports
/// twice is only considered once. An unchanged entity produces no event,
/// but a record that differs outside its state (e.g. a rename) still
/// replaces the cached one.
pub fn reconcile<E: Entity>(
    cache: &EntityCache<E>,
    fetched: Vec<E>,
    mut emit: impl FnMut(EntityEvent<E>),
) -> ReconcileSummary {
    let mut summary = ReconcileSummary::default();
    let mut seen: HashSet<String> = HashSet::with_capacity(fetched.len());

    for entity in fetched {
        let id = entity.id().to_owned();
        if !seen.insert(id.clone()) {
            debug!(kind = %E::KIND, id = %id, "duplicate id in fetch, ignoring");
            continue;
        }

        match cache.get(&id) {
            None => {
                let entity = Arc::new(entity);
                cache.upsert(id.as_str(), Arc::clone(&entity));
                debug!(kind = %E::KIND, id = %id, "added");
                summary.added += 1;
                emit(EntityEvent::Added(entity));
            }
            Some(previous) if !previous.same_state(&entity) => {
                let entity = Arc::new(entity);
                cache.upsert(id.as_str(), Arc::clone(&entity));
                debug!(kind = %E::KIND, id = %id, "changed");
                summary.changed += 1;
                emit(EntityEvent::Changed(entity));
            }
            Some(previous) => {
                if *previous != entity {
                    cache.upsert(id, entity);
                }
            }
        }
    }

    let mut stale: Vec<String> = cache
        .ids()
        .into_iter()
        .filter(|id| !seen.contains(id))
        .collect();
    stale.sort_by(|a, b| compare_ids(a, b));

    for id in stale {
        if let Some(previous) = cache.remove(&id) {
            debug!(kind = %E::KIND, id = %id, "removed");
            summary.removed += 1;
            emit(EntityEvent::Removed(previous));
        }
    }

    summary
}

/// Total order on hub ids: numeric ids first, ascending by value, then
/// everything else lexicographically.
pub fn compare_ids(a: &str, b: &str) -> Ordering {
    id_order_key(a).cmp(&id_order_key(b))
}

fn id_order_key(id: &str) -> (bool, u64, &str) {
    match id.parse::<u64>() {
        Ok(n) => (false, n, id),
        Err(_) => (true, 0, id),
    }
}
