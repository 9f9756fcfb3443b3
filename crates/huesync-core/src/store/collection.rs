// ── Reactive entity cache ──
//
// Ordered id -> snapshot map published through a `watch` channel. The
// channel value is the map itself (behind an `Arc`), so readers get a
// consistent point-in-time view without taking any lock of their own,
// and writers copy-on-write when a reader still holds an older view.

use std::sync::Arc;

use indexmap::IndexMap;
use tokio::sync::watch;

/// Point-in-time view of a cache, in first-insertion order.
pub type Snapshot<T> = Arc<IndexMap<String, Arc<T>>>;

/// Last-known snapshots for one entity kind.
///
/// Iteration follows first insertion; updating an existing id keeps its
/// position. Every mutation bumps a version counter and republishes the
/// map to subscribers.
pub struct EntityCache<T: Send + Sync + 'static> {
    entries: watch::Sender<Snapshot<T>>,
    version: watch::Sender<u64>,
}

impl<T: Send + Sync + 'static> Default for EntityCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + Sync + 'static> EntityCache<T> {
    pub fn new() -> Self {
        let (entries, _) = watch::channel(Arc::new(IndexMap::new()));
        let (version, _) = watch::channel(0u64);
        Self { entries, version }
    }

    /// Insert or update an entity. Returns `true` if the id was new.
    pub fn upsert(&self, id: impl Into<String>, entity: impl Into<Arc<T>>) -> bool {
        let id = id.into();
        let entity = entity.into();
        let mut is_new = false;
        // `send_modify` updates unconditionally, even with zero receivers.
        self.entries.send_modify(|map| {
            is_new = Arc::make_mut(map).insert(id, entity).is_none();
        });
        self.bump_version();
        is_new
    }

    /// Remove an entity by id. Returns the removed entity if it existed.
    ///
    /// Uses `shift_remove` so the remaining entries keep their order.
    pub fn remove(&self, id: &str) -> Option<Arc<T>> {
        let mut removed = None;
        self.entries.send_if_modified(|map| {
            if !map.contains_key(id) {
                return false;
            }
            removed = Arc::make_mut(map).shift_remove(id);
            true
        });
        if removed.is_some() {
            self.bump_version();
        }
        removed
    }

    pub fn get(&self, id: &str) -> Option<Arc<T>> {
        self.entries.borrow().get(id).map(Arc::clone)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.borrow().contains_key(id)
    }

    /// Get the current snapshot (cheap `Arc` clone).
    pub fn snapshot(&self) -> Snapshot<T> {
        Arc::clone(&self.entries.borrow())
    }

    /// All entities, in cache order.
    pub fn values(&self) -> Vec<Arc<T>> {
        self.entries.borrow().values().map(Arc::clone).collect()
    }

    /// All ids, in cache order.
    pub fn ids(&self) -> Vec<String> {
        self.entries.borrow().keys().cloned().collect()
    }

    /// Subscribe to snapshot changes via a `watch::Receiver`.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot<T>> {
        self.entries.subscribe()
    }

    /// Monotonic mutation counter.
    pub fn version(&self) -> u64 {
        *self.version.borrow()
    }

    pub fn clear(&self) {
        self.entries.send_modify(|map| *map = Arc::new(IndexMap::new()));
        self.bump_version();
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn bump_version(&self) {
        self.version.send_modify(|v| *v += 1);
    }
}
