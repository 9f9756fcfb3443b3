// ── Listener registry ──
//
// Fan-out of entity events to observers. Global listener lists are
// copy-on-write (`ArcSwap`), so delivery never holds a lock while
// calling into listener code. Listener failures are contained: an
// error or panic in one listener is logged and delivery continues.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use arc_swap::{ArcSwap, ArcSwapOption};
use dashmap::DashMap;
use tracing::{debug, error, warn};

use crate::model::{Entity, FullGroup, FullLight, FullSensor};
use crate::reconcile::EntityEvent;

/// Error type listeners may return; it is logged and otherwise ignored.
pub type ListenerError = Box<dyn std::error::Error + Send + Sync>;

/// Observer of one entity kind. All callbacks default to no-ops.
pub trait EntityListener<E>: Send + Sync {
    fn on_added(&self, _entity: &E) -> Result<(), ListenerError> {
        Ok(())
    }

    fn on_changed(&self, _entity: &E) -> Result<(), ListenerError> {
        Ok(())
    }

    fn on_removed(&self, _entity: &E) -> Result<(), ListenerError> {
        Ok(())
    }

    /// The hub rejected a write because the entity no longer exists.
    fn on_gone(&self, _id: &str) -> Result<(), ListenerError> {
        Ok(())
    }
}

/// Bridge-wide observer of every kind, held in the single discovery slot.
pub trait DiscoveryListener:
    EntityListener<FullLight> + EntityListener<FullSensor> + EntityListener<FullGroup>
{
}

impl<T> DiscoveryListener for T where
    T: EntityListener<FullLight> + EntityListener<FullSensor> + EntityListener<FullGroup>
{
}

// ── Delivery ─────────────────────────────────────────────────────────

/// Deliver one event to one listener, containing errors and panics.
pub(crate) fn deliver<E, L>(listener: &L, event: &EntityEvent<E>)
where
    E: Entity,
    L: EntityListener<E> + ?Sized,
{
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| match event {
        EntityEvent::Added(entity) => listener.on_added(entity),
        EntityEvent::Changed(entity) => listener.on_changed(entity),
        EntityEvent::Removed(entity) => listener.on_removed(entity),
        EntityEvent::Gone(id) => listener.on_gone(id),
    }));

    match outcome {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            warn!(kind = %E::KIND, id = event.id(), event = event.label(), error = %e, "listener failed");
        }
        Err(_) => {
            error!(kind = %E::KIND, id = event.id(), event = event.label(), "listener panicked");
        }
    }
}

fn same_listener<T: ?Sized>(a: &Arc<T>, b: &Arc<T>) -> bool {
    std::ptr::eq(Arc::as_ptr(a).cast::<()>(), Arc::as_ptr(b).cast::<()>())
}

// ── Per-kind listener set ────────────────────────────────────────────

/// Global and per-entity listeners for one kind.
pub struct ListenerSet<E> {
    global: ArcSwap<Vec<Arc<dyn EntityListener<E>>>>,
    targeted: DashMap<String, Arc<dyn EntityListener<E>>>,
}

impl<E: Entity> Default for ListenerSet<E> {
    fn default() -> Self {
        Self {
            global: ArcSwap::from_pointee(Vec::new()),
            targeted: DashMap::new(),
        }
    }
}

impl<E: Entity> ListenerSet<E> {
    pub fn contains(&self, listener: &Arc<dyn EntityListener<E>>) -> bool {
        self.global.load().iter().any(|l| same_listener(l, listener))
    }

    /// Add a global listener. Returns `false` if it was already registered.
    pub fn register(&self, listener: Arc<dyn EntityListener<E>>) -> bool {
        let mut added = false;
        self.global.rcu(|current| {
            if current.iter().any(|l| same_listener(l, &listener)) {
                added = false;
                Arc::clone(current)
            } else {
                added = true;
                let mut next = Vec::clone(current);
                next.push(Arc::clone(&listener));
                Arc::new(next)
            }
        });
        added
    }

    /// Remove a global listener. Returns `false` if it was not registered.
    pub fn unregister(&self, listener: &Arc<dyn EntityListener<E>>) -> bool {
        let mut removed = false;
        self.global.rcu(|current| {
            let next: Vec<_> = current
                .iter()
                .filter(|l| !same_listener(l, listener))
                .cloned()
                .collect();
            removed = next.len() != current.len();
            next
        });
        removed
    }

    /// Attach a listener to a single entity id, replacing any previous one.
    pub fn register_for(&self, id: impl Into<String>, listener: Arc<dyn EntityListener<E>>) -> bool {
        self.targeted.insert(id.into(), listener).is_none()
    }

    pub fn unregister_for(&self, id: &str) -> bool {
        self.targeted.remove(id).is_some()
    }

    pub fn targeted(&self, id: &str) -> Option<Arc<dyn EntityListener<E>>> {
        self.targeted.get(id).map(|l| Arc::clone(l.value()))
    }

    pub fn len(&self) -> usize {
        self.global.load().len() + self.targeted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver to global listeners, then the listener for the event's id.
    /// Returns the number of listeners reached.
    fn notify(&self, event: &EntityEvent<E>) -> usize {
        let global = self.global.load_full();
        for listener in global.iter() {
            deliver(&**listener, event);
        }
        // Clone out of the map so no shard lock is held during the callback.
        let targeted = self.targeted(event.id());
        if let Some(listener) = &targeted {
            deliver(&**listener, event);
        }
        global.len() + usize::from(targeted.is_some())
    }
}

// ── Kind selection ───────────────────────────────────────────────────

/// Entities the registry can route events for.
pub trait Routed: Entity {
    fn listeners(registry: &ListenerRegistry) -> &ListenerSet<Self>;

    fn deliver_to_discovery(listener: &dyn DiscoveryListener, event: &EntityEvent<Self>);
}

impl Routed for FullLight {
    fn listeners(registry: &ListenerRegistry) -> &ListenerSet<Self> {
        &registry.lights
    }

    fn deliver_to_discovery(listener: &dyn DiscoveryListener, event: &EntityEvent<Self>) {
        deliver::<Self, dyn DiscoveryListener>(listener, event);
    }
}

impl Routed for FullSensor {
    fn listeners(registry: &ListenerRegistry) -> &ListenerSet<Self> {
        &registry.sensors
    }

    fn deliver_to_discovery(listener: &dyn DiscoveryListener, event: &EntityEvent<Self>) {
        deliver::<Self, dyn DiscoveryListener>(listener, event);
    }
}

impl Routed for FullGroup {
    fn listeners(registry: &ListenerRegistry) -> &ListenerSet<Self> {
        &registry.groups
    }

    fn deliver_to_discovery(listener: &dyn DiscoveryListener, event: &EntityEvent<Self>) {
        deliver::<Self, dyn DiscoveryListener>(listener, event);
    }
}

// ── Registry ─────────────────────────────────────────────────────────

/// Holder for the discovery slot (`ArcSwapOption` needs a sized pointee).
struct DiscoverySlot {
    listener: Arc<dyn DiscoveryListener>,
}

/// All observers of one bridge.
#[derive(Default)]
pub struct ListenerRegistry {
    pub lights: ListenerSet<FullLight>,
    pub sensors: ListenerSet<FullSensor>,
    pub groups: ListenerSet<FullGroup>,
    discovery: ArcSwapOption<DiscoverySlot>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set<E: Routed>(&self) -> &ListenerSet<E> {
        E::listeners(self)
    }

    /// Occupy the discovery slot. Returns `false` if it is taken.
    pub fn register_discovery(&self, listener: Arc<dyn DiscoveryListener>) -> bool {
        let mut installed = false;
        self.discovery.rcu(|current| {
            if current.is_some() {
                installed = false;
                current.clone()
            } else {
                installed = true;
                Some(Arc::new(DiscoverySlot {
                    listener: Arc::clone(&listener),
                }))
            }
        });
        installed
    }

    /// Free the discovery slot. Returns `false` if it was empty.
    pub fn unregister_discovery(&self) -> bool {
        self.discovery.swap(None).is_some()
    }

    pub fn discovery(&self) -> Option<Arc<dyn DiscoveryListener>> {
        self.discovery
            .load()
            .as_ref()
            .map(|slot| Arc::clone(&slot.listener))
    }

    /// Deliver `event` to every interested listener: global ones, the one
    /// registered for the entity id, then the discovery slot.
    pub fn notify<E: Routed>(&self, event: &EntityEvent<E>) {
        let mut reached = E::listeners(self).notify(event);
        if let Some(discovery) = self.discovery() {
            E::deliver_to_discovery(&*discovery, event);
            reached += 1;
        }
        if reached == 0 {
            debug!(kind = %E::KIND, id = event.id(), event = event.label(), "no listeners registered");
        }
    }
}
