// ── Entity store ──
//
// One cache per entity kind. Writes happen only inside a reconciliation
// pass (under the polling lock); everything else reads snapshots.

mod collection;

use std::sync::Arc;

pub use collection::{EntityCache, Snapshot};

use crate::model::{Entity, FullGroup, FullLight, FullSensor};

/// Last-observed hub state, shared by the poll tasks and the facade.
#[derive(Default)]
pub struct DataStore {
    pub(crate) lights: EntityCache<FullLight>,
    pub(crate) sensors: EntityCache<FullSensor>,
    pub(crate) groups: EntityCache<FullGroup>,
}

impl DataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn light(&self, id: &str) -> Option<Arc<FullLight>> {
        self.lights.get(id)
    }

    pub fn sensor(&self, id: &str) -> Option<Arc<FullSensor>> {
        self.sensors.get(id)
    }

    pub fn group(&self, id: &str) -> Option<Arc<FullGroup>> {
        self.groups.get(id)
    }

    pub fn lights_snapshot(&self) -> Snapshot<FullLight> {
        self.lights.snapshot()
    }

    pub fn sensors_snapshot(&self) -> Snapshot<FullSensor> {
        self.sensors.snapshot()
    }

    pub fn groups_snapshot(&self) -> Snapshot<FullGroup> {
        self.groups.snapshot()
    }

    pub fn subscribe_lights(&self) -> tokio::sync::watch::Receiver<Snapshot<FullLight>> {
        self.lights.subscribe()
    }

    pub fn subscribe_sensors(&self) -> tokio::sync::watch::Receiver<Snapshot<FullSensor>> {
        self.sensors.subscribe()
    }

    pub fn subscribe_groups(&self) -> tokio::sync::watch::Receiver<Snapshot<FullGroup>> {
        self.groups.subscribe()
    }
}

/// Entities with a cache in [`DataStore`].
pub trait Stored: Entity {
    fn cache(store: &DataStore) -> &EntityCache<Self>;
}

impl Stored for FullLight {
    fn cache(store: &DataStore) -> &EntityCache<Self> {
        &store.lights
    }
}

impl Stored for FullSensor {
    fn cache(store: &DataStore) -> &EntityCache<Self> {
        &store.sensors
    }
}

impl Stored for FullGroup {
    fn cache(store: &DataStore) -> &EntityCache<Self> {
        &store.groups
    }
}
