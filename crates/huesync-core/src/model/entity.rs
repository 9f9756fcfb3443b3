use std::fmt::Debug;

use huesync_api::model::{EntityKind, FullGroup, FullLight, FullSensor};

/// A snapshot of one hub entity, as held in the cache.
///
/// Identity is the id. Change detection goes through [`same_state`],
/// so renames alone never produce a change event.
///
/// [`same_state`]: Entity::same_state
pub trait Entity: Clone + Debug + PartialEq + Send + Sync + 'static {
    const KIND: EntityKind;

    fn id(&self) -> &str;

    fn name(&self) -> &str;

    /// Whether `other` reports the same observable state as `self`.
    fn same_state(&self, other: &Self) -> bool;
}

impl Entity for FullLight {
    const KIND: EntityKind = EntityKind::Light;

    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn same_state(&self, other: &Self) -> bool {
        self.state == other.state
    }
}

impl Entity for FullSensor {
    const KIND: EntityKind = EntityKind::Sensor;

    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    // Config changes (e.g. a motion sensor being disabled) count as well.
    fn same_state(&self, other: &Self) -> bool {
        self.state == other.state && self.config == other.config
    }
}

impl Entity for FullGroup {
    const KIND: EntityKind = EntityKind::Group;

    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn same_state(&self, other: &Self) -> bool {
        self.state == other.state
    }
}
