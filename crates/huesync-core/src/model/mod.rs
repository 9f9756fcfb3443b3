// ── Domain model ──
//
// Wire records come from `huesync-api`; this module adds what the sync
// engine layers on top: the `Entity` abstraction used by the generic
// cache and reconciler, color comparison, and hub identity properties.

mod color;
mod entity;
mod properties;

pub use color::Hsb;
pub use entity::Entity;
pub use properties::BridgeProperties;

pub use huesync_api::model::{
    ColorMode, ConfigUpdate, EntityKind, EntityRef, FullGroup, FullLight, FullSensor,
    GlobalConfig, LightState, SensorConfig, SensorState, StateUpdate,
};
