//! Async client for Hue-compatible lighting hubs.
//!
//! Exposes the [`HubClient`] trait consumed by `huesync-core` and a
//! concrete [`HttpHubClient`] speaking the hub's REST/JSON v1 API.
//! Errors from the hub's `[{"error": {...}}]` envelope are mapped onto
//! the typed [`Error`] enum so callers can branch on them.

pub mod client;
pub mod error;
pub mod http;
pub mod model;
pub mod transport;

pub use client::HubClient;
pub use error::Error;
pub use http::HttpHubClient;
pub use model::{
    ColorMode, ConfigUpdate, EntityKind, EntityRef, FullGroup, FullLight, FullSensor,
    GlobalConfig, LightState, SensorConfig, SensorState, StateUpdate,
};
pub use transport::TransportConfig;
