//! Sync and reconciliation engine for Hue-compatible lighting hubs.
//!
//! Keeps a local mirror of a hub's lights, sensors, and groups by polling
//! on two cadences, and tells registered listeners about every difference:
//!
//! - **[`Bridge`]**: facade owning one hub connection. Starts and stops
//!   polling, registers listeners (with catch-up of already-known
//!   entities), answers cache queries, and submits commands.
//!
//! - **[`DataStore`]**: one ordered, snapshot-readable [`EntityCache`] per
//!   entity kind, only written during reconciliation.
//!
//! - **[`reconcile()`]**: diffs a fetched set against the cache and emits
//!   [`EntityEvent`]s (added, changed, removed).
//!
//! - **[`ConnectionSupervisor`]**: probe, provision, authenticate, and the
//!   [`Fault`]-driven state transitions, reported to the embedding
//!   [`BridgeHost`].
//!
//! - **[`CommandDispatcher`]**: asynchronous writes, including the
//!   switch-on-and-retry path for lights that are off.
//!
//! Group state is never polled; [`aggregate`] derives it from members.

pub mod aggregate;
pub mod bridge;
pub mod config;
pub mod connection;
pub mod dispatch;
pub mod error;
pub mod listener;
pub mod model;
pub mod poll;
pub mod reconcile;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use bridge::Bridge;
pub use config::BridgeConfig;
pub use connection::{
    BridgeHost, BridgeStatus, ConnectionState, ConnectionSupervisor, CycleOutcome, HostError,
    OfflineReason,
};
pub use dispatch::{CommandDispatcher, CommandHandle, CommandOutcome, Delta, PendingCommand};
pub use error::{CoreError, Fault};
pub use listener::{DiscoveryListener, EntityListener, ListenerError, ListenerRegistry};
pub use poll::{PollKind, PollingScheduler, PollingTask};
pub use reconcile::{EntityEvent, ReconcileSummary, reconcile};
pub use store::{DataStore, EntityCache, Snapshot};

pub use model::{
    BridgeProperties, ColorMode, ConfigUpdate, EntityKind, EntityRef, FullGroup, FullLight,
    FullSensor, GlobalConfig, Hsb, LightState, SensorConfig, SensorState, StateUpdate,
};
