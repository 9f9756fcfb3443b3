// ── Hub client seam ──
//
// The sync engine only talks to the hub through this trait, so the
// HTTP implementation can be swapped for a scripted one in tests.

use async_trait::async_trait;
use secrecy::SecretString;

use crate::error::Error;
use crate::model::{
    ConfigUpdate, EntityRef, FullGroup, FullLight, FullSensor, GlobalConfig, StateUpdate,
};

/// Typed operations against one hub.
///
/// Listing calls return entities in the order the hub reported them.
#[async_trait]
pub trait HubClient: Send + Sync {
    async fn fetch_lights(&self) -> Result<Vec<FullLight>, Error>;

    async fn fetch_sensors(&self) -> Result<Vec<FullSensor>, Error>;

    async fn fetch_groups(&self) -> Result<Vec<FullGroup>, Error>;

    /// Fetch the hub's global configuration. Works without a credential,
    /// in which case the hub returns its public subset.
    async fn fetch_global_config(&self) -> Result<GlobalConfig, Error>;

    /// Verify `credential` against the hub and use it for later calls.
    async fn authenticate(&self, credential: &SecretString) -> Result<(), Error>;

    /// Ask the hub for a fresh credential. Fails with
    /// [`Error::LinkButtonNotPressed`] until the pairing button is pressed.
    async fn provision_credential(&self, device_label: &str) -> Result<SecretString, Error>;

    async fn set_entity_state(&self, entity: &EntityRef, update: &StateUpdate)
    -> Result<(), Error>;

    async fn set_entity_config(
        &self,
        entity: &EntityRef,
        update: &ConfigUpdate,
    ) -> Result<(), Error>;

    /// Start hub-side discovery of new lights, optionally restricted to
    /// the given serial numbers.
    async fn start_search(&self, serial_numbers: &[String]) -> Result<(), Error>;
}
