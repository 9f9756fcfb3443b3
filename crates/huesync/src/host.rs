//! The CLI as a bridge host: status goes to the log, a provisioned
//! credential goes into the config file.

use std::path::PathBuf;
use std::sync::Mutex;

use secrecy::SecretString;
use tracing::{debug, info, warn};

use huesync_core::{BridgeHost, BridgeProperties, BridgeStatus, HostError};

pub struct CliHost {
    config_path: PathBuf,
    properties: Mutex<Option<BridgeProperties>>,
}

impl CliHost {
    pub fn new(config_path: PathBuf) -> Self {
        Self {
            config_path,
            properties: Mutex::new(None),
        }
    }

    /// Hub identity from the most recent connection, if any.
    pub fn properties(&self) -> Option<BridgeProperties> {
        self.properties.lock().ok().and_then(|p| p.clone())
    }
}

impl BridgeHost for CliHost {
    fn on_status_changed(&self, status: &BridgeStatus) {
        info!(%status, "hub status");
    }

    fn on_connection_lost(&self) {
        warn!("lost connection to hub");
    }

    fn on_connection_resumed(&self) {
        info!("connected to hub");
    }

    fn persist_credential(&self, credential: &SecretString) -> Result<(), HostError> {
        huesync_config::save_credential_to(&self.config_path, credential)?;
        info!(path = %self.config_path.display(), "credential saved");
        Ok(())
    }

    fn update_properties(&self, properties: &BridgeProperties) {
        debug!(?properties, "hub properties");
        if let Ok(mut slot) = self.properties.lock() {
            *slot = Some(properties.clone());
        }
    }
}
