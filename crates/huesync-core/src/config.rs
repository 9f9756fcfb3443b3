// ── Runtime configuration ──
//
// What the engine needs to run. Loading from files and the environment
// lives in `huesync-config`; this is the already-resolved form.

use std::time::Duration;

use secrecy::SecretString;
use tracing::info;

pub const DEFAULT_POLLING_INTERVAL_SECS: u64 = 10;
pub const MIN_POLLING_INTERVAL_SECS: u64 = 1;
pub const DEFAULT_SENSOR_POLLING_INTERVAL_MS: u64 = 500;
pub const MIN_SENSOR_POLLING_INTERVAL_MS: u64 = 50;
pub const DEFAULT_DEVICE_LABEL: &str = "huesync";

/// Configuration for one hub connection.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Hub address, used for diagnostics only (the client owns the URL).
    pub host: String,
    /// Previously provisioned credential. `None` triggers provisioning.
    pub credential: Option<SecretString>,
    /// Label the hub records for a credential created by provisioning.
    pub device_label: String,
    /// Slow pass (lights, groups) period in seconds.
    pub polling_interval_secs: u64,
    /// Fast pass (sensors) period in milliseconds.
    pub sensor_polling_interval_ms: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            credential: None,
            device_label: DEFAULT_DEVICE_LABEL.into(),
            polling_interval_secs: DEFAULT_POLLING_INTERVAL_SECS,
            sensor_polling_interval_ms: DEFAULT_SENSOR_POLLING_INTERVAL_MS,
        }
    }
}

impl BridgeConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }

    pub fn with_credential(mut self, credential: SecretString) -> Self {
        self.credential = Some(credential);
        self
    }

    /// Effective light/group polling period. Values below the floor fall
    /// back to the default.
    pub fn polling_interval(&self) -> Duration {
        Duration::from_secs(floor_or_default(
            "polling_interval",
            self.polling_interval_secs,
            MIN_POLLING_INTERVAL_SECS,
            DEFAULT_POLLING_INTERVAL_SECS,
        ))
    }

    /// Effective sensor polling period.
    pub fn sensor_polling_interval(&self) -> Duration {
        Duration::from_millis(floor_or_default(
            "sensor_polling_interval",
            self.sensor_polling_interval_ms,
            MIN_SENSOR_POLLING_INTERVAL_MS,
            DEFAULT_SENSOR_POLLING_INTERVAL_MS,
        ))
    }
}

/// The floor itself is a valid value.
fn floor_or_default(name: &str, value: u64, floor: u64, default: u64) -> u64 {
    if value < floor {
        info!(
            setting = name,
            value, floor, default, "polling interval below minimum, using default"
        );
        default
    } else {
        value
    }
}
