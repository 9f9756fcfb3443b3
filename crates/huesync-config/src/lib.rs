//! Configuration for huesync.
//!
//! A flat TOML file in the platform config directory, layered under
//! `HUESYNC_*` environment variables, validated and translated to
//! `huesync_core::BridgeConfig`. A credential obtained by provisioning
//! is written back into the same file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use huesync_core::BridgeConfig;
use huesync_core::config::{
    DEFAULT_DEVICE_LABEL, DEFAULT_POLLING_INTERVAL_SECS, DEFAULT_SENSOR_POLLING_INTERVAL_MS,
};

const ENV_PREFIX: &str = "HUESYNC_";
const DEFAULT_TIMEOUT_SECS: u64 = 5;

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config struct ──────────────────────────────────────────────

/// Scheme used to reach the hub.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Http,
    Https,
}

impl Protocol {
    pub fn scheme(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }

    pub fn default_port(self) -> u16 {
        match self {
            Self::Http => 80,
            Self::Https => 443,
        }
    }
}

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Hub address (hostname or IP).
    #[serde(default)]
    pub host: String,

    /// Hub port. Defaults to the protocol's well-known port.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    #[serde(default)]
    pub protocol: Protocol,

    /// Hub credential (plaintext). Written here after provisioning.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,

    /// Label the hub records for a provisioned credential.
    #[serde(default = "default_device_label")]
    pub device_label: String,

    /// Light/group polling period, seconds.
    #[serde(default = "default_polling_interval")]
    pub polling_interval: u64,

    /// Sensor polling period, milliseconds.
    #[serde(default = "default_sensor_polling_interval")]
    pub sensor_polling_interval: u64,

    /// Per-request timeout, seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: None,
            protocol: Protocol::default(),
            credential: None,
            device_label: default_device_label(),
            polling_interval: default_polling_interval(),
            sensor_polling_interval: default_sensor_polling_interval(),
            timeout: default_timeout(),
        }
    }
}

fn default_device_label() -> String {
    DEFAULT_DEVICE_LABEL.into()
}
fn default_polling_interval() -> u64 {
    DEFAULT_POLLING_INTERVAL_SECS
}
fn default_sensor_polling_interval() -> u64 {
    DEFAULT_SENSOR_POLLING_INTERVAL_MS
}
fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Config {
    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::Validation {
                field: "host".into(),
                reason: "no hub address configured".into(),
            });
        }
        if self.timeout == 0 {
            return Err(ConfigError::Validation {
                field: "timeout".into(),
                reason: "must be at least one second".into(),
            });
        }
        Ok(())
    }

    pub fn port(&self) -> u16 {
        self.port.unwrap_or_else(|| self.protocol.default_port())
    }

    /// The hub's base URL, e.g. `http://192.168.1.2:80`.
    pub fn base_url(&self) -> Result<url::Url, ConfigError> {
        let raw = format!("{}://{}:{}", self.protocol.scheme(), self.host.trim(), self.port());
        raw.parse().map_err(|e: url::ParseError| ConfigError::Validation {
            field: "host".into(),
            reason: format!("invalid hub address '{}': {e}", self.host),
        })
    }

    pub fn credential(&self) -> Option<SecretString> {
        self.credential
            .as_deref()
            .filter(|c| !c.is_empty())
            .map(SecretString::from)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// Translate to the engine's configuration. Interval floors are
    /// applied by the engine itself.
    pub fn to_bridge_config(&self) -> BridgeConfig {
        BridgeConfig {
            host: self.host.clone(),
            credential: self.credential(),
            device_label: self.device_label.clone(),
            polling_interval_secs: self.polling_interval,
            sensor_polling_interval_ms: self.sensor_polling_interval,
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "huesync", "huesync").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("huesync");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load from the canonical path + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` + environment. A missing file yields the defaults,
/// still overridable from the environment.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).ignore(&["config"]));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to `path`.
pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

/// Store `credential` in the file at `path`, keeping every other key
/// (including ones this version does not know) as it was.
pub fn save_credential_to(path: &Path, credential: &SecretString) -> Result<(), ConfigError> {
    let mut table: toml::Table = match std::fs::read_to_string(path) {
        Ok(existing) => existing.parse()?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => toml::Table::new(),
        Err(e) => return Err(e.into()),
    };
    table.insert(
        "credential".into(),
        toml::Value::String(credential.expose_secret().to_owned()),
    );

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, toml::to_string_pretty(&table)?)?;
    Ok(())
}

pub fn save_credential(credential: &SecretString) -> Result<(), ConfigError> {
    save_credential_to(&config_path(), credential)
}
