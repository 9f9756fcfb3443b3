// Hub REST (v1) HTTP client
//
// Wraps `reqwest::Client` with credential-scoped URL construction and
// unwrapping of the hub's error envelope. The hub answers most failures
// with HTTP 200 and a body of `[{"error": {"type": N, ...}}]`, so status
// codes alone are not enough to detect errors.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use indexmap::IndexMap;
use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, trace};
use url::Url;

use crate::client::HubClient;
use crate::error::Error;
use crate::model::{
    ConfigUpdate, EntityKind, EntityRef, FullGroup, FullLight, FullSensor, GlobalConfig,
    StateUpdate,
};
use crate::transport::TransportConfig;

/// HTTP client for one hub.
///
/// The credential ("username" in hub terms) is held behind an
/// `ArcSwapOption` so [`authenticate`](HubClient::authenticate) can
/// replace it while other requests are in flight.
pub struct HttpHubClient {
    http: reqwest::Client,
    base_url: Url,
    timeout_secs: u64,
    credential: ArcSwapOption<SecretString>,
    closed: AtomicBool,
}

impl HttpHubClient {
    /// Create a client for the hub at `base_url` (e.g. `http://192.168.1.2`).
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self {
            http,
            base_url,
            timeout_secs: transport.timeout.as_secs(),
            credential: ArcSwapOption::empty(),
            closed: AtomicBool::new(false),
        })
    }

    /// Create a client around a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self {
            http,
            base_url,
            timeout_secs: 0,
            credential: ArcSwapOption::empty(),
            closed: AtomicBool::new(false),
        }
    }

    /// Preset a credential without verifying it.
    pub fn with_credential(self, credential: SecretString) -> Self {
        self.credential.store(Some(Arc::new(credential)));
        self
    }

    /// The hub base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Whether a credential is currently set.
    pub fn has_credential(&self) -> bool {
        self.credential.load().is_some()
    }

    /// Refuse all further requests with [`Error::Closed`].
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// `{base}/api/{path}`
    fn api_url(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        if path.is_empty() {
            return Ok(Url::parse(&format!("{base}/api"))?);
        }
        Ok(Url::parse(&format!("{base}/api/{path}"))?)
    }

    /// `{base}/api/{credential}/{path}`
    fn user_url(&self, path: &str, operation: &'static str) -> Result<Url, Error> {
        let credential = self
            .credential
            .load_full()
            .ok_or(Error::NoCredential { operation })?;
        self.api_url(&format!("{}/{path}", credential.expose_secret()))
    }

    fn entity_path(entity: &EntityRef, suffix: &str) -> String {
        if suffix.is_empty() {
            format!("{}/{}", entity.kind.collection(), entity.id)
        } else {
            format!("{}/{}/{suffix}", entity.kind.collection(), entity.id)
        }
    }

    // ── Request helpers ──────────────────────────────────────────────

    fn ensure_open(&self) -> Result<(), Error> {
        if self.closed.load(Ordering::Acquire) {
            Err(Error::Closed)
        } else {
            Ok(())
        }
    }

    fn transport_error(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout {
                timeout_secs: self.timeout_secs,
            }
        } else {
            Error::Transport(err)
        }
    }

    /// Send a request and return the decoded JSON body, with hub error
    /// entries already turned into `Err`.
    async fn request(
        &self,
        method: Method,
        url: Url,
        resource: &str,
        body: Option<&Value>,
    ) -> Result<Value, Error> {
        self.ensure_open()?;
        debug!(%method, resource, "hub request");

        let mut builder = self.http.request(method, url);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        let resp = builder.send().await.map_err(|e| self.transport_error(e))?;

        let status = resp.status();
        if status.is_server_error() {
            return Err(Error::Unavailable {
                status: status.as_u16(),
            });
        }

        let text = resp.text().await.map_err(|e| self.transport_error(e))?;
        trace!(resource, body = %text, "hub response");

        let value: Value = serde_json::from_str(&text).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body: text.clone(),
        })?;

        if let Some(err) = hub_error(&value) {
            return Err(err);
        }

        if !status.is_success() {
            return Err(Error::Api {
                code: status.as_u16(),
                description: text,
            });
        }

        Ok(value)
    }

    async fn get<T: DeserializeOwned>(&self, url: Url, resource: &str) -> Result<T, Error> {
        let value = self.request(Method::GET, url, resource, None).await?;
        decode(value)
    }

    async fn fetch_keyed<T: DeserializeOwned>(
        &self,
        kind: EntityKind,
        set_id: impl Fn(&mut T, String),
    ) -> Result<Vec<T>, Error> {
        let url = self.user_url(kind.collection(), "list")?;
        let map: IndexMap<String, T> = self.get(url, kind.collection()).await?;
        Ok(map
            .into_iter()
            .map(|(id, mut entity)| {
                set_id(&mut entity, id);
                entity
            })
            .collect())
    }
}

// ── Envelope helpers ────────────────────────────────────────────────

/// Extract the first `{"error": {...}}` entry from a hub response array.
fn hub_error(value: &Value) -> Option<Error> {
    value.as_array()?.iter().find_map(|entry| {
        let err = entry.get("error")?;
        let code = err
            .get("type")
            .and_then(Value::as_u64)
            .and_then(|c| u16::try_from(c).ok())
            .unwrap_or_default();
        let description = err
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or_default();
        Some(Error::from_hub(code, description))
    })
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, Error> {
    let body = value.to_string();
    serde_json::from_value(value).map_err(|e| Error::Deserialization {
        message: e.to_string(),
        body,
    })
}

// ── HubClient impl ──────────────────────────────────────────────────

#[async_trait]
impl HubClient for HttpHubClient {
    async fn fetch_lights(&self) -> Result<Vec<FullLight>, Error> {
        self.fetch_keyed(EntityKind::Light, |l: &mut FullLight, id| l.id = id)
            .await
    }

    async fn fetch_sensors(&self) -> Result<Vec<FullSensor>, Error> {
        self.fetch_keyed(EntityKind::Sensor, |s: &mut FullSensor, id| s.id = id)
            .await
    }

    async fn fetch_groups(&self) -> Result<Vec<FullGroup>, Error> {
        self.fetch_keyed(EntityKind::Group, |g: &mut FullGroup, id| g.id = id)
            .await
    }

    async fn fetch_global_config(&self) -> Result<GlobalConfig, Error> {
        let url = if self.has_credential() {
            self.user_url("config", "config")?
        } else {
            self.api_url("config")?
        };
        self.get(url, "config").await
    }

    async fn authenticate(&self, credential: &SecretString) -> Result<(), Error> {
        let url = self.api_url(&format!("{}/lights", credential.expose_secret()))?;
        self.request(Method::GET, url, "lights", None).await?;
        self.credential.store(Some(Arc::new(credential.clone())));
        debug!("credential accepted by hub");
        Ok(())
    }

    async fn provision_credential(&self, device_label: &str) -> Result<SecretString, Error> {
        let url = self.api_url("")?;
        let body = json!({ "devicetype": device_label });
        let value = self.request(Method::POST, url, "", Some(&body)).await?;

        let username = value
            .as_array()
            .and_then(|entries| {
                entries.iter().find_map(|e| {
                    e.pointer("/success/username")
                        .and_then(Value::as_str)
                        .map(String::from)
                })
            })
            .ok_or_else(|| Error::Deserialization {
                message: "provisioning response carried no username".into(),
                body: value.to_string(),
            })?;

        Ok(SecretString::from(username))
    }

    async fn set_entity_state(
        &self,
        entity: &EntityRef,
        update: &StateUpdate,
    ) -> Result<(), Error> {
        let suffix = match entity.kind {
            EntityKind::Light | EntityKind::Sensor => "state",
            EntityKind::Group => "action",
        };
        let resource = Self::entity_path(entity, suffix);
        let url = self.user_url(&resource, "state update")?;
        let body = serde_json::to_value(update).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body: String::new(),
        })?;
        self.request(Method::PUT, url, &resource, Some(&body))
            .await
            .map(drop)
    }

    async fn set_entity_config(
        &self,
        entity: &EntityRef,
        update: &ConfigUpdate,
    ) -> Result<(), Error> {
        let resource = match entity.kind {
            EntityKind::Light | EntityKind::Sensor => Self::entity_path(entity, "config"),
            EntityKind::Group => Self::entity_path(entity, ""),
        };
        let url = self.user_url(&resource, "config update")?;
        let body = serde_json::to_value(update).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body: String::new(),
        })?;
        self.request(Method::PUT, url, &resource, Some(&body))
            .await
            .map(drop)
    }

    async fn start_search(&self, serial_numbers: &[String]) -> Result<(), Error> {
        let url = self.user_url("lights", "search")?;
        let body = (!serial_numbers.is_empty()).then(|| json!({ "deviceid": serial_numbers }));
        self.request(Method::POST, url, "lights", body.as_ref())
            .await
            .map(drop)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn hub_error_picks_first_error_entry() {
        let body = json!([
            {"success": {"/lights/1/state/on": true}},
            {"error": {"type": 201, "address": "/lights/1/state/bri", "description": "device is set to off"}}
        ]);
        assert!(matches!(hub_error(&body), Some(Error::DeviceOff { .. })));
    }

    #[test]
    fn hub_error_ignores_success_only_bodies() {
        assert!(hub_error(&json!([{"success": {}}])).is_none());
        assert!(hub_error(&json!({"1": {"name": "x"}})).is_none());
    }

    #[test]
    fn user_url_requires_credential() {
        let client =
            HttpHubClient::with_client(reqwest::Client::new(), "http://hub".parse().unwrap());
        assert!(matches!(
            client.user_url("lights", "list"),
            Err(Error::NoCredential { operation: "list" })
        ));

        let client = client.with_credential(SecretString::from("abc"));
        assert_eq!(
            client.user_url("lights", "list").unwrap().as_str(),
            "http://hub/api/abc/lights"
        );
    }

    #[test]
    fn entity_paths() {
        assert_eq!(
            HttpHubClient::entity_path(&EntityRef::group("4"), "action"),
            "groups/4/action"
        );
        assert_eq!(HttpHubClient::entity_path(&EntityRef::group("4"), ""), "groups/4");
    }
}
