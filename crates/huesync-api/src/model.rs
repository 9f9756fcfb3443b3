// ── Hub wire models ──
//
// Entities arrive as JSON objects keyed by id; the id is stamped onto
// each record after decoding so downstream code can treat records as
// self-describing.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Opaque sensor readings (`state` object), compared as a whole.
pub type SensorState = serde_json::Map<String, Value>;

/// Opaque sensor configuration (`config` object).
pub type SensorConfig = serde_json::Map<String, Value>;

// ── Addressing ──────────────────────────────────────────────────────

/// The three entity families a hub manages.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EntityKind {
    Light,
    Sensor,
    Group,
}

impl EntityKind {
    /// Collection name in the REST path (`lights`, `sensors`, `groups`).
    pub fn collection(self) -> &'static str {
        match self {
            Self::Light => "lights",
            Self::Sensor => "sensors",
            Self::Group => "groups",
        }
    }
}

/// A reference to one remote entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: String,
}

impl EntityRef {
    pub fn light(id: impl Into<String>) -> Self {
        Self {
            kind: EntityKind::Light,
            id: id.into(),
        }
    }

    pub fn sensor(id: impl Into<String>) -> Self {
        Self {
            kind: EntityKind::Sensor,
            id: id.into(),
        }
    }

    pub fn group(id: impl Into<String>) -> Self {
        Self {
            kind: EntityKind::Group,
            id: id.into(),
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.id)
    }
}

// ── Lights ──────────────────────────────────────────────────────────

/// Which color fields of a light are authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ColorMode {
    Hs,
    Xy,
    Ct,
}

/// Light (and derived group) state as reported by the hub.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LightState {
    #[serde(default)]
    pub on: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bri: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hue: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sat: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ct: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xy: Option<[f64; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colormode: Option<ColorMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effect: Option<String>,
    #[serde(default = "default_reachable")]
    pub reachable: bool,
}

fn default_reachable() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FullLight {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub light_type: String,
    #[serde(rename = "modelid", default)]
    pub model_id: Option<String>,
    #[serde(rename = "uniqueid", default)]
    pub unique_id: Option<String>,
    #[serde(rename = "manufacturername", default)]
    pub manufacturer: Option<String>,
    #[serde(rename = "swversion", default)]
    pub sw_version: Option<String>,
    #[serde(default)]
    pub state: LightState,
}

// ── Sensors ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FullSensor {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub sensor_type: String,
    #[serde(rename = "modelid", default)]
    pub model_id: Option<String>,
    #[serde(rename = "uniqueid", default)]
    pub unique_id: Option<String>,
    #[serde(default)]
    pub state: SensorState,
    #[serde(default)]
    pub config: SensorConfig,
}

// ── Groups ──────────────────────────────────────────────────────────

/// A hub group. `state` is never taken from the wire; it is derived
/// from the member lights by the sync engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FullGroup {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub group_type: String,
    #[serde(default)]
    pub lights: Vec<String>,
    #[serde(default, skip_deserializing)]
    pub state: LightState,
}

// ── Hub configuration ───────────────────────────────────────────────

/// Subset of the hub's `config` resource used for identification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "bridgeid", default)]
    pub bridge_id: Option<String>,
    #[serde(rename = "modelid", default)]
    pub model_id: Option<String>,
    #[serde(default)]
    pub mac: Option<String>,
    #[serde(rename = "swversion", default)]
    pub sw_version: Option<String>,
    #[serde(rename = "apiversion", default)]
    pub api_version: Option<String>,
}

// ── Outbound deltas ─────────────────────────────────────────────────

/// A partial state change. Only fields that are set go on the wire.
///
/// Typed fields cover lights and groups; `extra` carries free-form
/// sensor state fields (e.g. `status`, `flag`).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StateUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bri: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hue: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sat: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ct: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xy: Option<[f64; 2]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effect: Option<String>,
    #[serde(rename = "transitiontime", skip_serializing_if = "Option::is_none")]
    pub transition_time: Option<u16>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl StateUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_on(mut self, on: bool) -> Self {
        self.on = Some(on);
        self
    }

    pub fn with_brightness(mut self, bri: u8) -> Self {
        self.bri = Some(bri);
        self
    }

    pub fn with_hue_saturation(mut self, hue: u16, sat: u8) -> Self {
        self.hue = Some(hue);
        self.sat = Some(sat);
        self
    }

    pub fn with_color_temperature(mut self, ct: u16) -> Self {
        self.ct = Some(ct);
        self
    }

    pub fn with_xy(mut self, x: f64, y: f64) -> Self {
        self.xy = Some([x, y]);
        self
    }

    pub fn with_alert(mut self, alert: impl Into<String>) -> Self {
        self.alert = Some(alert.into());
        self
    }

    pub fn with_effect(mut self, effect: impl Into<String>) -> Self {
        self.effect = Some(effect.into());
        self
    }

    pub fn with_transition_time(mut self, deciseconds: u16) -> Self {
        self.transition_time = Some(deciseconds);
        self
    }

    /// Set an arbitrary state field (sensor state updates).
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(name.into(), value.into());
        self
    }

    /// A color-temperature change that does not touch brightness.
    ///
    /// Such an update must not switch a light on implicitly.
    pub fn is_color_temperature_only(&self) -> bool {
        self.ct.is_some() && self.bri.is_none()
    }

    /// Only the power flag is set.
    pub fn is_power_only(&self) -> bool {
        self.on.is_some()
            && self.bri.is_none()
            && self.hue.is_none()
            && self.sat.is_none()
            && self.ct.is_none()
            && self.xy.is_none()
            && self.alert.is_none()
            && self.effect.is_none()
            && self.extra.is_empty()
    }
}

/// A partial sensor configuration change.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConfigUpdate {
    #[serde(flatten)]
    pub fields: serde_json::Map<String, Value>,
}

impl ConfigUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
