use serde::Serialize;

use huesync_api::model::GlobalConfig;

/// Identity of the hub, pushed to the host after each (re)connection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BridgeProperties {
    pub serial_number: Option<String>,
    pub model_id: Option<String>,
    pub mac_address: Option<String>,
    pub firmware_version: Option<String>,
}

impl BridgeProperties {
    pub fn from_global_config(config: &GlobalConfig) -> Self {
        Self {
            serial_number: config
                .bridge_id
                .as_deref()
                .map(serial_from_bridge_id)
                .or_else(|| config.mac.as_deref().map(|mac| mac.replace(':', ""))),
            model_id: config.model_id.clone(),
            mac_address: config.mac.clone(),
            firmware_version: config.sw_version.clone(),
        }
    }
}

/// The 16-character bridge id is the MAC with `FFFE` spliced in at
/// offset 6; the serial is the id with that infix removed.
fn serial_from_bridge_id(bridge_id: &str) -> String {
    match (bridge_id.get(..6), bridge_id.get(10..)) {
        (Some(head), Some(tail)) => format!("{head}{tail}"),
        _ => bridge_id.to_owned(),
    }
}
