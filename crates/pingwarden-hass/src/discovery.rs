//! Home Assistant MQTT discovery documents and topics.
//!
//! The monitor shows up in Home Assistant as one device with a single
//! `problem` binary sensor. The sensor is "on" (`"1"`) while the target is
//! unreachable.

use serde::Serialize;

use crate::error::HassResult;

/// Object id of the connectivity sensor.
pub const SENSOR_ID: &str = "internet";
/// Discovery component the sensor is published under.
pub const COMPONENT: &str = "binary_sensor";

/// Identity of the monitor as a Home Assistant device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HassConfig {
    /// Broker URI, see [`crate::MqttEndpoint`].
    pub uri: String,
    /// Unique id of the device, also used as the MQTT client id.
    pub unique_id: String,
    /// Display name of the device.
    pub name: String,
    /// Discovery prefix configured in Home Assistant.
    pub topic_prefix: String,
    /// Reported software version.
    pub sw_version: String,
}

/// Device block embedded in the discovery document.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Device {
    pub identifiers: Vec<String>,
    pub name: String,
    pub sw_version: String,
    pub hw_version: String,
    pub serial_number: String,
    pub model: String,
    pub model_id: String,
    pub manufacturer: String,
    pub configuration_url: String,
}

impl Device {
    pub fn new(config: &HassConfig) -> Self {
        Self {
            identifiers: vec![config.unique_id.clone()],
            name: config.name.clone(),
            sw_version: config.sw_version.clone(),
            hw_version: "N/A".to_string(),
            serial_number: "N/A".to_string(),
            model: "NetworkMonitor".to_string(),
            model_id: "NetworkMonitor".to_string(),
            manufacturer: "pingwarden".to_string(),
            configuration_url: "http://localhost/".to_string(),
        }
    }
}

/// Discovery document for the connectivity sensor.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SensorDiscovery {
    pub name: String,
    pub unique_id: String,
    pub object_id: String,
    pub state_topic: String,
    pub value_template: String,
    pub device_class: String,
    pub payload_on: String,
    pub payload_off: String,
    pub device: Device,
}

/// Topics the sink publishes to and listens on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    /// Retained discovery document.
    pub config: String,
    /// Retained sensor state.
    pub state: String,
    /// Home Assistant birth/last-will topic.
    pub status: String,
}

impl Topics {
    pub fn new(prefix: &str, unique_id: &str) -> Self {
        let prefix = prefix.trim_end_matches('/');
        Self {
            config: format!("{prefix}/{COMPONENT}/{unique_id}/{SENSOR_ID}/config"),
            state: format!("{prefix}/{COMPONENT}/{unique_id}/state"),
            status: format!("{prefix}/status"),
        }
    }
}

/// Build the discovery document for `config`.
pub fn sensor_discovery(config: &HassConfig, topics: &Topics) -> SensorDiscovery {
    SensorDiscovery {
        name: "Internet".to_string(),
        unique_id: format!("{}_{SENSOR_ID}", config.unique_id),
        object_id: format!("{}_{SENSOR_ID}", config.unique_id),
        state_topic: topics.state.clone(),
        value_template: format!("{{{{ value_json.{SENSOR_ID} }}}}"),
        device_class: "problem".to_string(),
        payload_on: encode_health(false).to_string(),
        payload_off: encode_health(true).to_string(),
        device: Device::new(config),
    }
}

/// Sensor encoding of the health flag: healthy is "0", a problem is "1".
pub fn encode_health(healthy: bool) -> &'static str {
    if healthy { "0" } else { "1" }
}

/// JSON state document for the sensor.
pub fn state_payload(healthy: bool) -> HassResult<String> {
    let mut values = serde_json::Map::new();
    values.insert(
        SENSOR_ID.to_string(),
        serde_json::Value::String(encode_health(healthy).to_string()),
    );
    Ok(serde_json::to_string(&values)?)
}
