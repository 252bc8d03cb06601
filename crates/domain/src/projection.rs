//! Room-indexed projection of classified controls.
//!
//! This is the document handed to AI agents and workflow nodes: rooms hold
//! device records, and each record maps semantic control types (`power`,
//! `dimmer`, `targetTemperature`, …) to the state that implements them.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::control::DeviceKind;
use crate::object::ValueType;

/// Room name used for controls without a room assignment.
pub const NO_ROOM: &str = "No room";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub room_name: String,
    pub devices_in_room: Vec<DeviceRecord>,
}

impl Room {
    #[must_use]
    pub fn new(room_name: impl Into<String>) -> Self {
        Self {
            room_name: room_name.into(),
            devices_in_room: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRecord {
    pub device_name: String,
    pub device_type: DeviceKind,
    pub friendly_device_names: Vec<String>,
    pub room: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub functionality: Option<String>,
    /// Only filled when icons were requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub controls: BTreeMap<String, ControlBinding>,
}

/// How one semantic control is implemented.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlBinding {
    pub state_id: String,
    pub control_type: String,
    #[serde(rename = "ioBrokerValueType")]
    pub value_type: ValueType,
    pub writable: bool,
    pub readable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub states: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn should_serialize_with_camel_case_keys() {
        let mut room = Room::new(NO_ROOM);
        room.devices_in_room.push(DeviceRecord {
            device_name: "Lamp".to_string(),
            device_type: DeviceKind::Socket,
            friendly_device_names: vec!["Lamp".to_string()],
            room: NO_ROOM.to_string(),
            functionality: None,
            icon: None,
            controls: BTreeMap::from([(
                "power".to_string(),
                ControlBinding {
                    state_id: "zone.3.switch".to_string(),
                    control_type: "power".to_string(),
                    value_type: ValueType::Boolean,
                    writable: true,
                    readable: true,
                    min: None,
                    max: None,
                    unit: None,
                    states: None,
                    role: Some("switch".to_string()),
                },
            )]),
        });

        let json = serde_json::to_value(&room).unwrap();

        assert_eq!(json["roomName"], "No room");
        let device = &json["devicesInRoom"][0];
        assert_eq!(device["deviceType"], "socket");
        assert!(device.get("functionality").is_none());
        assert_eq!(
            device["controls"]["power"],
            json!({
                "stateId": "zone.3.switch",
                "controlType": "power",
                "ioBrokerValueType": "boolean",
                "writable": true,
                "readable": true,
                "role": "switch"
            })
        );
    }
}
