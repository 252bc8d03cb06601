//! Control: a controllable "thing" reconstructed from the object graph.
//!
//! A control groups one or more states under a device kind (a dimmer, a
//! thermostat, a blind, …). Each bound state carries its slot name inside
//! the control (`SET`, `ACTUAL`, `ON`, …), which is later translated into a
//! semantic [`ControlType`].

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize, Serializer};

use crate::object::{ObjectType, ValueType};
use crate::smart_name::SmartName;

/// Device kinds recognised by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeviceKind {
    AirCondition,
    Blind,
    Button,
    Cie,
    Ct,
    Dimmer,
    Door,
    FireAlarm,
    FloodAlarm,
    Gate,
    Hue,
    Humidity,
    Illuminance,
    Info,
    Light,
    Lock,
    Motion,
    Rgb,
    RgbSingle,
    RgbwSingle,
    Slider,
    Socket,
    Temperature,
    Thermostat,
    VacuumCleaner,
    Volume,
    VolumeGroup,
    Window,
    WindowTilt,
}

impl DeviceKind {
    pub const ALL: [Self; 29] = [
        Self::AirCondition,
        Self::Blind,
        Self::Button,
        Self::Cie,
        Self::Ct,
        Self::Dimmer,
        Self::Door,
        Self::FireAlarm,
        Self::FloodAlarm,
        Self::Gate,
        Self::Hue,
        Self::Humidity,
        Self::Illuminance,
        Self::Info,
        Self::Light,
        Self::Lock,
        Self::Motion,
        Self::Rgb,
        Self::RgbSingle,
        Self::RgbwSingle,
        Self::Slider,
        Self::Socket,
        Self::Temperature,
        Self::Thermostat,
        Self::VacuumCleaner,
        Self::Volume,
        Self::VolumeGroup,
        Self::Window,
        Self::WindowTilt,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AirCondition => "airCondition",
            Self::Blind => "blind",
            Self::Button => "button",
            Self::Cie => "cie",
            Self::Ct => "ct",
            Self::Dimmer => "dimmer",
            Self::Door => "door",
            Self::FireAlarm => "fireAlarm",
            Self::FloodAlarm => "floodAlarm",
            Self::Gate => "gate",
            Self::Hue => "hue",
            Self::Humidity => "humidity",
            Self::Illuminance => "illuminance",
            Self::Info => "info",
            Self::Light => "light",
            Self::Lock => "lock",
            Self::Motion => "motion",
            Self::Rgb => "rgb",
            Self::RgbSingle => "rgbSingle",
            Self::RgbwSingle => "rgbwSingle",
            Self::Slider => "slider",
            Self::Socket => "socket",
            Self::Temperature => "temperature",
            Self::Thermostat => "thermostat",
            Self::VacuumCleaner => "vacuumCleaner",
            Self::Volume => "volume",
            Self::VolumeGroup => "volumeGroup",
            Self::Window => "window",
            Self::WindowTilt => "windowTilt",
        }
    }

    /// Kind assumed for a smart-named state that does not declare one.
    ///
    /// Booleans (and mixed values) are switched like a socket, numbers are
    /// dimmed, anything else falls back to a socket.
    #[must_use]
    pub fn inferred_from(value_type: Option<ValueType>) -> Self {
        match value_type {
            Some(ValueType::Number) => Self::Dimmer,
            _ => Self::Socket,
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown device kind name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown device kind {0:?}")]
pub struct UnknownDeviceKind(pub String);

impl FromStr for DeviceKind {
    type Err = UnknownDeviceKind;

    /// Smart-name annotations are hand-written, so the match ignores case
    /// (`LIGHT` and `light` name the same kind).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownDeviceKind(s.to_string()))
    }
}

/// Semantic control vocabulary exposed by the projection.
///
/// Slots without a known translation keep their own name in [`Self::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ControlType {
    Power,
    Dimmer,
    BlindPosition,
    Stop,
    OpenedClosed,
    Alarm,
    Color,
    ColorRed,
    ColorGreen,
    ColorBlue,
    ColorWhite,
    ColorTemperature,
    OpenClose,
    Open,
    Close,
    FanSpeed,
    BoostMode,
    SwingPosition,
    Saturation,
    SwingOnOff,
    ActualTemperature,
    Humidity,
    Illuminance,
    Level,
    Volume,
    TargetTemperature,
    Lock,
    Valve,
    Other(String),
}

impl ControlType {
    const KNOWN: [Self; 28] = [
        Self::Power,
        Self::Dimmer,
        Self::BlindPosition,
        Self::Stop,
        Self::OpenedClosed,
        Self::Alarm,
        Self::Color,
        Self::ColorRed,
        Self::ColorGreen,
        Self::ColorBlue,
        Self::ColorWhite,
        Self::ColorTemperature,
        Self::OpenClose,
        Self::Open,
        Self::Close,
        Self::FanSpeed,
        Self::BoostMode,
        Self::SwingPosition,
        Self::Saturation,
        Self::SwingOnOff,
        Self::ActualTemperature,
        Self::Humidity,
        Self::Illuminance,
        Self::Level,
        Self::Volume,
        Self::TargetTemperature,
        Self::Lock,
        Self::Valve,
    ];

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Power => "power",
            Self::Dimmer => "dimmer",
            Self::BlindPosition => "blindPosition",
            Self::Stop => "stop",
            Self::OpenedClosed => "openedClosed",
            Self::Alarm => "alarm",
            Self::Color => "color",
            Self::ColorRed => "colorRed",
            Self::ColorGreen => "colorGreen",
            Self::ColorBlue => "colorBlue",
            Self::ColorWhite => "colorWhite",
            Self::ColorTemperature => "colorTemperature",
            Self::OpenClose => "openClose",
            Self::Open => "open",
            Self::Close => "close",
            Self::FanSpeed => "fanSpeed",
            Self::BoostMode => "boostMode",
            Self::SwingPosition => "swingPosition",
            Self::Saturation => "saturation",
            Self::SwingOnOff => "swingOnOff",
            Self::ActualTemperature => "actualTemperature",
            Self::Humidity => "humidity",
            Self::Illuminance => "illuminance",
            Self::Level => "level",
            Self::Volume => "volume",
            Self::TargetTemperature => "targetTemperature",
            Self::Lock => "lock",
            Self::Valve => "valve",
            Self::Other(name) => name,
        }
    }

    /// Parse a vocabulary word; `None` for anything outside the vocabulary.
    #[must_use]
    pub fn known(word: &str) -> Option<Self> {
        Self::KNOWN.into_iter().find(|t| t.as_str() == word)
    }

    /// Translate a slot of a device kind into its semantic control type.
    #[must_use]
    pub fn for_slot(kind: DeviceKind, slot: &str, value_type: Option<ValueType>) -> Self {
        use DeviceKind as K;

        let mapped = match (kind, slot) {
            (K::AirCondition, "SET") | (K::Thermostat, "SET") => Some(Self::TargetTemperature),
            (K::AirCondition | K::Thermostat | K::Temperature, "ACTUAL") => {
                Some(Self::ActualTemperature)
            }
            (K::AirCondition, "SPEED") => Some(Self::FanSpeed),
            (K::AirCondition | K::Thermostat | K::VacuumCleaner, "POWER") => Some(Self::Power),
            (K::AirCondition | K::Thermostat, "HUMIDITY") | (K::Humidity, "ACTUAL") => {
                Some(Self::Humidity)
            }
            (K::AirCondition | K::Thermostat, "BOOST") => Some(Self::BoostMode),
            (K::AirCondition, "SWING") => match value_type {
                Some(ValueType::Boolean) => Some(Self::SwingOnOff),
                Some(ValueType::Number) => Some(Self::SwingPosition),
                _ => None,
            },
            (K::Blind, "SET") => Some(Self::BlindPosition),
            (K::Blind | K::Gate, "STOP") => Some(Self::Stop),
            (K::Blind | K::Lock, "OPEN") => Some(Self::Open),
            (K::Blind, "CLOSE") => Some(Self::Close),
            (K::Cie, "CIE") | (K::Hue, "HUE") | (K::RgbSingle, "RGB") | (K::RgbwSingle, "RGBW") => {
                Some(Self::Color)
            }
            (
                K::Cie | K::Ct | K::Hue | K::Rgb | K::RgbSingle | K::RgbwSingle,
                "DIMMER" | "BRIGHTNESS",
            )
            | (K::Dimmer, "SET") => Some(Self::Dimmer),
            (K::Cie | K::Ct | K::Hue | K::Rgb | K::RgbSingle | K::RgbwSingle, "TEMPERATURE") => {
                Some(Self::ColorTemperature)
            }
            (
                K::Cie | K::Ct | K::Hue | K::Rgb | K::RgbSingle | K::RgbwSingle | K::Dimmer,
                "ON",
            )
            | (K::Light | K::Socket, "SET") => Some(Self::Power),
            (K::Hue, "SATURATION") => Some(Self::Saturation),
            (K::Rgb, "RED") => Some(Self::ColorRed),
            (K::Rgb, "GREEN") => Some(Self::ColorGreen),
            (K::Rgb, "BLUE") => Some(Self::ColorBlue),
            (K::Rgb, "WHITE") => Some(Self::ColorWhite),
            (K::Door | K::Window | K::WindowTilt, "ACTUAL") => Some(Self::OpenedClosed),
            (K::FireAlarm | K::FloodAlarm | K::Motion, "ACTUAL") => Some(Self::Alarm),
            (K::Gate, "SET") => Some(Self::OpenClose),
            (K::Illuminance, "ACTUAL") => Some(Self::Illuminance),
            (K::Slider, "SET") => Some(Self::Level),
            (K::Lock, "SET") => Some(Self::Lock),
            (K::Volume | K::VolumeGroup, "SET") => Some(Self::Volume),
            _ => None,
        };
        mapped.unwrap_or_else(|| Self::Other(slot.to_string()))
    }
}

impl fmt::Display for ControlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ControlType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A state bound into a slot of a control, with its live metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundState {
    /// Slot name inside the control (`SET`, `ACTUAL`, `ON`, …).
    pub name: String,
    pub id: String,
    pub role: Option<String>,
    pub value_type: Option<ValueType>,
    pub writable: bool,
    pub readable: bool,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub unit: Option<String>,
    pub labels: Option<BTreeMap<String, String>>,
    pub smart_name: Option<SmartName>,
    /// Role the slot expects, used when the object has none.
    pub default_role: Option<String>,
    pub default_unit: Option<String>,
    pub indicator: bool,
}

/// The object a control is attached to.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlObject {
    pub id: String,
    pub kind: ObjectType,
    /// Resolved display name.
    pub name: String,
    pub icon: Option<String>,
    /// `false` for controls declared through a smart name.
    pub auto_detected: bool,
    pub toggle: Option<bool>,
}

/// Reference to a room or function enum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumRef {
    pub id: String,
    /// Resolved display name.
    pub name: String,
}

/// Classifier output.
#[derive(Debug, Clone, PartialEq)]
pub struct Control {
    pub kind: DeviceKind,
    pub states: Vec<BoundState>,
    pub object: ControlObject,
    /// Display names taken from the smart name (split on `,`).
    pub names: Vec<String>,
    pub room: Option<EnumRef>,
    pub function: Option<EnumRef>,
}

impl Control {
    /// Ids of every bound state.
    pub fn state_ids(&self) -> impl Iterator<Item = &str> {
        self.states.iter().map(|s| s.id.as_str())
    }
}
