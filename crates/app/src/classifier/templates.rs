//! Device templates: which states, recognised by role, make up each device kind.
//!
//! Templates are listed in detection priority order. More specific shapes
//! (an air conditioner needs a mode state on top of a target temperature)
//! come before the shapes they contain.

use iobridge_domain::control::DeviceKind;
use iobridge_domain::object::{Object, ValueType};

use RoleRule::{Any, Exact, Prefix};
use ValueType::{Boolean, Mixed, Number, String as Text};

/// How a slot recognises a state by its role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleRule {
    /// One of the listed roles.
    Exact(&'static [&'static str]),
    /// The role itself or any role below it (`level` covers `level.valve`).
    Prefix(&'static str),
    /// Any state.
    Any,
}

impl RoleRule {
    #[must_use]
    pub fn matches(self, role: Option<&str>) -> bool {
        match (self, role) {
            (Self::Any, _) => true,
            (_, None) => false,
            (Self::Exact(roles), Some(role)) => roles.contains(&role),
            (Self::Prefix(prefix), Some(role)) => {
                role == prefix
                    || role
                        .strip_prefix(prefix)
                        .is_some_and(|rest| rest.starts_with('.'))
            }
        }
    }

    /// The role a matching state is expected to carry.
    #[must_use]
    pub fn canonical(self) -> Option<&'static str> {
        match self {
            Self::Exact(roles) => roles.first().copied(),
            Self::Prefix(prefix) => Some(prefix),
            Self::Any => None,
        }
    }
}

/// One state position inside a device template.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlotTemplate {
    pub name: &'static str,
    pub role: RoleRule,
    /// Accepted value types; empty accepts any.
    pub types: &'static [ValueType],
    pub required: bool,
    /// The slot is written to (commands).
    pub writes: bool,
    pub reads: bool,
    pub indicator: bool,
    pub default_unit: Option<&'static str>,
}

impl SlotTemplate {
    const fn new(name: &'static str, role: RoleRule) -> Self {
        Self {
            name,
            role,
            types: &[],
            required: false,
            writes: false,
            reads: true,
            indicator: false,
            default_unit: None,
        }
    }

    const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    const fn writes(mut self) -> Self {
        self.writes = true;
        self
    }

    const fn write_only(mut self) -> Self {
        self.writes = true;
        self.reads = false;
        self
    }

    const fn types(mut self, types: &'static [ValueType]) -> Self {
        self.types = types;
        self
    }

    const fn unit(mut self, unit: &'static str) -> Self {
        self.default_unit = Some(unit);
        self
    }

    const fn indicator(mut self) -> Self {
        self.indicator = true;
        self
    }

    /// Whether `object` can fill this slot.
    #[must_use]
    pub fn accepts(&self, object: &Object) -> bool {
        let common = &object.common;
        self.role.matches(common.role.as_deref())
            && (self.types.is_empty()
                || common
                    .value_type
                    .is_some_and(|value_type| self.types.contains(&value_type)))
            && (!self.writes || common.write != Some(false))
    }
}

/// The states that make up one device kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceTemplate {
    pub kind: DeviceKind,
    pub slots: &'static [SlotTemplate],
}

impl DeviceTemplate {
    /// First required slot; explicit controls bind their object here.
    #[must_use]
    pub fn primary_slot(&self) -> Option<&'static SlotTemplate> {
        self.slots.iter().find(|slot| slot.required)
    }
}

const BOOL: &[ValueType] = &[Boolean];
const NUMBER: &[ValueType] = &[Number];
const SWITCHABLE: &[ValueType] = &[Boolean, Mixed, Number];

const ON: SlotTemplate = SlotTemplate::new("ON", Exact(&["switch.light", "switch"]))
    .types(BOOL)
    .writes();
const DIMMER: SlotTemplate = SlotTemplate::new("DIMMER", Exact(&["level.dimmer"]))
    .types(NUMBER)
    .writes()
    .unit("%");
const BRIGHTNESS: SlotTemplate = SlotTemplate::new("BRIGHTNESS", Exact(&["level.brightness"]))
    .types(NUMBER)
    .writes();
const COLOR_TEMPERATURE: SlotTemplate =
    SlotTemplate::new("TEMPERATURE", Exact(&["level.color.temperature"]))
        .types(NUMBER)
        .writes()
        .unit("K");
const ACTUAL_TEMPERATURE: SlotTemplate =
    SlotTemplate::new("ACTUAL", Exact(&["value.temperature"])).types(NUMBER).unit("°C");
const HUMIDITY: SlotTemplate =
    SlotTemplate::new("HUMIDITY", Exact(&["value.humidity"])).types(NUMBER).unit("%");
const BOOST: SlotTemplate = SlotTemplate::new("BOOST", Exact(&["switch.boost"]))
    .types(BOOL)
    .writes();
const POWER: SlotTemplate = SlotTemplate::new("POWER", Exact(&["switch.power"]))
    .types(BOOL)
    .writes();
const STOP: SlotTemplate = SlotTemplate::new("STOP", Exact(&["button.stop", "button.stop.blind"]))
    .types(BOOL)
    .write_only();

/// Indicators any device may carry, matched after its own slots.
pub const INDICATORS: &[SlotTemplate] = &[
    SlotTemplate::new(
        "UNREACH",
        Exact(&["indicator.maintenance.unreach", "indicator.unreach"]),
    )
    .types(BOOL)
    .indicator(),
    SlotTemplate::new(
        "LOWBAT",
        Exact(&["indicator.maintenance.lowbat", "indicator.lowbat"]),
    )
    .types(BOOL)
    .indicator(),
    SlotTemplate::new("MAINTAIN", Exact(&["indicator.maintenance"]))
        .types(BOOL)
        .indicator(),
    SlotTemplate::new("ERROR", Exact(&["indicator.error"])).indicator(),
    SlotTemplate::new("WORKING", Exact(&["indicator.working"])).indicator(),
];

/// Every device template, in detection priority order.
pub const TEMPLATES: &[DeviceTemplate] = &[
    DeviceTemplate {
        kind: DeviceKind::AirCondition,
        slots: &[
            SlotTemplate::new("SET", Exact(&["level.temperature"]))
                .types(NUMBER)
                .writes()
                .required()
                .unit("°C"),
            SlotTemplate::new("MODE", Exact(&["level.mode.airconditioner"]))
                .writes()
                .required(),
            ACTUAL_TEMPERATURE,
            SlotTemplate::new("SPEED", Exact(&["level.mode.fan"])).writes(),
            POWER,
            HUMIDITY,
            BOOST,
            SlotTemplate::new("SWING", Exact(&["level.mode.swing", "switch.mode.swing"])).writes(),
        ],
    },
    DeviceTemplate {
        kind: DeviceKind::Thermostat,
        slots: &[
            SlotTemplate::new("SET", Exact(&["level.temperature"]))
                .types(NUMBER)
                .writes()
                .required()
                .unit("°C"),
            ACTUAL_TEMPERATURE,
            HUMIDITY,
            BOOST,
            POWER,
        ],
    },
    DeviceTemplate {
        kind: DeviceKind::VacuumCleaner,
        slots: &[
            POWER.required(),
            SlotTemplate::new("MODE", Exact(&["level.mode.cleanup"]))
                .writes()
                .required(),
            SlotTemplate::new("BATTERY", Exact(&["value.battery"]))
                .types(NUMBER)
                .unit("%"),
        ],
    },
    DeviceTemplate {
        kind: DeviceKind::Blind,
        slots: &[
            SlotTemplate::new("SET", Exact(&["level.blind"]))
                .types(NUMBER)
                .writes()
                .required()
                .unit("%"),
            SlotTemplate::new("ACTUAL", Exact(&["value.blind"]))
                .types(NUMBER)
                .unit("%"),
            STOP,
            SlotTemplate::new("OPEN", Exact(&["button.open.blind"]))
                .types(BOOL)
                .write_only(),
            SlotTemplate::new("CLOSE", Exact(&["button.close.blind"]))
                .types(BOOL)
                .write_only(),
        ],
    },
    DeviceTemplate {
        kind: DeviceKind::Gate,
        slots: &[
            SlotTemplate::new("SET", Exact(&["switch.gate"]))
                .types(BOOL)
                .writes()
                .required(),
            SlotTemplate::new("ACTUAL", Exact(&["value.gate"])),
            STOP,
        ],
    },
    DeviceTemplate {
        kind: DeviceKind::Lock,
        slots: &[
            SlotTemplate::new("SET", Exact(&["switch.lock"]))
                .types(BOOL)
                .writes()
                .required(),
            SlotTemplate::new("ACTUAL", Exact(&["state.lock"])),
            SlotTemplate::new("OPEN", Exact(&["button.open.door", "button.open"]))
                .types(BOOL)
                .write_only(),
        ],
    },
    DeviceTemplate {
        kind: DeviceKind::RgbwSingle,
        slots: &[
            SlotTemplate::new("RGBW", Exact(&["level.color.rgbw"]))
                .types(&[Text])
                .writes()
                .required(),
            DIMMER,
            BRIGHTNESS,
            COLOR_TEMPERATURE,
            ON,
        ],
    },
    DeviceTemplate {
        kind: DeviceKind::RgbSingle,
        slots: &[
            SlotTemplate::new("RGB", Exact(&["level.color.rgb"]))
                .types(&[Text])
                .writes()
                .required(),
            DIMMER,
            BRIGHTNESS,
            COLOR_TEMPERATURE,
            ON,
        ],
    },
    DeviceTemplate {
        kind: DeviceKind::Rgb,
        slots: &[
            SlotTemplate::new("RED", Exact(&["level.color.red"]))
                .types(NUMBER)
                .writes()
                .required(),
            SlotTemplate::new("GREEN", Exact(&["level.color.green"]))
                .types(NUMBER)
                .writes()
                .required(),
            SlotTemplate::new("BLUE", Exact(&["level.color.blue"]))
                .types(NUMBER)
                .writes()
                .required(),
            SlotTemplate::new("WHITE", Exact(&["level.color.white"]))
                .types(NUMBER)
                .writes(),
            DIMMER,
            BRIGHTNESS,
            COLOR_TEMPERATURE,
            ON,
        ],
    },
    DeviceTemplate {
        kind: DeviceKind::Hue,
        slots: &[
            SlotTemplate::new("HUE", Exact(&["level.color.hue"]))
                .types(NUMBER)
                .writes()
                .required()
                .unit("°"),
            DIMMER,
            BRIGHTNESS,
            SlotTemplate::new("SATURATION", Exact(&["level.color.saturation"]))
                .types(NUMBER)
                .writes(),
            COLOR_TEMPERATURE,
            ON,
        ],
    },
    DeviceTemplate {
        kind: DeviceKind::Cie,
        slots: &[
            SlotTemplate::new("CIE", Exact(&["level.color.cie"]))
                .types(&[Text])
                .writes()
                .required(),
            DIMMER,
            BRIGHTNESS,
            COLOR_TEMPERATURE,
            ON,
        ],
    },
    DeviceTemplate {
        kind: DeviceKind::Ct,
        slots: &[COLOR_TEMPERATURE.required(), DIMMER, BRIGHTNESS, ON],
    },
    DeviceTemplate {
        kind: DeviceKind::Dimmer,
        slots: &[
            SlotTemplate::new("SET", Exact(&["level.dimmer", "level.brightness"]))
                .types(NUMBER)
                .writes()
                .required()
                .unit("%"),
            SlotTemplate::new("ACTUAL", Exact(&["value.dimmer"]))
                .types(NUMBER)
                .unit("%"),
            ON,
        ],
    },
    DeviceTemplate {
        kind: DeviceKind::VolumeGroup,
        slots: &[
            SlotTemplate::new("SET", Exact(&["level.volume.group"]))
                .types(NUMBER)
                .writes()
                .required()
                .unit("%"),
            SlotTemplate::new("ACTUAL", Exact(&["value.volume.group"])).types(NUMBER),
            SlotTemplate::new("MUTE", Exact(&["media.mute.group"]))
                .types(BOOL)
                .writes(),
        ],
    },
    DeviceTemplate {
        kind: DeviceKind::Volume,
        slots: &[
            SlotTemplate::new("SET", Exact(&["level.volume"]))
                .types(NUMBER)
                .writes()
                .required()
                .unit("%"),
            SlotTemplate::new("ACTUAL", Exact(&["value.volume"])).types(NUMBER),
            SlotTemplate::new("MUTE", Exact(&["media.mute"]))
                .types(BOOL)
                .writes(),
        ],
    },
    DeviceTemplate {
        kind: DeviceKind::Slider,
        slots: &[SlotTemplate::new("SET", Prefix("level"))
            .types(NUMBER)
            .writes()
            .required()],
    },
    DeviceTemplate {
        kind: DeviceKind::Light,
        slots: &[SlotTemplate::new("SET", Exact(&["switch.light"]))
            .types(BOOL)
            .writes()
            .required()],
    },
    DeviceTemplate {
        kind: DeviceKind::Socket,
        slots: &[
            SlotTemplate::new(
                "SET",
                Exact(&["switch", "state", "switch.active", "switch.power", "switch.enable"]),
            )
            .types(SWITCHABLE)
            .writes()
            .required(),
            SlotTemplate::new("ACTUAL", Exact(&["sensor.switch"])).types(BOOL),
        ],
    },
    DeviceTemplate {
        kind: DeviceKind::Button,
        slots: &[SlotTemplate::new("SET", Prefix("button"))
            .types(BOOL)
            .write_only()
            .required()],
    },
    DeviceTemplate {
        kind: DeviceKind::Door,
        slots: &[SlotTemplate::new("ACTUAL", Exact(&["sensor.door"]))
            .types(BOOL)
            .required()],
    },
    DeviceTemplate {
        kind: DeviceKind::Window,
        slots: &[SlotTemplate::new("ACTUAL", Exact(&["sensor.window"]))
            .types(BOOL)
            .required()],
    },
    DeviceTemplate {
        kind: DeviceKind::WindowTilt,
        slots: &[SlotTemplate::new("ACTUAL", Exact(&["value.window"]))
            .types(&[Number, Text])
            .required()],
    },
    DeviceTemplate {
        kind: DeviceKind::FireAlarm,
        slots: &[SlotTemplate::new("ACTUAL", Exact(&["sensor.alarm.fire"]))
            .types(BOOL)
            .required()],
    },
    DeviceTemplate {
        kind: DeviceKind::FloodAlarm,
        slots: &[SlotTemplate::new("ACTUAL", Exact(&["sensor.alarm.flood"]))
            .types(BOOL)
            .required()],
    },
    DeviceTemplate {
        kind: DeviceKind::Motion,
        slots: &[SlotTemplate::new("ACTUAL", Exact(&["sensor.motion"]))
            .types(BOOL)
            .required()],
    },
    DeviceTemplate {
        kind: DeviceKind::Temperature,
        slots: &[
            ACTUAL_TEMPERATURE.required(),
            SlotTemplate::new("SECOND", Exact(&["value.humidity"]))
                .types(NUMBER)
                .unit("%"),
        ],
    },
    DeviceTemplate {
        kind: DeviceKind::Humidity,
        slots: &[HUMIDITY_ACTUAL],
    },
    DeviceTemplate {
        kind: DeviceKind::Illuminance,
        slots: &[SlotTemplate::new("ACTUAL", Exact(&["value.brightness"]))
            .types(NUMBER)
            .required()
            .unit("lux")],
    },
    DeviceTemplate {
        kind: DeviceKind::Info,
        slots: &[SlotTemplate::new("ACTUAL", Any).required()],
    },
];

const HUMIDITY_ACTUAL: SlotTemplate = SlotTemplate::new("ACTUAL", Exact(&["value.humidity"]))
    .types(NUMBER)
    .required()
    .unit("%");

/// Template of a device kind.
#[must_use]
pub fn template(kind: DeviceKind) -> Option<&'static DeviceTemplate> {
    TEMPLATES.iter().find(|template| template.kind == kind)
}
