//! Enums: named groups (rooms, functions, …) listing member object ids.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::object::{Object, ObjectType, ValueType};
use crate::text::display_name;

pub const ROOMS_PREFIX: &str = "enum.rooms.";
pub const FUNCTIONS_PREFIX: &str = "enum.functions.";

/// Category of an enum, taken from the second id segment (`enum.<category>.*`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnumCategory {
    Rooms,
    Functions,
    #[serde(untagged)]
    Custom(String),
}

impl EnumCategory {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Rooms => "rooms",
            Self::Functions => "functions",
            Self::Custom(name) => name,
        }
    }

    /// Id prefix of every enum of this category, e.g. `enum.rooms.`.
    #[must_use]
    pub fn id_prefix(&self) -> String {
        format!("enum.{}.", self.as_str())
    }

    #[must_use]
    pub fn of(id: &str) -> Option<Self> {
        let rest = id.strip_prefix("enum.")?;
        let (category, _) = rest.split_once('.')?;
        Some(Self::from(category))
    }
}

impl From<&str> for EnumCategory {
    fn from(value: &str) -> Self {
        match value {
            "rooms" => Self::Rooms,
            "functions" => Self::Functions,
            other => Self::Custom(other.to_string()),
        }
    }
}

impl fmt::Display for EnumCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One enum with its resolved members.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumResponse {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub items: Vec<EnumItem>,
}

impl EnumResponse {
    /// Describe an enum object, without its members.
    #[must_use]
    pub fn describe(object: &Object, language: &str, with_icons: bool) -> Self {
        Self {
            id: object.id.clone(),
            name: display_name(object.common.name.as_ref(), language, &object.id),
            color: object.common.color.clone(),
            icon: with_icons.then(|| object.common.icon.clone()).flatten(),
            items: Vec::new(),
        }
    }
}

/// A member of an enum.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumItem {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ObjectType,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_type: Option<ValueType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
}

impl EnumItem {
    #[must_use]
    pub fn describe(member: &Object, language: &str, with_icons: bool) -> Self {
        let common = &member.common;
        Self {
            id: member.id.clone(),
            kind: member.kind,
            name: display_name(common.name.as_ref(), language, &member.id),
            color: common.color.clone(),
            icon: with_icons.then(|| common.icon.clone()).flatten(),
            state_type: common.value_type,
            min: common.min,
            max: common.max,
            unit: common.unit.clone(),
            role: common.role.clone(),
            step: common.step,
        }
    }
}
