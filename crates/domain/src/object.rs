//! Object: an entry of the object graph (state, channel, device, enum, …).
//!
//! Objects form an implicit tree through their dot-segmented ids: the channel
//! of `zone.3.switch` is `zone.3`, its device is `zone`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{BridgeError, ValidationError};
use crate::smart_name::SmartName;
use crate::text::Text;

/// Kind of an object graph entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectType {
    State,
    Channel,
    Device,
    Enum,
    Folder,
    Instance,
    Adapter,
    Host,
    Config,
    #[serde(other)]
    Other,
}

impl ObjectType {
    /// States, channels and devices: the kinds that can form a control.
    #[must_use]
    pub fn is_controllable(self) -> bool {
        matches!(self, Self::State | Self::Channel | Self::Device)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::State => "state",
            Self::Channel => "channel",
            Self::Device => "device",
            Self::Enum => "enum",
            Self::Folder => "folder",
            Self::Instance => "instance",
            Self::Adapter => "adapter",
            Self::Host => "host",
            Self::Config => "config",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for ObjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared value type of a state (`common.type`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Boolean,
    Number,
    String,
    Mixed,
    Object,
    Array,
    File,
    Json,
    #[serde(other)]
    Other,
}

/// Enumerated value labels: a map or the inline `"0:off;1:on"` form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ValueLabels {
    Map(BTreeMap<String, String>),
    Inline(String),
}

impl ValueLabels {
    /// Normalize to a value → label map.
    #[must_use]
    pub fn to_map(&self) -> BTreeMap<String, String> {
        match self {
            Self::Map(map) => map.clone(),
            Self::Inline(text) => text
                .split(';')
                .filter_map(|pair| pair.split_once(':'))
                .map(|(value, label)| (value.trim().to_string(), label.trim().to_string()))
                .collect(),
        }
    }
}

/// The `common` block of an object.
///
/// Fields the bridge does not interpret are kept in `extra` so that a
/// read-merge-write cycle never drops them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Common {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<Text>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<ValueType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub states: Option<ValueLabels>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smart_name: Option<SmartName>,
    /// Member ids of an enum object.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<String>,
    /// Host an instance object runs on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_lang: Option<Text>,
    /// System language (only on `system.config`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An entry of the object graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Object {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ObjectType,
    #[serde(default)]
    pub common: Common,
    #[serde(default)]
    pub native: Map<String, Value>,
}

/// A partial object for `write_object`.
///
/// When the target exists, `common` and `native` are shallow-merged into it
/// (top-level keys of the patch replace existing keys, nested values are not
/// merged). Otherwise the patch is written as a new object and must carry a
/// `kind`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectPatch {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ObjectType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub common: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub native: Option<Map<String, Value>>,
}

impl Object {
    /// Create an object with an empty `common`/`native` block.
    #[must_use]
    pub fn new(id: impl Into<String>, kind: ObjectType) -> Self {
        Self {
            id: id.into(),
            kind,
            common: Common::default(),
            native: Map::new(),
        }
    }

    #[must_use]
    pub fn with_common(mut self, common: Common) -> Self {
        self.common = common;
        self
    }

    /// Shallow-merge a patch into this object.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Serialization`] when the merged `common` block
    /// no longer matches the object model.
    pub fn merge(&mut self, patch: ObjectPatch) -> Result<(), BridgeError> {
        if let Some(common) = patch.common {
            let mut merged = match serde_json::to_value(&self.common)? {
                Value::Object(map) => map,
                _ => Map::new(),
            };
            merged.extend(common);
            self.common = serde_json::from_value(Value::Object(merged))?;
        }
        if let Some(native) = patch.native {
            self.native.extend(native);
        }
        Ok(())
    }

    /// Build a brand-new object from a patch.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyObjectId`] for an empty id,
    /// [`ValidationError::MissingObjectType`] when the patch has no kind, or
    /// [`BridgeError::Serialization`] for a malformed `common` block.
    pub fn from_patch(id: &str, patch: ObjectPatch) -> Result<Self, BridgeError> {
        if id.is_empty() {
            return Err(ValidationError::EmptyObjectId.into());
        }
        let kind = patch
            .kind
            .ok_or_else(|| ValidationError::MissingObjectType(id.to_string()))?;
        let common = match patch.common {
            Some(map) => serde_json::from_value(Value::Object(map))?,
            None => Common::default(),
        };
        Ok(Self {
            id: id.to_string(),
            kind,
            common,
            native: patch.native.unwrap_or_default(),
        })
    }
}

/// Parent id (`zone.3.switch` → `zone.3`); empty for a single segment.
#[must_use]
pub fn parent_of(id: &str) -> &str {
    id.rsplit_once('.').map_or("", |(parent, _)| parent)
}
