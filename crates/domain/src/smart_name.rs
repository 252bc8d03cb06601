//! Smart-name annotation: per-object metadata controlling whether and how an
//! object takes part in control classification.
//!
//! On the wire the annotation is duck-typed: `false`, `"ignore"`, a plain
//! string, or an object with per-language names plus `smartType`, `byON`
//! and `toggle`. It is resolved once, at deserialization, into [`SmartName`].

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde::ser::SerializeMap;

const IGNORE: &str = "ignore";
const SECONDARY_LANGUAGE: &str = "de";

/// Resolved smart-name annotation.
#[derive(Debug, Clone, PartialEq)]
pub enum SmartName {
    /// `false` or `"ignore"`: never classified.
    Ignored,
    /// A single display name, valid in every language.
    Plain(String),
    Detailed(SmartNameDetails),
}

/// Object form of the annotation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SmartNameDetails {
    /// Display names keyed by language code.
    pub names: BTreeMap<String, String>,
    /// Explicit device type tag (e.g. `"light"`, `"dimmer"`).
    pub smart_type: Option<String>,
    /// Value to write when switching on; kept verbatim.
    pub by_on: Option<serde_json::Value>,
    pub toggle: Option<bool>,
}

impl SmartName {
    /// Display name through `language → en → de`.
    #[must_use]
    pub fn display_name(&self, language: &str) -> Option<&str> {
        match self {
            Self::Ignored => None,
            Self::Plain(name) => Some(name.as_str()).filter(|name| !name.is_empty()),
            Self::Detailed(details) => [language, crate::text::FALLBACK_LANGUAGE, SECONDARY_LANGUAGE]
                .into_iter()
                .filter_map(|lang| details.names.get(lang))
                .find(|name| !name.is_empty())
                .map(String::as_str),
        }
    }

    /// Whether the annotation excludes the object from classification.
    #[must_use]
    pub fn is_ignored(&self, language: &str) -> bool {
        match self {
            Self::Ignored => true,
            _ => self.display_name(language) == Some(IGNORE),
        }
    }

    /// Whether the annotation names the object in `language`.
    #[must_use]
    pub fn is_valid(&self, language: &str) -> bool {
        self.display_name(language)
            .is_some_and(|name| name != IGNORE)
    }

    #[must_use]
    pub fn smart_type(&self) -> Option<&str> {
        match self {
            Self::Detailed(details) => details.smart_type.as_deref(),
            _ => None,
        }
    }

    #[must_use]
    pub fn toggle(&self) -> Option<bool> {
        match self {
            Self::Detailed(details) => details.toggle,
            _ => None,
        }
    }

    /// Display names: the resolved name split on `,`, trimmed.
    #[must_use]
    pub fn group_names(&self, language: &str) -> Vec<String> {
        self.display_name(language)
            .map(|name| {
                name.split(',')
                    .map(str::trim)
                    .filter(|part| !part.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSmartName {
    Flag(bool),
    Text(String),
    Details(RawDetails),
}

#[derive(Deserialize)]
struct RawDetails {
    #[serde(rename = "smartType", default)]
    smart_type: Option<String>,
    #[serde(rename = "byON", default)]
    by_on: Option<serde_json::Value>,
    #[serde(default)]
    toggle: Option<bool>,
    #[serde(flatten)]
    rest: BTreeMap<String, serde_json::Value>,
}

impl<'de> Deserialize<'de> for SmartName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match RawSmartName::deserialize(deserializer)? {
            RawSmartName::Flag(false) => Self::Ignored,
            RawSmartName::Flag(true) => Self::Detailed(SmartNameDetails::default()),
            RawSmartName::Text(text) if text == IGNORE => Self::Ignored,
            RawSmartName::Text(text) => Self::Plain(text),
            RawSmartName::Details(raw) => Self::Detailed(SmartNameDetails {
                names: raw
                    .rest
                    .into_iter()
                    .filter_map(|(lang, value)| match value {
                        serde_json::Value::String(name) => Some((lang, name)),
                        _ => None,
                    })
                    .collect(),
                smart_type: raw.smart_type.filter(|t| !t.is_empty()),
                by_on: raw.by_on,
                toggle: raw.toggle,
            }),
        })
    }
}

impl Serialize for SmartName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Ignored => serializer.serialize_bool(false),
            Self::Plain(name) => serializer.serialize_str(name),
            Self::Detailed(details) => {
                let mut map = serializer.serialize_map(None)?;
                for (lang, name) in &details.names {
                    map.serialize_entry(lang, name)?;
                }
                if let Some(smart_type) = &details.smart_type {
                    map.serialize_entry("smartType", smart_type)?;
                }
                if let Some(by_on) = &details.by_on {
                    map.serialize_entry("byON", by_on)?;
                }
                if let Some(toggle) = details.toggle {
                    map.serialize_entry("toggle", &toggle)?;
                }
                map.end()
            }
        }
    }
}
