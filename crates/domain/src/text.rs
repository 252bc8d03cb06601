//! Translatable display text (`"Kitchen"` or `{"en": "Kitchen", "de": "Küche"}`).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Fallback language used when the requested translation is missing.
pub const FALLBACK_LANGUAGE: &str = "en";

const UNNAMED: &str = "Unnamed";

/// A plain string or a per-language map of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Text {
    Plain(String),
    Translated(BTreeMap<String, String>),
}

impl Text {
    /// Resolve through `language → en → first available translation`.
    #[must_use]
    pub fn resolve(&self, language: &str) -> Option<&str> {
        match self {
            Self::Plain(text) => Some(text.as_str()),
            Self::Translated(map) => [language, FALLBACK_LANGUAGE]
                .into_iter()
                .filter_map(|lang| map.get(lang))
                .chain(map.values())
                .find(|text| !text.is_empty())
                .map(String::as_str),
        }
    }
}

impl From<&str> for Text {
    fn from(value: &str) -> Self {
        Self::Plain(value.to_string())
    }
}

/// Last dot-separated segment of an object id.
#[must_use]
pub fn last_segment(id: &str) -> &str {
    id.rsplit('.').next().unwrap_or(id)
}

/// Resolve a display name, falling back to the last id segment.
///
/// Never returns an empty string.
#[must_use]
pub fn display_name(name: Option<&Text>, language: &str, id: &str) -> String {
    if let Some(text) = name.and_then(|name| name.resolve(language))
        && !text.is_empty()
    {
        return text.to_string();
    }
    let segment = last_segment(id);
    if segment.is_empty() {
        UNNAMED.to_string()
    } else {
        segment.to_string()
    }
}
