//! Adapter instances running on the object graph host.

use serde::{Deserialize, Serialize};

use crate::object::Common;
use crate::text::FALLBACK_LANGUAGE;

pub const INSTANCE_PREFIX: &str = "system.adapter.";

/// A selectable instance: `value` is its namespace (`hue.0`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceInfo {
    pub value: String,
    pub name: String,
}

impl InstanceInfo {
    /// Entry matching every instance; always listed first.
    #[must_use]
    pub fn any() -> Self {
        Self {
            value: String::new(),
            name: "Any instance".to_string(),
        }
    }

    /// Describe the instance object `system.adapter.<adapter>.<n>`.
    ///
    /// The label is the English title. A title equal to the adapter name is
    /// replaced by the namespace, a title that does not mention the instance
    /// number gets the namespace appended in brackets.
    #[must_use]
    pub fn describe(id: &str, common: &Common) -> Self {
        let namespace = id.strip_prefix(INSTANCE_PREFIX).unwrap_or(id);
        let title = common
            .title_lang
            .as_ref()
            .and_then(|text| text.resolve(FALLBACK_LANGUAGE))
            .or(common.title.as_deref())
            .filter(|title| !title.is_empty())
            .unwrap_or(namespace);
        let (adapter, number) = namespace.split_once('.').unwrap_or((namespace, ""));

        let name = if title == adapter {
            namespace.to_string()
        } else if !title.contains(number) {
            format!("{title} [{namespace}]")
        } else {
            title.to_string()
        };

        Self {
            value: namespace.to_string(),
            name,
        }
    }
}

/// Own instance object id for a namespace (`n8n.0` → `system.adapter.n8n.0`).
#[must_use]
pub fn instance_object_id(namespace: &str) -> String {
    format!("{INSTANCE_PREFIX}{namespace}")
}
