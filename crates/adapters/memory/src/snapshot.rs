//! JSON snapshot of an object graph, used to seed a [`MemoryGateway`].
//!
//! ```json
//! {
//!   "namespace": "n8n.0",
//!   "objects": [{ "_id": "zone.1.switch", "type": "state", "common": { "role": "switch" } }],
//!   "states": { "zone.1.switch": { "val": true, "ack": true } },
//!   "logs": { "nas": [{ "fileName": "iobroker.2025-08-23.log", "text": "..." }] }
//! }
//! ```
//!
//! [`MemoryGateway`]: crate::MemoryGateway

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use iobridge_domain::object::Object;
use iobridge_domain::state::SettableState;

use crate::error::MemoryGatewayError;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphSnapshot {
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub objects: Vec<Object>,
    #[serde(default)]
    pub states: BTreeMap<String, SettableState>,
    /// Log files per host.
    #[serde(default)]
    pub logs: BTreeMap<String, Vec<LogFileSnapshot>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogFileSnapshot {
    pub file_name: String,
    #[serde(default)]
    pub text: String,
}

impl GraphSnapshot {
    /// # Errors
    ///
    /// Returns [`MemoryGatewayError::Json`] for a malformed document.
    pub fn from_json(text: &str) -> Result<Self, MemoryGatewayError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Read and parse a snapshot file.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryGatewayError::Io`] when the file cannot be read, or
    /// [`MemoryGatewayError::Json`] for a malformed document.
    pub fn load(path: &Path) -> Result<Self, MemoryGatewayError> {
        let text = std::fs::read_to_string(path).map_err(|source| MemoryGatewayError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }
}
