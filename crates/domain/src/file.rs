//! Files stored under an object (adapter or meta id) of the object graph.

use serde::{Deserialize, Serialize};

/// File payload with its MIME type, if the store knows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileContent {
    pub data: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl FileContent {
    #[must_use]
    pub fn new(data: impl Into<Vec<u8>>, mime_type: Option<String>) -> Self {
        Self {
            data: data.into(),
            mime_type,
        }
    }
}

/// A log file listed by a host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogFile {
    /// Path as reported by the host, e.g. `log/pi/file1/iobroker.2025-08-23.log`.
    pub file_name: String,
    pub size: u64,
}

impl LogFile {
    /// Readme files and empty files carry no records.
    #[must_use]
    pub fn has_records(&self) -> bool {
        !self.file_name.ends_with("ReadMe.log") && self.size > 0
    }
}
