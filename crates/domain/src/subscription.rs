//! Upstream subscription topics.
//!
//! A topic is what the bridge actually subscribes to at the gateway. Many
//! listeners may share one topic; the gateway sees it once.

use std::fmt;

use serde::{Deserialize, Serialize};

/// File-name pattern used when a file listener does not name a file.
pub const ANY_FILE: &str = "*";

/// Notification kind a listener can register for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    State,
    Object,
    File,
    Log,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::State => "state",
            Self::Object => "object",
            Self::File => "file",
            Self::Log => "log",
        })
    }
}

/// One upstream subscription, keyed by its raw pattern text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Topic {
    State { pattern: String },
    Object { pattern: String },
    File { pattern: String, file_name: String },
}

impl Topic {
    #[must_use]
    pub fn state(pattern: impl Into<String>) -> Self {
        Self::State {
            pattern: pattern.into(),
        }
    }

    #[must_use]
    pub fn object(pattern: impl Into<String>) -> Self {
        Self::Object {
            pattern: pattern.into(),
        }
    }

    #[must_use]
    pub fn file(pattern: impl Into<String>, file_name: Option<&str>) -> Self {
        Self::File {
            pattern: pattern.into(),
            file_name: file_name
                .filter(|name| !name.is_empty())
                .unwrap_or(ANY_FILE)
                .to_string(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> ChangeKind {
        match self {
            Self::State { .. } => ChangeKind::State,
            Self::Object { .. } => ChangeKind::Object,
            Self::File { .. } => ChangeKind::File,
        }
    }

    #[must_use]
    pub fn pattern(&self) -> &str {
        match self {
            Self::State { pattern } | Self::Object { pattern } | Self::File { pattern, .. } => {
                pattern
            }
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::State { pattern } => write!(f, "state({pattern})"),
            Self::Object { pattern } => write!(f, "object({pattern})"),
            Self::File { pattern, file_name } => write!(f, "file({pattern}, {file_name})"),
        }
    }
}
