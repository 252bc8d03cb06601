//! Log records streamed from (and written to) the object graph host.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::time::{Timestamp, parse_log_time};

/// Severity on the ordered five-level scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Silly,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Silly => "silly",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "silly" => Ok(Self::Silly),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(ValidationError::UnknownLogLevel(other.to_string())),
        }
    }
}

/// One log record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogMessage {
    pub message: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub ts: Timestamp,
    pub severity: LogLevel,
    /// Source instance (e.g. `hue.0`).
    pub from: String,
    #[serde(rename = "_id")]
    pub id: i64,
}

const TIME_LEN: usize = "2025-08-23 23:37:53.529".len();
const TIME_SEPARATOR: &str = " - ";

impl LogMessage {
    #[must_use]
    pub fn new(severity: LogLevel, from: impl Into<String>, message: impl Into<String>) -> Self {
        let ts = crate::time::now();
        Self {
            message: message.into(),
            ts,
            severity,
            from: from.into(),
            id: ts.timestamp_millis(),
        }
    }

    /// Parse one line of a host log file:
    /// `2025-08-23 23:37:53.529 - error: nmea.0 (1781) cannot open /dev/ttyUSB0`.
    ///
    /// Returns `None` for lines that do not follow the format.
    #[must_use]
    pub fn parse_line(line: &str) -> Option<Self> {
        let line = line.trim();
        let time = line.get(..TIME_LEN)?;
        let rest = line.get(TIME_LEN..)?.strip_prefix(TIME_SEPARATOR)?.trim();
        let (severity, rest) = rest.split_once(':')?;
        let severity = strip_ansi(severity).parse().ok()?;
        let (from, message) = rest.trim().split_once(' ')?;
        let ts = parse_log_time(time)?;
        Some(Self {
            message: message.trim().to_string(),
            ts,
            severity,
            from: from.trim().to_string(),
            id: ts.timestamp_millis(),
        })
    }
}

/// Drop terminal color sequences (`\u{1b}[32m`) some hosts write around the level.
fn strip_ansi(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '\u{1b}' {
            for c in chars.by_ref() {
                if c.is_ascii_alphabetic() {
                    break;
                }
            }
        } else {
            out.push(c);
        }
    }
    out
}
