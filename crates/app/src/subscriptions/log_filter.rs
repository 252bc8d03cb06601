//! Per-listener log filter: minimum severity and source-instance pattern.

use iobridge_domain::log::{LogLevel, LogMessage};
use iobridge_domain::pattern::Pattern;

/// Decides whether a log record reaches a listener.
#[derive(Debug, Clone, PartialEq)]
pub struct LogFilter {
    level: Option<LogLevel>,
    instance: Option<Pattern>,
}

impl LogFilter {
    /// Build a filter; an empty instance means every source.
    ///
    /// An instance pattern that does not compile is logged and never matches.
    #[must_use]
    pub fn new(level: Option<LogLevel>, instance: Option<&str>) -> Self {
        let instance = instance
            .filter(|instance| !instance.is_empty())
            .map(|instance| {
                Pattern::compile(instance).unwrap_or_else(|err| {
                    tracing::warn!(%instance, %err, "invalid log instance pattern");
                    Pattern::never(instance)
                })
            });
        Self { level, instance }
    }

    #[must_use]
    pub fn level(&self) -> Option<LogLevel> {
        self.level
    }

    #[must_use]
    pub fn instance(&self) -> Option<&str> {
        self.instance.as_ref().map(Pattern::as_str)
    }

    /// Severity at or above the threshold, source matching the instance.
    #[must_use]
    pub fn accepts(&self, message: &LogMessage) -> bool {
        self.level.is_none_or(|level| message.severity >= level)
            && self
                .instance
                .as_ref()
                .is_none_or(|instance| instance.matches(&message.from))
    }
}
