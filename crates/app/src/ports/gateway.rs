//! Object graph gateway port: access to the home-automation object store.
//!
//! The gateway is the only IO boundary of the bridge: objects, states, files
//! and log records are read and written through it, and change events for
//! subscribed topics come back from it (see [`GatewayEvent`]).

use std::future::Future;
use std::sync::Arc;

use iobridge_domain::error::BridgeError;
use iobridge_domain::file::{FileContent, LogFile};
use iobridge_domain::log::{LogLevel, LogMessage};
use iobridge_domain::object::{Object, ObjectType};
use iobridge_domain::state::{SettableState, State};
use iobridge_domain::subscription::Topic;

/// Highest code point used to close an id range (`prefix` ..= `prefix\u{9999}`).
const RANGE_END: char = '\u{9999}';

/// Object view query: every object of one type, optionally limited to an id range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewQuery {
    pub kind: ObjectType,
    pub start: Option<String>,
    pub end: Option<String>,
}

impl ViewQuery {
    #[must_use]
    pub fn all(kind: ObjectType) -> Self {
        Self {
            kind,
            start: None,
            end: None,
        }
    }

    /// Objects whose id starts with `prefix`.
    #[must_use]
    pub fn prefixed(kind: ObjectType, prefix: &str) -> Self {
        Self {
            kind,
            start: Some(prefix.to_string()),
            end: Some(format!("{prefix}{RANGE_END}")),
        }
    }

    /// Whether an object of this view lies inside the id range.
    #[must_use]
    pub fn contains(&self, object: &Object) -> bool {
        object.kind == self.kind
            && self.start.as_deref().is_none_or(|start| object.id.as_str() >= start)
            && self.end.as_deref().is_none_or(|end| object.id.as_str() <= end)
    }
}

/// Change notifications emitted by the gateway for subscribed topics.
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayEvent {
    /// The connection is established; fired once.
    Ready,
    /// A state changed; `None` when it was deleted.
    StateChanged { id: String, state: Option<State> },
    /// An object changed; `None` when it was deleted.
    ObjectChanged { id: String, object: Option<Object> },
    /// A file changed; `size` is `None` when it was deleted.
    FileChanged {
        id: String,
        file_name: String,
        size: Option<u64>,
    },
    /// A log record, delivered while log streaming is required.
    Log(LogMessage),
}

/// Access to the object graph.
///
/// Errors are reported as [`BridgeError::Gateway`] naming the operation and
/// the offending id.
pub trait ObjectGateway: Send + Sync {
    /// Namespace of the bridge's own instance (e.g. `n8n.0`).
    fn namespace(&self) -> &str;

    /// Read one object; `None` when it does not exist.
    fn get_object(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<Option<Object>, BridgeError>> + Send;

    /// Create or replace an object.
    fn set_object(&self, object: Object) -> impl Future<Output = Result<(), BridgeError>> + Send;

    /// Read one state; `None` when it has no value yet.
    fn get_state(&self, id: &str)
    -> impl Future<Output = Result<Option<State>, BridgeError>> + Send;

    /// Write a state value.
    fn set_state(
        &self,
        id: &str,
        state: SettableState,
    ) -> impl Future<Output = Result<(), BridgeError>> + Send;

    /// Read a file stored under an object; `None` when it does not exist.
    fn read_file(
        &self,
        id: &str,
        file_name: &str,
    ) -> impl Future<Output = Result<Option<FileContent>, BridgeError>> + Send;

    fn write_file(
        &self,
        id: &str,
        file_name: &str,
        data: Vec<u8>,
    ) -> impl Future<Output = Result<(), BridgeError>> + Send;

    /// Enumerate objects through a view.
    fn query_view(
        &self,
        query: ViewQuery,
    ) -> impl Future<Output = Result<Vec<Object>, BridgeError>> + Send;

    /// Open the upstream subscription for a topic.
    fn subscribe(&self, topic: &Topic) -> impl Future<Output = Result<(), BridgeError>> + Send;

    /// Close the upstream subscription for a topic.
    fn unsubscribe(&self, topic: &Topic) -> impl Future<Output = Result<(), BridgeError>> + Send;

    /// Turn log streaming on or off.
    fn require_log(&self, enabled: bool) -> impl Future<Output = Result<(), BridgeError>> + Send;

    /// Write a record to the host log.
    fn write_log(
        &self,
        level: LogLevel,
        message: &str,
    ) -> impl Future<Output = Result<(), BridgeError>> + Send;

    /// List the log files of a host.
    fn log_files(
        &self,
        host: &str,
    ) -> impl Future<Output = Result<Vec<LogFile>, BridgeError>> + Send;

    /// Read a host log file as text.
    fn read_log_file(
        &self,
        host: &str,
        file_name: &str,
    ) -> impl Future<Output = Result<String, BridgeError>> + Send;
}

impl<T: ObjectGateway> ObjectGateway for Arc<T> {
    fn namespace(&self) -> &str {
        (**self).namespace()
    }

    fn get_object(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<Option<Object>, BridgeError>> + Send {
        (**self).get_object(id)
    }

    fn set_object(&self, object: Object) -> impl Future<Output = Result<(), BridgeError>> + Send {
        (**self).set_object(object)
    }

    fn get_state(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<Option<State>, BridgeError>> + Send {
        (**self).get_state(id)
    }

    fn set_state(
        &self,
        id: &str,
        state: SettableState,
    ) -> impl Future<Output = Result<(), BridgeError>> + Send {
        (**self).set_state(id, state)
    }

    fn read_file(
        &self,
        id: &str,
        file_name: &str,
    ) -> impl Future<Output = Result<Option<FileContent>, BridgeError>> + Send {
        (**self).read_file(id, file_name)
    }

    fn write_file(
        &self,
        id: &str,
        file_name: &str,
        data: Vec<u8>,
    ) -> impl Future<Output = Result<(), BridgeError>> + Send {
        (**self).write_file(id, file_name, data)
    }

    fn query_view(
        &self,
        query: ViewQuery,
    ) -> impl Future<Output = Result<Vec<Object>, BridgeError>> + Send {
        (**self).query_view(query)
    }

    fn subscribe(&self, topic: &Topic) -> impl Future<Output = Result<(), BridgeError>> + Send {
        (**self).subscribe(topic)
    }

    fn unsubscribe(&self, topic: &Topic) -> impl Future<Output = Result<(), BridgeError>> + Send {
        (**self).unsubscribe(topic)
    }

    fn require_log(&self, enabled: bool) -> impl Future<Output = Result<(), BridgeError>> + Send {
        (**self).require_log(enabled)
    }

    fn write_log(
        &self,
        level: LogLevel,
        message: &str,
    ) -> impl Future<Output = Result<(), BridgeError>> + Send {
        (**self).write_log(level, message)
    }

    fn log_files(
        &self,
        host: &str,
    ) -> impl Future<Output = Result<Vec<LogFile>, BridgeError>> + Send {
        (**self).log_files(host)
    }

    fn read_log_file(
        &self,
        host: &str,
        file_name: &str,
    ) -> impl Future<Output = Result<String, BridgeError>> + Send {
        (**self).read_log_file(host, file_name)
    }
}
