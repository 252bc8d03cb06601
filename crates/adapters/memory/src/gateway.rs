//! Object graph held in process.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast;

use iobridge_app::ports::{GatewayEvent, ObjectGateway, ViewQuery};
use iobridge_domain::error::{BridgeError, GatewayError};
use iobridge_domain::file::{FileContent, LogFile};
use iobridge_domain::log::{LogLevel, LogMessage};
use iobridge_domain::object::Object;
use iobridge_domain::pattern::Pattern;
use iobridge_domain::state::{SettableState, State};
use iobridge_domain::subscription::{ANY_FILE, Topic};

use crate::error::MemoryGatewayError;
use crate::snapshot::GraphSnapshot;

/// Namespace used when none is configured.
pub const DEFAULT_NAMESPACE: &str = "iobridge.0";

const EVENT_CAPACITY: usize = 256;

/// Subscription traffic received from the bridge, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpstreamCall {
    Subscribe(Topic),
    Unsubscribe(Topic),
    RequireLog(bool),
}

struct TopicMatcher {
    id: Pattern,
    file_name: Option<Pattern>,
}

impl TopicMatcher {
    fn compile(topic: &Topic) -> Self {
        let compile = |source: &str| {
            Pattern::compile(source).unwrap_or_else(|err| {
                tracing::warn!(%err, pattern = source, "topic never matches");
                Pattern::never(source)
            })
        };
        let file_name = match topic {
            Topic::File { file_name, .. } if file_name != ANY_FILE => Some(compile(file_name)),
            _ => None,
        };
        Self {
            id: compile(topic.pattern()),
            file_name,
        }
    }
}

#[derive(Default)]
struct Graph {
    objects: BTreeMap<String, Object>,
    states: HashMap<String, State>,
    files: HashMap<(String, String), FileContent>,
    /// Host → (file name, text).
    logs: HashMap<String, Vec<(String, String)>>,
    topics: BTreeMap<Topic, TopicMatcher>,
    log_required: bool,
    calls: Vec<UpstreamCall>,
    rejected: HashSet<String>,
    written_logs: Vec<LogMessage>,
}

impl Graph {
    fn check(&self, operation: &'static str, id: &str) -> Result<(), BridgeError> {
        if self.rejected.contains(id) {
            return Err(MemoryGatewayError::Rejected {
                operation,
                id: id.to_string(),
            }
            .into());
        }
        Ok(())
    }

    fn watches(&self, wanted: impl Fn(&Topic) -> bool, id: &str, file_name: Option<&str>) -> bool {
        self.topics.iter().any(|(topic, matcher)| {
            wanted(topic)
                && matcher.id.matches(id)
                && match (&matcher.file_name, file_name) {
                    (Some(pattern), Some(name)) => pattern.matches(name),
                    _ => true,
                }
        })
    }

    fn watches_state(&self, id: &str) -> bool {
        self.watches(|topic| matches!(topic, Topic::State { .. }), id, None)
    }

    fn watches_object(&self, id: &str) -> bool {
        self.watches(|topic| matches!(topic, Topic::Object { .. }), id, None)
    }

    fn watches_file(&self, id: &str, file_name: &str) -> bool {
        self.watches(
            |topic| matches!(topic, Topic::File { .. }),
            id,
            Some(file_name),
        )
    }
}

/// In-memory [`ObjectGateway`] with a broadcast change feed.
///
/// Change events are only emitted for topics the bridge subscribed to, and
/// log records only while log streaming is required, mirroring a real
/// object graph connection.
pub struct MemoryGateway {
    namespace: String,
    graph: Mutex<Graph>,
    events: broadcast::Sender<GatewayEvent>,
}

impl MemoryGateway {
    #[must_use]
    pub fn new(namespace: impl Into<String>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            namespace: namespace.into(),
            graph: Mutex::new(Graph::default()),
            events,
        }
    }

    /// Seed a gateway from a snapshot; the snapshot namespace wins over
    /// `namespace`.
    #[must_use]
    pub fn from_snapshot(snapshot: GraphSnapshot, namespace: &str) -> Self {
        let gateway = Self::new(snapshot.namespace.as_deref().unwrap_or(namespace));
        {
            let mut graph = gateway.lock();
            for object in snapshot.objects {
                graph.objects.insert(object.id.clone(), object);
            }
            for (id, state) in snapshot.states {
                graph.states.insert(id, State::new(state.val, state.ack));
            }
            for (host, files) in snapshot.logs {
                graph.logs.insert(
                    host,
                    files
                        .into_iter()
                        .map(|file| (file.file_name, file.text))
                        .collect(),
                );
            }
            tracing::debug!(
                objects = graph.objects.len(),
                states = graph.states.len(),
                "gateway seeded from snapshot"
            );
        }
        gateway
    }

    fn lock(&self) -> MutexGuard<'_, Graph> {
        self.graph.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: GatewayEvent) {
        // nobody listening is fine
        let _ = self.events.send(event);
    }

    /// Receive every event emitted from now on.
    #[must_use]
    pub fn subscribe_events(&self) -> broadcast::Receiver<GatewayEvent> {
        self.events.subscribe()
    }

    /// Signal that the connection is established.
    pub fn start(&self) {
        tracing::info!(namespace = %self.namespace, "gateway ready");
        self.emit(GatewayEvent::Ready);
    }

    /// Add an object without emitting a change.
    pub fn insert_object(&self, object: Object) {
        self.lock().objects.insert(object.id.clone(), object);
    }

    pub fn delete_object(&self, id: &str) {
        let watched = {
            let mut graph = self.lock();
            graph.objects.remove(id);
            graph.watches_object(id)
        };
        if watched {
            self.emit(GatewayEvent::ObjectChanged {
                id: id.to_string(),
                object: None,
            });
        }
    }

    pub fn delete_state(&self, id: &str) {
        let watched = {
            let mut graph = self.lock();
            graph.states.remove(id);
            graph.watches_state(id)
        };
        if watched {
            self.emit(GatewayEvent::StateChanged {
                id: id.to_string(),
                state: None,
            });
        }
    }

    pub fn delete_file(&self, id: &str, file_name: &str) {
        let watched = {
            let mut graph = self.lock();
            graph
                .files
                .remove(&(id.to_string(), file_name.to_string()));
            graph.watches_file(id, file_name)
        };
        if watched {
            self.emit(GatewayEvent::FileChanged {
                id: id.to_string(),
                file_name: file_name.to_string(),
                size: None,
            });
        }
    }

    /// Publish a log record from any source.
    pub fn push_log(&self, message: LogMessage) {
        if self.lock().log_required {
            self.emit(GatewayEvent::Log(message));
        }
    }

    /// Add a log file to a host.
    pub fn add_log_file(&self, host: &str, file_name: &str, text: &str) {
        self.lock()
            .logs
            .entry(host.to_string())
            .or_default()
            .push((file_name.to_string(), text.to_string()));
    }

    /// Make every call naming `id` fail.
    pub fn reject(&self, id: &str) {
        self.lock().rejected.insert(id.to_string());
    }

    #[must_use]
    pub fn upstream_calls(&self) -> Vec<UpstreamCall> {
        self.lock().calls.clone()
    }

    #[must_use]
    pub fn topics(&self) -> Vec<Topic> {
        self.lock().topics.keys().cloned().collect()
    }

    #[must_use]
    pub fn is_log_required(&self) -> bool {
        self.lock().log_required
    }

    /// Records written through [`ObjectGateway::write_log`].
    #[must_use]
    pub fn written_logs(&self) -> Vec<LogMessage> {
        self.lock().written_logs.clone()
    }
}

impl ObjectGateway for MemoryGateway {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn get_object(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<Option<Object>, BridgeError>> + Send {
        let graph = self.lock();
        let result = graph
            .check("read object", id)
            .map(|()| graph.objects.get(id).cloned());
        drop(graph);
        async { result }
    }

    fn set_object(&self, object: Object) -> impl Future<Output = Result<(), BridgeError>> + Send {
        let mut graph = self.lock();
        let result = graph.check("write object", &object.id).map(|()| {
            let event = graph
                .watches_object(&object.id)
                .then(|| GatewayEvent::ObjectChanged {
                    id: object.id.clone(),
                    object: Some(object.clone()),
                });
            graph.objects.insert(object.id.clone(), object);
            event
        });
        drop(graph);
        let result = result.map(|event| {
            if let Some(event) = event {
                self.emit(event);
            }
        });
        async { result }
    }

    fn get_state(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<Option<State>, BridgeError>> + Send {
        let graph = self.lock();
        let result = graph
            .check("read state", id)
            .map(|()| graph.states.get(id).cloned());
        drop(graph);
        async { result }
    }

    fn set_state(
        &self,
        id: &str,
        state: SettableState,
    ) -> impl Future<Output = Result<(), BridgeError>> + Send {
        let mut graph = self.lock();
        let result = graph.check("write state", id).map(|()| {
            let from = Some(format!("system.adapter.{}", self.namespace));
            let next = match graph.states.get(id) {
                Some(current) => current.updated(state, from),
                None => State {
                    from,
                    ..State::new(state.val, state.ack)
                },
            };
            let event = graph
                .watches_state(id)
                .then(|| GatewayEvent::StateChanged {
                    id: id.to_string(),
                    state: Some(next.clone()),
                });
            graph.states.insert(id.to_string(), next);
            event
        });
        drop(graph);
        let result = result.map(|event| {
            if let Some(event) = event {
                self.emit(event);
            }
        });
        async { result }
    }

    fn read_file(
        &self,
        id: &str,
        file_name: &str,
    ) -> impl Future<Output = Result<Option<FileContent>, BridgeError>> + Send {
        let graph = self.lock();
        let result = graph.check("read file", id).map(|()| {
            graph
                .files
                .get(&(id.to_string(), file_name.to_string()))
                .cloned()
        });
        drop(graph);
        async { result }
    }

    fn write_file(
        &self,
        id: &str,
        file_name: &str,
        data: Vec<u8>,
    ) -> impl Future<Output = Result<(), BridgeError>> + Send {
        let mut graph = self.lock();
        let result = graph.check("write file", id).map(|()| {
            let size = data.len() as u64;
            graph
                .files
                .insert((id.to_string(), file_name.to_string()), FileContent::new(data, None));
            graph
                .watches_file(id, file_name)
                .then(|| GatewayEvent::FileChanged {
                    id: id.to_string(),
                    file_name: file_name.to_string(),
                    size: Some(size),
                })
        });
        drop(graph);
        let result = result.map(|event| {
            if let Some(event) = event {
                self.emit(event);
            }
        });
        async { result }
    }

    fn query_view(
        &self,
        query: ViewQuery,
    ) -> impl Future<Output = Result<Vec<Object>, BridgeError>> + Send {
        let objects = self
            .lock()
            .objects
            .values()
            .filter(|object| query.contains(object))
            .cloned()
            .collect();
        async { Ok(objects) }
    }

    fn subscribe(&self, topic: &Topic) -> impl Future<Output = Result<(), BridgeError>> + Send {
        let mut graph = self.lock();
        graph.calls.push(UpstreamCall::Subscribe(topic.clone()));
        graph
            .topics
            .entry(topic.clone())
            .or_insert_with(|| TopicMatcher::compile(topic));
        drop(graph);
        tracing::debug!(%topic, "subscribed");
        async { Ok(()) }
    }

    fn unsubscribe(&self, topic: &Topic) -> impl Future<Output = Result<(), BridgeError>> + Send {
        let mut graph = self.lock();
        graph.calls.push(UpstreamCall::Unsubscribe(topic.clone()));
        graph.topics.remove(topic);
        drop(graph);
        tracing::debug!(%topic, "unsubscribed");
        async { Ok(()) }
    }

    fn require_log(&self, enabled: bool) -> impl Future<Output = Result<(), BridgeError>> + Send {
        let mut graph = self.lock();
        graph.calls.push(UpstreamCall::RequireLog(enabled));
        graph.log_required = enabled;
        async { Ok(()) }
    }

    fn write_log(
        &self,
        level: LogLevel,
        message: &str,
    ) -> impl Future<Output = Result<(), BridgeError>> + Send {
        let record = LogMessage::new(level, self.namespace.clone(), message);
        self.lock().written_logs.push(record.clone());
        self.push_log(record);
        async { Ok(()) }
    }

    fn log_files(
        &self,
        host: &str,
    ) -> impl Future<Output = Result<Vec<LogFile>, BridgeError>> + Send {
        let graph = self.lock();
        let result = graph.check("list log files of", host).map(|()| {
            graph
                .logs
                .get(host)
                .map(|files| {
                    files
                        .iter()
                        .map(|(file_name, text)| LogFile {
                            file_name: file_name.clone(),
                            size: text.len() as u64,
                        })
                        .collect()
                })
                .unwrap_or_default()
        });
        drop(graph);
        async { result }
    }

    fn read_log_file(
        &self,
        host: &str,
        file_name: &str,
    ) -> impl Future<Output = Result<String, BridgeError>> + Send {
        let text = self
            .lock()
            .logs
            .get(host)
            .and_then(|files| files.iter().find(|(name, _)| name == file_name))
            .map(|(_, text)| text.clone());
        let result: Result<String, BridgeError> = text.ok_or_else(|| {
            GatewayError::new("read log file", format!("{host}/{file_name}"), "no such file").into()
        });
        async { result }
    }
}
