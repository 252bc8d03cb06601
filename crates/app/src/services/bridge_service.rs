//! Bridge service: the single entry point callers talk to.
//!
//! One-shot operations go through the [`RequestQueue`] so that calls issued
//! before the gateway is ready are parked and replayed in order. Listener
//! registrations go through the [`SubscriptionRegistry`]; the upstream
//! commands it produces are forwarded to the gateway once the bridge is live.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::time::Instant;

use iobridge_domain::enumeration::{EnumCategory, EnumItem, EnumResponse};
use iobridge_domain::error::{BridgeError, NotFoundError, ValidationError};
use iobridge_domain::file::FileContent;
use iobridge_domain::id::ListenerId;
use iobridge_domain::instance::{INSTANCE_PREFIX, InstanceInfo, instance_object_id};
use iobridge_domain::log::{LogLevel, LogMessage};
use iobridge_domain::object::{Object, ObjectPatch, ObjectType};
use iobridge_domain::projection::Room;
use iobridge_domain::state::{SettableState, State};
use iobridge_domain::text::FALLBACK_LANGUAGE;

use crate::classifier::{self, snapshot::Snapshot};
use crate::log_reader::{collect_records, newest_file};
use crate::ports::{GatewayEvent, ObjectGateway, ViewQuery};
use crate::projector::project;
use crate::request_queue::{Admission, RequestKind, RequestQueue, settle};
use crate::subscriptions::{FileChange, Subscription, SubscriptionRegistry, Upstream};

/// Object holding the system-wide settings (language among them).
pub const SYSTEM_CONFIG_ID: &str = "system.config";

/// Object types the classifier looks at.
const SNAPSHOT_KINDS: [ObjectType; 4] = [
    ObjectType::State,
    ObjectType::Channel,
    ObjectType::Device,
    ObjectType::Enum,
];

/// Tunables of a [`BridgeService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeOptions {
    /// Fixed classification language; `None` adopts the system language
    /// at start-up.
    pub language: Option<String>,
    /// How long a classification result is reused.
    pub cache_ttl: Duration,
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self {
            language: None,
            cache_ttl: Duration::from_secs(30),
        }
    }
}

type CacheKey = (String, bool);

/// Application service bridging callers to the object graph.
pub struct BridgeService<G> {
    gateway: Arc<G>,
    queue: RequestQueue<Arc<G>>,
    registry: Mutex<SubscriptionRegistry>,
    /// Serialises upstream forwarding; `true` once subscriptions are live.
    live: tokio::sync::Mutex<bool>,
    /// Shared with parked jobs so they see the language adopted at start.
    language: Arc<RwLock<String>>,
    language_pinned: bool,
    cache_ttl: Duration,
    cache: Mutex<HashMap<CacheKey, (Instant, Arc<Vec<Room>>)>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read_language(language: &RwLock<String>) -> String {
    language
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

fn require_id(id: &str) -> Result<String, BridgeError> {
    if id.is_empty() {
        return Err(ValidationError::EmptyObjectId.into());
    }
    Ok(id.to_string())
}

impl<G: ObjectGateway + 'static> BridgeService<G> {
    /// Create a bridge over `gateway`. Nothing reaches the gateway until
    /// [`start`](Self::start) is called.
    pub fn new(gateway: Arc<G>, options: BridgeOptions) -> Self {
        let language_pinned = options.language.is_some();
        Self {
            gateway,
            queue: RequestQueue::new(),
            registry: Mutex::new(SubscriptionRegistry::new()),
            live: tokio::sync::Mutex::new(false),
            language: Arc::new(RwLock::new(
                options
                    .language
                    .unwrap_or_else(|| FALLBACK_LANGUAGE.to_string()),
            )),
            language_pinned,
            cache_ttl: options.cache_ttl,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Language used when a call does not name one.
    #[must_use]
    pub fn language(&self) -> String {
        read_language(&self.language)
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.queue.is_ready()
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        lock(&self.registry).len()
    }

    /// Number of upstream topics currently held.
    #[must_use]
    pub fn topic_count(&self) -> usize {
        lock(&self.registry).topic_count()
    }

    /// Number of operations waiting for readiness.
    #[must_use]
    pub fn pending(&self, kind: RequestKind) -> usize {
        self.queue.pending(kind)
    }

    async fn submit<T, F, Fut>(&self, kind: RequestKind, op: F) -> Result<T, BridgeError>
    where
        T: Send + 'static,
        F: FnOnce(Arc<G>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, BridgeError>> + Send + 'static,
    {
        match self.queue.admit(kind, op) {
            Admission::Run(op) => op(Arc::clone(&self.gateway)).await,
            Admission::Deferred(rx) => settle(rx).await,
        }
    }

    async fn forward(&self, commands: Vec<Upstream>) {
        for command in commands {
            let result = match &command {
                Upstream::Subscribe(topic) => self.gateway.subscribe(topic).await,
                Upstream::Unsubscribe(topic) => self.gateway.unsubscribe(topic).await,
                Upstream::RequireLog(enabled) => self.gateway.require_log(*enabled).await,
            };
            if let Err(err) = result {
                tracing::warn!(%err, ?command, "failed to forward subscription change");
            }
        }
    }

    /// Go live: adopt the system language, open every upstream subscription
    /// registered so far and drain the parked requests.
    ///
    /// Calling it again is a no-op.
    #[tracing::instrument(skip(self))]
    pub async fn start(&self) {
        {
            let mut live = self.live.lock().await;
            if *live {
                tracing::debug!("bridge already started");
                return;
            }
            self.adopt_language().await;
            let commands = lock(&self.registry).replay();
            self.forward(commands).await;
            *live = true;
        }
        if let Some(lanes) = self.queue.mark_ready() {
            RequestQueue::drain(lanes, Arc::clone(&self.gateway)).await;
        }
        tracing::info!(language = %self.language(), "bridge ready");
    }

    async fn adopt_language(&self) {
        if self.language_pinned {
            return;
        }
        match self.gateway.get_object(SYSTEM_CONFIG_ID).await {
            Ok(Some(config)) => {
                if let Some(language) = config.common.language.filter(|l| !l.is_empty()) {
                    *self
                        .language
                        .write()
                        .unwrap_or_else(PoisonError::into_inner) = language;
                }
            }
            Ok(None) => tracing::debug!("no system config, keeping default language"),
            Err(err) => tracing::warn!(%err, "failed to read system language"),
        }
    }

    // --- registrations ---

    /// Register (or re-register) a listener.
    ///
    /// A malformed pattern is logged and leaves the listener registered but
    /// never matching; an empty pattern removes the listener.
    #[tracing::instrument(skip(self, subscription), fields(kind = %subscription.kind()))]
    pub async fn register(&self, listener: &ListenerId, subscription: Subscription) {
        let live = self.live.lock().await;
        let commands = lock(&self.registry).register(listener, subscription);
        if *live {
            self.forward(commands).await;
        }
    }

    /// Remove every registration of a listener.
    #[tracing::instrument(skip(self))]
    pub async fn unregister_all(&self, listener: &ListenerId) {
        let live = self.live.lock().await;
        let commands = lock(&self.registry).unregister_all(listener);
        if *live {
            self.forward(commands).await;
        }
    }

    // --- dispatch ---

    /// Route one gateway event.
    pub async fn handle_event(&self, event: GatewayEvent) {
        match event {
            GatewayEvent::Ready => self.start().await,
            GatewayEvent::StateChanged { id, state } => self.dispatch_state(&id, state.as_ref()),
            GatewayEvent::ObjectChanged { id, object } => {
                self.dispatch_object(&id, object.as_ref());
            }
            GatewayEvent::FileChanged {
                id,
                file_name,
                size,
            } => self.dispatch_file(&id, &file_name, size).await,
            GatewayEvent::Log(message) => self.dispatch_log(&message),
        }
    }

    /// Forward gateway events until the feed closes.
    ///
    /// A lagging receiver skips the lost events and keeps going.
    pub async fn pump_events(&self, mut events: broadcast::Receiver<GatewayEvent>) {
        loop {
            match events.recv().await {
                Ok(event) => self.handle_event(event).await,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "gateway event feed lagged, events lost");
                }
                Err(RecvError::Closed) => {
                    tracing::debug!("gateway event feed closed");
                    break;
                }
            }
        }
    }

    /// Deliver a state change to every matching listener, in registration order.
    pub fn dispatch_state(&self, id: &str, state: Option<&State>) {
        let targets = lock(&self.registry).state_targets(id);
        for callback in targets {
            callback(id, state);
        }
    }

    pub fn dispatch_object(&self, id: &str, object: Option<&Object>) {
        let targets = lock(&self.registry).object_targets(id);
        for callback in targets {
            callback(id, object);
        }
    }

    /// Deliver a file change; the content is read once, and only when a
    /// matching listener asked for it and the file still exists.
    pub async fn dispatch_file(&self, id: &str, file_name: &str, size: Option<u64>) {
        let targets = lock(&self.registry).file_targets(id, file_name);
        if targets.is_empty() {
            return;
        }
        let wants_content = targets.iter().any(|(_, with_content)| *with_content);
        let content: Option<FileContent> = if wants_content && size.is_some() {
            match self.gateway.read_file(id, file_name).await {
                Ok(content) => content,
                Err(err) => {
                    tracing::warn!(%err, %id, %file_name, "failed to read changed file");
                    None
                }
            }
        } else {
            None
        };

        let bare = FileChange {
            id: id.to_string(),
            file_name: file_name.to_string(),
            size,
            content: None,
        };
        let full = FileChange {
            content,
            ..bare.clone()
        };
        for (callback, with_content) in targets {
            callback(if with_content { &full } else { &bare });
        }
    }

    pub fn dispatch_log(&self, message: &LogMessage) {
        let targets = lock(&self.registry).log_targets(message);
        for callback in targets {
            callback(message);
        }
    }

    // --- one-shot operations ---

    /// # Errors
    ///
    /// Returns the gateway error naming `id`.
    #[tracing::instrument(skip(self))]
    pub async fn read_state(&self, id: &str) -> Result<Option<State>, BridgeError> {
        let id = require_id(id)?;
        self.submit(RequestKind::ReadState, move |gateway| async move {
            gateway.get_state(&id).await
        })
        .await
    }

    /// # Errors
    ///
    /// Returns the gateway error naming `id`.
    #[tracing::instrument(skip(self, state))]
    pub async fn write_state(&self, id: &str, state: SettableState) -> Result<(), BridgeError> {
        let id = require_id(id)?;
        self.submit(RequestKind::WriteState, move |gateway| async move {
            gateway.set_state(&id, state).await
        })
        .await
    }

    /// # Errors
    ///
    /// Returns the gateway error naming `id`.
    #[tracing::instrument(skip(self))]
    pub async fn read_object(&self, id: &str) -> Result<Option<Object>, BridgeError> {
        let id = require_id(id)?;
        self.submit(RequestKind::ReadObject, move |gateway| async move {
            gateway.get_object(&id).await
        })
        .await
    }

    /// Write an object: an existing one gets `common` and `native`
    /// shallow-merged, a missing one is created from the patch.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingObjectType`] when creating without
    /// a type, or the gateway error naming `id`.
    #[tracing::instrument(skip(self, patch))]
    pub async fn write_object(&self, id: &str, patch: ObjectPatch) -> Result<Object, BridgeError> {
        let id = require_id(id)?;
        self.submit(RequestKind::WriteObject, move |gateway| async move {
            let object = match gateway.get_object(&id).await? {
                Some(mut existing) => {
                    existing.merge(patch)?;
                    existing
                }
                None => Object::from_patch(&id, patch)?,
            };
            gateway.set_object(object.clone()).await?;
            Ok(object)
        })
        .await
    }

    /// # Errors
    ///
    /// Returns the gateway error naming `id`.
    #[tracing::instrument(skip(self))]
    pub async fn read_file(
        &self,
        id: &str,
        file_name: &str,
    ) -> Result<Option<FileContent>, BridgeError> {
        let id = require_id(id)?;
        let file_name = file_name.to_string();
        self.submit(RequestKind::ReadFile, move |gateway| async move {
            gateway.read_file(&id, &file_name).await
        })
        .await
    }

    /// # Errors
    ///
    /// Returns the gateway error naming `id`.
    #[tracing::instrument(skip(self, data), fields(size = data.len()))]
    pub async fn write_file(
        &self,
        id: &str,
        file_name: &str,
        data: Vec<u8>,
    ) -> Result<(), BridgeError> {
        let id = require_id(id)?;
        let file_name = file_name.to_string();
        self.submit(RequestKind::WriteFile, move |gateway| async move {
            gateway.write_file(&id, &file_name, data).await
        })
        .await
    }

    /// Read records from the newest log file of the bridge's host, newest
    /// first.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::NotFound`] when the own instance object or its
    /// host is missing, or the gateway error.
    #[tracing::instrument(skip(self))]
    pub async fn read_log(
        &self,
        level: Option<LogLevel>,
        instance: Option<&str>,
        count: Option<usize>,
    ) -> Result<Vec<LogMessage>, BridgeError> {
        let instance = instance.filter(|i| !i.is_empty()).map(str::to_string);
        self.submit(RequestKind::ReadLog, move |gateway| async move {
            let own = instance_object_id(gateway.namespace());
            let host = gateway
                .get_object(&own)
                .await?
                .and_then(|object| object.common.host)
                .ok_or_else(|| NotFoundError {
                    entity: "host of instance",
                    id: own.clone(),
                })?;
            let files = gateway.log_files(&host).await?;
            let Some(file) = newest_file(&files) else {
                tracing::debug!(%host, "no log file with records");
                return Ok(Vec::new());
            };
            let text = gateway.read_log_file(&host, &file.file_name).await?;
            Ok(collect_records(&text, level, instance.as_deref(), count))
        })
        .await
    }

    /// # Errors
    ///
    /// Returns the gateway error.
    #[tracing::instrument(skip(self, message))]
    pub async fn write_log(&self, level: LogLevel, message: &str) -> Result<(), BridgeError> {
        let message = message.to_string();
        self.submit(RequestKind::WriteLog, move |gateway| async move {
            gateway.write_log(level, &message).await
        })
        .await
    }

    /// List the enums of a category with their members resolved.
    ///
    /// Members that cannot be read are left out.
    ///
    /// # Errors
    ///
    /// Returns the gateway error of the enum query.
    #[tracing::instrument(skip(self))]
    pub async fn read_enums(
        &self,
        category: EnumCategory,
        language: Option<&str>,
        with_icons: bool,
    ) -> Result<Vec<EnumResponse>, BridgeError> {
        let language = language.map(str::to_string);
        let default_language = Arc::clone(&self.language);
        self.submit(RequestKind::ReadEnums, move |gateway| async move {
            let language = language.unwrap_or_else(|| read_language(&default_language));
            let query = ViewQuery::prefixed(ObjectType::Enum, &category.id_prefix());
            let enums = gateway.query_view(query).await?;
            let mut members: HashMap<String, Option<Object>> = HashMap::new();
            let mut responses = Vec::with_capacity(enums.len());

            for enumeration in &enums {
                let mut response = EnumResponse::describe(enumeration, &language, with_icons);
                for id in &enumeration.common.members {
                    if !members.contains_key(id) {
                        let member = match gateway.get_object(id).await {
                            Ok(member) => member,
                            Err(err) => {
                                tracing::debug!(%err, %id, "skipping unreadable enum member");
                                None
                            }
                        };
                        members.insert(id.clone(), member);
                    }
                    if let Some(Some(member)) = members.get(id) {
                        response
                            .items
                            .push(EnumItem::describe(member, &language, with_icons));
                    }
                }
                responses.push(response);
            }
            Ok(responses)
        })
        .await
    }

    /// Every adapter instance, after a synthetic "any instance" entry.
    ///
    /// # Errors
    ///
    /// Returns the gateway error of the instance query.
    #[tracing::instrument(skip(self))]
    pub async fn list_instances(&self) -> Result<Vec<InstanceInfo>, BridgeError> {
        self.submit(RequestKind::ListInstances, |gateway| async move {
            let query = ViewQuery::prefixed(ObjectType::Instance, INSTANCE_PREFIX);
            let instances = gateway.query_view(query).await?;
            Ok(std::iter::once(InstanceInfo::any())
                .chain(
                    instances
                        .iter()
                        .map(|object| InstanceInfo::describe(&object.id, &object.common)),
                )
                .collect())
        })
        .await
    }

    /// Classify the object graph into rooms of controls.
    ///
    /// Without an explicit `language` the bridge language is resolved when
    /// the request runs, so a call parked before readiness uses the adopted
    /// system language. Results are reused per `(language, with_icons)`
    /// until they are older than the configured TTL.
    ///
    /// # Errors
    ///
    /// Returns the gateway error of the snapshot queries.
    #[tracing::instrument(skip(self))]
    pub async fn classify(
        &self,
        language: Option<&str>,
        with_icons: bool,
    ) -> Result<Arc<Vec<Room>>, BridgeError> {
        let language = language.map(str::to_string);
        // the default language is only settled once the bridge is ready
        if language.is_some() || self.is_ready() {
            let key = (
                language.clone().unwrap_or_else(|| self.language()),
                with_icons,
            );
            if let Some(rooms) = self.cached(&key) {
                tracing::debug!("classification served from cache");
                return Ok(rooms);
            }
        }

        let default_language = Arc::clone(&self.language);
        let (language, rooms) = self
            .submit(RequestKind::Classify, move |gateway| async move {
                let language = language.unwrap_or_else(|| read_language(&default_language));
                let snapshot = load_snapshot(&*gateway).await?;
                let controls = classifier::classify(&snapshot, &language);
                Ok((language, project(&controls, with_icons)))
            })
            .await?;
        let rooms = Arc::new(rooms);
        lock(&self.cache).insert((language, with_icons), (Instant::now(), Arc::clone(&rooms)));
        Ok(rooms)
    }

    fn cached(&self, key: &CacheKey) -> Option<Arc<Vec<Room>>> {
        let mut cache = lock(&self.cache);
        match cache.get(key) {
            Some((at, rooms)) if at.elapsed() < self.cache_ttl => Some(Arc::clone(rooms)),
            Some(_) => {
                cache.remove(key);
                None
            }
            None => None,
        }
    }
}

/// Fetch every object the classifier needs.
async fn load_snapshot<G: ObjectGateway>(gateway: &G) -> Result<Snapshot, BridgeError> {
    let mut objects = Vec::new();
    for kind in SNAPSHOT_KINDS {
        objects.extend(gateway.query_view(ViewQuery::all(kind)).await?);
    }
    Ok(Snapshot::new(objects))
}

#[cfg(test)]
mod tests {
    use super::*;
    use iobridge_domain::error::GatewayError;
    use iobridge_domain::file::LogFile;
    use iobridge_domain::object::{Common, ValueType};
    use iobridge_domain::subscription::Topic;
    use iobridge_domain::text::Text;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct InMemoryGateway {
        objects: Mutex<BTreeMap<String, Object>>,
        states: Mutex<HashMap<String, State>>,
        files: Mutex<HashMap<(String, String), Vec<u8>>>,
        logs: Mutex<HashMap<String, Vec<(LogFile, String)>>>,
        calls: Mutex<Vec<String>>,
        file_reads: AtomicUsize,
        queries: AtomicUsize,
    }

    impl InMemoryGateway {
        fn with_objects(objects: impl IntoIterator<Item = Object>) -> Arc<Self> {
            let gateway = Self::default();
            gateway
                .objects
                .lock()
                .unwrap()
                .extend(objects.into_iter().map(|o| (o.id.clone(), o)));
            Arc::new(gateway)
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl ObjectGateway for InMemoryGateway {
        fn namespace(&self) -> &str {
            "n8n.0"
        }

        fn get_object(
            &self,
            id: &str,
        ) -> impl Future<Output = Result<Option<Object>, BridgeError>> + Send {
            let result = if id == "broken.0" {
                Err(GatewayError::new("read object", id, "boom").into())
            } else {
                Ok(self.objects.lock().unwrap().get(id).cloned())
            };
            async { result }
        }

        fn set_object(&self, object: Object) -> impl Future<Output = Result<(), BridgeError>> + Send {
            self.objects.lock().unwrap().insert(object.id.clone(), object);
            async { Ok(()) }
        }

        fn get_state(
            &self,
            id: &str,
        ) -> impl Future<Output = Result<Option<State>, BridgeError>> + Send {
            self.record(format!("get_state {id}"));
            let state = self.states.lock().unwrap().get(id).cloned();
            async { Ok(state) }
        }

        fn set_state(
            &self,
            id: &str,
            state: SettableState,
        ) -> impl Future<Output = Result<(), BridgeError>> + Send {
            self.record(format!("set_state {id}"));
            self.states
                .lock()
                .unwrap()
                .insert(id.to_string(), State::new(state.val, state.ack));
            async { Ok(()) }
        }

        fn read_file(
            &self,
            id: &str,
            file_name: &str,
        ) -> impl Future<Output = Result<Option<FileContent>, BridgeError>> + Send {
            self.file_reads.fetch_add(1, Ordering::SeqCst);
            let data = self
                .files
                .lock()
                .unwrap()
                .get(&(id.to_string(), file_name.to_string()))
                .cloned();
            async { Ok(data.map(|data| FileContent::new(data, None))) }
        }

        fn write_file(
            &self,
            id: &str,
            file_name: &str,
            data: Vec<u8>,
        ) -> impl Future<Output = Result<(), BridgeError>> + Send {
            self.files
                .lock()
                .unwrap()
                .insert((id.to_string(), file_name.to_string()), data);
            async { Ok(()) }
        }

        fn query_view(
            &self,
            query: ViewQuery,
        ) -> impl Future<Output = Result<Vec<Object>, BridgeError>> + Send {
            self.queries.fetch_add(1, Ordering::SeqCst);
            let objects = self
                .objects
                .lock()
                .unwrap()
                .values()
                .filter(|object| query.contains(object))
                .cloned()
                .collect();
            async { Ok(objects) }
        }

        fn subscribe(&self, topic: &Topic) -> impl Future<Output = Result<(), BridgeError>> + Send {
            self.record(format!("subscribe {topic}"));
            async { Ok(()) }
        }

        fn unsubscribe(&self, topic: &Topic) -> impl Future<Output = Result<(), BridgeError>> + Send {
            self.record(format!("unsubscribe {topic}"));
            async { Ok(()) }
        }

        fn require_log(&self, enabled: bool) -> impl Future<Output = Result<(), BridgeError>> + Send {
            self.record(format!("require_log {enabled}"));
            async { Ok(()) }
        }

        fn write_log(
            &self,
            level: LogLevel,
            message: &str,
        ) -> impl Future<Output = Result<(), BridgeError>> + Send {
            self.record(format!("write_log {level} {message}"));
            async { Ok(()) }
        }

        fn log_files(
            &self,
            host: &str,
        ) -> impl Future<Output = Result<Vec<LogFile>, BridgeError>> + Send {
            let files = self
                .logs
                .lock()
                .unwrap()
                .get(host)
                .map(|files| files.iter().map(|(file, _)| file.clone()).collect())
                .unwrap_or_default();
            async { Ok(files) }
        }

        fn read_log_file(
            &self,
            host: &str,
            file_name: &str,
        ) -> impl Future<Output = Result<String, BridgeError>> + Send {
            let text = self
                .logs
                .lock()
                .unwrap()
                .get(host)
                .and_then(|files| files.iter().find(|(file, _)| file.file_name == file_name))
                .map(|(_, text)| text.clone())
                .unwrap_or_default();
            async { Ok(text) }
        }
    }

    fn listener(id: &str) -> ListenerId {
        ListenerId::new(id).unwrap()
    }

    fn bridge(gateway: &Arc<InMemoryGateway>) -> BridgeService<InMemoryGateway> {
        BridgeService::new(Arc::clone(gateway), BridgeOptions::default())
    }

    #[tokio::test]
    async fn should_park_requests_until_started() {
        let gateway = InMemoryGateway::with_objects([]);
        let service = Arc::new(bridge(&gateway));

        let writer = {
            let service = Arc::clone(&service);
            tokio::spawn(async move {
                service
                    .write_state("zone.1.switch", SettableState::command(true))
                    .await
            })
        };
        while service.pending(RequestKind::WriteState) == 0 {
            tokio::task::yield_now().await;
        }
        assert!(gateway.calls().is_empty());

        service.start().await;
        writer.await.unwrap().unwrap();

        assert_eq!(gateway.calls(), vec!["set_state zone.1.switch"]);
        let state = service.read_state("zone.1.switch").await.unwrap().unwrap();
        assert_eq!(state.val, true.into());
    }

    #[tokio::test]
    async fn should_replay_registrations_on_start() {
        let gateway = InMemoryGateway::with_objects([]);
        let service = bridge(&gateway);

        service
            .register(&listener("a"), Subscription::state("zone.*", |_, _| {}))
            .await;
        service
            .register(&listener("b"), Subscription::log(None, None, |_| {}))
            .await;
        assert!(gateway.calls().is_empty());

        service.start().await;
        service.start().await;

        assert_eq!(
            gateway.calls(),
            vec!["subscribe state(zone.*)", "require_log true"]
        );
    }

    #[tokio::test]
    async fn should_share_one_upstream_subscription() {
        let gateway = InMemoryGateway::with_objects([]);
        let service = bridge(&gateway);
        service.start().await;

        for id in ["a", "b"] {
            service
                .register(&listener(id), Subscription::state("zone.*", |_, _| {}))
                .await;
        }
        for id in ["a", "b"] {
            service.unregister_all(&listener(id)).await;
        }

        assert_eq!(
            gateway.calls(),
            vec!["subscribe state(zone.*)", "unsubscribe state(zone.*)"]
        );
        assert_eq!(service.topic_count(), 0);
    }

    #[tokio::test]
    async fn should_dispatch_in_registration_order() {
        let gateway = InMemoryGateway::with_objects([]);
        let service = bridge(&gateway);
        let seen = Arc::new(Mutex::new(Vec::new()));

        for (id, pattern) in [("wide", "zone.*"), ("narrow", "zone.3.switch")] {
            let seen = Arc::clone(&seen);
            service
                .register(
                    &listener(id),
                    Subscription::state(pattern, move |state_id, _| {
                        seen.lock().unwrap().push(format!("{id}:{state_id}"));
                    }),
                )
                .await;
        }
        service.start().await;

        service
            .handle_event(GatewayEvent::StateChanged {
                id: "zone.3.switch".to_string(),
                state: Some(State::new(true, true)),
            })
            .await;

        assert_eq!(
            *seen.lock().unwrap(),
            vec!["wide:zone.3.switch", "narrow:zone.3.switch"]
        );
    }

    #[tokio::test]
    async fn should_read_file_content_once_for_interested_listeners() {
        let gateway = InMemoryGateway::with_objects([]);
        gateway
            .files
            .lock()
            .unwrap()
            .insert(("vis.0".to_string(), "main.json".to_string()), b"{}".to_vec());
        let service = bridge(&gateway);
        let contents = Arc::new(Mutex::new(Vec::new()));

        for (id, with_content) in [("a", true), ("b", true), ("c", false)] {
            let contents = Arc::clone(&contents);
            service
                .register(
                    &listener(id),
                    Subscription::file("vis.0", Some("main.json"), with_content, move |change| {
                        contents.lock().unwrap().push(change.content.is_some());
                    }),
                )
                .await;
        }
        service.dispatch_file("vis.0", "main.json", Some(2)).await;

        assert_eq!(*contents.lock().unwrap(), vec![true, true, false]);
        assert_eq!(gateway.file_reads.load(Ordering::SeqCst), 1);

        service.dispatch_file("vis.0", "main.json", None).await;
        assert_eq!(gateway.file_reads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn should_apply_log_threshold() {
        let gateway = InMemoryGateway::with_objects([]);
        let service = bridge(&gateway);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        service
            .register(
                &listener("logs"),
                Subscription::log(Some(LogLevel::Warn), None, move |message| {
                    sink.lock().unwrap().push(message.severity);
                }),
            )
            .await;

        service.dispatch_log(&LogMessage::new(LogLevel::Info, "hue.0", "ping"));
        service.dispatch_log(&LogMessage::new(LogLevel::Error, "hue.0", "gone"));

        assert_eq!(*seen.lock().unwrap(), vec![LogLevel::Error]);
    }

    #[tokio::test]
    async fn should_merge_existing_object_and_create_missing_one() {
        let mut existing = Object::new("zone.1.switch", ObjectType::State);
        existing.common.role = Some("switch".to_string());
        let gateway = InMemoryGateway::with_objects([existing]);
        let service = bridge(&gateway);
        service.start().await;

        let patch: ObjectPatch =
            serde_json::from_value(serde_json::json!({ "common": { "unit": "W" } })).unwrap();
        let merged = service.write_object("zone.1.switch", patch).await.unwrap();
        assert_eq!(merged.common.role.as_deref(), Some("switch"));
        assert_eq!(merged.common.unit.as_deref(), Some("W"));

        let untyped: ObjectPatch =
            serde_json::from_value(serde_json::json!({ "common": {} })).unwrap();
        let err = service.write_object("zone.2.new", untyped).await.unwrap_err();
        assert!(matches!(
            err,
            BridgeError::Validation(ValidationError::MissingObjectType(_))
        ));
    }

    #[tokio::test]
    async fn should_reject_with_offending_id() {
        let gateway = InMemoryGateway::with_objects([]);
        let service = bridge(&gateway);
        service.start().await;

        let err = service.read_object("broken.0").await.unwrap_err();

        assert!(err.to_string().contains("broken.0"));
    }

    #[tokio::test]
    async fn should_read_newest_log_records() {
        let mut own = Object::new("system.adapter.n8n.0", ObjectType::Instance);
        own.common.host = Some("nas".to_string());
        let gateway = InMemoryGateway::with_objects([own]);
        gateway.logs.lock().unwrap().insert(
            "nas".to_string(),
            vec![
                (
                    LogFile {
                        file_name: "iobroker.2025-08-22.log".to_string(),
                        size: 10,
                    },
                    "2025-08-22 10:00:00.000 - error: old.0 stale".to_string(),
                ),
                (
                    LogFile {
                        file_name: "iobroker.2025-08-23.log".to_string(),
                        size: 10,
                    },
                    "2025-08-23 10:00:00.000 - error: hue.0 fresh".to_string(),
                ),
            ],
        );
        let service = bridge(&gateway);
        service.start().await;

        let records = service.read_log(None, None, Some(10)).await.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].from, "hue.0");
    }

    #[tokio::test]
    async fn should_fail_read_log_without_host() {
        let gateway = InMemoryGateway::with_objects([]);
        let service = bridge(&gateway);
        service.start().await;

        let err = service.read_log(None, None, None).await.unwrap_err();

        assert!(matches!(err, BridgeError::NotFound(_)));
    }

    #[tokio::test]
    async fn should_list_enums_with_readable_members() {
        let kitchen = Object::new("enum.rooms.kitchen", ObjectType::Enum).with_common(Common {
            name: Some(Text::from("Kitchen")),
            icon: Some("kitchen.svg".to_string()),
            members: vec!["zone.1.switch".to_string(), "zone.9.gone".to_string()],
            ..Common::default()
        });
        let switch = Object::new("zone.1.switch", ObjectType::State).with_common(Common {
            value_type: Some(ValueType::Boolean),
            ..Common::default()
        });
        let gateway = InMemoryGateway::with_objects([kitchen, switch]);
        let service = bridge(&gateway);
        service.start().await;

        let enums = service
            .read_enums(EnumCategory::Rooms, None, false)
            .await
            .unwrap();

        assert_eq!(enums.len(), 1);
        assert_eq!(enums[0].name, "Kitchen");
        assert!(enums[0].icon.is_none());
        let ids: Vec<_> = enums[0].items.iter().map(|item| item.id.as_str()).collect();
        assert_eq!(ids, vec!["zone.1.switch"]);
    }

    #[tokio::test]
    async fn should_list_instances_after_any_entry() {
        let mut hue = Object::new("system.adapter.hue.0", ObjectType::Instance);
        hue.common.title = Some("Philips Hue".to_string());
        let gateway = InMemoryGateway::with_objects([hue]);
        let service = bridge(&gateway);
        service.start().await;

        let instances = service.list_instances().await.unwrap();

        assert_eq!(instances[0], InstanceInfo::any());
        assert_eq!(instances[1].value, "hue.0");
        assert_eq!(instances[1].name, "Philips Hue [hue.0]");
    }

    #[tokio::test]
    async fn should_adopt_system_language_and_cache_classification() {
        let mut config = Object::new(SYSTEM_CONFIG_ID, ObjectType::Config);
        config.common.language = Some("de".to_string());
        let mut lamp = Object::new("zone.0.lamp", ObjectType::State).with_common(Common {
            role: Some("switch".to_string()),
            value_type: Some(ValueType::Boolean),
            ..Common::default()
        });
        lamp.common.smart_name =
            Some(serde_json::from_value(serde_json::json!({ "de": "Lampe" })).unwrap());
        let gateway = InMemoryGateway::with_objects([config, lamp]);
        let service = bridge(&gateway);
        service.start().await;
        assert_eq!(service.language(), "de");

        let rooms = service.classify(None, false).await.unwrap();
        let queries = gateway.queries.load(Ordering::SeqCst);
        let again = service.classify(None, false).await.unwrap();

        assert!(Arc::ptr_eq(&rooms, &again));
        assert_eq!(gateway.queries.load(Ordering::SeqCst), queries);
        let device = &rooms[0].devices_in_room[0];
        assert_eq!(device.device_name, "Lampe");
        assert!(device.controls.contains_key("power"));
    }

    #[tokio::test]
    async fn should_resolve_default_language_of_parked_calls_at_start() {
        let mut config = Object::new(SYSTEM_CONFIG_ID, ObjectType::Config);
        config.common.language = Some("de".to_string());
        let mut lamp = Object::new("zone.0.lamp", ObjectType::State).with_common(Common {
            role: Some("switch".to_string()),
            value_type: Some(ValueType::Boolean),
            ..Common::default()
        });
        lamp.common.smart_name = Some(
            serde_json::from_value(serde_json::json!({ "en": "Lamp", "de": "Lampe" })).unwrap(),
        );
        let kitchen = Object::new("enum.rooms.kitchen", ObjectType::Enum).with_common(Common {
            name: Some(Text::Translated(BTreeMap::from([
                ("en".to_string(), "Kitchen".to_string()),
                ("de".to_string(), "Küche".to_string()),
            ]))),
            members: vec!["zone.0.lamp".to_string()],
            ..Common::default()
        });
        let gateway = InMemoryGateway::with_objects([config, lamp, kitchen]);
        let service = Arc::new(bridge(&gateway));

        let parked_classify = {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.classify(None, false).await })
        };
        let parked_enums = {
            let service = Arc::clone(&service);
            tokio::spawn(async move {
                service
                    .read_enums(EnumCategory::Rooms, None, false)
                    .await
            })
        };
        while service.pending(RequestKind::Classify) == 0
            || service.pending(RequestKind::ReadEnums) == 0
        {
            tokio::task::yield_now().await;
        }

        service.start().await;
        let rooms = parked_classify.await.unwrap().unwrap();
        let enums = parked_enums.await.unwrap().unwrap();

        let kitchen = rooms
            .iter()
            .find(|room| !room.devices_in_room.is_empty())
            .unwrap();
        assert_eq!(kitchen.room_name, "Küche");
        assert_eq!(kitchen.devices_in_room[0].device_name, "Lampe");
        assert_eq!(enums[0].name, "Küche");

        let queries = gateway.queries.load(Ordering::SeqCst);
        let cached = service.classify(Some("de"), false).await.unwrap();
        assert!(Arc::ptr_eq(&rooms, &cached));
        assert_eq!(gateway.queries.load(Ordering::SeqCst), queries);
    }

    #[tokio::test]
    async fn should_pump_events_until_feed_closes() {
        let gateway = InMemoryGateway::with_objects([]);
        let service = bridge(&gateway);
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        service
            .register(
                &listener("a"),
                Subscription::object("zone.*", move |_, _| {
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .await;
        let (tx, rx) = broadcast::channel(8);
        tx.send(GatewayEvent::Ready).unwrap();
        tx.send(GatewayEvent::ObjectChanged {
            id: "zone.1".to_string(),
            object: None,
        })
        .unwrap();
        drop(tx);

        service.pump_events(rx).await;

        assert!(service.is_ready());
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn should_forward_write_log() {
        let gateway = InMemoryGateway::with_objects([]);
        let service = bridge(&gateway);
        service.start().await;

        service.write_log(LogLevel::Warn, "hello").await.unwrap();

        assert_eq!(gateway.calls(), vec!["write_log warn hello"]);
    }
}
