//! Subscription registry: listeners, their patterns and the upstream topics
//! they share.
//!
//! The registry is pure bookkeeping: registering or removing a listener
//! returns the [`Upstream`] commands the caller must forward to the gateway.
//! A topic is subscribed upstream when its first listener arrives and
//! unsubscribed when its last listener leaves, so any number of listeners on
//! the same pattern cost a single upstream subscription.

pub mod log_filter;

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use iobridge_domain::file::FileContent;
use iobridge_domain::id::ListenerId;
use iobridge_domain::log::{LogLevel, LogMessage};
use iobridge_domain::object::Object;
use iobridge_domain::pattern::Pattern;
use iobridge_domain::state::State;
use iobridge_domain::subscription::{ANY_FILE, ChangeKind, Topic};

pub use log_filter::LogFilter;

pub type StateCallback = Arc<dyn Fn(&str, Option<&State>) + Send + Sync>;
pub type ObjectCallback = Arc<dyn Fn(&str, Option<&Object>) + Send + Sync>;
pub type FileCallback = Arc<dyn Fn(&FileChange) + Send + Sync>;
pub type LogCallback = Arc<dyn Fn(&LogMessage) + Send + Sync>;

/// A file change as delivered to file listeners.
#[derive(Debug, Clone, PartialEq)]
pub struct FileChange {
    pub id: String,
    pub file_name: String,
    /// `None` when the file was deleted.
    pub size: Option<u64>,
    /// Only present for listeners that asked for content.
    pub content: Option<FileContent>,
}

/// What a listener asks to be notified about.
#[derive(Clone)]
pub enum Subscription {
    State {
        pattern: String,
        callback: StateCallback,
    },
    Object {
        pattern: String,
        callback: ObjectCallback,
    },
    File {
        pattern: String,
        file_name: Option<String>,
        with_content: bool,
        callback: FileCallback,
    },
    Log {
        level: Option<LogLevel>,
        instance: Option<String>,
        callback: LogCallback,
    },
}

impl Subscription {
    pub fn state(
        pattern: impl Into<String>,
        callback: impl Fn(&str, Option<&State>) + Send + Sync + 'static,
    ) -> Self {
        Self::State {
            pattern: pattern.into(),
            callback: Arc::new(callback),
        }
    }

    pub fn object(
        pattern: impl Into<String>,
        callback: impl Fn(&str, Option<&Object>) + Send + Sync + 'static,
    ) -> Self {
        Self::Object {
            pattern: pattern.into(),
            callback: Arc::new(callback),
        }
    }

    pub fn file(
        pattern: impl Into<String>,
        file_name: Option<&str>,
        with_content: bool,
        callback: impl Fn(&FileChange) + Send + Sync + 'static,
    ) -> Self {
        Self::File {
            pattern: pattern.into(),
            file_name: file_name.map(str::to_string),
            with_content,
            callback: Arc::new(callback),
        }
    }

    pub fn log(
        level: Option<LogLevel>,
        instance: Option<&str>,
        callback: impl Fn(&LogMessage) + Send + Sync + 'static,
    ) -> Self {
        Self::Log {
            level,
            instance: instance.map(str::to_string),
            callback: Arc::new(callback),
        }
    }

    #[must_use]
    pub fn kind(&self) -> ChangeKind {
        match self {
            Self::State { .. } => ChangeKind::State,
            Self::Object { .. } => ChangeKind::Object,
            Self::File { .. } => ChangeKind::File,
            Self::Log { .. } => ChangeKind::Log,
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            Self::State { pattern, .. } | Self::Object { pattern, .. } | Self::File { pattern, .. } => {
                pattern.is_empty()
            }
            Self::Log { .. } => false,
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::State { pattern, .. } => f.debug_struct("State").field("pattern", pattern).finish(),
            Self::Object { pattern, .. } => {
                f.debug_struct("Object").field("pattern", pattern).finish()
            }
            Self::File {
                pattern,
                file_name,
                with_content,
                ..
            } => f
                .debug_struct("File")
                .field("pattern", pattern)
                .field("file_name", file_name)
                .field("with_content", with_content)
                .finish(),
            Self::Log {
                level, instance, ..
            } => f
                .debug_struct("Log")
                .field("level", level)
                .field("instance", instance)
                .finish(),
        }
    }
}

/// Command for the gateway produced by a registry change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Upstream {
    Subscribe(Topic),
    Unsubscribe(Topic),
    /// Log streaming must be switched on (`true`) or off (`false`).
    RequireLog(bool),
}

/// Registered listener, with its patterns compiled.
enum Listener {
    State {
        pattern: Pattern,
        callback: StateCallback,
    },
    Object {
        pattern: Pattern,
        callback: ObjectCallback,
    },
    File {
        pattern: Pattern,
        file_name: Pattern,
        with_content: bool,
        callback: FileCallback,
    },
    Log {
        filter: LogFilter,
        callback: LogCallback,
    },
}

fn compile_or_never(source: &str) -> Pattern {
    Pattern::compile(source).unwrap_or_else(|err| {
        tracing::warn!(pattern = %source, %err, "invalid pattern on subscribe");
        Pattern::never(source)
    })
}

impl Listener {
    fn compile(subscription: Subscription) -> Self {
        match subscription {
            Subscription::State { pattern, callback } => Self::State {
                pattern: compile_or_never(&pattern),
                callback,
            },
            Subscription::Object { pattern, callback } => Self::Object {
                pattern: compile_or_never(&pattern),
                callback,
            },
            Subscription::File {
                pattern,
                file_name,
                with_content,
                callback,
            } => Self::File {
                pattern: compile_or_never(&pattern),
                file_name: compile_or_never(
                    file_name
                        .as_deref()
                        .filter(|name| !name.is_empty())
                        .unwrap_or(ANY_FILE),
                ),
                with_content,
                callback,
            },
            Subscription::Log {
                level,
                instance,
                callback,
            } => Self::Log {
                filter: LogFilter::new(level, instance.as_deref()),
                callback,
            },
        }
    }

    fn kind(&self) -> ChangeKind {
        match self {
            Self::State { .. } => ChangeKind::State,
            Self::Object { .. } => ChangeKind::Object,
            Self::File { .. } => ChangeKind::File,
            Self::Log { .. } => ChangeKind::Log,
        }
    }

    fn topic(&self) -> Option<Topic> {
        match self {
            Self::State { pattern, .. } => Some(Topic::state(pattern.as_str())),
            Self::Object { pattern, .. } => Some(Topic::object(pattern.as_str())),
            Self::File {
                pattern, file_name, ..
            } => Some(Topic::file(pattern.as_str(), Some(file_name.as_str()))),
            Self::Log { .. } => None,
        }
    }
}

/// Listeners in registration order plus the topic → listener-set map.
#[derive(Default)]
pub struct SubscriptionRegistry {
    listeners: Vec<(ListenerId, Listener)>,
    topics: HashMap<Topic, BTreeSet<ListenerId>>,
}

impl SubscriptionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, id: &ListenerId) -> Option<usize> {
        self.listeners.iter().position(|(other, _)| other == id)
    }

    fn has_log_listeners(&self) -> bool {
        self.listeners
            .iter()
            .any(|(_, listener)| matches!(listener, Listener::Log { .. }))
    }

    fn acquire(&mut self, topic: Option<Topic>, id: &ListenerId, commands: &mut Vec<Upstream>) {
        let Some(topic) = topic else { return };
        let listeners = self.topics.entry(topic.clone()).or_default();
        if listeners.is_empty() {
            commands.push(Upstream::Subscribe(topic));
        }
        listeners.insert(id.clone());
    }

    fn release(&mut self, topic: Option<Topic>, id: &ListenerId, commands: &mut Vec<Upstream>) {
        let Some(topic) = topic else { return };
        let Some(listeners) = self.topics.get_mut(&topic) else {
            return;
        };
        listeners.remove(id);
        if listeners.is_empty() {
            self.topics.remove(&topic);
            commands.push(Upstream::Unsubscribe(topic));
        }
    }

    /// Register (or re-register) a listener.
    ///
    /// - same kind and same topic: only the callback and options change
    /// - same kind, new topic: the new topic is acquired before the old one
    ///   is released
    /// - different kind: the previous registration is torn down and the
    ///   listener moves to the end of the new kind's order
    /// - an empty pattern removes the listener
    pub fn register(&mut self, id: &ListenerId, subscription: Subscription) -> Vec<Upstream> {
        if subscription.is_empty() {
            return self.unregister_all(id);
        }
        let had_log = self.has_log_listeners();
        let listener = Listener::compile(subscription);
        let new_topic = listener.topic();
        let mut commands = Vec::new();

        match self.position(id) {
            Some(index) if self.listeners[index].1.kind() == listener.kind() => {
                let old_topic = self.listeners[index].1.topic();
                if old_topic != new_topic {
                    self.acquire(new_topic, id, &mut commands);
                    self.release(old_topic, id, &mut commands);
                }
                self.listeners[index].1 = listener;
            }
            Some(index) => {
                let (_, previous) = self.listeners.remove(index);
                self.acquire(new_topic, id, &mut commands);
                self.release(previous.topic(), id, &mut commands);
                self.listeners.push((id.clone(), listener));
            }
            None => {
                self.acquire(new_topic, id, &mut commands);
                self.listeners.push((id.clone(), listener));
            }
        }

        let has_log = self.has_log_listeners();
        if had_log != has_log {
            commands.push(Upstream::RequireLog(has_log));
        }
        commands
    }

    /// Remove a listener from whatever kind it is registered under.
    pub fn unregister_all(&mut self, id: &ListenerId) -> Vec<Upstream> {
        let mut commands = Vec::new();
        let Some(index) = self.position(id) else {
            return commands;
        };
        let had_log = self.has_log_listeners();
        let (_, listener) = self.listeners.remove(index);
        self.release(listener.topic(), id, &mut commands);
        let has_log = self.has_log_listeners();
        if had_log != has_log {
            commands.push(Upstream::RequireLog(has_log));
        }
        commands
    }

    /// Commands that re-open every live topic, used when the gateway becomes ready.
    #[must_use]
    pub fn replay(&self) -> Vec<Upstream> {
        let mut topics: Vec<&Topic> = self.topics.keys().collect();
        topics.sort();
        let mut commands: Vec<Upstream> = topics
            .into_iter()
            .cloned()
            .map(Upstream::Subscribe)
            .collect();
        if self.has_log_listeners() {
            commands.push(Upstream::RequireLog(true));
        }
        commands
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    #[must_use]
    pub fn kind_of(&self, id: &ListenerId) -> Option<ChangeKind> {
        self.position(id).map(|index| self.listeners[index].1.kind())
    }

    /// Listeners currently sharing a topic.
    #[must_use]
    pub fn listeners_of(&self, topic: &Topic) -> usize {
        self.topics.get(topic).map_or(0, BTreeSet::len)
    }

    /// Number of open upstream topics.
    #[must_use]
    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }

    /// State callbacks matching `id`, in registration order.
    #[must_use]
    pub fn state_targets(&self, id: &str) -> Vec<StateCallback> {
        self.listeners
            .iter()
            .filter_map(|(_, listener)| match listener {
                Listener::State { pattern, callback } if pattern.matches(id) => {
                    Some(Arc::clone(callback))
                }
                _ => None,
            })
            .collect()
    }

    /// Object callbacks matching `id`, in registration order.
    #[must_use]
    pub fn object_targets(&self, id: &str) -> Vec<ObjectCallback> {
        self.listeners
            .iter()
            .filter_map(|(_, listener)| match listener {
                Listener::Object { pattern, callback } if pattern.matches(id) => {
                    Some(Arc::clone(callback))
                }
                _ => None,
            })
            .collect()
    }

    /// File callbacks matching `id` and `file_name`, with their content flag.
    #[must_use]
    pub fn file_targets(&self, id: &str, file_name: &str) -> Vec<(FileCallback, bool)> {
        self.listeners
            .iter()
            .filter_map(|(_, listener)| match listener {
                Listener::File {
                    pattern,
                    file_name: name_pattern,
                    with_content,
                    callback,
                } if pattern.matches(id) && name_pattern.matches(file_name) => {
                    Some((Arc::clone(callback), *with_content))
                }
                _ => None,
            })
            .collect()
    }

    /// Log callbacks whose filter accepts the record.
    #[must_use]
    pub fn log_targets(&self, message: &LogMessage) -> Vec<LogCallback> {
        self.listeners
            .iter()
            .filter_map(|(_, listener)| match listener {
                Listener::Log { filter, callback } if filter.accepts(message) => {
                    Some(Arc::clone(callback))
                }
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn listener(id: &str) -> ListenerId {
        ListenerId::new(id).unwrap()
    }

    fn noop_state(pattern: &str) -> Subscription {
        Subscription::state(pattern, |_, _| {})
    }

    #[test]
    fn should_share_one_upstream_subscription_per_pattern() {
        let mut registry = SubscriptionRegistry::new();

        let first = registry.register(&listener("a"), noop_state("zone.*"));
        let second = registry.register(&listener("b"), noop_state("zone.*"));

        assert_eq!(first, vec![Upstream::Subscribe(Topic::state("zone.*"))]);
        assert!(second.is_empty());
        assert_eq!(registry.listeners_of(&Topic::state("zone.*")), 2);

        assert!(registry.unregister_all(&listener("a")).is_empty());
        assert_eq!(
            registry.unregister_all(&listener("b")),
            vec![Upstream::Unsubscribe(Topic::state("zone.*"))]
        );
        assert_eq!(registry.topic_count(), 0);
    }

    #[test]
    fn should_only_replace_callback_for_identical_pattern() {
        let mut registry = SubscriptionRegistry::new();
        let hits = Arc::new(Mutex::new(Vec::new()));
        registry.register(&listener("a"), noop_state("zone.3.switch"));

        let sink = Arc::clone(&hits);
        let commands = registry.register(
            &listener("a"),
            Subscription::state("zone.3.switch", move |id, _| {
                sink.lock().unwrap().push(id.to_string());
            }),
        );

        assert!(commands.is_empty());
        for callback in registry.state_targets("zone.3.switch") {
            callback("zone.3.switch", None);
        }
        assert_eq!(*hits.lock().unwrap(), vec!["zone.3.switch"]);
    }

    #[test]
    fn should_migrate_pattern_acquiring_before_releasing() {
        let mut registry = SubscriptionRegistry::new();
        registry.register(&listener("a"), noop_state("zone.1"));

        let commands = registry.register(&listener("a"), noop_state("zone.2"));

        assert_eq!(
            commands,
            vec![
                Upstream::Subscribe(Topic::state("zone.2")),
                Upstream::Unsubscribe(Topic::state("zone.1")),
            ]
        );
        assert!(registry.state_targets("zone.1").is_empty());
        assert_eq!(registry.state_targets("zone.2").len(), 1);
    }

    #[test]
    fn should_keep_old_topic_while_other_listeners_remain() {
        let mut registry = SubscriptionRegistry::new();
        registry.register(&listener("a"), noop_state("zone.1"));
        registry.register(&listener("b"), noop_state("zone.1"));

        let commands = registry.register(&listener("a"), noop_state("zone.2"));

        assert_eq!(commands, vec![Upstream::Subscribe(Topic::state("zone.2"))]);
        assert_eq!(registry.listeners_of(&Topic::state("zone.1")), 1);
    }

    #[test]
    fn should_tear_down_previous_kind() {
        let mut registry = SubscriptionRegistry::new();
        registry.register(&listener("a"), noop_state("zone.*"));

        let commands = registry.register(&listener("a"), Subscription::object("zone.*", |_, _| {}));

        assert_eq!(
            commands,
            vec![
                Upstream::Subscribe(Topic::object("zone.*")),
                Upstream::Unsubscribe(Topic::state("zone.*")),
            ]
        );
        assert_eq!(registry.kind_of(&listener("a")), Some(ChangeKind::Object));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn should_remove_listener_on_empty_pattern() {
        let mut registry = SubscriptionRegistry::new();
        registry.register(&listener("a"), noop_state("zone.*"));

        let commands = registry.register(&listener("a"), noop_state(""));

        assert_eq!(commands, vec![Upstream::Unsubscribe(Topic::state("zone.*"))]);
        assert!(registry.is_empty());
    }

    #[test]
    fn should_ignore_unregister_of_unknown_listener() {
        let mut registry = SubscriptionRegistry::new();
        assert!(registry.unregister_all(&listener("ghost")).is_empty());
    }

    #[test]
    fn should_dispatch_to_exact_and_wildcard_in_registration_order() {
        let mut registry = SubscriptionRegistry::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for (name, pattern) in [("wild", "zone.*"), ("exact", "zone.3.switch"), ("other", "hall.*")] {
            let sink = Arc::clone(&order);
            registry.register(
                &listener(name),
                Subscription::state(pattern, move |_, _| sink.lock().unwrap().push(name)),
            );
        }

        for callback in registry.state_targets("zone.3.switch") {
            callback("zone.3.switch", None);
        }

        assert_eq!(*order.lock().unwrap(), vec!["wild", "exact"]);
    }

    #[test]
    fn should_never_match_invalid_pattern_without_failing() {
        let mut registry = SubscriptionRegistry::new();
        let long = format!("{}*", "a".repeat(2_000_000));

        let commands = registry.register(&listener("a"), noop_state(&long));

        assert_eq!(commands.len(), 1);
        assert!(registry.state_targets(&"a".repeat(2_000_000)).is_empty());
    }

    #[test]
    fn should_toggle_log_streaming_on_first_and_last_log_listener() {
        let mut registry = SubscriptionRegistry::new();

        let first = registry.register(&listener("a"), Subscription::log(None, None, |_| {}));
        let second = registry.register(
            &listener("b"),
            Subscription::log(Some(LogLevel::Warn), None, |_| {}),
        );
        let remove_a = registry.unregister_all(&listener("a"));
        let remove_b = registry.unregister_all(&listener("b"));

        assert_eq!(first, vec![Upstream::RequireLog(true)]);
        assert!(second.is_empty());
        assert!(remove_a.is_empty());
        assert_eq!(remove_b, vec![Upstream::RequireLog(false)]);
    }

    #[test]
    fn should_switch_log_streaming_off_on_kind_change() {
        let mut registry = SubscriptionRegistry::new();
        registry.register(&listener("a"), Subscription::log(None, None, |_| {}));

        let commands = registry.register(&listener("a"), noop_state("zone.*"));

        assert_eq!(
            commands,
            vec![
                Upstream::Subscribe(Topic::state("zone.*")),
                Upstream::RequireLog(false),
            ]
        );
    }

    #[test]
    fn should_filter_log_targets_by_threshold() {
        let mut registry = SubscriptionRegistry::new();
        registry.register(
            &listener("a"),
            Subscription::log(Some(LogLevel::Warn), None, |_| {}),
        );

        let info = LogMessage::new(LogLevel::Info, "hue.0", "connected");
        let error = LogMessage::new(LogLevel::Error, "hue.0", "bridge lost");

        assert!(registry.log_targets(&info).is_empty());
        assert_eq!(registry.log_targets(&error).len(), 1);
    }

    #[test]
    fn should_key_file_topics_by_pattern_and_file_name() {
        let mut registry = SubscriptionRegistry::new();

        let any = registry.register(
            &listener("a"),
            Subscription::file("vis.0", None, false, |_| {}),
        );
        let main = registry.register(
            &listener("b"),
            Subscription::file("vis.0", Some("main/*"), true, |_| {}),
        );

        assert_eq!(any, vec![Upstream::Subscribe(Topic::file("vis.0", None))]);
        assert_eq!(
            main,
            vec![Upstream::Subscribe(Topic::file("vis.0", Some("main/*")))]
        );

        let targets = registry.file_targets("vis.0", "main/vis-views.json");
        assert_eq!(targets.len(), 2);
        assert_eq!(
            targets.iter().map(|(_, content)| *content).collect::<Vec<_>>(),
            vec![false, true]
        );
        assert_eq!(registry.file_targets("vis.0", "other/file.txt").len(), 1);
    }

    #[test]
    fn should_replay_live_topics_and_log_flag() {
        let mut registry = SubscriptionRegistry::new();
        registry.register(&listener("a"), noop_state("zone.*"));
        registry.register(&listener("b"), noop_state("zone.*"));
        registry.register(&listener("c"), Subscription::object("hall.1", |_, _| {}));
        registry.register(&listener("d"), Subscription::log(None, None, |_| {}));

        let replay = registry.replay();

        assert_eq!(replay.len(), 3);
        assert!(replay.contains(&Upstream::Subscribe(Topic::state("zone.*"))));
        assert!(replay.contains(&Upstream::Subscribe(Topic::object("hall.1"))));
        assert_eq!(replay.last(), Some(&Upstream::RequireLog(true)));
    }
}
