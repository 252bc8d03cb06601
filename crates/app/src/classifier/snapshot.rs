//! Point-in-time copy of the objects the classifier works on.

use std::collections::BTreeMap;

use iobridge_domain::enumeration::{FUNCTIONS_PREFIX, ROOMS_PREFIX};
use iobridge_domain::object::{Object, ObjectType, parent_of};

/// States, channels, devices and enums keyed (and ordered) by id.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    objects: BTreeMap<String, Object>,
}

impl Snapshot {
    #[must_use]
    pub fn new(objects: impl IntoIterator<Item = Object>) -> Self {
        Self {
            objects: objects
                .into_iter()
                .map(|object| (object.id.clone(), object))
                .collect(),
        }
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Object> {
        self.objects.get(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Every object, sorted by id.
    pub fn objects(&self) -> impl Iterator<Item = &Object> {
        self.objects.values()
    }

    fn kind_of(&self, id: &str) -> Option<ObjectType> {
        self.objects.get(id).map(|object| object.kind)
    }

    /// Non-empty enums under `prefix`, sorted by id.
    fn enums_under<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a Object> {
        self.objects
            .range(prefix.to_string()..)
            .take_while(move |(id, _)| id.starts_with(prefix))
            .map(|(_, object)| object)
            .filter(|object| object.kind == ObjectType::Enum && !object.common.members.is_empty())
    }

    pub fn rooms(&self) -> impl Iterator<Item = &Object> {
        self.enums_under(ROOMS_PREFIX)
    }

    pub fn functions(&self) -> impl Iterator<Item = &Object> {
        self.enums_under(FUNCTIONS_PREFIX)
    }

    /// The channel an id belongs to: the id itself for a channel, the parent
    /// of a state when that parent is a channel.
    #[must_use]
    pub fn channel_of<'a>(&self, id: &'a str) -> Option<&'a str> {
        match self.kind_of(id)? {
            ObjectType::Channel => Some(id),
            ObjectType::State => {
                let parent = parent_of(id);
                (self.kind_of(parent) == Some(ObjectType::Channel)).then_some(parent)
            }
            _ => None,
        }
    }

    /// The device (or grouping channel) above the channel of an id.
    #[must_use]
    pub fn device_of<'a>(&self, id: &'a str) -> Option<&'a str> {
        let device = parent_of(self.channel_of(id)?);
        matches!(
            self.kind_of(device),
            Some(ObjectType::Device | ObjectType::Channel)
        )
        .then_some(device)
    }

    /// States under `id` at most `depth` levels deep, sorted by id.
    pub fn states_under<'a>(&'a self, id: &'a str, depth: usize) -> impl Iterator<Item = &'a Object> {
        let prefix = format!("{id}.");
        self.objects
            .range(prefix.clone()..)
            .take_while(move |(other, _)| other.starts_with(&prefix))
            .map(|(_, object)| object)
            .filter(move |object| {
                object.kind == ObjectType::State
                    && object.id[id.len() + 1..].split('.').count() <= depth
            })
    }
}
