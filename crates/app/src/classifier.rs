//! Device classification over a snapshot of the object graph.
//!
//! Classification runs in two phases:
//!
//! 1. **Explicit**: every controllable object carrying a valid smart name
//!    becomes a control of its own. The kind comes from the smart-name type
//!    tag, or is inferred from the value type when no tag is set.
//! 2. **Detected**: objects listed in function and room enums are run
//!    through structural [`detector`] matching. Objects already claimed by
//!    phase 1 (and their channels) are left out.
//!
//! Objects whose smart name resolves to `ignore`, and enums marked that
//! way, never contribute.

pub mod detector;
pub mod snapshot;
pub mod templates;

use iobridge_domain::control::{BoundState, Control, ControlObject, DeviceKind, EnumRef};
use iobridge_domain::object::{Object, ValueLabels};
use iobridge_domain::smart_name::SmartName;
use iobridge_domain::text::display_name;

use detector::{Detection, Detector};
use snapshot::Snapshot;
use templates::{DeviceTemplate, SlotTemplate, template};

fn is_ignored(object: &Object, language: &str) -> bool {
    object
        .common
        .smart_name
        .as_ref()
        .is_some_and(|smart_name| smart_name.is_ignored(language))
}

/// Bind one object into a slot.
fn bind(slot: &SlotTemplate, object: &Object) -> BoundState {
    let common = &object.common;
    BoundState {
        name: slot.name.to_string(),
        id: object.id.clone(),
        role: common.role.clone(),
        value_type: common.value_type,
        writable: slot.writes && common.write != Some(false),
        readable: slot.reads && common.read != Some(false),
        min: common.min,
        max: common.max,
        unit: common.unit.clone(),
        labels: common.states.as_ref().map(ValueLabels::to_map),
        smart_name: common.smart_name.clone(),
        default_role: slot.role.canonical().map(str::to_string),
        default_unit: slot.default_unit.map(str::to_string),
        indicator: slot.indicator,
    }
}

/// Runs both classification phases for one language.
pub struct Classifier<'s> {
    snapshot: &'s Snapshot,
    language: &'s str,
    rooms: Vec<&'s Object>,
    functions: Vec<&'s Object>,
}

impl<'s> Classifier<'s> {
    #[must_use]
    pub fn new(snapshot: &'s Snapshot, language: &'s str) -> Self {
        let rooms = snapshot
            .rooms()
            .filter(|room| !is_ignored(room, language))
            .collect();
        let functions = snapshot
            .functions()
            .filter(|function| !is_ignored(function, language))
            .collect();
        Self {
            snapshot,
            language,
            rooms,
            functions,
        }
    }

    fn accepts_member(&self, object: &Object) -> bool {
        object.kind.is_controllable() && !is_ignored(object, self.language)
    }

    /// Objects eligible for structural detection: function members first,
    /// then room members whose channel (or device) is not already pooled.
    fn detection_pool(&self) -> Vec<&'s str> {
        let snapshot = self.snapshot;
        let mut pool: Vec<&'s str> = Vec::new();

        for function in &self.functions {
            for member in &function.common.members {
                let Some(object) = snapshot.get(member) else {
                    continue;
                };
                if self.accepts_member(object) && !pool.contains(&object.id.as_str()) {
                    pool.push(&object.id);
                }
            }
        }

        for room in &self.rooms {
            for member in &room.common.members {
                let Some(object) = snapshot.get(member) else {
                    continue;
                };
                let id = object.id.as_str();
                if !self.accepts_member(object) || pool.contains(&id) {
                    continue;
                }
                let covered = snapshot.channel_of(id).is_some_and(|channel| {
                    pool.contains(&channel)
                        || snapshot
                            .device_of(id)
                            .is_some_and(|device| pool.contains(&device))
                });
                if !covered {
                    pool.push(id);
                }
            }
        }
        pool
    }

    /// Phase 1: a control for an object named through its smart name.
    fn explicit(&self, object: &'s Object) -> Option<Control> {
        let smart_name = object.common.smart_name.as_ref()?;
        let kind = match smart_name.smart_type() {
            Some(tag) => match tag.parse::<DeviceKind>() {
                Ok(kind) => kind,
                Err(err) => {
                    tracing::debug!(id = %object.id, %err, "skipping smart-named object");
                    return None;
                }
            },
            None => DeviceKind::inferred_from(object.common.value_type),
        };
        let Some(slot) = template(kind).and_then(DeviceTemplate::primary_slot) else {
            tracing::debug!(id = %object.id, %kind, "no slot for smart-named object");
            return None;
        };
        let names = smart_name.group_names(self.language);
        let name = smart_name
            .display_name(self.language)
            .map_or_else(
                || display_name(object.common.name.as_ref(), self.language, &object.id),
                str::to_string,
            );

        Some(Control {
            kind,
            states: vec![bind(slot, object)],
            object: ControlObject {
                id: object.id.clone(),
                kind: object.kind,
                name,
                icon: object.common.icon.clone(),
                auto_detected: false,
                toggle: smart_name.toggle(),
            },
            names,
            room: None,
            function: None,
        })
    }

    fn enum_containing(&self, enums: &[&Object], id: &str) -> Option<EnumRef> {
        enums
            .iter()
            .find(|candidate| candidate.common.members.iter().any(|member| member == id))
            .map(|found| EnumRef {
                id: found.id.clone(),
                name: display_name(found.common.name.as_ref(), self.language, &found.id),
            })
    }

    /// Phase 2: a control for a detected device shape under `object`.
    fn detected(&self, object: &Object, detection: Detection<'_>) -> Control {
        let smart_name = object
            .common
            .smart_name
            .as_ref()
            .filter(|smart_name| smart_name.is_valid(self.language));

        Control {
            kind: detection.kind,
            states: detection
                .slots
                .into_iter()
                .map(|(slot, state)| bind(slot, state))
                .collect(),
            object: ControlObject {
                id: object.id.clone(),
                kind: object.kind,
                name: display_name(object.common.name.as_ref(), self.language, &object.id),
                icon: object.common.icon.clone(),
                auto_detected: true,
                toggle: object.common.smart_name.as_ref().and_then(SmartName::toggle),
            },
            names: smart_name
                .map(|smart_name| smart_name.group_names(self.language))
                .unwrap_or_default(),
            room: self.enum_containing(&self.rooms, &object.id),
            function: self.enum_containing(&self.functions, &object.id),
        }
    }

    /// Classify the snapshot into controls: explicit ones first, then
    /// detected ones in pool order.
    #[must_use]
    pub fn classify(&self) -> Vec<Control> {
        let snapshot = self.snapshot;
        let mut detector = Detector::new(snapshot);
        let mut pool = self.detection_pool();
        let mut controls = Vec::new();

        for object in snapshot.objects() {
            if is_ignored(object, self.language) {
                detector.mark_used(&object.id);
                continue;
            }
            let named = object
                .common
                .smart_name
                .as_ref()
                .is_some_and(|smart_name| smart_name.is_valid(self.language));
            if !object.kind.is_controllable() || !named {
                continue;
            }
            let Some(control) = self.explicit(object) else {
                continue;
            };
            let channel = snapshot.channel_of(&object.id);
            pool.retain(|pooled| *pooled != object.id && Some(*pooled) != channel);
            detector.mark_used(&object.id);
            controls.push(control);
        }
        let explicit = controls.len();

        for id in pool {
            let Some(object) = snapshot.get(id) else {
                continue;
            };
            for detection in detector.detect(id) {
                controls.push(self.detected(object, detection));
            }
        }

        tracing::debug!(
            explicit,
            detected = controls.len() - explicit,
            "classification finished"
        );
        controls
    }
}

/// Classify a snapshot for one language.
#[must_use]
pub fn classify(snapshot: &Snapshot, language: &str) -> Vec<Control> {
    Classifier::new(snapshot, language).classify()
}
