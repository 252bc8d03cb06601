//! Structural detection: recognise device shapes among the states of an
//! object by their roles and indicator naming.

use std::collections::HashSet;

use iobridge_domain::control::DeviceKind;
use iobridge_domain::object::{Object, ObjectType};
use iobridge_domain::text::last_segment;

use super::snapshot::Snapshot;
use super::templates::{DeviceTemplate, INDICATORS, SlotTemplate, TEMPLATES};

/// Indicator states never bound, by last id segment.
pub const IGNORED_INDICATORS: &[&str] = &["UNREACH_STICKY"];
/// Kinds never produced by detection.
pub const EXCLUDED_KINDS: &[DeviceKind] = &[DeviceKind::Info];

/// A device shape found among the states of an object.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection<'s> {
    pub kind: DeviceKind,
    pub slots: Vec<(&'static SlotTemplate, &'s Object)>,
}

/// Runs detection over a snapshot, never binding a state twice.
pub struct Detector<'s> {
    snapshot: &'s Snapshot,
    used: HashSet<&'s str>,
}

impl<'s> Detector<'s> {
    #[must_use]
    pub fn new(snapshot: &'s Snapshot) -> Self {
        Self {
            snapshot,
            used: HashSet::new(),
        }
    }

    /// Keep a state out of every later detection.
    pub fn mark_used(&mut self, id: &'s str) {
        self.used.insert(id);
    }

    #[must_use]
    pub fn is_used(&self, id: &str) -> bool {
        self.used.contains(id)
    }

    /// States an object contributes: itself for a state, its own states for
    /// a channel, the states of its channels for a device.
    fn candidates(&self, id: &str) -> Vec<&'s Object> {
        let snapshot = self.snapshot;
        let Some(object) = snapshot.get(id) else {
            return Vec::new();
        };
        let all: Vec<&'s Object> = match object.kind {
            ObjectType::State => vec![object],
            ObjectType::Channel => snapshot.states_under(&object.id, 1).collect(),
            ObjectType::Device => snapshot.states_under(&object.id, 2).collect(),
            _ => Vec::new(),
        };
        all.into_iter()
            .filter(|candidate| !self.is_used(&candidate.id))
            .collect()
    }

    fn fill(template: &DeviceTemplate, candidates: &[&'s Object]) -> Option<Detection<'s>> {
        let mut slots: Vec<(&'static SlotTemplate, &'s Object)> = Vec::new();
        let is_free = |slots: &[(&SlotTemplate, &Object)], candidate: &Object| {
            !slots.iter().any(|(_, bound)| bound.id == candidate.id)
        };

        for slot in template.slots {
            let pick = candidates
                .iter()
                .copied()
                .find(|candidate| is_free(&slots, candidate) && slot.accepts(candidate));
            match pick {
                Some(object) => slots.push((slot, object)),
                None if slot.required => return None,
                None => {}
            }
        }
        for slot in INDICATORS {
            let pick = candidates.iter().copied().find(|candidate| {
                is_free(&slots, candidate)
                    && !IGNORED_INDICATORS.contains(&last_segment(&candidate.id))
                    && slot.accepts(candidate)
            });
            if let Some(object) = pick {
                slots.push((slot, object));
            }
        }

        Some(Detection {
            kind: template.kind,
            slots,
        })
    }

    /// Detect every device shape under `id`, in template priority order.
    pub fn detect(&mut self, id: &str) -> Vec<Detection<'s>> {
        let mut candidates = self.candidates(id);
        let mut found = Vec::new();

        while !candidates.is_empty() {
            let detection = TEMPLATES
                .iter()
                .filter(|template| !EXCLUDED_KINDS.contains(&template.kind))
                .find_map(|template| Self::fill(template, &candidates));
            let Some(detection) = detection else { break };

            for (_, object) in &detection.slots {
                self.used.insert(object.id.as_str());
            }
            candidates.retain(|candidate| !self.used.contains(candidate.id.as_str()));
            tracing::debug!(%id, kind = %detection.kind, states = detection.slots.len(), "detected control");
            found.push(detection);
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iobridge_domain::object::{Common, ValueType};

    fn state(id: &str, role: &str, value_type: ValueType) -> Object {
        Object::new(id, ObjectType::State).with_common(Common {
            role: Some(role.to_string()),
            value_type: Some(value_type),
            ..Common::default()
        })
    }

    fn dimmer_channel() -> Snapshot {
        Snapshot::new([
            Object::new("hm.0.lamp", ObjectType::Channel),
            state("hm.0.lamp.LEVEL", "level.dimmer", ValueType::Number),
            state("hm.0.lamp.ON", "switch.light", ValueType::Boolean),
            state(
                "hm.0.lamp.UNREACH",
                "indicator.maintenance.unreach",
                ValueType::Boolean,
            ),
            state(
                "hm.0.lamp.UNREACH_STICKY",
                "indicator.maintenance.unreach",
                ValueType::Boolean,
            ),
        ])
    }

    fn slot_ids(detection: &Detection<'_>) -> Vec<(&'static str, String)> {
        detection
            .slots
            .iter()
            .map(|(slot, object)| (slot.name, object.id.clone()))
            .collect()
    }

    #[test]
    fn should_detect_dimmer_with_indicator() {
        let snapshot = dimmer_channel();
        let mut detector = Detector::new(&snapshot);

        let found = detector.detect("hm.0.lamp");

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, DeviceKind::Dimmer);
        assert_eq!(
            slot_ids(&found[0]),
            vec![
                ("SET", "hm.0.lamp.LEVEL".to_string()),
                ("ON", "hm.0.lamp.ON".to_string()),
                ("UNREACH", "hm.0.lamp.UNREACH".to_string()),
            ]
        );
    }

    #[test]
    fn should_never_bind_ignored_indicator() {
        let snapshot = Snapshot::new([
            Object::new("hm.0.plug", ObjectType::Channel),
            state("hm.0.plug.STATE", "switch", ValueType::Boolean),
            state(
                "hm.0.plug.UNREACH_STICKY",
                "indicator.maintenance.unreach",
                ValueType::Boolean,
            ),
        ]);
        let mut detector = Detector::new(&snapshot);

        let found = detector.detect("hm.0.plug");

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, DeviceKind::Socket);
        assert_eq!(found[0].slots.len(), 1);
    }

    #[test]
    fn should_not_bind_a_state_twice() {
        let snapshot = dimmer_channel();
        let mut detector = Detector::new(&snapshot);

        let first = detector.detect("hm.0.lamp");
        let second = detector.detect("hm.0.lamp.LEVEL");

        assert_eq!(first.len(), 1);
        assert!(second.is_empty());
    }

    #[test]
    fn should_skip_states_marked_used() {
        let snapshot = dimmer_channel();
        let mut detector = Detector::new(&snapshot);
        detector.mark_used("hm.0.lamp.LEVEL");

        let found = detector.detect("hm.0.lamp");

        // the remaining light switch is still a control of its own
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, DeviceKind::Light);
    }

    #[test]
    fn should_not_produce_info_controls() {
        let snapshot = Snapshot::new([state("sys.0.uptime", "value", ValueType::Number)]);
        let mut detector = Detector::new(&snapshot);

        assert!(detector.detect("sys.0.uptime").is_empty());
    }

    #[test]
    fn should_detect_several_controls_in_one_device() {
        let snapshot = Snapshot::new([
            Object::new("hm.0.climate", ObjectType::Device),
            Object::new("hm.0.climate.1", ObjectType::Channel),
            state("hm.0.climate.1.SET", "level.temperature", ValueType::Number),
            state("hm.0.climate.1.ACTUAL", "value.temperature", ValueType::Number),
            Object::new("hm.0.climate.2", ObjectType::Channel),
            state("hm.0.climate.2.WINDOW", "sensor.window", ValueType::Boolean),
        ]);
        let mut detector = Detector::new(&snapshot);

        let kinds: Vec<_> = detector
            .detect("hm.0.climate")
            .into_iter()
            .map(|detection| detection.kind)
            .collect();

        assert_eq!(kinds, vec![DeviceKind::Thermostat, DeviceKind::Window]);
    }
}
