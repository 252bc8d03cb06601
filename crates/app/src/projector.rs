//! Reshape classified controls into the room-indexed projection document.

use std::collections::BTreeMap;

use iobridge_domain::control::{BoundState, Control, ControlType};
use iobridge_domain::object::ValueType;
use iobridge_domain::projection::{ControlBinding, DeviceRecord, NO_ROOM, Room};

/// Semantic key a bound state is published under.
///
/// A vocabulary word set as the state's own smart-name type wins over the
/// slot mapping of the device kind.
fn control_key(control: &Control, state: &BoundState) -> ControlType {
    state
        .smart_name
        .as_ref()
        .and_then(|smart_name| smart_name.smart_type())
        .and_then(ControlType::known)
        .unwrap_or_else(|| ControlType::for_slot(control.kind, &state.name, state.value_type))
}

fn binding(state: &BoundState, control_type: &ControlType) -> ControlBinding {
    ControlBinding {
        state_id: state.id.clone(),
        control_type: control_type.to_string(),
        value_type: state.value_type.unwrap_or(ValueType::Boolean),
        writable: state.writable,
        readable: state.readable,
        min: state.min,
        max: state.max,
        unit: state.unit.clone().or_else(|| state.default_unit.clone()),
        states: state.labels.clone(),
        role: state.role.clone().or_else(|| state.default_role.clone()),
    }
}

fn record(control: &Control, room: &str, with_icons: bool) -> DeviceRecord {
    let mut controls = BTreeMap::new();
    for state in &control.states {
        let key = control_key(control, state);
        // a later slot with the same key replaces the earlier one
        controls.insert(key.to_string(), binding(state, &key));
    }
    DeviceRecord {
        device_name: control.object.name.clone(),
        device_type: control.kind,
        friendly_device_names: control.names.clone(),
        room: room.to_string(),
        functionality: control.function.as_ref().map(|function| function.name.clone()),
        icon: control.object.icon.clone().filter(|_| with_icons),
        controls,
    }
}

/// Group controls by room, rooms in first-seen order.
#[must_use]
pub fn project(controls: &[Control], with_icons: bool) -> Vec<Room> {
    let mut rooms: Vec<Room> = Vec::new();
    for control in controls {
        let room_name = control.room.as_ref().map_or(NO_ROOM, |room| room.name.as_str());
        let index = match rooms.iter().position(|room| room.room_name == room_name) {
            Some(index) => index,
            None => {
                rooms.push(Room::new(room_name));
                rooms.len() - 1
            }
        };
        rooms[index]
            .devices_in_room
            .push(record(control, room_name, with_icons));
    }
    rooms
}
