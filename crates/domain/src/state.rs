//! State: the live value of a `state` object.

use serde::{Deserialize, Serialize};

use crate::time::{Timestamp, now};

/// A state value: null, boolean, number or string.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StateValue {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl From<bool> for StateValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for StateValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for StateValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// Live value with its time stamp and acknowledgement flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct State {
    pub val: StateValue,
    /// `true` when the value was confirmed by the owning device.
    #[serde(default)]
    pub ack: bool,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub ts: Timestamp,
    /// Last time the value changed (not merely refreshed).
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub lc: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
}

impl State {
    /// A freshly written state stamped with the current time.
    #[must_use]
    pub fn new(val: impl Into<StateValue>, ack: bool) -> Self {
        let ts = now();
        Self {
            val: val.into(),
            ack,
            ts,
            lc: ts,
            from: None,
        }
    }

    /// Apply a write, keeping `lc` when the value did not change.
    #[must_use]
    pub fn updated(&self, write: SettableState, from: Option<String>) -> Self {
        let ts = now();
        let lc = if write.val == self.val { self.lc } else { ts };
        Self {
            val: write.val,
            ack: write.ack,
            ts,
            lc,
            from,
        }
    }
}

/// The part of a state a caller can write.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SettableState {
    pub val: StateValue,
    #[serde(default)]
    pub ack: bool,
}

impl SettableState {
    /// A command (`ack = false`) to be executed by the owning device.
    #[must_use]
    pub fn command(val: impl Into<StateValue>) -> Self {
        Self {
            val: val.into(),
            ack: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_deserialize_every_value_shape() {
        let values: Vec<StateValue> = serde_json::from_str(r#"[null, true, 21.5, "on"]"#).unwrap();
        assert_eq!(
            values,
            vec![
                StateValue::Null,
                StateValue::Bool(true),
                StateValue::Number(21.5),
                StateValue::Text("on".to_string()),
            ]
        );
    }

    #[test]
    fn should_roundtrip_millisecond_timestamps() {
        let json = r#"{"val": 1, "ack": true, "ts": 1700000000123, "lc": 1700000000000}"#;
        let state: State = serde_json::from_str(json).unwrap();
        assert_eq!(state.ts.timestamp_millis(), 1_700_000_000_123);
        let back = serde_json::to_value(&state).unwrap();
        assert_eq!(back["lc"], serde_json::json!(1_700_000_000_000_i64));
    }

    #[test]
    fn should_keep_last_change_when_value_is_unchanged() {
        let state = State::new(true, true);
        let refreshed = state.updated(SettableState { val: true.into(), ack: true }, None);
        assert_eq!(refreshed.lc, state.lc);
    }

    #[test]
    fn should_move_last_change_when_value_changes() {
        let state = State::new(false, true);
        let changed = state.updated(SettableState::command(true), Some("n8n.0".to_string()));
        assert!(changed.lc >= state.lc);
        assert_eq!(changed.val, StateValue::Bool(true));
        assert!(!changed.ack);
    }
}
