//! Device state store - last known raw value per attribute
//!
//! One slot per registry attribute, created up front and never removed.
//! Values are kept exactly as the receiver sent them; typed views live in
//! the handler's property getters.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::protocol::registry;

/// Mirror of the receiver's state for one connection
#[derive(Debug, Clone)]
pub struct DeviceState {
    /// Key: attribute key, Value: raw value string
    values: HashMap<String, String>,

    /// Set once the receiver answers zone queries after a power-on
    reconciled: bool,

    /// Input number -> configured name
    input_names: BTreeMap<u8, String>,

    /// Configured name -> input number
    input_numbers: HashMap<String, u8>,
}

/// Serializable copy of the store, for display and debugging
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub values: BTreeMap<String, String>,
    pub reconciled: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub inputs: BTreeMap<u8, String>,
}

impl DeviceState {
    /// Create a store seeded with defaults: every attribute empty, power off
    pub fn new() -> Self {
        let mut values: HashMap<String, String> = registry::keys()
            .map(|key| (key.to_string(), String::new()))
            .collect();
        values.insert(registry::POWER.to_string(), "0".to_string());

        Self {
            values,
            reconciled: false,
            input_names: BTreeMap::new(),
            input_numbers: HashMap::new(),
        }
    }

    /// Raw value for a key, `None` if the key has no slot
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Raw value for a key, empty when unknown or unset
    pub fn raw(&self, key: &str) -> &str {
        self.get(key).unwrap_or("")
    }

    /// Overwrite a value and return the previous one
    ///
    /// The write always happens, even when the value is unchanged.
    pub fn set(&mut self, key: &str, value: &str) -> Option<String> {
        self.values.insert(key.to_string(), value.to_string())
    }

    /// Whether the post power-on refresh has been confirmed
    pub fn is_reconciled(&self) -> bool {
        self.reconciled
    }

    pub fn set_reconciled(&mut self, reconciled: bool) {
        self.reconciled = reconciled;
    }

    /// Name of a discovered input
    pub fn input_name(&self, number: u8) -> Option<&str> {
        self.input_names.get(&number).map(String::as_str)
    }

    /// Number of a discovered input by name
    pub fn input_number(&self, name: &str) -> Option<u8> {
        self.input_numbers.get(name).copied()
    }

    /// Record a discovered input, returning true if the name changed
    pub fn set_input_name(&mut self, number: u8, name: &str) -> bool {
        if self.input_names.get(&number).map(String::as_str) == Some(name) {
            return false;
        }
        if let Some(old) = self.input_names.insert(number, name.to_string()) {
            self.input_numbers.remove(&old);
        }
        self.input_numbers.insert(name.to_string(), number);
        true
    }

    /// Names of all discovered inputs, ordered by input number
    pub fn input_list(&self) -> Vec<String> {
        self.input_names.values().cloned().collect()
    }

    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            values: self
                .values
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            reconciled: self.reconciled,
            inputs: self.input_names.clone(),
        }
    }
}

impl Default for DeviceState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_defaults() {
        let state = DeviceState::new();
        for key in registry::keys() {
            assert!(state.get(key).is_some(), "missing slot for {}", key);
        }
        assert_eq!(state.raw(registry::POWER), "0");
        assert_eq!(state.raw(registry::VOLUME), "");
        assert_eq!(state.get("ZZZ"), None);
        assert_eq!(state.raw("ZZZ"), "");
        assert!(!state.is_reconciled());
    }

    #[test]
    fn test_set_returns_previous() {
        let mut state = DeviceState::new();
        assert_eq!(state.set(registry::MUTE, "1"), Some(String::new()));
        assert_eq!(state.set(registry::MUTE, "1"), Some("1".to_string()));
        assert_eq!(state.raw(registry::MUTE), "1");
    }

    #[test]
    fn test_input_maps_stay_consistent() {
        let mut state = DeviceState::new();
        assert!(state.set_input_name(1, "Blu-ray"));
        assert!(!state.set_input_name(1, "Blu-ray"));
        assert!(state.set_input_name(1, "Player"));

        assert_eq!(state.input_name(1), Some("Player"));
        assert_eq!(state.input_number("Player"), Some(1));
        assert_eq!(state.input_number("Blu-ray"), None);
        assert_eq!(state.input_list(), vec!["Player".to_string()]);
    }

    #[test]
    fn test_snapshot_serializes() {
        let mut state = DeviceState::new();
        state.set(registry::POWER, "1");
        let json = serde_json::to_value(state.snapshot()).unwrap();
        assert_eq!(json["values"]["P1P"], "1");
        assert_eq!(json["reconciled"], false);
        assert!(json.get("inputs").is_none());
    }
}
