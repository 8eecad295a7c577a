//! Response interpretation
//!
//! Matches one decoded message against the receiver's literal status
//! responses and then against the attribute registry, updates the state
//! mirror and detects power transitions.

use tracing::{debug, info, warn};

use super::{Action, Avr};
use crate::protocol::registry;

/// Outcome of interpreting one message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterpretResult {
    /// Message matched a literal response or a registry attribute
    pub recognized: bool,
    /// Stored value differs from the previous one
    pub changed: bool,
    /// Registry key the message was matched to
    pub key: Option<&'static str>,
}

impl InterpretResult {
    fn log_only() -> Self {
        Self {
            recognized: true,
            changed: false,
            key: None,
        }
    }

    fn unrecognized() -> Self {
        Self {
            recognized: false,
            changed: false,
            key: None,
        }
    }
}

impl Avr {
    /// Interpret a single message (without delimiter)
    ///
    /// Attribute values are always written back, even when unchanged. A
    /// change queues an [`Action::Notify`] carrying the raw message.
    pub fn interpret(&mut self, message: &str) -> InterpretResult {
        let result = if message.starts_with("Invalid Command") {
            warn!("Invalid command: {}", message);
            InterpretResult::log_only()
        } else if message.starts_with("Parameter Out-of-range") {
            warn!("Out-of-range command: {}", message);
            InterpretResult::log_only()
        } else if message.starts_with("Main Off") || message.starts_with("Zone2 Off") {
            warn!("Ignoring command for powered-off zone: {}", message);
            InterpretResult::log_only()
        } else if let Some((attr, value)) = registry::match_prefix(message) {
            self.apply_attribute(attr.key, value)
        } else {
            InterpretResult::unrecognized()
        };

        if result.changed {
            self.actions.push(Action::Notify(message.to_string()));
        } else {
            debug!("no new data encountered");
        }

        if !result.recognized {
            warn!("Unrecognized response: {}", message);
        }

        result
    }

    fn apply_attribute(&mut self, key: &'static str, value: &str) -> InterpretResult {
        let old = self.state.set(key, value).unwrap_or_default();
        let changed = old != value;

        let indicator = if changed { "New Value" } else { "Unchanged" };
        info!("{}: {}", indicator, registry::describe(key, value));

        if key == registry::POWER {
            match (old.as_str(), value) {
                ("0", "1") => {
                    info!("Power on detected, refreshing all attributes");
                    self.state.set_reconciled(false);
                    self.start_reconcile();
                }
                ("1", "0") => {
                    self.state.set_reconciled(false);
                }
                _ => {}
            }
        } else if !registry::is_core(key)
            && self.reconciler.awaiting_reply()
            && !self.state.is_reconciled()
        {
            debug!(key, "Zone attribute answered, power-on refresh confirmed");
            self.state.set_reconciled(true);
        }

        InterpretResult {
            recognized: true,
            changed,
            key: Some(key),
        }
    }
}
