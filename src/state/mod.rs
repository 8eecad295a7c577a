//! Device state module - in-memory mirror of the receiver
//!
//! Holds the last raw value reported for every registry attribute, the
//! power-on reconciliation flag and the (discovery-fed) input name maps.
//! State lives for one connection-scoped handler and is never persisted.

mod store;

pub use store::{DeviceState, StateSnapshot};
