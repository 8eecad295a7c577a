//! Attribute registry for the Anthem x00 IP control protocol
//!
//! A static, ordered table of every attribute the handler understands. The
//! order matters: the message interpreter matches responses against keys by
//! prefix in table order and stops at the first hit.

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Power attribute for zone 1
pub const POWER: &str = "P1P";
/// Volume attribute for zone 1, reported as attenuation in dB
pub const VOLUME: &str = "P1VM";
/// Active input (source) for zone 1
pub const INPUT: &str = "P1S";
/// Mute attribute for zone 1
pub const MUTE: &str = "P1M";

/// Static description of a single protocol attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeDescriptor {
    /// Protocol key (e.g. "P1P")
    pub key: &'static str,
    /// Human readable description
    pub description: &'static str,
    /// Raw value to label pairs; empty for free-form values
    pub labels: &'static [(&'static str, &'static str)],
}

impl AttributeDescriptor {
    /// Label for a raw value, if the attribute is enumerated and knows it
    pub fn label(&self, raw: &str) -> Option<&'static str> {
        self.labels
            .iter()
            .find(|(value, _)| *value == raw)
            .map(|(_, label)| *label)
    }
}

static ATTRIBUTES: &[AttributeDescriptor] = &[
    AttributeDescriptor {
        key: POWER,
        description: "Zone 1 Power",
        labels: &[("0", "Off"), ("1", "On")],
    },
    AttributeDescriptor {
        key: VOLUME,
        description: "Zone 1 Volume",
        labels: &[],
    },
    AttributeDescriptor {
        key: INPUT,
        description: "Zone 1 current input",
        labels: &[
            ("1", "BDP"),
            ("2", "CD"),
            ("3", "TV"),
            ("4", "SAT"),
            ("5", "GAME"),
            ("6", "AUX"),
            ("7", "MEDIA"),
            ("8", "TV"),
            ("9", "SAT"),
            ("d", "USB"),
            ("e", "Internet Radio"),
        ],
    },
    AttributeDescriptor {
        key: MUTE,
        description: "Zone 1 mute",
        labels: &[("0", "Unmuted"), ("1", "Muted")],
    },
];

/// Attributes that can be queried regardless of power state
static CORE_ATTRIBUTES: &[&str] = &[POWER];

static INDEX: Lazy<HashMap<&'static str, &'static AttributeDescriptor>> =
    Lazy::new(|| ATTRIBUTES.iter().map(|attr| (attr.key, attr)).collect());

/// All known attributes in prefix-match order
pub fn attributes() -> &'static [AttributeDescriptor] {
    ATTRIBUTES
}

/// Keys of all known attributes in prefix-match order
pub fn keys() -> impl Iterator<Item = &'static str> {
    ATTRIBUTES.iter().map(|attr| attr.key)
}

/// Keys that stay queryable while the receiver is in standby
pub fn core_keys() -> &'static [&'static str] {
    CORE_ATTRIBUTES
}

/// Whether a key belongs to the always-queryable subset
pub fn is_core(key: &str) -> bool {
    CORE_ATTRIBUTES.contains(&key)
}

/// Look up an attribute by exact key
pub fn get(key: &str) -> Option<&'static AttributeDescriptor> {
    INDEX.get(key).copied()
}

/// First attribute whose key prefixes `message`, with the remainder as raw value
pub fn match_prefix(message: &str) -> Option<(&'static AttributeDescriptor, &str)> {
    ATTRIBUTES
        .iter()
        .find_map(|attr| message.strip_prefix(attr.key).map(|rest| (attr, rest)))
}

/// Label for a raw value of `key`, if enumerated
pub fn label(key: &str, raw: &str) -> Option<&'static str> {
    get(key).and_then(|attr| attr.label(raw))
}

/// Render an attribute value for log output
///
/// Enumerated values are shown with their label, e.g.
/// `Zone 1 Power (P1P) -> On (1)`; free-form values as
/// `Zone 1 Volume (P1VM) -> -45`. Unknown keys fall back to `KEY -> raw`.
pub fn describe(key: &str, raw: &str) -> String {
    match get(key) {
        Some(attr) => match attr.label(raw) {
            Some(label) => format!("{} ({}) -> {} ({})", attr.description, key, label, raw),
            None => format!("{} ({}) -> {}", attr.description, key, raw),
        },
        None => format!("{} -> {}", key, raw),
    }
}
