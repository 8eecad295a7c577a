//! Typed property accessors
//!
//! Getters read the last raw value in the state mirror and fall back to a
//! safe default when it is missing or does not parse. Setters only send a
//! command; the mirror is updated when the receiver reports the new value.

use tracing::{debug, info};

use super::commands::{AvrStatus, SetRequest};
use super::volume;
use super::Avr;
use crate::error::{AvrError, Result};
use crate::protocol::registry;

/// Lowest selectable input number
pub const MIN_INPUT: i32 = 1;
/// Highest selectable input number
pub const MAX_INPUT: i32 = 99;

/// Name reported for inputs that discovery has not named
pub const UNKNOWN_INPUT: &str = "Unknown";

impl Avr {
    fn get_boolean(&self, key: &str) -> bool {
        self.state
            .raw(key)
            .trim()
            .parse::<i64>()
            .map(|value| value != 0)
            .unwrap_or(false)
    }

    fn set_boolean(&mut self, key: &str, value: bool) {
        let raw = format!("{}{}", key, if value { "1" } else { "0" });
        self.command(&raw);
    }

    /// Whether zone 1 is powered on
    pub fn power(&self) -> bool {
        self.get_boolean(registry::POWER)
    }

    pub fn set_power(&mut self, on: bool) {
        self.set_boolean(registry::POWER, on);
    }

    /// Whether zone 1 is muted
    pub fn mute(&self) -> bool {
        self.get_boolean(registry::MUTE)
    }

    pub fn set_mute(&mut self, muted: bool) {
        self.set_boolean(registry::MUTE, muted);
    }

    /// Current attenuation in dB (-90..=0), -90 when unknown
    pub fn attenuation(&self) -> i32 {
        volume::parse_attenuation(self.state.raw(registry::VOLUME))
    }

    pub fn set_attenuation(&mut self, attenuation: i32) -> Result<()> {
        if !(volume::MIN_ATTENUATION..=volume::MAX_ATTENUATION).contains(&attenuation) {
            return Err(AvrError::OutOfRange {
                what: "attenuation",
                value: attenuation.into(),
                min: volume::MIN_ATTENUATION.into(),
                max: volume::MAX_ATTENUATION.into(),
            });
        }
        debug!("Setting attenuation to {}", attenuation);
        self.command(&format!("P1V{}", attenuation));
        Ok(())
    }

    /// Current volume level (0..=100)
    pub fn volume(&self) -> i32 {
        volume::attenuation_to_volume(self.attenuation())
    }

    pub fn set_volume(&mut self, level: i32) -> Result<()> {
        if !(volume::MIN_VOLUME..=volume::MAX_VOLUME).contains(&level) {
            return Err(AvrError::OutOfRange {
                what: "volume",
                value: level.into(),
                min: volume::MIN_VOLUME.into(),
                max: volume::MAX_VOLUME.into(),
            });
        }
        self.set_attenuation(volume::volume_to_attenuation(level))
    }

    /// Current volume as a fraction (0.0..=1.0)
    pub fn volume_as_percentage(&self) -> f64 {
        volume::volume_to_percentage(self.volume())
    }

    pub fn set_volume_as_percentage(&mut self, percentage: f64) -> Result<()> {
        if !(0.0..=1.0).contains(&percentage) {
            return Err(AvrError::OutOfRange {
                what: "volume percentage",
                value: (percentage * 100.0).round() as i64,
                min: 0,
                max: 100,
            });
        }
        self.set_volume(volume::percentage_to_volume(percentage))
    }

    /// Number of the active input, `None` when unknown or not numeric
    ///
    /// Reported as sent, even outside the selectable range.
    pub fn input_number(&self) -> Option<i32> {
        self.state.raw(registry::INPUT).trim().parse().ok()
    }

    pub fn set_input_number(&mut self, number: i32) -> Result<()> {
        if !(MIN_INPUT..=MAX_INPUT).contains(&number) {
            return Err(AvrError::OutOfRange {
                what: "input",
                value: number.into(),
                min: MIN_INPUT.into(),
                max: MAX_INPUT.into(),
            });
        }
        info!("Switching input to {}", number);
        self.command(&format!("P1S{}", number));
        Ok(())
    }

    /// Discovered name of the active input
    pub fn input_name(&self) -> String {
        self.input_number()
            .and_then(|number| u8::try_from(number).ok())
            .and_then(|number| self.state.input_name(number))
            .unwrap_or(UNKNOWN_INPUT)
            .to_string()
    }

    /// Switch to a discovered input by name
    pub fn set_input_name(&mut self, name: &str) -> Result<()> {
        match self.state.input_number(name) {
            Some(number) if number > 0 => self.set_input_number(number.into()),
            _ => Err(AvrError::UnknownInput(name.to_string())),
        }
    }

    /// Names of all discovered inputs
    pub fn input_list(&self) -> Vec<String> {
        self.state.input_list()
    }

    /// Registry label for the current value of `key` (e.g. "TV" for `P1S3`)
    pub fn label(&self, key: &str) -> Option<&'static str> {
        registry::label(key, self.state.raw(key))
    }

    /// All typed properties at once
    pub fn status(&self) -> AvrStatus {
        AvrStatus {
            connected: self.is_connected(),
            power: self.power(),
            mute: self.mute(),
            attenuation: self.attenuation(),
            volume: self.volume(),
            volume_as_percentage: self.volume_as_percentage(),
            input_number: self.input_number(),
            input_name: self.input_name(),
            source: self.label(registry::INPUT),
            reconcile_phase: self.reconcile_phase(),
            reconciled: self.state.is_reconciled(),
        }
    }

    /// Apply a property write
    pub fn apply(&mut self, request: SetRequest) -> Result<()> {
        match request {
            SetRequest::Power(on) => {
                self.set_power(on);
                Ok(())
            }
            SetRequest::Mute(muted) => {
                self.set_mute(muted);
                Ok(())
            }
            SetRequest::Attenuation(value) => self.set_attenuation(value),
            SetRequest::Volume(level) => self.set_volume(level),
            SetRequest::VolumePercentage(percentage) => self.set_volume_as_percentage(percentage),
            SetRequest::InputNumber(number) => self.set_input_number(number),
            SetRequest::InputName(name) => self.set_input_name(&name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::connected;
    use super::*;

    #[test]
    fn test_defaults_before_any_response() {
        let avr = Avr::default();
        assert!(!avr.power());
        assert!(!avr.mute());
        assert_eq!(avr.attenuation(), -90);
        assert_eq!(avr.volume(), 0);
        assert_eq!(avr.volume_as_percentage(), 0.0);
        assert_eq!(avr.input_number(), None);
        assert_eq!(avr.input_name(), "Unknown");
        assert!(avr.input_list().is_empty());
    }

    #[test]
    fn test_getters_read_state() {
        let mut avr = Avr::default();
        avr.interpret("P1P1");
        avr.interpret("P1M1");
        avr.interpret("P1VM-45");
        avr.interpret("P1S3");

        assert!(avr.power());
        assert!(avr.mute());
        assert_eq!(avr.attenuation(), -45);
        assert_eq!(avr.volume(), 50);
        assert_eq!(avr.volume_as_percentage(), 0.5);
        assert_eq!(avr.input_number(), Some(3));
        assert_eq!(avr.label(registry::INPUT), Some("TV"));
    }

    #[test]
    fn test_garbled_values_fall_back() {
        let mut avr = Avr::default();
        avr.interpret("P1Mx");
        avr.interpret("P1VMloud");
        avr.interpret("P1Sd");

        assert!(!avr.mute());
        assert_eq!(avr.attenuation(), -90);
        assert_eq!(avr.input_number(), None);
        assert_eq!(avr.label(registry::INPUT), Some("USB"));
    }

    #[test]
    fn test_input_number_outside_selectable_range() {
        let mut avr = Avr::default();
        avr.interpret("P1S300");
        assert_eq!(avr.input_number(), Some(300));
        assert_eq!(avr.input_name(), UNKNOWN_INPUT);

        avr.interpret("P1S-1");
        assert_eq!(avr.input_number(), Some(-1));
        assert_eq!(avr.input_name(), UNKNOWN_INPUT);
    }

    #[test]
    fn test_boolean_setters() {
        let (mut avr, sink) = connected();
        avr.set_power(true);
        avr.set_mute(false);
        assert_eq!(sink.take(), vec!["P1P1;", "P1M0;"]);
    }

    #[test]
    fn test_volume_setters() {
        let (mut avr, sink) = connected();
        avr.set_attenuation(-50).unwrap();
        avr.set_volume(50).unwrap();
        avr.set_volume_as_percentage(1.0).unwrap();
        assert_eq!(sink.take(), vec!["P1V-50;", "P1V-45;", "P1V0;"]);
    }

    #[test]
    fn test_setters_reject_out_of_range() {
        let (mut avr, sink) = connected();
        assert!(matches!(
            avr.set_attenuation(3),
            Err(AvrError::OutOfRange { what: "attenuation", .. })
        ));
        assert!(avr.set_volume(101).is_err());
        assert!(avr.set_volume_as_percentage(1.5).is_err());
        assert!(avr.set_input_number(0).is_err());
        assert!(avr.set_input_number(100).is_err());
        assert!(sink.take().is_empty());
    }

    #[test]
    fn test_input_selection() {
        let (mut avr, sink) = connected();
        avr.set_input_number(7).unwrap();
        assert_eq!(sink.take(), vec!["P1S7;"]);

        assert_eq!(
            avr.set_input_name("Kaleidescape"),
            Err(AvrError::UnknownInput("Kaleidescape".to_string()))
        );

        avr.set_input_label(4, "Kaleidescape");
        avr.set_input_name("Kaleidescape").unwrap();
        assert_eq!(sink.take(), vec!["P1S4;"]);

        avr.interpret("P1S4");
        assert_eq!(avr.input_name(), "Kaleidescape");
        assert_eq!(avr.input_list(), vec!["Kaleidescape".to_string()]);
    }

    #[test]
    fn test_status_and_apply() {
        let (mut avr, sink) = connected();
        avr.interpret("P1P1");
        avr.interpret("P1VM-18");
        avr.interpret("P1S9");

        let status = avr.status();
        assert!(status.connected);
        assert!(status.power);
        assert_eq!(status.volume, 80);
        assert_eq!(status.source, Some("SAT"));
        assert_eq!(status.input_name, UNKNOWN_INPUT);

        avr.apply(SetRequest::Mute(true)).unwrap();
        avr.apply(SetRequest::Volume(20)).unwrap();
        assert!(avr.apply(SetRequest::InputNumber(120)).is_err());
        assert_eq!(sink.take(), vec!["P1M1;", "P1V-72;"]);
    }
}
