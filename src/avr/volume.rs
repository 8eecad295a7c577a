//! Volume representations
//!
//! The receiver tracks volume as attenuation in dB, from -90 (silent) to
//! 0 (full). Applications usually want a 0-100 level or a 0.0-1.0 fraction,
//! so the handler exposes all three and converts linearly between them.
//! Rounding is half-to-even.

/// Quietest attenuation the receiver accepts
pub const MIN_ATTENUATION: i32 = -90;
/// Loudest attenuation the receiver accepts
pub const MAX_ATTENUATION: i32 = 0;
/// Attenuation reported when the receiver has not told us anything usable
pub const DEFAULT_ATTENUATION: i32 = MIN_ATTENUATION;

pub const MIN_VOLUME: i32 = 0;
pub const MAX_VOLUME: i32 = 100;

const RANGE_DB: f64 = (MAX_ATTENUATION - MIN_ATTENUATION) as f64;

/// Parse a raw volume value, defaulting to -90 dB when absent or garbled
pub fn parse_attenuation(raw: &str) -> i32 {
    raw.trim().parse().unwrap_or(DEFAULT_ATTENUATION)
}

/// Attenuation in dB (-90..=0) to a volume level (0..=100)
pub fn attenuation_to_volume(attenuation: i32) -> i32 {
    let volume = (f64::from(attenuation) - f64::from(MIN_ATTENUATION)) / RANGE_DB * 100.0;
    (volume.round_ties_even() as i32).clamp(MIN_VOLUME, MAX_VOLUME)
}

/// Volume level (0..=100) to attenuation in dB (-90..=0)
pub fn volume_to_attenuation(volume: i32) -> i32 {
    let attenuation = (f64::from(volume) / 100.0 * RANGE_DB).round_ties_even() as i32;
    (attenuation + MIN_ATTENUATION).clamp(MIN_ATTENUATION, MAX_ATTENUATION)
}

/// Volume level to a fraction in 0.0..=1.0
pub fn volume_to_percentage(volume: i32) -> f64 {
    f64::from(volume) / 100.0
}

/// Fraction in 0.0..=1.0 to a volume level
pub fn percentage_to_volume(percentage: f64) -> i32 {
    (percentage * 100.0).round_ties_even() as i32
}
