//! IR flame sensor.
//!
//! Inverted polarity: the analog output sits near 1000 in darkness and
//! falls as infrared from an open flame reaches the photodiode.  Low
//! readings are the dangerous ones.

use super::HazardLevel;

/// Readings at or above this are normal.
pub const NORMAL_FROM: i32 = 800;
/// Readings below this indicate fire.
pub const CRITICAL_BELOW: i32 = 400;

pub fn classify(raw: i32) -> HazardLevel {
    if raw >= NORMAL_FROM {
        HazardLevel::Normal
    } else if raw >= CRITICAL_BELOW {
        HazardLevel::Warning
    } else {
        HazardLevel::Critical
    }
}

pub fn label(level: HazardLevel) -> &'static str {
    match level {
        HazardLevel::Normal => "Good",
        HazardLevel::Warning => "Heat Detected",
        HazardLevel::Critical => "FIRE DETECTED!",
    }
}
