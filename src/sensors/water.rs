//! Resistive water-leak sensor.

use super::HazardLevel;

pub const NORMAL_UP_TO: i32 = 100;
pub const CRITICAL_ABOVE: i32 = 400;

pub fn classify(raw: i32) -> HazardLevel {
    if raw <= NORMAL_UP_TO {
        HazardLevel::Normal
    } else if raw <= CRITICAL_ABOVE {
        HazardLevel::Warning
    } else {
        HazardLevel::Critical
    }
}

pub fn label(level: HazardLevel) -> &'static str {
    match level {
        HazardLevel::Normal => "Good",
        HazardLevel::Warning => "Minor Leakage",
        HazardLevel::Critical => "WATER LEAK!",
    }
}
