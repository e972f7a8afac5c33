//! MQ-series combustible gas sensor.
//!
//! Output rises with gas concentration; high readings are dangerous.

use super::HazardLevel;

/// Readings at or below this are normal.
pub const NORMAL_UP_TO: i32 = 150;
/// Readings above this indicate a leak.
pub const CRITICAL_ABOVE: i32 = 500;

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
        HazardLevel::Warning => "Minor Leak",
        HazardLevel::Critical => "GAS LEAK!",
    }
}
