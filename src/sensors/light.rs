//! Light relay state: `0` = on, `1` = off, anything else is unknown.

use super::LightLevel;

pub fn classify(raw: i32) -> LightLevel {
    match raw {
        0 => LightLevel::On,
        1 => LightLevel::Off,
        _ => LightLevel::Unknown,
    }
}

pub fn label(level: LightLevel, raw: i32) -> String {
    match level {
        LightLevel::On => "On".to_owned(),
        LightLevel::Off => "Off".to_owned(),
        LightLevel::Unknown => format!("Unknown: {raw}"),
    }
}
