//! Sensor kinds and the reading classifier.
//!
//! Each hazard sensor has its own file holding its zone thresholds and
//! display labels.  This module ties them together behind
//! [`classify`], a pure function from `(kind, payload)` to a severity zone
//! and the text shown for it.
//!
//! ```text
//!  payload ──▶ decode (trim, base-10 i32) ──▶ classify_value(kind) ──▶ Severity
//!                     │                                                 │
//!                     └──▶ DecodeError("Error: <raw>")                  └──▶ label
//! ```

pub mod flame;
pub mod gas;
pub mod light;
pub mod water;

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DecodeError;

// ---------------------------------------------------------------------------
// Sensor identity
// ---------------------------------------------------------------------------

/// The closed set of sensors on the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorKind {
    Flame,
    Gas,
    Water,
    Light,
}

impl SensorKind {
    pub const ALL: [SensorKind; 4] = [Self::Flame, Self::Gas, Self::Water, Self::Light];

    /// Canonical topic suffix for this sensor.
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Flame => "flame",
            Self::Gas => "gas",
            Self::Water => "water",
            Self::Light => "light",
        }
    }

    /// Whether this sensor has a `Critical` zone (and therefore a latch).
    pub const fn is_hazard(self) -> bool {
        !matches!(self, Self::Light)
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

// ---------------------------------------------------------------------------
// Severity zones
// ---------------------------------------------------------------------------

/// Zone of a flame, gas or water reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HazardLevel {
    Normal,
    Warning,
    Critical,
}

/// Zone of a light reading.  Light has no danger polarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LightLevel {
    On,
    Off,
    Unknown,
}

/// Classification result; which variant applies depends on the sensor kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    Hazard(HazardLevel),
    Light(LightLevel),
}

impl Severity {
    pub const fn is_critical(self) -> bool {
        matches!(self, Self::Hazard(HazardLevel::Critical))
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hazard(level) => write!(f, "{level:?}"),
            Self::Light(level) => write!(f, "{level:?}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Readings
// ---------------------------------------------------------------------------

/// One decoded message.  Consumed once by the classifier, never retained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reading {
    pub kind: SensorKind,
    pub value: Result<i32, DecodeError>,
}

impl Reading {
    pub fn decode(kind: SensorKind, payload: &str) -> Self {
        Self {
            kind,
            value: decode(payload),
        }
    }

    /// Zone and display text, or the decode error carried over.
    pub fn classify(self) -> Result<Classified, DecodeError> {
        let raw = self.value?;
        let severity = classify_value(self.kind, raw);
        Ok(Classified {
            kind: self.kind,
            raw,
            severity,
            text: label(self.kind, severity, raw),
        })
    }
}

/// A successfully classified reading together with its display text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classified {
    pub kind: SensorKind,
    pub raw: i32,
    pub severity: Severity,
    pub text: String,
}

// ---------------------------------------------------------------------------
// Classifier
// ---------------------------------------------------------------------------

/// Decode a payload as a base-10 `i32` after trimming surrounding
/// whitespace.  Anything else, including overflow, is a [`DecodeError`].
pub fn decode(payload: &str) -> Result<i32, DecodeError> {
    payload
        .trim()
        .parse::<i32>()
        .map_err(|_| DecodeError::new(payload))
}

/// Map a raw reading to its zone.  Total over `i32` for every kind.
pub fn classify_value(kind: SensorKind, raw: i32) -> Severity {
    match kind {
        SensorKind::Flame => Severity::Hazard(flame::classify(raw)),
        SensorKind::Gas => Severity::Hazard(gas::classify(raw)),
        SensorKind::Water => Severity::Hazard(water::classify(raw)),
        SensorKind::Light => Severity::Light(light::classify(raw)),
    }
}

/// Display text for a classified reading.
pub fn label(kind: SensorKind, severity: Severity, raw: i32) -> String {
    match (kind, severity) {
        (SensorKind::Flame, Severity::Hazard(level)) => flame::label(level).to_owned(),
        (SensorKind::Gas, Severity::Hazard(level)) => gas::label(level).to_owned(),
        (SensorKind::Water, Severity::Hazard(level)) => water::label(level).to_owned(),
        (SensorKind::Light, Severity::Light(level)) => light::label(level, raw),
        // A hazard kind never yields a light zone and vice versa.
        (_, severity) => severity.to_string(),
    }
}

/// Text shown for a payload that could not be decoded.
pub fn error_label(err: &DecodeError) -> String {
    format!("Error: {}", err.raw)
}

/// Decode and classify one payload.
pub fn classify(kind: SensorKind, payload: &str) -> Result<Classified, DecodeError> {
    Reading::decode(kind, payload).classify()
}
