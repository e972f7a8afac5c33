//! Topic router.
//!
//! Maps an inbound topic to the sensor whose canonical suffix it ends
//! with.  A topic matching no suffix, or more than one, is not routed and
//! the message is dropped by the caller.

use crate::sensors::SensorKind;

/// Route `topic` to a sensor kind.  Pure; no side effects.
pub fn route(topic: &str) -> Option<SensorKind> {
    let mut matches = SensorKind::ALL
        .into_iter()
        .filter(|kind| topic.ends_with(kind.suffix()));

    match (matches.next(), matches.next()) {
        (Some(kind), None) => Some(kind),
        _ => None,
    }
}
