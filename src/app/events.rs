//! Outbound session events.
//!
//! The [`SessionService`](super::service::SessionService) emits these
//! through the [`EventSink`](super::ports::EventSink) port.  Adapters on
//! the other side decide where each one ends up.

use crate::error::SessionError;
use crate::latch::AlertEvent;
use crate::sensors::{SensorKind, Severity};
use crate::session::SessionState;

/// Structured events emitted by the session core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The session moved between states.
    StateChanged { from: SessionState, to: SessionState },

    /// A hazard alert edge for the notifier.
    Alert(AlertEvent),

    /// New status text for one sensor.
    Display(DisplayUpdate),

    /// A message arrived on a topic matching no sensor.
    Unrouted { topic: String },

    /// The broker acknowledged the subscription.
    Subscribed { filter: String },

    /// The broker rejected the subscription; the session stays connected.
    SubscribeFailed { filter: String, reason: String },

    /// The link is down and no reconnect will be attempted.
    RecoveryStopped { reason: String },

    /// A command was not valid in the current state.
    CommandRejected {
        command: &'static str,
        reason: SessionError,
    },
}

/// Projection of one processed message for the display collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayUpdate {
    pub kind: SensorKind,
    pub text: String,
    pub status: DisplayStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayStatus {
    /// Successfully classified reading.
    Reading(Severity),
    /// Payload was not an integer.
    DecodeError,
    /// No reading since the session (re)started.
    Waiting,
}

impl DisplayUpdate {
    /// Placeholder shown after a disconnect.
    pub fn waiting(kind: SensorKind) -> Self {
        Self {
            kind,
            text: "Waiting...".to_owned(),
            status: DisplayStatus::Waiting,
        }
    }
}
