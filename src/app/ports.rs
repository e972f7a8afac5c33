//! Port traits: the hexagonal boundary between session logic and the outside world.
//!
//! ```text
//!   Transport adapter ──▶ TransportEvent ──▶ SessionService ──▶ EventSink
//!                      ◀── TransportPort ◀──                    ├─▶ Notifier
//!                                                               └─▶ DisplayPort
//! ```
//!
//! Driven adapters (pub/sub client, notification delivery, status display)
//! implement these traits.  The [`SessionService`](super::service::SessionService)
//! consumes them via generics, so the core never touches a socket directly.
//!
//! ## Asynchronous results
//!
//! Every [`TransportPort`] call only *starts* an operation.  The adapter
//! reports the outcome later as a [`TransportEvent`] tagged with the same
//! [`AttemptId`], which the runtime feeds back into the session's single
//! processing sequence.

use std::borrow::Cow;

use crate::error::TransportError;
use crate::latch::AlertEvent;
use crate::session::{AttemptId, Endpoint};

use super::events::{DisplayUpdate, SessionEvent};

// ───────────────────────────────────────────────────────────────
// Transport port (driving side: domain → broker)
// ───────────────────────────────────────────────────────────────

/// Pub/sub client operations.  All are fire-and-forget; results arrive as
/// [`TransportEvent`]s.  Timeouts are the adapter's responsibility and are
/// reported as [`TransportError::Timeout`].
pub trait TransportPort {
    /// Open a connection.  Answer with [`TransportEvent::ConnAck`].
    fn connect(&mut self, attempt: AttemptId, endpoint: &Endpoint);

    /// Subscribe to `filter`.  Answer with [`TransportEvent::SubAck`], then
    /// deliver every matching publish as [`TransportEvent::Message`].
    fn subscribe(&mut self, attempt: AttemptId, filter: &str);

    /// Close the connection and stop delivering messages.  No answer.
    fn disconnect(&mut self, attempt: AttemptId);
}

/// Asynchronous results and deliveries from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Handshake finished.
    ConnAck {
        attempt: AttemptId,
        result: Result<(), TransportError>,
    },
    /// Subscription finished.
    SubAck {
        attempt: AttemptId,
        result: Result<(), TransportError>,
    },
    /// A publish matching the active filter.
    Message {
        attempt: AttemptId,
        message: InboundMessage,
    },
    /// The established link dropped.
    ConnectionLost {
        attempt: AttemptId,
        error: TransportError,
    },
}

impl TransportEvent {
    pub fn attempt(&self) -> AttemptId {
        match self {
            Self::ConnAck { attempt, .. }
            | Self::SubAck { attempt, .. }
            | Self::Message { attempt, .. }
            | Self::ConnectionLost { attempt, .. } => *attempt,
        }
    }
}

/// One publish as received.  Topic and payload are kept whole; sizing
/// is the broker's concern, not the core's.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    topic: String,
    payload: Vec<u8>,
}

impl InboundMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Payload as UTF-8 text; invalid sequences become U+FFFD.
    pub fn payload_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → observers)
// ───────────────────────────────────────────────────────────────

/// The core emits structured [`SessionEvent`]s through this port.
/// Adapters decide where they go (log, notifier, display, test recorder).
pub trait EventSink {
    fn emit(&mut self, event: &SessionEvent);
}

// ───────────────────────────────────────────────────────────────
// Collaborator ports (driven adapters: domain → user)
// ───────────────────────────────────────────────────────────────

/// User-visible alert delivery (push notification, siren, log).
///
/// `alert.alert_id` is stable per sensor kind so implementations can
/// replace an earlier alert of the same kind instead of stacking them.
pub trait Notifier {
    fn notify(&mut self, alert: &AlertEvent);
}

/// Status rendering.  A pure projection; nothing flows back.
pub trait DisplayPort {
    fn render(&mut self, update: &DisplayUpdate);
}
