//! Inbound commands to the session service.
//!
//! These represent actions requested by the outside world (UI thread,
//! binary, reconnect timer) that the
//! [`SessionService`](super::service::SessionService) interprets and acts
//! upon.

use crate::session::{AttemptId, Endpoint};

/// Commands that callers can send into the session core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    /// Start a handshake with the broker.
    Connect(Endpoint),

    /// Register the message callback for a topic filter.
    Subscribe(String),

    /// Tear the session down and reset every latch.
    Disconnect,

    /// Automatic reconnect scheduled after attempt `after` was lost.
    /// Ignored if anything else happened to the session since.
    Reconnect { after: AttemptId },
}

impl SessionCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Connect(_) => "connect",
            Self::Subscribe(_) => "subscribe",
            Self::Disconnect => "disconnect",
            Self::Reconnect { .. } => "reconnect",
        }
    }
}
