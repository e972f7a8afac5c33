//! Session state for the pub/sub link.
//!
//! ```text
//!  IDLE ──connect()──▶ CONNECTING ──ack ok──▶ CONNECTED ──sub ok──▶ CONNECTED(subscribed)
//!                          │                      │
//!                       ack fail        disconnect() / link lost
//!                          ▼                      ▼
//!                       FAILED ──connect()──▶  DISCONNECTED ──connect()──▶ CONNECTING
//! ```
//!
//! `Failed` stays put until a fresh `connect()`.  Every handshake is tagged
//! with an [`AttemptId`] so results that arrive after the session has moved
//! on can be recognised and discarded.

use core::fmt;

/// Lifecycle of one session against the broker.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Connecting,
    Connected {
        subscribed: bool,
    },
    Disconnected(DisconnectCause),
    Failed(String),
}

/// Why the session left `Connected`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectCause {
    /// The caller asked for it.
    Requested,
    /// The transport dropped the link.
    Lost(String),
}

impl SessionState {
    /// States from which a new handshake may start.
    pub fn accepts_connect(&self) -> bool {
        matches!(self, Self::Idle | Self::Disconnected(_) | Self::Failed(_))
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected { .. })
    }

    pub fn is_subscribed(&self) -> bool {
        matches!(self, Self::Connected { subscribed: true })
    }

    /// True after an unexpected loss; the caller may choose to reconnect.
    pub fn is_unexpected_loss(&self) -> bool {
        matches!(self, Self::Disconnected(DisconnectCause::Lost(_)))
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected { subscribed: false } => write!(f, "Connected"),
            Self::Connected { subscribed: true } => write!(f, "Connected(subscribed)"),
            Self::Disconnected(DisconnectCause::Requested) => write!(f, "Disconnected"),
            Self::Disconnected(DisconnectCause::Lost(reason)) => {
                write!(f, "Disconnected(lost: {reason})")
            }
            Self::Failed(reason) => write!(f, "Failed({reason})"),
        }
    }
}

/// Monotonically increasing handshake identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct AttemptId(pub u32);

impl AttemptId {
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for AttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Broker address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}
