//! Unified error types for the alerting core.
//!
//! [`Error`] covers setup: loading configuration and captures and starting
//! the runtime.  The per-message and per-command errors below are never
//! fatal to a running session; the service turns each of them into an
//! explicit result or event.

use core::fmt;

use crate::config::ConfigError;
use crate::session::SessionState;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Failures of the setup path: configuration, capture files and
/// starting the session threads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Configuration is invalid or could not be loaded.
    Config(ConfigError),
    /// A capture line is not a valid replay record.  Lines count from 1.
    Capture { line: usize, reason: String },
    /// A file or thread could not be opened or started.
    Io(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Capture { line, reason } => write!(f, "capture line {line}: {reason}"),
            Self::Io(reason) => write!(f, "I/O: {reason}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// Decode errors
// ---------------------------------------------------------------------------

/// Payload was not a base-10 integer after trimming.  Carries the original
/// text so it can be shown back to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeError {
    pub raw: String,
}

impl DecodeError {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "not an integer reading: {:?}", self.raw)
    }
}

impl std::error::Error for DecodeError {}

// ---------------------------------------------------------------------------
// Session errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// `connect()` while a handshake is in flight or the link is up.
    AlreadyActive(SessionState),
    /// `subscribe()` outside of `Connected`.
    NotConnected(SessionState),
    /// A reconnect was requested before any endpoint was ever given.
    NoEndpoint,
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyActive(state) => write!(f, "session already active ({state})"),
            Self::NotConnected(state) => write!(f, "session not connected ({state})"),
            Self::NoEndpoint => write!(f, "no broker endpoint configured"),
        }
    }
}

impl std::error::Error for SessionError {}

// ---------------------------------------------------------------------------
// Transport errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Broker refused the handshake or subscription.
    Refused(String),
    /// Handshake or subscribe did not complete in time.
    Timeout,
    /// The link dropped underneath an established session.
    ConnectionLost(String),
    /// Any other I/O failure reported by the adapter.
    Io(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Refused(reason) => write!(f, "refused: {reason}"),
            Self::Timeout => write!(f, "timed out"),
            Self::ConnectionLost(reason) => write!(f, "connection lost: {reason}"),
            Self::Io(reason) => write!(f, "I/O error: {reason}"),
        }
    }
}

impl std::error::Error for TransportError {}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
