//! Session inbox channel.
//!
//! Uses an `embassy-sync` bounded MPSC-style channel to bridge every
//! producer (caller threads, transport I/O threads, reconnect timers) with
//! the single session worker.  Whatever the producer, inputs are consumed
//! in arrival order by one task, so latch reads and writes are strictly
//! ordered.
//!
//! ```text
//! ┌──────────────┐ Command   ┌─────────┐
//! │ SessionHandle│──────────▶│         │     ┌────────────────┐
//! └──────────────┘           │  Inbox  │────▶│ Session worker │
//! ┌──────────────┐ Transport │ (bounded)│     └────────────────┘
//! │ TransportLink│──────────▶│         │
//! └──────────────┘           └─────────┘
//! ```

use std::sync::Arc;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::warn;

use crate::app::commands::SessionCommand;
use crate::app::ports::{InboundMessage, TransportEvent};
use crate::error::TransportError;
use crate::session::AttemptId;

/// Inbox depth.  Producers wait while it is full.
pub const INBOX_DEPTH: usize = 32;

/// Everything the session worker consumes.
#[derive(Debug)]
pub enum SessionInput {
    Command(SessionCommand),
    Transport(TransportEvent),
    /// Disconnect and stop the worker.
    Shutdown,
}

pub(crate) type Inbox = Channel<CriticalSectionRawMutex, SessionInput, INBOX_DEPTH>;

/// Cloneable producer side of the inbox.
#[derive(Clone)]
pub struct InboxSender {
    inbox: Arc<Inbox>,
}

impl InboxSender {
    pub(crate) fn new(inbox: Arc<Inbox>) -> Self {
        Self { inbox }
    }

    /// Post an input, waiting while the inbox is full.
    ///
    /// Must not be called from the session worker itself.
    pub fn post(&self, input: SessionInput) {
        futures_lite::future::block_on(self.inbox.send(input));
    }

    /// Post an input without waiting.  Returns `false` if it was dropped.
    pub fn try_post(&self, input: SessionInput) -> bool {
        if self.inbox.try_send(input).is_err() {
            warn!("Session inbox full, dropping input");
            return false;
        }
        true
    }
}

/// Handle given to transport adapters for reporting results.
///
/// Call these from the adapter's own I/O thread, never from inside a
/// [`TransportPort`](crate::app::ports::TransportPort) method: those run on
/// the session worker, which is the only consumer of the inbox.
#[derive(Clone)]
pub struct TransportLink {
    sender: InboxSender,
}

impl TransportLink {
    pub(crate) fn new(sender: InboxSender) -> Self {
        Self { sender }
    }

    pub fn connack(&self, attempt: AttemptId, result: Result<(), TransportError>) {
        self.post(TransportEvent::ConnAck { attempt, result });
    }

    pub fn suback(&self, attempt: AttemptId, result: Result<(), TransportError>) {
        self.post(TransportEvent::SubAck { attempt, result });
    }

    /// Deliver one publish.
    pub fn deliver(&self, attempt: AttemptId, topic: &str, payload: &[u8]) {
        let message = InboundMessage::new(topic, payload);
        self.post(TransportEvent::Message { attempt, message });
    }

    pub fn connection_lost(&self, attempt: AttemptId, error: TransportError) {
        self.post(TransportEvent::ConnectionLost { attempt, error });
    }

    fn post(&self, event: TransportEvent) {
        self.sender.post(SessionInput::Transport(event));
    }
}
