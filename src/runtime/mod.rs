//! Session runtime: threads, inbox and handles around [`SessionService`].
//!
//! ```text
//!  caller thread(s)          transport I/O thread
//!  SessionHandle             TransportLink
//!        │ Command                 │ ConnAck / SubAck / Message / Lost
//!        └──────────┬──────────────┘
//!                   ▼
//!              Inbox (embassy-sync Channel)
//!                   ▼
//!          session worker thread ──▶ SessionService ──▶ EventSink
//! ```
//!
//! The worker is the single processing sequence: each input is fully
//! handled before the next is taken, so routing, classification and the
//! latch update for one message are atomic with respect to every other
//! message and to connection-state changes.

pub mod channels;
mod worker;

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::info;

use crate::app::commands::SessionCommand;
use crate::app::ports::{EventSink, TransportPort};
use crate::app::service::SessionService;
use crate::config::MonitorConfig;
use crate::error::Result;
use crate::session::Endpoint;

pub use channels::{InboxSender, SessionInput, TransportLink, INBOX_DEPTH};

use channels::Inbox;

/// Owns the inbox until the worker is spawned.
///
/// Create the runtime first, hand [`Runtime::transport_link`] to the
/// transport adapter, then [`Runtime::spawn`] the worker.
pub struct Runtime {
    inbox: Arc<Inbox>,
}

impl Runtime {
    pub fn new() -> Self {
        Self {
            inbox: Arc::new(Inbox::new()),
        }
    }

    pub fn transport_link(&self) -> TransportLink {
        TransportLink::new(InboxSender::new(self.inbox.clone()))
    }

    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            sender: InboxSender::new(self.inbox.clone()),
        }
    }

    /// Validate `config` and start the session worker thread.
    pub fn spawn<T, S>(
        self,
        config: MonitorConfig,
        transport: T,
        sink: S,
    ) -> Result<SessionWorker<T, S>>
    where
        T: TransportPort + Send + 'static,
        S: EventSink + Send + 'static,
    {
        config.validate()?;
        let handle = self.handle();
        let inbox = self.inbox;
        let service = SessionService::new(config);
        let thread = thread::Builder::new()
            .name("session".into())
            .spawn(move || worker::run(inbox, service, transport, sink))?;
        info!("Session worker started");
        Ok(SessionWorker { handle, thread })
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

/// Caller-facing command handle.  Cheap to clone; every call returns once
/// the command is queued, never waiting for the broker.
#[derive(Clone)]
pub struct SessionHandle {
    sender: InboxSender,
}

impl SessionHandle {
    pub fn connect(&self, host: &str, port: u16) {
        self.send(SessionCommand::Connect(Endpoint::new(host, port)));
    }

    pub fn subscribe(&self, filter: &str) {
        self.send(SessionCommand::Subscribe(filter.to_owned()));
    }

    pub fn disconnect(&self) {
        self.send(SessionCommand::Disconnect);
    }

    pub fn send(&self, cmd: SessionCommand) {
        self.sender.post(SessionInput::Command(cmd));
    }
}

/// What the worker hands back when it stops.
pub struct SessionReport<T, S> {
    pub service: SessionService,
    pub transport: T,
    pub sink: S,
}

/// Running session worker.
pub struct SessionWorker<T, S> {
    handle: SessionHandle,
    thread: JoinHandle<(SessionService, T, S)>,
}

impl<T, S> SessionWorker<T, S> {
    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    /// Queue a shutdown behind every pending input, then join the worker.
    /// An active session is disconnected first.
    pub fn shutdown(self) -> thread::Result<SessionReport<T, S>> {
        self.handle.sender.post(SessionInput::Shutdown);
        let (service, transport, sink) = self.thread.join()?;
        Ok(SessionReport {
            service,
            transport,
            sink,
        })
    }
}
