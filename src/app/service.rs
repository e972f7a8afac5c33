//! Session service: the hexagonal core.
//!
//! [`SessionService`] owns the session state, the alert latch and the
//! diagnostics counters.  It is the single point of mutation for all of
//! them: the runtime feeds it commands and transport events one at a time,
//! and every outcome leaves through the [`EventSink`] port.
//!
//! ```text
//!  SessionCommand ──▶ ┌──────────────────────────────┐ ──▶ EventSink
//!                     │        SessionService         │
//!  TransportEvent ──▶ │ Router · Classifier · Latch   │ ──▶ TransportPort
//!                     └──────────────────────────────┘
//! ```

use std::time::Duration;

use log::{debug, error, info, warn};

use crate::config::MonitorConfig;
use crate::diagnostics::SessionStats;
use crate::error::{SessionError, TransportError};
use crate::latch::{AlertLatch, LatchState};
use crate::router;
use crate::sensors::{self, Reading, SensorKind};
use crate::session::{AttemptId, DisconnectCause, Endpoint, SessionState};

use super::commands::SessionCommand;
use super::events::{DisplayStatus, DisplayUpdate, SessionEvent};
use super::ports::{EventSink, InboundMessage, TransportEvent, TransportPort};

/// Reconnect the runtime should schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectRequest {
    /// Attempt whose loss triggered the request.
    pub after: AttemptId,
    pub delay: Duration,
}

// ───────────────────────────────────────────────────────────────
// SessionService
// ───────────────────────────────────────────────────────────────

/// The session manager.
pub struct SessionService {
    config: MonitorConfig,
    state: SessionState,
    latch: AlertLatch,
    /// Identifier of the most recent handshake.
    attempt: AttemptId,
    /// Last endpoint given to `connect`, reused by automatic reconnects.
    endpoint: Option<Endpoint>,
    /// Filter whose callback is registered (pending or acknowledged).
    filter: Option<String>,
    /// Set while recovering from an unexpected loss.
    recovering: bool,
    /// Consecutive automatic attempts in the current recovery.
    reconnects: u32,
    reconnect_request: Option<ReconnectRequest>,
    stats: SessionStats,
}

impl SessionService {
    pub fn new(config: MonitorConfig) -> Self {
        let latch = AlertLatch::new(config.notify_on_clear);
        Self {
            config,
            state: SessionState::Idle,
            latch,
            attempt: AttemptId::default(),
            endpoint: None,
            filter: None,
            recovering: false,
            reconnects: 0,
            reconnect_request: None,
            stats: SessionStats::default(),
        }
    }

    // ── Command handling ──────────────────────────────────────

    /// Process a caller command.  Rejections are reported to the sink as
    /// [`SessionEvent::CommandRejected`]; nothing here fails hard.
    pub fn handle_command(
        &mut self,
        cmd: SessionCommand,
        transport: &mut impl TransportPort,
        sink: &mut impl EventSink,
    ) {
        let name = cmd.name();
        let result = match cmd {
            SessionCommand::Connect(endpoint) => self.connect(endpoint, transport, sink).map(|_| ()),
            SessionCommand::Subscribe(filter) => self.subscribe(&filter, transport),
            SessionCommand::Disconnect => {
                self.disconnect(transport, sink);
                Ok(())
            }
            SessionCommand::Reconnect { after } => self.reconnect(after, transport, sink),
        };

        if let Err(reason) = result {
            warn!("Command '{}' rejected: {}", name, reason);
            sink.emit(&SessionEvent::CommandRejected {
                command: name,
                reason,
            });
        }
    }

    /// Start a handshake.  Only valid from `Idle`, `Disconnected` or
    /// `Failed`; a second concurrent handshake is never started.
    pub fn connect(
        &mut self,
        endpoint: Endpoint,
        transport: &mut impl TransportPort,
        sink: &mut impl EventSink,
    ) -> Result<AttemptId, SessionError> {
        if !self.state.accepts_connect() {
            return Err(SessionError::AlreadyActive(self.state.clone()));
        }
        self.cancel_recovery();
        self.endpoint = Some(endpoint);
        Ok(self.begin_handshake(transport, sink))
    }

    /// Register the message callback for `filter`.  Only valid while
    /// connected.  The outcome arrives later as a `SubAck`.
    pub fn subscribe(
        &mut self,
        filter: &str,
        transport: &mut impl TransportPort,
    ) -> Result<(), SessionError> {
        if !self.state.is_connected() {
            return Err(SessionError::NotConnected(self.state.clone()));
        }
        info!("Subscribing to '{}' ({})", filter, self.attempt);
        self.filter = Some(filter.to_owned());
        transport.subscribe(self.attempt, filter);
        Ok(())
    }

    /// Tear the session down.  Idempotent; a no-op from `Idle`.
    pub fn disconnect(&mut self, transport: &mut impl TransportPort, sink: &mut impl EventSink) {
        self.cancel_recovery();
        match self.state {
            SessionState::Idle | SessionState::Disconnected(DisconnectCause::Requested) => {
                debug!("Disconnect ignored in {}", self.state);
            }
            // Link already gone; only the cause changes, which stops recovery.
            SessionState::Disconnected(DisconnectCause::Lost(_)) => {
                self.set_state(SessionState::Disconnected(DisconnectCause::Requested), sink);
            }
            SessionState::Failed(_) => {
                self.enter_disconnected(DisconnectCause::Requested, sink);
            }
            SessionState::Connecting | SessionState::Connected { .. } => {
                transport.disconnect(self.attempt);
                self.enter_disconnected(DisconnectCause::Requested, sink);
            }
        }
    }

    /// Automatic reconnect fired by the runtime timer.  Stale requests are
    /// ignored silently.
    fn reconnect(
        &mut self,
        after: AttemptId,
        transport: &mut impl TransportPort,
        sink: &mut impl EventSink,
    ) -> Result<(), SessionError> {
        if !self.recovering || after != self.attempt || !self.state.accepts_connect() {
            debug!("Stale reconnect for {} ignored", after);
            return Ok(());
        }
        if self.endpoint.is_none() {
            self.cancel_recovery();
            return Err(SessionError::NoEndpoint);
        }
        self.reconnects += 1;
        info!("Reconnect attempt {} after {}", self.reconnects, after);
        self.begin_handshake(transport, sink);
        Ok(())
    }

    // ── Transport events ──────────────────────────────────────

    /// Process one asynchronous result or delivery from the transport.
    pub fn handle_transport(
        &mut self,
        event: TransportEvent,
        transport: &mut impl TransportPort,
        sink: &mut impl EventSink,
    ) {
        if event.attempt() != self.attempt {
            self.stale(&event);
            return;
        }
        match event {
            TransportEvent::ConnAck { result, .. } => self.on_connack(result, transport, sink),
            TransportEvent::SubAck { result, .. } => self.on_suback(result, sink),
            TransportEvent::Message { message, .. } => self.on_message(&message, sink),
            TransportEvent::ConnectionLost { error, .. } => self.on_connection_lost(&error, sink),
        }
    }

    fn on_connack(
        &mut self,
        result: Result<(), TransportError>,
        transport: &mut impl TransportPort,
        sink: &mut impl EventSink,
    ) {
        if self.state != SessionState::Connecting {
            self.stats.stale_results += 1;
            warn!("ConnAck for {} after session moved to {}", self.attempt, self.state);
            return;
        }
        match result {
            Ok(()) => {
                self.latch.reset();
                self.recovering = false;
                self.reconnects = 0;
                self.set_state(SessionState::Connected { subscribed: false }, sink);
                if self.config.auto_subscribe {
                    let filter = self.config.subscription_filter();
                    if let Err(e) = self.subscribe(&filter, transport) {
                        warn!("Auto-subscribe skipped: {}", e);
                    }
                }
            }
            Err(e) => {
                error!("Connection failed: {}", e);
                self.set_state(SessionState::Failed(e.to_string()), sink);
                if self.recovering {
                    self.schedule_reconnect(sink);
                }
            }
        }
    }

    fn on_suback(&mut self, result: Result<(), TransportError>, sink: &mut impl EventSink) {
        let Some(filter) = self.filter.clone().filter(|_| self.state.is_connected()) else {
            self.stats.stale_results += 1;
            warn!("SubAck with no pending subscription in {}", self.state);
            return;
        };
        match result {
            Ok(()) => {
                info!("Subscribed to '{}'", filter);
                self.set_state(SessionState::Connected { subscribed: true }, sink);
                sink.emit(&SessionEvent::Subscribed { filter });
            }
            Err(e) => {
                // Connection and subscription liveness are separate facts.
                error!("Subscribe to '{}' failed: {}", filter, e);
                self.filter = None;
                self.set_state(SessionState::Connected { subscribed: false }, sink);
                sink.emit(&SessionEvent::SubscribeFailed {
                    filter,
                    reason: e.to_string(),
                });
            }
        }
    }

    fn on_message(&mut self, message: &InboundMessage, sink: &mut impl EventSink) {
        if !self.state.is_connected() || self.filter.is_none() {
            self.stats.dropped += 1;
            debug!("Dropped message on '{}': no active subscription", message.topic());
            return;
        }
        self.process(message.topic(), &message.payload_text(), sink);
    }

    fn on_connection_lost(&mut self, error: &TransportError, sink: &mut impl EventSink) {
        match self.state {
            SessionState::Connected { .. } => {
                warn!("Connection lost: {}", error);
                self.stats.connection_losses += 1;
                self.enter_disconnected(DisconnectCause::Lost(error.to_string()), sink);
                self.recovering = self.config.reconnect.enabled;
                if self.recovering {
                    self.schedule_reconnect(sink);
                } else {
                    sink.emit(&SessionEvent::RecoveryStopped {
                        reason: "reconnect disabled".to_owned(),
                    });
                }
            }
            SessionState::Connecting => {
                error!("Connection failed during handshake: {}", error);
                self.set_state(SessionState::Failed(error.to_string()), sink);
                if self.recovering {
                    self.schedule_reconnect(sink);
                }
            }
            _ => {
                self.stats.stale_results += 1;
                debug!("Connection loss ignored in {}", self.state);
            }
        }
    }

    // ── Message pipeline: Router → Classifier → Latch ─────────

    fn process(&mut self, topic: &str, payload: &str, sink: &mut impl EventSink) {
        self.stats.messages += 1;

        let Some(kind) = router::route(topic) else {
            self.stats.unrouted += 1;
            debug!("Unrouted topic '{}'", topic);
            sink.emit(&SessionEvent::Unrouted {
                topic: topic.to_owned(),
            });
            return;
        };

        match Reading::decode(kind, payload).classify() {
            Ok(reading) => {
                debug!("{} = {} -> {}", kind, reading.raw, reading.severity);
                sink.emit(&SessionEvent::Display(DisplayUpdate {
                    kind,
                    text: reading.text,
                    status: DisplayStatus::Reading(reading.severity),
                }));
                if let Some(alert) = self.latch.update(kind, reading.severity) {
                    self.stats.alerts += 1;
                    sink.emit(&SessionEvent::Alert(alert));
                }
            }
            Err(e) => {
                self.stats.decode_errors += 1;
                warn!("{} reading rejected: {}", kind, e);
                sink.emit(&SessionEvent::Display(DisplayUpdate {
                    kind,
                    text: sensors::error_label(&e),
                    status: DisplayStatus::DecodeError,
                }));
            }
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn latch(&self) -> &LatchState {
        self.latch.state()
    }

    pub fn attempt(&self) -> AttemptId {
        self.attempt
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Reconnect the runtime should schedule, if any.  Taken once.
    pub fn take_reconnect_request(&mut self) -> Option<ReconnectRequest> {
        self.reconnect_request.take()
    }

    // ── Internal ──────────────────────────────────────────────

    fn begin_handshake(
        &mut self,
        transport: &mut impl TransportPort,
        sink: &mut impl EventSink,
    ) -> AttemptId {
        self.attempt = self.attempt.next();
        self.stats.connect_attempts += 1;
        self.filter = None;
        self.set_state(SessionState::Connecting, sink);
        if let Some(endpoint) = &self.endpoint {
            info!("Connecting to {} ({})", endpoint, self.attempt);
            transport.connect(self.attempt, endpoint);
        }
        self.attempt
    }

    fn enter_disconnected(&mut self, cause: DisconnectCause, sink: &mut impl EventSink) {
        self.latch.reset();
        self.filter = None;
        self.set_state(SessionState::Disconnected(cause), sink);
        for kind in SensorKind::ALL {
            sink.emit(&SessionEvent::Display(DisplayUpdate::waiting(kind)));
        }
    }

    fn schedule_reconnect(&mut self, sink: &mut impl EventSink) {
        let next = self.reconnects + 1;
        let policy = self.config.reconnect;
        if policy.allows(next) {
            let delay = policy.delay_for(next);
            info!("Reconnect {} scheduled in {:?}", next, delay);
            self.reconnect_request = Some(ReconnectRequest {
                after: self.attempt,
                delay,
            });
        } else {
            warn!("Giving up after {} reconnect attempts", self.reconnects);
            self.recovering = false;
            sink.emit(&SessionEvent::RecoveryStopped {
                reason: format!("gave up after {} attempts", self.reconnects),
            });
        }
    }

    fn cancel_recovery(&mut self) {
        self.recovering = false;
        self.reconnects = 0;
        self.reconnect_request = None;
    }

    fn stale(&mut self, event: &TransportEvent) {
        self.stats.stale_results += 1;
        warn!(
            "Discarding transport result for {} (current {})",
            event.attempt(),
            self.attempt
        );
    }

    fn set_state(&mut self, to: SessionState, sink: &mut impl EventSink) {
        if to == self.state {
            return;
        }
        let from = core::mem::replace(&mut self.state, to.clone());
        info!("SESSION {} -> {}", from, to);
        sink.emit(&SessionEvent::StateChanged { from, to });
    }
}
