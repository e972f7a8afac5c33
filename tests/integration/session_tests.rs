//! Integration tests: SessionService → Router → Classifier → Latch.

use homeguard::app::commands::SessionCommand;
use homeguard::app::events::{DisplayStatus, SessionEvent};
use homeguard::app::ports::TransportEvent;
use homeguard::app::service::SessionService;
use homeguard::config::{MonitorConfig, ReconnectPolicy};
use homeguard::error::{SessionError, TransportError};
use homeguard::sensors::{HazardLevel, LightLevel, SensorKind, Severity};
use homeguard::session::{AttemptId, DisconnectCause, Endpoint, SessionState};

use crate::mock_ports::{
    BASE, MockTransport, RecordingSink, TransportCall, connack_ok, message, suback_ok,
};

struct Harness {
    svc: SessionService,
    transport: MockTransport,
    sink: RecordingSink,
}

impl Harness {
    fn new(config: MonitorConfig) -> Self {
        Self {
            svc: SessionService::new(config),
            transport: MockTransport::new(),
            sink: RecordingSink::new(),
        }
    }

    fn command(&mut self, cmd: SessionCommand) {
        self.svc
            .handle_command(cmd, &mut self.transport, &mut self.sink);
    }

    fn transport_event(&mut self, event: TransportEvent) {
        self.svc
            .handle_transport(event, &mut self.transport, &mut self.sink);
    }

    fn connect(&mut self) -> AttemptId {
        self.command(SessionCommand::Connect(Endpoint::new("broker.test", 1883)));
        self.svc.attempt()
    }

    /// Connect, acknowledge and let auto-subscribe complete.
    fn online(&mut self) -> AttemptId {
        let attempt = self.connect();
        self.transport_event(connack_ok(attempt));
        self.transport_event(suback_ok(attempt));
        assert_eq!(
            self.svc.state(),
            &SessionState::Connected { subscribed: true }
        );
        self.sink.clear();
        attempt
    }

    fn feed(&mut self, suffix: &str, payload: &str) {
        let attempt = self.svc.attempt();
        self.transport_event(message(attempt, suffix, payload));
    }
}

fn harness() -> Harness {
    Harness::new(MonitorConfig::default())
}

// ── Lifecycle ─────────────────────────────────────────────────

#[test]
fn connect_ack_and_auto_subscribe() {
    let mut h = harness();
    let attempt = h.connect();
    assert_eq!(h.svc.state(), &SessionState::Connecting);

    h.transport_event(connack_ok(attempt));
    assert_eq!(
        h.transport.last_call(),
        Some(&TransportCall::Subscribe(attempt, format!("{BASE}#")))
    );

    h.transport_event(suback_ok(attempt));
    assert_eq!(
        h.sink.states(),
        vec![
            &SessionState::Connecting,
            &SessionState::Connected { subscribed: false },
            &SessionState::Connected { subscribed: true },
        ]
    );
    assert!(h.sink.events.contains(&SessionEvent::Subscribed {
        filter: format!("{BASE}#")
    }));
}

#[test]
fn manual_subscribe_when_auto_subscribe_is_off() {
    let mut h = Harness::new(MonitorConfig {
        auto_subscribe: false,
        ..MonitorConfig::default()
    });
    let attempt = h.connect();
    h.transport_event(connack_ok(attempt));
    assert_eq!(h.transport.calls.len(), 1);

    h.command(SessionCommand::Subscribe("home/#".into()));
    assert_eq!(
        h.transport.last_call(),
        Some(&TransportCall::Subscribe(attempt, "home/#".into()))
    );
}

#[test]
fn handshake_failure_is_reported_and_retryable() {
    let mut h = harness();
    let attempt = h.connect();
    h.transport_event(TransportEvent::ConnAck {
        attempt,
        result: Err(TransportError::Refused("bad credentials".into())),
    });
    assert_eq!(
        h.svc.state(),
        &SessionState::Failed("refused: bad credentials".into())
    );

    let retry = h.connect();
    assert_ne!(retry, attempt);
    assert_eq!(h.svc.state(), &SessionState::Connecting);
    assert_eq!(h.transport.connects(), 2);
}

#[test]
fn connect_while_connecting_is_rejected() {
    let mut h = harness();
    h.connect();
    h.connect();

    assert_eq!(h.transport.connects(), 1);
    assert!(h.sink.events.contains(&SessionEvent::CommandRejected {
        command: "connect",
        reason: SessionError::AlreadyActive(SessionState::Connecting),
    }));
}

#[test]
fn subscribe_before_connected_is_rejected() {
    let mut h = harness();
    h.command(SessionCommand::Subscribe("x/#".into()));
    assert!(h.transport.calls.is_empty());
    assert!(matches!(
        h.sink.events.last(),
        Some(SessionEvent::CommandRejected {
            command: "subscribe",
            reason: SessionError::NotConnected(SessionState::Idle),
        })
    ));
}

#[test]
fn subscribe_failure_keeps_connection() {
    let mut h = harness();
    let attempt = h.connect();
    h.transport_event(connack_ok(attempt));
    h.transport_event(TransportEvent::SubAck {
        attempt,
        result: Err(TransportError::Timeout),
    });

    assert_eq!(
        h.svc.state(),
        &SessionState::Connected { subscribed: false }
    );
    assert!(h.sink.events.contains(&SessionEvent::SubscribeFailed {
        filter: format!("{BASE}#"),
        reason: "timed out".into(),
    }));

    // No callback registered: readings are dropped.
    h.feed("flame", "10");
    assert!(h.sink.alerts().is_empty());
    assert_eq!(h.svc.stats().dropped, 1);
}

#[test]
fn disconnect_is_idempotent() {
    let mut h = harness();
    let attempt = h.online();

    h.command(SessionCommand::Disconnect);
    h.command(SessionCommand::Disconnect);

    assert_eq!(
        h.svc.state(),
        &SessionState::Disconnected(DisconnectCause::Requested)
    );
    let disconnects = h
        .transport
        .calls
        .iter()
        .filter(|c| **c == TransportCall::Disconnect(attempt))
        .count();
    assert_eq!(disconnects, 1);
    assert_eq!(h.sink.states().len(), 1);
}

#[test]
fn disconnect_from_idle_does_nothing() {
    let mut h = harness();
    h.command(SessionCommand::Disconnect);
    assert_eq!(h.svc.state(), &SessionState::Idle);
    assert!(h.sink.events.is_empty());
}

#[test]
fn disconnect_resets_displays_to_waiting() {
    let mut h = harness();
    h.online();
    h.feed("gas", "600");
    h.sink.clear();

    h.command(SessionCommand::Disconnect);
    let waiting: Vec<SensorKind> = h
        .sink
        .displays()
        .into_iter()
        .filter(|d| d.status == DisplayStatus::Waiting)
        .map(|d| d.kind)
        .collect();
    assert_eq!(waiting, SensorKind::ALL.to_vec());
}

// ── Message pipeline ──────────────────────────────────────────

#[test]
fn flame_scenario_alerts_on_each_onset() {
    let mut h = harness();
    h.online();

    for raw in ["900", "200", "150", "850", "10"] {
        h.feed("flame", raw);
    }

    let alerts = h.sink.alerts();
    assert_eq!(alerts.len(), 2);
    assert!(alerts.iter().all(|a| a.alert_id == 1 && a.onset));
    assert_eq!(
        h.sink.reading_texts(),
        vec![
            "Good",
            "FIRE DETECTED!",
            "FIRE DETECTED!",
            "Good",
            "FIRE DETECTED!",
        ]
    );
    assert!(h.svc.latch().is_latched(SensorKind::Flame));
    assert_eq!(h.svc.stats().alerts, 2);
}

#[test]
fn each_hazard_kind_uses_its_own_alert_id() {
    let mut h = harness();
    h.online();
    h.feed("flame", "0");
    h.feed("gas", "999");
    h.feed("water", "999");

    let ids: Vec<u32> = h.sink.alerts().iter().map(|a| a.alert_id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
}

#[test]
fn latches_are_independent_per_kind() {
    let mut h = harness();
    h.online();
    h.feed("gas", "600");
    h.feed("water", "500");
    h.feed("gas", "10");
    h.feed("water", "450");

    assert_eq!(h.sink.alerts().len(), 2);
    assert!(!h.svc.latch().is_latched(SensorKind::Gas));
    assert!(h.svc.latch().is_latched(SensorKind::Water));
}

#[test]
fn unknown_topic_is_not_routed() {
    let mut h = harness();
    h.online();
    h.feed("gas", "600");
    let latch = *h.svc.latch();
    h.sink.clear();

    h.feed("unknown", "600");

    assert_eq!(
        h.sink.events,
        vec![SessionEvent::Unrouted {
            topic: format!("{BASE}unknown")
        }]
    );
    assert_eq!(h.svc.latch(), &latch);
    assert_eq!(
        h.svc.state(),
        &SessionState::Connected { subscribed: true }
    );
}

#[test]
fn light_never_alerts() {
    let mut h = harness();
    h.online();
    for raw in ["0", "1", "5", "-3"] {
        h.feed("light", raw);
    }

    assert!(h.sink.alerts().is_empty());
    assert_eq!(
        h.sink.reading_texts(),
        vec!["On", "Off", "Unknown: 5", "Unknown: -3"]
    );
    let statuses: Vec<DisplayStatus> = h.sink.displays().iter().map(|d| d.status).collect();
    assert_eq!(
        statuses[..3],
        [
            DisplayStatus::Reading(Severity::Light(LightLevel::On)),
            DisplayStatus::Reading(Severity::Light(LightLevel::Off)),
            DisplayStatus::Reading(Severity::Light(LightLevel::Unknown)),
        ]
    );
}

#[test]
fn non_numeric_payload_leaves_latch_alone() {
    let mut h = harness();
    h.online();
    h.feed("water", "450");
    assert_eq!(h.sink.alerts().len(), 1);
    let latch = *h.svc.latch();

    h.feed("water", "abc");
    h.feed("water", "999");

    assert_eq!(h.sink.alerts().len(), 1, "still latched, no re-alert");
    assert_eq!(h.svc.latch(), &latch);
    let err = h
        .sink
        .displays()
        .into_iter()
        .find(|d| d.status == DisplayStatus::DecodeError)
        .map(|d| d.text.clone());
    assert_eq!(err.as_deref(), Some("Error: abc"));
    assert_eq!(h.svc.stats().decode_errors, 1);
}

#[test]
fn padded_payload_is_accepted() {
    let mut h = harness();
    h.online();
    h.feed("gas", " 501\n");
    assert_eq!(h.sink.alerts().len(), 1);
    assert_eq!(
        h.sink.displays()[0].status,
        DisplayStatus::Reading(Severity::Hazard(HazardLevel::Critical))
    );
}

#[test]
fn reconnect_resets_latch() {
    let mut h = harness();
    h.online();
    h.feed("flame", "100");
    assert_eq!(h.sink.alerts().len(), 1);

    h.command(SessionCommand::Disconnect);
    assert!(!h.svc.latch().any());

    h.online();
    h.feed("flame", "100");
    assert_eq!(h.sink.alerts().len(), 1, "fresh alert after reconnect");
}

// ── Stale results ─────────────────────────────────────────────

#[test]
fn disconnect_during_handshake_discards_late_ack() {
    let mut h = harness();
    let attempt = h.connect();
    h.command(SessionCommand::Disconnect);

    h.transport_event(connack_ok(attempt));

    assert_eq!(
        h.svc.state(),
        &SessionState::Disconnected(DisconnectCause::Requested)
    );
    assert_eq!(h.svc.stats().stale_results, 1);
}

#[test]
fn messages_from_previous_attempt_are_ignored() {
    let mut h = harness();
    let old = h.online();
    h.command(SessionCommand::Disconnect);
    h.online();

    h.transport_event(message(old, "gas", "900"));

    assert!(h.sink.alerts().is_empty());
    assert_eq!(h.svc.stats().stale_results, 1);
}

// ── Link loss and recovery ────────────────────────────────────

fn lose_link(h: &mut Harness) {
    let attempt = h.svc.attempt();
    h.transport_event(TransportEvent::ConnectionLost {
        attempt,
        error: TransportError::ConnectionLost("wifi".into()),
    });
}

#[test]
fn link_loss_is_distinguishable_from_disconnect() {
    let mut h = harness();
    h.online();
    h.feed("gas", "900");
    lose_link(&mut h);

    assert!(h.svc.state().is_unexpected_loss());
    assert!(!h.svc.latch().any());
    assert_eq!(h.svc.stats().connection_losses, 1);
    // Recovery is off by default.
    assert_eq!(h.svc.take_reconnect_request(), None);
    assert!(h.sink.events.contains(&SessionEvent::RecoveryStopped {
        reason: "reconnect disabled".into(),
    }));
}

#[test]
fn link_loss_schedules_backoff_reconnects() {
    let mut h = Harness::new(MonitorConfig {
        reconnect: ReconnectPolicy {
            enabled: true,
            initial_delay_ms: 100,
            max_delay_ms: 250,
            max_attempts: 3,
        },
        ..MonitorConfig::default()
    });
    let first = h.online();
    lose_link(&mut h);

    let req = h.svc.take_reconnect_request().expect("reconnect scheduled");
    assert_eq!(req.after, first);
    assert_eq!(req.delay.as_millis(), 100);

    h.command(SessionCommand::Reconnect { after: req.after });
    let second = h.svc.attempt();
    assert_eq!(h.svc.state(), &SessionState::Connecting);

    h.transport_event(TransportEvent::ConnAck {
        attempt: second,
        result: Err(TransportError::Timeout),
    });
    let req = h.svc.take_reconnect_request().expect("second reconnect");
    assert_eq!(req.delay.as_millis(), 200);

    h.command(SessionCommand::Reconnect { after: req.after });
    h.transport_event(TransportEvent::ConnAck {
        attempt: h.svc.attempt(),
        result: Err(TransportError::Timeout),
    });
    let req = h.svc.take_reconnect_request().expect("third reconnect");
    assert_eq!(req.delay.as_millis(), 250);

    h.command(SessionCommand::Reconnect { after: req.after });
    h.transport_event(TransportEvent::ConnAck {
        attempt: h.svc.attempt(),
        result: Err(TransportError::Timeout),
    });
    assert_eq!(h.svc.take_reconnect_request(), None, "gave up");
    assert_eq!(h.transport.connects(), 4);
    assert!(matches!(
        h.sink.events.last(),
        Some(SessionEvent::RecoveryStopped { .. })
    ));
}

#[test]
fn explicit_disconnect_cancels_recovery() {
    let mut h = Harness::new(MonitorConfig {
        reconnect: ReconnectPolicy {
            enabled: true,
            ..ReconnectPolicy::default()
        },
        ..MonitorConfig::default()
    });
    h.online();
    lose_link(&mut h);
    let req = h.svc.take_reconnect_request().expect("reconnect scheduled");

    h.command(SessionCommand::Disconnect);
    h.command(SessionCommand::Reconnect { after: req.after });

    assert_eq!(
        h.svc.state(),
        &SessionState::Disconnected(DisconnectCause::Requested)
    );
    assert_eq!(h.transport.connects(), 1);
}

#[test]
fn cleared_alerts_when_enabled() {
    let mut h = Harness::new(MonitorConfig {
        notify_on_clear: true,
        ..MonitorConfig::default()
    });
    h.online();
    h.feed("gas", "900");
    h.feed("gas", "200");
    h.feed("gas", "100");

    let alerts = h.sink.alerts();
    assert_eq!(alerts.len(), 2);
    assert!(alerts[0].onset);
    assert!(!alerts[1].onset);
    assert_eq!(alerts[1].alert_id, 2);
}
