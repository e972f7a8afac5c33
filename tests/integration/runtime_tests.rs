//! Integration tests: Runtime worker thread ↔ transport ↔ sink.
//!
//! The test thread plays the broker: it reads the calls the worker makes
//! on a [`ChannelTransport`] and answers through the [`TransportLink`].

use std::sync::mpsc::Receiver;
use std::thread;
use std::time::Duration;

use homeguard::app::events::{DisplayStatus, SessionEvent};
use homeguard::config::{ConfigError, MonitorConfig, ReconnectPolicy};
use homeguard::error::{Error, TransportError};
use homeguard::runtime::{Runtime, SessionHandle, TransportLink};
use homeguard::sensors::SensorKind;
use homeguard::session::{AttemptId, DisconnectCause, Endpoint, SessionState};

use crate::mock_ports::{BASE, ChannelTransport, RecordingSink, TransportCall, next_call};

#[test]
fn full_session_over_worker_thread() {
    let runtime = Runtime::new();
    let link = runtime.transport_link();
    let (transport, calls) = ChannelTransport::pair();
    let worker = runtime
        .spawn(MonitorConfig::default(), transport, RecordingSink::new())
        .unwrap();
    let handle = worker.handle();

    handle.connect("broker.test", 1883);
    let attempt = AttemptId(1);
    assert_eq!(
        next_call(&calls),
        TransportCall::Connect(attempt, Endpoint::new("broker.test", 1883))
    );

    link.connack(attempt, Ok(()));
    assert_eq!(
        next_call(&calls),
        TransportCall::Subscribe(attempt, format!("{BASE}#"))
    );
    link.suback(attempt, Ok(()));

    for raw in ["900", "200", "150", "850", "10"] {
        link.deliver(attempt, &format!("{BASE}flame"), raw.as_bytes());
    }
    link.deliver(attempt, &format!("{BASE}light"), b"0");

    let report = worker.shutdown().unwrap();
    let alerts = report.sink.alerts();
    assert_eq!(alerts.len(), 2);
    assert!(alerts.iter().all(|a| a.alert_id == 1));
    assert_eq!(report.service.stats().messages, 6);
    assert_eq!(
        report.service.state(),
        &SessionState::Disconnected(DisconnectCause::Requested)
    );
}

/// Connect and subscribe with default config; returns the live attempt.
fn go_online(
    handle: &SessionHandle,
    link: &TransportLink,
    calls: &Receiver<TransportCall>,
) -> AttemptId {
    handle.connect("broker.test", 1883);
    next_call(calls);
    link.connack(AttemptId(1), Ok(()));
    next_call(calls);
    link.suback(AttemptId(1), Ok(()));
    AttemptId(1)
}

#[test]
fn long_messages_reach_the_pipeline() {
    let runtime = Runtime::new();
    let link = runtime.transport_link();
    let (transport, calls) = ChannelTransport::pair();
    let worker = runtime
        .spawn(MonitorConfig::default(), transport, RecordingSink::new())
        .unwrap();
    let attempt = go_online(&worker.handle(), &link, &calls);

    let json = br#"{"sensor":"gas","value":620,"unit":"ppm","ts":"2026-01-01T00:00:00Z"}"#;
    assert!(json.len() > 64);
    link.deliver(attempt, &format!("{BASE}gas"), json);

    let padded = format!("{}10", " ".repeat(68));
    link.deliver(attempt, &format!("{BASE}flame"), padded.as_bytes());

    let long_topic = format!("{BASE}{}flame", "zone-a/".repeat(18));
    assert!(long_topic.len() > 128);
    link.deliver(attempt, &long_topic, b"10");

    let report = worker.shutdown().unwrap();
    let alerts = report.sink.alerts();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].kind, SensorKind::Flame);

    let decode_errors: Vec<_> = report
        .sink
        .displays()
        .into_iter()
        .filter(|d| d.status == DisplayStatus::DecodeError)
        .collect();
    assert_eq!(decode_errors.len(), 1);
    assert_eq!(decode_errors[0].kind, SensorKind::Gas);
    assert!(decode_errors[0].text.starts_with("Error: {\"sensor\""));

    let stats = report.service.stats();
    assert_eq!(stats.messages, 3);
    assert_eq!(stats.decode_errors, 1);
}

#[test]
fn concurrent_producers_keep_per_kind_edges() {
    // (kind, critical payload, normal payload)
    const FEEDS: [(SensorKind, &str, &str); 3] = [
        (SensorKind::Flame, "10", "900"),
        (SensorKind::Gas, "900", "100"),
        (SensorKind::Water, "900", "50"),
    ];
    const ROUNDS: usize = 200;

    let runtime = Runtime::new();
    let link = runtime.transport_link();
    let (transport, calls) = ChannelTransport::pair();
    let worker = runtime
        .spawn(MonitorConfig::default(), transport, RecordingSink::new())
        .unwrap();
    let attempt = go_online(&worker.handle(), &link, &calls);

    let pattern = |k: usize| -> Vec<bool> { (0..ROUNDS).map(|i| (i * (k + 2)) % 7 < 3).collect() };

    let producers: Vec<_> = FEEDS
        .iter()
        .enumerate()
        .map(|(k, &(kind, critical, normal))| {
            let link = link.clone();
            let topic = format!("{BASE}{kind}");
            let seq = pattern(k);
            thread::spawn(move || {
                for hot in seq {
                    let payload = if hot { critical } else { normal };
                    link.deliver(attempt, &topic, payload.as_bytes());
                }
            })
        })
        .collect();
    // Light traffic interleaved from yet another thread never alerts.
    let light = {
        let link = link.clone();
        thread::spawn(move || {
            for i in 0..ROUNDS {
                let payload = if i % 2 == 0 { "0" } else { "1" };
                link.deliver(attempt, &format!("{BASE}light"), payload.as_bytes());
            }
        })
    };
    for p in producers {
        p.join().unwrap();
    }
    light.join().unwrap();

    let report = worker.shutdown().unwrap();
    let alerts = report.sink.alerts();
    for (k, &(kind, _, _)) in FEEDS.iter().enumerate() {
        let seq = pattern(k);
        let rising = (0..ROUNDS)
            .filter(|&i| seq[i] && (i == 0 || !seq[i - 1]))
            .count();
        let got = alerts.iter().filter(|a| a.kind == kind).count();
        assert_eq!(got, rising, "{kind}");
    }
    assert!(alerts.iter().all(|a| a.kind != SensorKind::Light));
    assert_eq!(report.service.stats().messages as usize, ROUNDS * 4);
}

#[test]
fn invalid_config_is_rejected_before_spawn() {
    let config = MonitorConfig {
        broker_port: 0,
        ..MonitorConfig::default()
    };
    let (transport, _calls) = ChannelTransport::pair();
    let result = Runtime::new().spawn(config, transport, RecordingSink::new());
    assert!(matches!(
        result,
        Err(Error::Config(ConfigError::ValidationFailed(_)))
    ));
}

#[test]
fn shutdown_disconnects_active_session() {
    let runtime = Runtime::new();
    let link = runtime.transport_link();
    let (transport, calls) = ChannelTransport::pair();
    let worker = runtime
        .spawn(MonitorConfig::default(), transport, RecordingSink::new())
        .unwrap();

    worker.handle().connect("broker.test", 1883);
    next_call(&calls);
    link.connack(AttemptId(1), Ok(()));
    next_call(&calls);

    worker.shutdown().unwrap();
    assert_eq!(next_call(&calls), TransportCall::Disconnect(AttemptId(1)));
}

#[test]
fn stale_ack_after_disconnect_is_discarded() {
    let runtime = Runtime::new();
    let link = runtime.transport_link();
    let (transport, calls) = ChannelTransport::pair();
    let worker = runtime
        .spawn(MonitorConfig::default(), transport, RecordingSink::new())
        .unwrap();
    let handle = worker.handle();

    handle.connect("broker.test", 1883);
    next_call(&calls);
    handle.disconnect();
    assert_eq!(next_call(&calls), TransportCall::Disconnect(AttemptId(1)));
    link.connack(AttemptId(1), Ok(()));

    let report = worker.shutdown().unwrap();
    assert_eq!(report.service.stats().stale_results, 1);
    assert!(
        !report
            .sink
            .states()
            .contains(&&SessionState::Connected { subscribed: false })
    );
}

#[test]
fn link_loss_triggers_timed_reconnect() {
    let config = MonitorConfig {
        reconnect: ReconnectPolicy {
            enabled: true,
            initial_delay_ms: 20,
            max_delay_ms: 100,
            max_attempts: 0,
        },
        ..MonitorConfig::default()
    };
    let runtime = Runtime::new();
    let link = runtime.transport_link();
    let (transport, calls) = ChannelTransport::pair();
    let worker = runtime
        .spawn(config, transport, RecordingSink::new())
        .unwrap();

    worker.handle().connect("broker.test", 1883);
    next_call(&calls);
    link.connack(AttemptId(1), Ok(()));
    next_call(&calls);
    link.suback(AttemptId(1), Ok(()));
    link.deliver(AttemptId(1), &format!("{BASE}gas"), b"900");

    link.connection_lost(
        AttemptId(1),
        TransportError::ConnectionLost("broker restarted".into()),
    );
    assert_eq!(
        next_call(&calls),
        TransportCall::Connect(AttemptId(2), Endpoint::new("broker.test", 1883))
    );

    link.connack(AttemptId(2), Ok(()));
    next_call(&calls);
    link.suback(AttemptId(2), Ok(()));
    link.deliver(AttemptId(2), &format!("{BASE}gas"), b"900");

    let report = worker.shutdown().unwrap();
    assert_eq!(report.sink.alerts().len(), 2, "latch reset across reconnect");
    assert_eq!(report.service.stats().connection_losses, 1);
    assert!(report.sink.events.iter().any(|e| matches!(
        e,
        SessionEvent::StateChanged {
            to: SessionState::Disconnected(DisconnectCause::Lost(_)),
            ..
        }
    )));
}

#[test]
fn disconnect_before_reconnect_timer_fires_cancels_it() {
    let config = MonitorConfig {
        reconnect: ReconnectPolicy {
            enabled: true,
            initial_delay_ms: 200,
            max_delay_ms: 200,
            max_attempts: 0,
        },
        ..MonitorConfig::default()
    };
    let runtime = Runtime::new();
    let link = runtime.transport_link();
    let (transport, calls) = ChannelTransport::pair();
    let worker = runtime
        .spawn(config, transport, RecordingSink::new())
        .unwrap();
    let handle = worker.handle();

    handle.connect("broker.test", 1883);
    next_call(&calls);
    link.connack(AttemptId(1), Ok(()));
    next_call(&calls);
    link.connection_lost(AttemptId(1), TransportError::Timeout);
    handle.disconnect();

    // Outlast the backoff; no reconnect may reach the transport.
    assert!(calls.recv_timeout(Duration::from_millis(500)).is_err());

    let report = worker.shutdown().unwrap();
    assert_eq!(report.service.stats().connect_attempts, 1);
}
