//! Fuzz target: inbound message pipeline (Router → Classifier → Latch)
//!
//! Splits the input into `(topic suffix, payload)` pairs and feeds them
//! through a connected, subscribed `SessionService`.
//!
//! Invariants checked:
//! - No panics under any byte sequence
//! - An alert is only emitted when its kind was not already latched
//! - Light never latches
//!
//! cargo fuzz run fuzz_message_pipeline

#![no_main]

use homeguard::app::events::SessionEvent;
use homeguard::app::ports::{EventSink, InboundMessage, TransportEvent, TransportPort};
use homeguard::app::service::SessionService;
use homeguard::config::MonitorConfig;
use homeguard::sensors::SensorKind;
use homeguard::session::{AttemptId, Endpoint};
use libfuzzer_sys::fuzz_target;

struct NullTransport;

impl TransportPort for NullTransport {
    fn connect(&mut self, _attempt: AttemptId, _endpoint: &Endpoint) {}
    fn subscribe(&mut self, _attempt: AttemptId, _filter: &str) {}
    fn disconnect(&mut self, _attempt: AttemptId) {}
}

#[derive(Default)]
struct Alerts(Vec<SensorKind>);

impl EventSink for Alerts {
    fn emit(&mut self, event: &SessionEvent) {
        if let SessionEvent::Alert(alert) = event {
            self.0.push(alert.kind);
        }
    }
}

fuzz_target!(|data: &[u8]| {
    let mut svc = SessionService::new(MonitorConfig::default());
    let mut transport = NullTransport;
    let mut sink = Alerts::default();

    let Ok(attempt) = svc.connect(Endpoint::new("fuzz", 1883), &mut transport, &mut sink) else {
        return;
    };
    for event in [
        TransportEvent::ConnAck { attempt, result: Ok(()) },
        TransportEvent::SubAck { attempt, result: Ok(()) },
    ] {
        svc.handle_transport(event, &mut transport, &mut sink);
    }

    // Records are `len, suffix..., payload...` with the suffix length
    // taken modulo the remaining input.
    let mut rest = data;
    while let Some((&len, tail)) = rest.split_first() {
        let split = usize::from(len) % (tail.len() + 1);
        let (suffix, after) = tail.split_at(split);
        let payload_len = after.len().min(16);
        let (payload, next) = after.split_at(payload_len);
        rest = next;

        let topic = format!(
            "smarthome/security/sensors/{}",
            String::from_utf8_lossy(suffix)
        );
        let message = InboundMessage::new(topic, payload);

        let before = *svc.latch();
        sink.0.clear();
        svc.handle_transport(
            TransportEvent::Message { attempt, message },
            &mut transport,
            &mut sink,
        );

        for kind in &sink.0 {
            assert!(!before.is_latched(*kind), "alert for an already latched {kind}");
            assert!(svc.latch().is_latched(*kind));
        }
        assert!(!svc.latch().is_latched(SensorKind::Light));
    }
});
