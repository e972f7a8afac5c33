//! Log-based adapters.
//!
//! Implements [`EventSink`], [`Notifier`] and [`DisplayPort`] by writing
//! one structured line per event through the `log` facade.  The binary
//! routes these to `tracing-subscriber`; tests can use them as no-op
//! collaborators.

use log::{error, info, warn};

use crate::app::events::{DisplayStatus, DisplayUpdate, SessionEvent};
use crate::app::ports::{DisplayPort, EventSink, Notifier};
use crate::latch::AlertEvent;

/// Adapter that logs every [`SessionEvent`].
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &SessionEvent) {
        match event {
            SessionEvent::StateChanged { from, to } => {
                info!("STATE | {} -> {}", from, to);
            }
            SessionEvent::Alert(alert) => log_alert(alert),
            SessionEvent::Display(update) => log_display(update),
            SessionEvent::Unrouted { topic } => {
                warn!("SENSOR | unknown topic '{}'", topic);
            }
            SessionEvent::Subscribed { filter } => {
                info!("SUB | '{}' acknowledged", filter);
            }
            SessionEvent::SubscribeFailed { filter, reason } => {
                warn!("SUB | '{}' failed: {}", filter, reason);
            }
            SessionEvent::RecoveryStopped { reason } => {
                warn!("STATE | link down, not reconnecting: {}", reason);
            }
            SessionEvent::CommandRejected { command, reason } => {
                warn!("CMD | {} rejected: {}", command, reason);
            }
        }
    }
}

fn log_alert(alert: &AlertEvent) {
    if alert.onset {
        error!(
            "ALERT | id={} kind={} | {} | {}",
            alert.alert_id, alert.kind, alert.title, alert.body
        );
    } else {
        info!(
            "ALERT | id={} kind={} cleared | {}",
            alert.alert_id, alert.kind, alert.body
        );
    }
}

fn log_display(update: &DisplayUpdate) {
    match update.status {
        DisplayStatus::Reading(severity) => {
            info!("SENSOR | {} = {} [{}]", update.kind, update.text, severity);
        }
        DisplayStatus::DecodeError => {
            warn!("SENSOR | {} = {}", update.kind, update.text);
        }
        DisplayStatus::Waiting => {
            info!("SENSOR | {} = {}", update.kind, update.text);
        }
    }
}

/// Notifier that only logs.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&mut self, alert: &AlertEvent) {
        log_alert(alert);
    }
}

/// Display that only logs.
#[derive(Debug, Default)]
pub struct LogDisplay;

impl DisplayPort for LogDisplay {
    fn render(&mut self, update: &DisplayUpdate) {
        log_display(update);
    }
}
