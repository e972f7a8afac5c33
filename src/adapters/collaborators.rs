//! Fan-out sink for the user-facing collaborators.
//!
//! Alerts go to the [`Notifier`], display updates to the [`DisplayPort`],
//! and everything else to the log.  Unrouted topics are logged only; the
//! display never shows them.

use crate::app::events::SessionEvent;
use crate::app::ports::{DisplayPort, EventSink, Notifier};

use super::log_sink::LogEventSink;

pub struct CollaboratorSink<N, D> {
    notifier: N,
    display: D,
    log: LogEventSink,
}

impl<N: Notifier, D: DisplayPort> CollaboratorSink<N, D> {
    pub fn new(notifier: N, display: D) -> Self {
        Self {
            notifier,
            display,
            log: LogEventSink::new(),
        }
    }

    pub fn into_parts(self) -> (N, D) {
        (self.notifier, self.display)
    }
}

impl<N: Notifier, D: DisplayPort> EventSink for CollaboratorSink<N, D> {
    fn emit(&mut self, event: &SessionEvent) {
        match event {
            SessionEvent::Alert(alert) => self.notifier.notify(alert),
            SessionEvent::Display(update) => self.display.render(update),
            other => self.log.emit(other),
        }
    }
}
