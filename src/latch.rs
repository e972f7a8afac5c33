//! Alert latch.
//!
//! Turns a stream of hazard classifications into alert edges, so the user
//! is notified once per onset of a dangerous condition rather than once per
//! reading.
//!
//! ## Latch lifecycle
//!
//! 1. A `Critical` reading arrives for a kind whose latch is clear.
//! 2. The latch is set and an onset [`AlertEvent`] is emitted.
//! 3. Further `Critical` readings emit nothing while the latch holds.
//! 4. Any non-`Critical` reading clears the latch.  A cleared event is
//!    only emitted when the latch was built with `report_cleared`.
//! 5. The owning session resets every latch when it disconnects.
//!
//! Light has no `Critical` zone and therefore no latch slot.

use log::{error, info};

use crate::sensors::{SensorKind, Severity};

// ---------------------------------------------------------------------------
// Latch state
// ---------------------------------------------------------------------------

/// One flag per hazard sensor.  `true` iff the most recent classification
/// for that kind was `Critical`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LatchState {
    flags: [bool; 3],
}

impl LatchState {
    const fn slot(kind: SensorKind) -> Option<usize> {
        match kind {
            SensorKind::Flame => Some(0),
            SensorKind::Gas => Some(1),
            SensorKind::Water => Some(2),
            SensorKind::Light => None,
        }
    }

    pub fn is_latched(&self, kind: SensorKind) -> bool {
        Self::slot(kind).is_some_and(|i| self.flags[i])
    }

    /// True if **any** hazard is currently latched.
    pub fn any(&self) -> bool {
        self.flags.iter().any(|f| *f)
    }

    /// Clear every latch.
    pub fn reset(&mut self) {
        self.flags = [false; 3];
    }
}

// ---------------------------------------------------------------------------
// Edges and alert payloads
// ---------------------------------------------------------------------------

/// Transition of the `severity == Critical` predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Raised,
    Cleared,
}

/// Payload handed to the notifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertEvent {
    pub kind: SensorKind,
    /// `true` for an onset, `false` for a cleared condition.
    pub onset: bool,
    pub title: &'static str,
    pub body: &'static str,
    /// Stable per kind so the notifier can replace earlier alerts.
    pub alert_id: u32,
}

struct AlertText {
    alert_id: u32,
    title: &'static str,
    body: &'static str,
    cleared_title: &'static str,
    cleared_body: &'static str,
}

const fn alert_text(kind: SensorKind) -> Option<AlertText> {
    match kind {
        SensorKind::Flame => Some(AlertText {
            alert_id: 1,
            title: "\u{1F525} FIRE DETECTED!",
            body: "Flame sensor detected fire! Check your home immediately!",
            cleared_title: "Fire alert cleared",
            cleared_body: "Flame sensor reading is no longer critical.",
        }),
        SensorKind::Gas => Some(AlertText {
            alert_id: 2,
            title: "\u{1F4A8} GAS LEAK DETECTED!",
            body: "Dangerous gas levels detected! Evacuate and ventilate immediately!",
            cleared_title: "Gas alert cleared",
            cleared_body: "Gas sensor reading is no longer critical.",
        }),
        SensorKind::Water => Some(AlertText {
            alert_id: 3,
            title: "\u{1F4A7} WATER LEAK DETECTED!",
            body: "Water leak detected! Check for flooding immediately!",
            cleared_title: "Water alert cleared",
            cleared_body: "Water sensor reading is no longer critical.",
        }),
        SensorKind::Light => None,
    }
}

impl AlertEvent {
    /// Build the alert for `kind` and `edge`.  `None` for kinds without a
    /// hazard zone.
    pub fn for_edge(kind: SensorKind, edge: Edge) -> Option<Self> {
        let text = alert_text(kind)?;
        let (onset, title, body) = match edge {
            Edge::Raised => (true, text.title, text.body),
            Edge::Cleared => (false, text.cleared_title, text.cleared_body),
        };
        Some(Self {
            kind,
            onset,
            title,
            body,
            alert_id: text.alert_id,
        })
    }
}

/// Fixed notifier id for a hazard kind.
pub fn alert_id(kind: SensorKind) -> Option<u32> {
    alert_text(kind).map(|t| t.alert_id)
}

// ---------------------------------------------------------------------------
// Alert latch
// ---------------------------------------------------------------------------

/// Edge detector over `severity == Critical`, one latch per hazard kind.
#[derive(Debug, Default)]
pub struct AlertLatch {
    state: LatchState,
    report_cleared: bool,
}

impl AlertLatch {
    pub fn new(report_cleared: bool) -> Self {
        Self {
            state: LatchState::default(),
            report_cleared,
        }
    }

    /// Feed one hazard classification.  Returns the alert to forward, if
    /// any.  Light readings are ignored.
    pub fn update(&mut self, kind: SensorKind, severity: Severity) -> Option<AlertEvent> {
        match self.edge(kind, severity.is_critical())? {
            Edge::Raised => AlertEvent::for_edge(kind, Edge::Raised),
            Edge::Cleared if self.report_cleared => AlertEvent::for_edge(kind, Edge::Cleared),
            Edge::Cleared => None,
        }
    }

    /// Set or clear the latch for `kind` and report which edge, if any,
    /// was crossed.
    pub fn edge(&mut self, kind: SensorKind, critical: bool) -> Option<Edge> {
        let slot = LatchState::slot(kind)?;
        let was = self.state.flags[slot];
        self.state.flags[slot] = critical;
        match (was, critical) {
            (false, true) => {
                error!("ALERT LATCHED: {kind}");
                Some(Edge::Raised)
            }
            (true, false) => {
                info!("ALERT CLEARED: {kind}");
                Some(Edge::Cleared)
            }
            _ => None,
        }
    }

    pub fn state(&self) -> &LatchState {
        &self.state
    }

    pub fn reset(&mut self) {
        self.state.reset();
    }
}
