//! Session diagnostics.
//!
//! Counters kept by the session service and reported by the binary on
//! shutdown.  Reset never happens implicitly; a reconnect keeps counting.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    /// Handshakes started (explicit and automatic).
    pub connect_attempts: u32,
    /// Unexpected transport losses while connected.
    pub connection_losses: u32,
    /// Messages that reached the router.
    pub messages: u64,
    /// Alerts forwarded to the notifier (onsets and, if enabled, clears).
    pub alerts: u64,
    /// Payloads that were not integers.
    pub decode_errors: u64,
    /// Topics matching no sensor.
    pub unrouted: u64,
    /// Transport results discarded because the session had moved on.
    pub stale_results: u64,
    /// Messages received without an active subscription.
    pub dropped: u64,
}

impl SessionStats {
    /// Fraction of routed messages that failed to decode.
    pub fn decode_error_ratio(&self) -> f64 {
        let routed = self.messages.saturating_sub(self.unrouted);
        if routed == 0 {
            return 0.0;
        }
        self.decode_errors as f64 / routed as f64
    }
}
