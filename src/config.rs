//! Monitor configuration parameters
//!
//! All tunable parameters for the alerting core.
//! Values can be overridden from a JSON file; missing fields keep their
//! defaults.

use core::fmt;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Core monitor configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    // --- Broker ---
    /// Broker host name
    pub broker_host: String,
    /// Broker TCP port
    pub broker_port: u16,

    // --- Topics ---
    /// Base path shared by every sensor topic; must end in `/`
    pub base_topic: String,
    /// Subscribe to `<base_topic>#` as soon as the session is connected
    pub auto_subscribe: bool,

    // --- Alerting ---
    /// Also forward "alert cleared" edges to the notifier
    pub notify_on_clear: bool,

    // --- Link recovery ---
    pub reconnect: ReconnectPolicy,
}

/// Auto-reconnect after an unexpected transport loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectPolicy {
    pub enabled: bool,
    /// Delay before the first attempt (milliseconds)
    pub initial_delay_ms: u64,
    /// Backoff cap (milliseconds)
    pub max_delay_ms: u64,
    /// Attempts before giving up; 0 = unlimited
    pub max_attempts: u32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            // Public unauthenticated broker
            broker_host: "broker.hivemq.com".to_owned(),
            broker_port: 1883,

            base_topic: "smarthome/security/sensors/".to_owned(),
            auto_subscribe: true,

            notify_on_clear: false,

            reconnect: ReconnectPolicy::default(),
        }
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            initial_delay_ms: 1_000,
            max_delay_ms: 30_000,
            max_attempts: 5,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before reconnect attempt number `attempt` (1-based).
    /// Doubles per attempt, capped at `max_delay_ms`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        let ms = self
            .initial_delay_ms
            .saturating_mul(1u64 << shift)
            .min(self.max_delay_ms);
        Duration::from_millis(ms)
    }

    /// Whether attempt number `attempt` (1-based) is still allowed.
    pub fn allows(&self, attempt: u32) -> bool {
        self.enabled && (self.max_attempts == 0 || attempt <= self.max_attempts)
    }
}

impl MonitorConfig {
    /// Topic filter covering every sensor under the base path.
    pub fn subscription_filter(&self) -> String {
        format!("{}#", self.base_topic)
    }

    /// Reject values that would leave the session unusable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.broker_host.trim().is_empty() {
            return Err(ConfigError::ValidationFailed("broker_host must not be empty"));
        }
        if self.broker_port == 0 {
            return Err(ConfigError::ValidationFailed("broker_port must be non-zero"));
        }
        if self.base_topic.contains(['#', '+']) {
            return Err(ConfigError::ValidationFailed(
                "base_topic must not contain wildcards",
            ));
        }
        if !self.base_topic.ends_with('/') {
            return Err(ConfigError::ValidationFailed("base_topic must end with '/'"));
        }
        let r = &self.reconnect;
        if r.enabled && r.initial_delay_ms == 0 {
            return Err(ConfigError::ValidationFailed(
                "reconnect.initial_delay_ms must be non-zero",
            ));
        }
        if r.max_delay_ms < r.initial_delay_ms {
            return Err(ConfigError::ValidationFailed(
                "reconnect.max_delay_ms below initial_delay_ms",
            ));
        }
        Ok(())
    }

    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_json_str(&text)
    }
}

/// Errors from loading or validating a [`MonitorConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// File could not be read.
    Io(String),
    /// File is not valid JSON for this schema.
    Parse(String),
    /// A field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(msg) => write!(f, "I/O error: {}", msg),
            Self::Parse(msg) => write!(f, "parse error: {}", msg),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}
