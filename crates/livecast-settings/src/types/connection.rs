//! Connection and pipeline settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Shortest allowed pause between two connection attempts.
pub const MIN_RECONNECT_DELAY_MS: u64 = 1000;

/// Watchdog and reconnect policy.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConnectionSettings {
    /// Silence on an open connection longer than this forces a reconnect.
    pub liveness_timeout_ms: u64,
    /// Fixed delay between connection attempts. Clamped to at least one second.
    pub reconnect_delay_ms: u64,
    /// Reconnects allowed in a row without a successful connection in
    /// between. `None` and `0` both retry forever, wherever they are set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_reconnect_attempts: Option<u32>,
    /// Upper bound on waiting for a close handshake.
    pub close_timeout_ms: u64,
}

impl ConnectionSettings {
    /// Watchdog timeout.
    pub fn liveness_timeout(&self) -> Duration {
        Duration::from_millis(self.liveness_timeout_ms.max(1))
    }

    /// Backoff between attempts, never below [`MIN_RECONNECT_DELAY_MS`].
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms.max(MIN_RECONNECT_DELAY_MS))
    }

    /// Reconnect cap with `0` read as unbounded.
    pub fn reconnect_limit(&self) -> Option<u32> {
        self.max_reconnect_attempts.filter(|n| *n > 0)
    }

    /// Close handshake bound.
    pub fn close_timeout(&self) -> Duration {
        Duration::from_millis(self.close_timeout_ms)
    }
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            liveness_timeout_ms: 10_000,
            reconnect_delay_ms: MIN_RECONNECT_DELAY_MS,
            max_reconnect_attempts: None,
            close_timeout_ms: 2000,
        }
    }
}

/// Bounded speech task queue.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PipelineSettings {
    /// Queue capacity.
    pub capacity: usize,
    /// How long a producer waits for space before dropping the task.
    pub enqueue_timeout_ms: u64,
    /// How long `stop` waits for the worker to finish its current task.
    pub shutdown_timeout_ms: u64,
}

impl PipelineSettings {
    /// Producer wait bound.
    pub fn enqueue_timeout(&self) -> Duration {
        Duration::from_millis(self.enqueue_timeout_ms)
    }

    /// Worker join bound.
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            capacity: 100,
            enqueue_timeout_ms: 1000,
            shutdown_timeout_ms: 5000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reconnect_delay_is_clamped() {
        let settings = ConnectionSettings {
            reconnect_delay_ms: 10,
            ..ConnectionSettings::default()
        };
        assert_eq!(settings.reconnect_delay(), Duration::from_secs(1));

        let settings = ConnectionSettings {
            reconnect_delay_ms: 2500,
            ..ConnectionSettings::default()
        };
        assert_eq!(settings.reconnect_delay(), Duration::from_millis(2500));
    }

    #[test]
    fn max_attempts_roundtrip() {
        let json = r#"{"maxReconnectAttempts": 3}"#;
        let settings: ConnectionSettings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.max_reconnect_attempts, Some(3));
        assert_eq!(settings.liveness_timeout_ms, 10_000);
    }

    #[test]
    fn zero_attempts_is_unbounded() {
        let zero = ConnectionSettings {
            max_reconnect_attempts: Some(0),
            ..ConnectionSettings::default()
        };
        assert_eq!(zero.reconnect_limit(), None);
        assert_eq!(ConnectionSettings::default().reconnect_limit(), None);

        let two = ConnectionSettings {
            max_reconnect_attempts: Some(2),
            ..ConnectionSettings::default()
        };
        assert_eq!(two.reconnect_limit(), Some(2));
    }

    #[test]
    fn pipeline_durations() {
        let settings = PipelineSettings::default();
        assert_eq!(settings.enqueue_timeout(), Duration::from_secs(1));
        assert_eq!(settings.shutdown_timeout(), Duration::from_secs(5));
    }
}
