//! Connection lifecycle states.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle state of the single live connection owned by a session.
///
/// ```text
/// Disconnected ──start──▶ Connecting ──ok──▶ Connected ──stream end──▶ Disconnected
///                             ▲  │fail           │ timeout / error
///                             │  ▼               ▼
///                             └─ Reconnecting ◀──┘
/// any ──stop──▶ Closed
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// No connection and none being attempted.
    #[default]
    Disconnected,
    /// Resolving session data and opening the socket.
    Connecting,
    /// Socket open and receiving frames.
    Connected,
    /// Waiting out the backoff before the next attempt.
    Reconnecting,
    /// Stopped by the control surface. Terminal.
    Closed,
}

impl ConnectionState {
    /// Short name for logging.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
            Self::Closed => "closed",
        }
    }

    /// Whether no further transitions will happen without a new `start`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Disconnected | Self::Closed)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
