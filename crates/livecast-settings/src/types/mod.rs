//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]` and `#[serde(default)]`
//! so a settings file only needs the keys it changes.

mod connection;
mod session;
mod speech;

pub use connection::*;
pub use session::*;
pub use speech::*;

use livecast_core::{SpeechFeature, SpeechToggles};
use serde::{Deserialize, Serialize};

/// Root settings type.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LivecastSettings {
    /// Connection lifecycle: watchdog and reconnect policy.
    pub connection: ConnectionSettings,
    /// Session resolution endpoints and client identity.
    pub session: SessionSettings,
    /// Bounded speech task queue.
    pub pipeline: PipelineSettings,
    /// Speech synthesis and playback.
    pub speech: SpeechSettings,
    /// External request signer.
    pub signer: SignerSettings,
    /// Initial speech feature toggles.
    pub features: FeatureSettings,
    /// Log output.
    pub logging: LoggingSettings,
}

/// Initial state of the four speech toggles.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FeatureSettings {
    /// Read chat aloud.
    pub chat: bool,
    /// Thank gifts.
    pub gift: bool,
    /// Thank follows.
    pub follow: bool,
    /// Welcome entering viewers.
    pub welcome: bool,
}

impl FeatureSettings {
    /// Copy these values onto live toggles.
    pub fn apply(&self, toggles: &SpeechToggles) {
        toggles.set(SpeechFeature::Chat, self.chat);
        toggles.set(SpeechFeature::Gift, self.gift);
        toggles.set(SpeechFeature::Follow, self.follow);
        toggles.set(SpeechFeature::Welcome, self.welcome);
    }
}

/// Log output settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default filter directive. `RUST_LOG` wins when set.
    pub level: String,
    /// Optional file that receives a copy of every log line.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}
