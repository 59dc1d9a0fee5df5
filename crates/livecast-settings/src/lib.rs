//! # livecast-settings
//!
//! Configuration with layered sources. In priority order:
//! 1. **Compiled defaults**: [`LivecastSettings::default()`]
//! 2. **User file**: `~/.livecast/settings.json`, deep-merged over defaults
//! 3. **Environment variables**: `LIVECAST_*` overrides (highest priority)

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path, validate};
pub use types::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_match_observed_behaviour() {
        let settings = LivecastSettings::default();
        assert_eq!(settings.connection.liveness_timeout_ms, 10_000);
        assert_eq!(settings.connection.reconnect_delay_ms, 1000);
        assert!(settings.connection.max_reconnect_attempts.is_none());
        assert_eq!(settings.pipeline.capacity, 100);
        assert_eq!(settings.pipeline.enqueue_timeout_ms, 1000);
        assert_eq!(settings.speech.voices.len(), 6);
        assert_eq!(settings.session.live_url, "https://live.douyin.com/");
        assert!(settings.signer.command.is_none());
        assert_eq!(settings.logging.level, "info");
    }
}
