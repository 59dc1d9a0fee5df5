//! Settings loading with deep merge, environment overrides and validation.
//!
//! Loading flow:
//! 1. Start with compiled [`LivecastSettings::default()`]
//! 2. If the settings file exists, deep-merge user values over defaults
//! 3. Apply `LIVECAST_*` environment variable overrides
//! 4. Validate cross-field constraints
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::{Result, SettingsError};
use crate::types::{LivecastSettings, MIN_RECONNECT_DELAY_MS};

/// Resolve the path to the settings file (`~/.livecast/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".livecast").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<LivecastSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults. Invalid JSON or out-of-range values are
/// errors.
pub fn load_settings_from_path(path: &Path) -> Result<LivecastSettings> {
    let defaults = serde_json::to_value(LivecastSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: LivecastSettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings);
    settings.connection.max_reconnect_attempts = settings.connection.reconnect_limit();
    validate(&settings)?;
    Ok(settings)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply environment variable overrides to loaded settings.
///
/// Invalid values are logged and ignored.
pub fn apply_env_overrides(settings: &mut LivecastSettings) {
    // ── Connection ──────────────────────────────────────────────────
    if let Some(v) = read_env_u64("LIVECAST_LIVENESS_TIMEOUT_MS", 100, 600_000) {
        settings.connection.liveness_timeout_ms = v;
    }
    if let Some(v) = read_env_u64("LIVECAST_RECONNECT_DELAY_MS", MIN_RECONNECT_DELAY_MS, 600_000)
    {
        settings.connection.reconnect_delay_ms = v;
    }
    if let Some(v) = read_env_u64("LIVECAST_MAX_RECONNECT_ATTEMPTS", 0, u64::from(u32::MAX)) {
        // 0 means unbounded.
        settings.connection.max_reconnect_attempts = u32::try_from(v).ok();
    }

    // ── Pipeline ────────────────────────────────────────────────────
    if let Some(v) = read_env_usize("LIVECAST_QUEUE_CAPACITY", 1, 100_000) {
        settings.pipeline.capacity = v;
    }

    // ── Session / signer ────────────────────────────────────────────
    if let Some(v) = read_env_string("LIVECAST_USER_AGENT") {
        settings.session.user_agent = v;
    }
    if let Some(v) = read_env_string("LIVECAST_SIGNER_COMMAND") {
        let argv = split_command(&v);
        if !argv.is_empty() {
            settings.signer.command = Some(argv);
        }
    }

    // ── Speech ──────────────────────────────────────────────────────
    if let Some(v) = read_env_string("LIVECAST_TTS_PROXY") {
        settings.speech.proxy = Some(v);
    }

    // ── Features ────────────────────────────────────────────────────
    if let Some(v) = read_env_bool("LIVECAST_SPEAK_CHAT") {
        settings.features.chat = v;
    }
    if let Some(v) = read_env_bool("LIVECAST_SPEAK_GIFT") {
        settings.features.gift = v;
    }
    if let Some(v) = read_env_bool("LIVECAST_SPEAK_FOLLOW") {
        settings.features.follow = v;
    }
    if let Some(v) = read_env_bool("LIVECAST_SPEAK_WELCOME") {
        settings.features.welcome = v;
    }

    // ── Logging ─────────────────────────────────────────────────────
    if let Some(v) = read_env_string("LIVECAST_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = read_env_string("LIVECAST_LOG_FILE") {
        settings.logging.file = Some(v);
    }
}

/// Reject settings the runtime cannot honour.
pub fn validate(settings: &LivecastSettings) -> Result<()> {
    if settings.pipeline.capacity == 0 {
        return Err(SettingsError::InvalidValue(
            "pipeline.capacity must be at least 1".into(),
        ));
    }
    let speech = &settings.speech;
    if speech.voices.is_empty() {
        return Err(SettingsError::InvalidValue(
            "speech.voices must not be empty".into(),
        ));
    }
    let voices = speech.voices.len();
    let indices = [
        ("chatVoice", Some(speech.chat_voice)),
        ("giftVoice", Some(speech.gift_voice)),
        ("followVoice", Some(speech.follow_voice)),
        ("welcomeVoice", speech.welcome_voice),
    ];
    for (name, index) in indices {
        if let Some(index) = index.filter(|i| *i >= voices) {
            return Err(SettingsError::InvalidValue(format!(
                "speech.{name} = {index} is out of range for {voices} voices"
            )));
        }
    }
    if speech.tts_command.is_empty() {
        return Err(SettingsError::InvalidValue(
            "speech.ttsCommand must name a program".into(),
        ));
    }
    if speech.player_command.is_empty() {
        return Err(SettingsError::InvalidValue(
            "speech.playerCommand must name a program".into(),
        ));
    }
    if settings
        .signer
        .command
        .as_ref()
        .is_some_and(std::vec::Vec::is_empty)
    {
        return Err(SettingsError::InvalidValue(
            "signer.command must name a program".into(),
        ));
    }
    Ok(())
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `usize` within a range.
pub fn parse_usize_range(val: &str, min: usize, max: usize) -> Option<usize> {
    let n: usize = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Split a command line on whitespace.
pub fn split_command(val: &str) -> Vec<String> {
    val.split_whitespace().map(str::to_string).collect()
}

// ── Env var readers (thin wrappers) ─────────────────────────────────────────

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn read_env_bool(name: &str) -> Option<bool> {
    let val = std::env::var(name).ok()?;
    let result = parse_bool(&val);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid boolean env var, ignoring");
    }
    result
}

fn read_env_u64(name: &str, min: u64, max: u64) -> Option<u64> {
    let val = std::env::var(name).ok()?;
    let result = parse_u64_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid u64 env var, ignoring");
    }
    result
}

fn read_env_usize(name: &str, min: usize, max: usize) -> Option<usize> {
    let val = std::env::var(name).ok()?;
    let result = parse_usize_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid usize env var, ignoring");
    }
    result
}
