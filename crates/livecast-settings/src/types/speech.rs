//! Speech synthesis and playback settings.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Voice table, indexed by [`livecast_core::RenderTask::voice_index`].
pub const DEFAULT_VOICES: [&str; 6] = [
    "zh-CN-XiaoxiaoNeural",
    "zh-CN-XiaoyiNeural",
    "zh-CN-YunjianNeural",
    "zh-CN-YunxiNeural",
    "zh-CN-YunxiaNeural",
    "zh-CN-YunyangNeural",
];

/// How announcements are voiced and played.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpeechSettings {
    /// Voice names, in index order.
    pub voices: Vec<String>,
    /// Voice for chat messages.
    pub chat_voice: usize,
    /// Voice for gift thanks.
    pub gift_voice: usize,
    /// Voice for follow thanks.
    pub follow_voice: usize,
    /// Voice for welcomes. `None` picks a random voice per announcement.
    pub welcome_voice: Option<usize>,
    /// Synthesis program and leading arguments, invoked as
    /// `<tts...> --voice V --text T --write-media FILE [--proxy P]`.
    pub tts_command: Vec<String>,
    /// Player program and arguments. The audio file is appended.
    pub player_command: Vec<String>,
    /// Optional HTTP proxy handed to the synthesis program.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
    /// Synthesis attempts per announcement.
    pub max_retries: u32,
    /// Pause between synthesis attempts.
    pub retry_delay_ms: u64,
    /// Scratch directory for synthesised audio.
    pub output_dir: String,
}

impl SpeechSettings {
    /// Pause between synthesis attempts.
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Scratch directory as a path.
    pub fn output_path(&self) -> PathBuf {
        PathBuf::from(&self.output_dir)
    }
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            voices: DEFAULT_VOICES.iter().map(|v| (*v).to_string()).collect(),
            chat_voice: 0,
            gift_voice: 1,
            follow_voice: 3,
            welcome_voice: None,
            tts_command: vec!["edge-tts".to_string()],
            player_command: ["ffplay", "-nodisp", "-autoexit", "-loglevel", "quiet"]
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            proxy: None,
            max_retries: 3,
            retry_delay_ms: 1000,
            output_dir: std::env::temp_dir()
                .join("livecast")
                .to_string_lossy()
                .into_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_voice_indices_are_in_range() {
        let settings = SpeechSettings::default();
        assert!(settings.chat_voice < settings.voices.len());
        assert!(settings.gift_voice < settings.voices.len());
        assert!(settings.follow_voice < settings.voices.len());
        assert!(settings.welcome_voice.is_none());
    }

    #[test]
    fn player_command_override_replaces_array() {
        let settings: SpeechSettings =
            serde_json::from_str(r#"{"playerCommand": ["afplay"]}"#).unwrap();
        assert_eq!(settings.player_command, vec!["afplay".to_string()]);
        assert_eq!(settings.tts_command, vec!["edge-tts".to_string()]);
    }
}
