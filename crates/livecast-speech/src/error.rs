//! Speech rendering errors.

use thiserror::Error;

/// Why a task could not be spoken.
#[derive(Debug, Error)]
pub enum SpeechError {
    /// The task's voice index is outside the voice table.
    #[error("voice index {index} out of range ({available} voices configured)")]
    UnknownVoice {
        /// Requested index.
        index: usize,
        /// Size of the voice table.
        available: usize,
    },
    /// Every synthesis attempt failed.
    #[error("synthesis failed after {attempts} attempt(s): {message}")]
    Synthesis {
        /// Attempts made.
        attempts: u32,
        /// Last failure.
        message: String,
    },
    /// The player failed.
    #[error("playback failed: {0}")]
    Playback(String),
    /// Scratch directory could not be prepared.
    #[error("audio scratch directory: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_voice_display() {
        let err = SpeechError::UnknownVoice {
            index: 9,
            available: 6,
        };
        assert_eq!(err.to_string(), "voice index 9 out of range (6 voices configured)");
    }

    #[test]
    fn synthesis_display() {
        let err = SpeechError::Synthesis {
            attempts: 3,
            message: "no audio written".into(),
        };
        assert_eq!(
            err.to_string(),
            "synthesis failed after 3 attempt(s): no audio written"
        );
    }
}
