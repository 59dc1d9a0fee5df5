//! Speech rendering.
//!
//! [`CommandRenderer`] synthesises audio with an external TTS program into
//! a scratch file, plays it with an external player, and removes the file
//! whatever the outcome.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use livecast_core::RenderTask;
use livecast_settings::SpeechSettings;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::SpeechError;

/// Turns a task into audible speech.
///
/// Called from the pipeline worker only, one task at a time. Implementations
/// may block for as long as playback takes.
#[async_trait]
pub trait SpeechRenderer: Send + Sync {
    /// Synthesise and play `task`.
    async fn render_and_play(&self, task: &RenderTask) -> Result<(), SpeechError>;
}

/// Renderer that shells out to a TTS program and an audio player.
#[derive(Clone, Debug)]
pub struct CommandRenderer {
    voices: Vec<String>,
    tts: Vec<String>,
    player: Vec<String>,
    proxy: Option<String>,
    max_retries: u32,
    retry_delay: Duration,
    output_dir: PathBuf,
}

impl CommandRenderer {
    /// Renderer configured from settings.
    pub fn new(settings: &SpeechSettings) -> Self {
        Self {
            voices: settings.voices.clone(),
            tts: settings.tts_command.clone(),
            player: settings.player_command.clone(),
            proxy: settings.proxy.clone(),
            max_retries: settings.max_retries.max(1),
            retry_delay: settings.retry_delay(),
            output_dir: settings.output_path(),
        }
    }

    fn voice(&self, index: usize) -> Result<&str, SpeechError> {
        self.voices
            .get(index)
            .map(String::as_str)
            .ok_or(SpeechError::UnknownVoice {
                index,
                available: self.voices.len(),
            })
    }

    async fn synthesise(&self, text: &str, voice: &str, out: &Path) -> Result<(), SpeechError> {
        let Some((program, leading)) = self.tts.split_first() else {
            return Err(SpeechError::Synthesis {
                attempts: 0,
                message: "no synthesis command configured".into(),
            });
        };
        let out_arg = out.to_string_lossy();
        let mut args: Vec<&str> = leading.iter().map(String::as_str).collect();
        args.extend([
            "--voice",
            voice,
            "--text",
            text,
            "--write-media",
            out_arg.as_ref(),
        ]);
        if let Some(proxy) = &self.proxy {
            args.extend(["--proxy", proxy.as_str()]);
        }

        let mut last_error = String::new();
        for attempt in 1..=self.max_retries {
            match run(program, &args).await {
                Ok(()) if tokio::fs::try_exists(out).await.unwrap_or(false) => return Ok(()),
                Ok(()) => last_error = format!("no audio written to {}", out.display()),
                Err(e) => last_error = e,
            }
            warn!(attempt, max = self.max_retries, error = %last_error, "synthesis attempt failed");
            if attempt < self.max_retries {
                tokio::time::sleep(self.retry_delay).await;
            }
        }
        Err(SpeechError::Synthesis {
            attempts: self.max_retries,
            message: last_error,
        })
    }

    async fn play(&self, file: &Path) -> Result<(), SpeechError> {
        let Some((program, args)) = self.player.split_first() else {
            return Err(SpeechError::Playback("no player configured".into()));
        };
        let file_arg = file.to_string_lossy();
        let mut argv: Vec<&str> = args.iter().map(String::as_str).collect();
        argv.push(file_arg.as_ref());
        run(program, &argv).await.map_err(SpeechError::Playback)
    }
}

#[async_trait]
impl SpeechRenderer for CommandRenderer {
    async fn render_and_play(&self, task: &RenderTask) -> Result<(), SpeechError> {
        let voice = self.voice(task.voice_index)?;
        tokio::fs::create_dir_all(&self.output_dir).await?;
        let audio = ScratchFile(
            self.output_dir
                .join(format!("speech_{}.mp3", Uuid::now_v7())),
        );

        self.synthesise(&task.text, voice, &audio.0).await?;
        self.play(&audio.0).await?;
        info!(voice, text = %task.text, "speech played");
        Ok(())
    }
}

/// Removes the audio file when dropped.
struct ScratchFile(PathBuf);

impl Drop for ScratchFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.0) {
            Ok(()) => debug!(path = %self.0.display(), "removed audio file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.0.display(), error = %e, "failed to remove audio file"),
        }
    }
}

async fn run(program: &str, args: &[&str]) -> Result<(), String> {
    let output = tokio::process::Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| format!("failed to run {program}: {e}"))?;
    if output.status.success() {
        Ok(())
    } else {
        Err(format!(
            "{program} exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        ))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    /// Fake TTS: writes "audio <voice> <text>" to the --write-media path.
    /// Fails (writes nothing) until `fail_first` attempts have been made.
    fn fake_tts(dir: &Path, fail_first: u32) -> Vec<String> {
        let path = dir.join("fake-tts");
        let counter = dir.join("attempts");
        let script = format!(
            r#"#!/bin/sh
echo x >> "{counter}"
n=$(wc -l < "{counter}" | tr -d ' ')
while [ $# -gt 0 ]; do
  case "$1" in
    --voice) voice="$2"; shift ;;
    --text) text="$2"; shift ;;
    --write-media) out="$2"; shift ;;
  esac
  shift
done
if [ "$n" -le {fail_first} ]; then exit 0; fi
echo "audio $voice $text" > "$out"
"#,
            counter = counter.display(),
        );
        std::fs::write(&path, script).unwrap();
        vec!["sh".into(), path.to_string_lossy().into_owned()]
    }

    fn attempts(dir: &Path) -> usize {
        std::fs::read_to_string(dir.join("attempts"))
            .map(|s| s.lines().count())
            .unwrap_or(0)
    }

    fn renderer(dir: &Path, tts: Vec<String>, player: Vec<String>) -> CommandRenderer {
        CommandRenderer::new(&SpeechSettings {
            tts_command: tts,
            player_command: player,
            max_retries: 3,
            retry_delay_ms: 0,
            output_dir: dir.join("out").to_string_lossy().into_owned(),
            ..SpeechSettings::default()
        })
    }

    fn logging_player(log: &Path) -> Vec<String> {
        vec![
            "sh".into(),
            "-c".into(),
            format!("cat \"$0\" >> \"{}\"", log.display()),
        ]
    }

    fn leftover_files(dir: &Path) -> usize {
        std::fs::read_dir(dir.join("out"))
            .map(|entries| entries.count())
            .unwrap_or(0)
    }

    #[tokio::test]
    async fn renders_plays_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("played");
        let r = renderer(dir.path(), fake_tts(dir.path(), 0), logging_player(&log));

        r.render_and_play(&RenderTask::new("你好", 3)).await.unwrap();

        let played = std::fs::read_to_string(&log).unwrap();
        assert_eq!(played.trim(), "audio zh-CN-YunxiNeural 你好");
        assert_eq!(attempts(dir.path()), 1);
        assert_eq!(leftover_files(dir.path()), 0);
    }

    #[tokio::test]
    async fn retries_until_audio_appears() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("played");
        let r = renderer(dir.path(), fake_tts(dir.path(), 2), logging_player(&log));

        r.render_and_play(&RenderTask::new("hi", 0)).await.unwrap();
        assert_eq!(attempts(dir.path()), 3);
        assert!(std::fs::read_to_string(&log).unwrap().contains("hi"));
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("played");
        let r = renderer(dir.path(), fake_tts(dir.path(), 10), logging_player(&log));

        let err = r.render_and_play(&RenderTask::new("hi", 0)).await.unwrap_err();
        assert_matches!(err, SpeechError::Synthesis { attempts: 3, .. });
        assert_eq!(attempts(dir.path()), 3);
        assert!(!log.exists());
    }

    #[tokio::test]
    async fn unknown_voice_is_rejected_before_synthesis() {
        let dir = tempfile::tempdir().unwrap();
        let r = renderer(dir.path(), fake_tts(dir.path(), 0), vec!["true".into()]);

        let err = r.render_and_play(&RenderTask::new("hi", 6)).await.unwrap_err();
        assert_matches!(err, SpeechError::UnknownVoice { index: 6, available: 6 });
        assert_eq!(attempts(dir.path()), 0);
    }

    #[tokio::test]
    async fn player_failure_still_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let r = renderer(
            dir.path(),
            fake_tts(dir.path(), 0),
            vec!["sh".into(), "-c".into(), "exit 1".into()],
        );

        let err = r.render_and_play(&RenderTask::new("hi", 0)).await.unwrap_err();
        assert_matches!(err, SpeechError::Playback(_));
        assert_eq!(leftover_files(dir.path()), 0);
    }

    #[tokio::test]
    async fn missing_tts_program_is_a_synthesis_failure() {
        let dir = tempfile::tempdir().unwrap();
        let r = renderer(
            dir.path(),
            vec!["/nonexistent/edge-tts".into()],
            vec!["true".into()],
        );
        let err = r.render_and_play(&RenderTask::new("hi", 0)).await.unwrap_err();
        assert_matches!(err, SpeechError::Synthesis { message, .. } if message.contains("failed to run"));
    }
}
