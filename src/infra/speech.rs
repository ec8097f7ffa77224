//! Text-to-speech through an external engine such as `espeak`.

use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{info, warn};

use crate::application::speech::{SpeechError, Speaker};
use crate::config::SpeechSettings;

/// Runs the configured program with its fixed arguments, writes the text to
/// its stdin, and waits for it to exit.
#[derive(Debug, Clone)]
pub struct CommandSpeaker {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandSpeaker {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn from_settings(settings: &SpeechSettings) -> Self {
        Self::new(settings.command.clone(), settings.args.clone())
    }

    fn program_name(&self) -> String {
        self.program.display().to_string()
    }

    fn input_error(&self, source: io::Error) -> SpeechError {
        warn!(
            target = "rxlens::speech",
            op = "speak",
            program = %self.program.display(),
            error = %source,
            "failed to talk to speech engine"
        );
        SpeechError::Input {
            program: self.program_name(),
            source,
        }
    }
}

#[async_trait]
impl Speaker for CommandSpeaker {
    async fn speak(&self, text: &str) -> Result<(), SpeechError> {
        let started = Instant::now();
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| {
                warn!(
                    target = "rxlens::speech",
                    op = "speak",
                    program = %self.program.display(),
                    error = %source,
                    "failed to launch speech engine"
                );
                SpeechError::Launch {
                    program: self.program_name(),
                    source,
                }
            })?;

        // Text goes through stdin so it is never read as an engine option.
        // An engine that exits without reading it closes the pipe early.
        if let Some(mut stdin) = child.stdin.take() {
            let written = match stdin.write_all(text.as_bytes()).await {
                Ok(()) => stdin.shutdown().await,
                Err(err) => Err(err),
            };
            match written {
                Ok(()) => {}
                Err(err) if err.kind() == io::ErrorKind::BrokenPipe => {}
                Err(source) => return Err(self.input_error(source)),
            }
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|source| self.input_error(source))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!(
                target = "rxlens::speech",
                op = "speak",
                program = %self.program.display(),
                exit_code = output.status.code().unwrap_or(-1),
                stderr = %stderr,
                "speech engine failed"
            );
            return Err(SpeechError::Failed {
                program: self.program_name(),
                status: output.status.to_string(),
                stderr,
            });
        }

        info!(
            target = "rxlens::speech",
            op = "speak",
            chars = text.chars().count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "text spoken"
        );
        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn successful_engine_returns_ok() {
        let speaker = CommandSpeaker::new("true", Vec::new());
        speaker.speak("hello").await.expect("speak");
    }

    #[tokio::test]
    async fn failing_engine_reports_status() {
        let speaker = CommandSpeaker::new("sh", vec!["-c".into(), "echo broken >&2; exit 3".into()]);
        let err = speaker.speak("ignored").await.expect_err("must fail");
        match err {
            SpeechError::Failed { stderr, .. } => assert_eq!(stderr, "broken"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn dash_prefixed_text_is_not_an_engine_option() {
        let dir = tempfile::tempdir().expect("tempdir");
        let target = dir.path().join("written");

        let speaker = CommandSpeaker::new("sort", Vec::new());
        speaker
            .speak(&format!("-o{}", target.display()))
            .await
            .expect("speak");
        assert!(!target.exists());
    }

    #[tokio::test]
    async fn text_arrives_on_stdin() {
        let dir = tempfile::tempdir().expect("tempdir");
        let target = dir.path().join("spoken.txt");

        let speaker = CommandSpeaker::new(
            "sh",
            vec![
                "-c".into(),
                "cat > \"$0\"".into(),
                target.display().to_string(),
            ],
        );
        speaker.speak("--help me").await.expect("speak");

        let spoken = std::fs::read_to_string(&target).expect("read spoken text");
        assert_eq!(spoken, "--help me");
    }

    #[tokio::test]
    async fn missing_engine_is_a_launch_error() {
        let speaker = CommandSpeaker::new("/nonexistent/rxlens-speech-engine", Vec::new());
        let err = speaker.speak("hello").await.expect_err("must fail");
        assert!(matches!(err, SpeechError::Launch { .. }));
    }
}
