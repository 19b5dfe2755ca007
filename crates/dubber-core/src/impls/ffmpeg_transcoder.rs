//! `MediaTranscoder` backed by the ffmpeg binary.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;

use crate::domain::{PipelineError, TranscodeOptions};
use crate::ports::MediaTranscoder;

pub struct FfmpegTranscoder {
    binary: PathBuf,
}

impl FfmpegTranscoder {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Argument list for one transcode: strip video, re-encode audio.
    pub fn args(input: &Path, output: &Path, options: &TranscodeOptions) -> Vec<String> {
        let mut args = vec![
            "-y".to_string(),
            "-i".to_string(),
            input.display().to_string(),
            "-vn".to_string(),
            "-acodec".to_string(),
            options.format.codec().to_string(),
            "-ar".to_string(),
            options.sample_rate.to_string(),
            "-ac".to_string(),
            options.channels.to_string(),
        ];
        if let Some(kbps) = options.bitrate_kbps {
            args.push("-b:a".to_string());
            args.push(format!("{kbps}k"));
        }
        args.push(output.display().to_string());
        args
    }
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

#[async_trait]
impl MediaTranscoder for FfmpegTranscoder {
    async fn transcode(
        &self,
        input: &Path,
        output: &Path,
        options: &TranscodeOptions,
    ) -> Result<(), PipelineError> {
        options.validate()?;
        let args = Self::args(input, output, options);
        tracing::debug!(binary = %self.binary.display(), ?args, "running ffmpeg");

        let out = Command::new(&self.binary)
            .args(&args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                PipelineError::TranscodeFailure(format!(
                    "failed to launch {}: {e}",
                    self.binary.display()
                ))
            })?;

        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            let tail: Vec<&str> = stderr.lines().rev().take(5).collect();
            let tail: Vec<&str> = tail.into_iter().rev().collect();
            return Err(PipelineError::TranscodeFailure(format!(
                "ffmpeg exited with {}: {}",
                out.status,
                tail.join(" | ")
            )));
        }

        if !tokio::fs::try_exists(output).await.unwrap_or(false) {
            return Err(PipelineError::TranscodeFailure(format!(
                "ffmpeg reported success but {} is missing",
                output.display()
            )));
        }
        Ok(())
    }
}
