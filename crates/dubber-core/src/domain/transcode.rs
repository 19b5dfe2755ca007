//! Typed parameters for the media transcoder.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::errors::PipelineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    #[default]
    Wav,
    Mp3,
}

impl AudioFormat {
    pub fn extension(self) -> &'static str {
        match self {
            AudioFormat::Wav => "wav",
            AudioFormat::Mp3 => "mp3",
        }
    }

    /// ffmpeg `-acodec` value.
    pub fn codec(self) -> &'static str {
        match self {
            AudioFormat::Wav => "pcm_s16le",
            AudioFormat::Mp3 => "libmp3lame",
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for AudioFormat {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "wav" => Ok(AudioFormat::Wav),
            "mp3" => Ok(AudioFormat::Mp3),
            other => Err(PipelineError::InvalidRequest(format!(
                "unsupported audio format '{other}', expected wav or mp3"
            ))),
        }
    }
}

pub const SAMPLE_RATE_RANGE: std::ops::RangeInclusive<u32> = 8_000..=192_000;
pub const CHANNELS_RANGE: std::ops::RangeInclusive<u8> = 1..=8;
pub const BITRATE_KBPS_RANGE: std::ops::RangeInclusive<u32> = 8..=512;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscodeOptions {
    #[serde(default)]
    pub format: AudioFormat,
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    #[serde(default = "default_channels")]
    pub channels: u8,
    /// Only meaningful for lossy formats.
    #[serde(default)]
    pub bitrate_kbps: Option<u32>,
}

fn default_sample_rate() -> u32 {
    16_000
}

fn default_channels() -> u8 {
    1
}

impl Default for TranscodeOptions {
    fn default() -> Self {
        Self {
            format: AudioFormat::default(),
            sample_rate: default_sample_rate(),
            channels: default_channels(),
            bitrate_kbps: None,
        }
    }
}

impl TranscodeOptions {
    pub fn validate(&self) -> Result<(), PipelineError> {
        if !SAMPLE_RATE_RANGE.contains(&self.sample_rate) {
            return Err(PipelineError::InvalidRequest(format!(
                "sample rate {} outside {:?}",
                self.sample_rate, SAMPLE_RATE_RANGE
            )));
        }
        if !CHANNELS_RANGE.contains(&self.channels) {
            return Err(PipelineError::InvalidRequest(format!(
                "channel count {} outside {:?}",
                self.channels, CHANNELS_RANGE
            )));
        }
        if let Some(kbps) = self.bitrate_kbps {
            if self.format == AudioFormat::Wav {
                return Err(PipelineError::InvalidRequest(
                    "bitrate applies to mp3 output only".to_string(),
                ));
            }
            if !BITRATE_KBPS_RANGE.contains(&kbps) {
                return Err(PipelineError::InvalidRequest(format!(
                    "bitrate {kbps}k outside {BITRATE_KBPS_RANGE:?}"
                )));
            }
        }
        Ok(())
    }
}
