//! Placeholder engines registered under [`DEFAULT_ENGINE`].
//!
//! They never fail and produce deterministic output, so a fresh install can
//! run the whole pipeline before any real model is configured.

use std::path::Path;

use async_trait::async_trait;

use crate::domain::LanguageCode;
use crate::ports::{EngineError, Synthesizer, Transcriber, Translator};

pub use crate::domain::DEFAULT_ENGINE as DUMMY_ENGINE;

pub const DUMMY_TRANSCRIPT: &str = "[DUMMY TRANSCRIPT] Hello, world. This is a placeholder transcript.";

/// Sample rate of the audio the dummy synthesizer emits.
pub const DUMMY_SAMPLE_RATE: u32 = 16_000;

pub struct DummyTranscriber;

#[async_trait]
impl Transcriber for DummyTranscriber {
    async fn transcribe(&self, video_path: &Path) -> Result<String, EngineError> {
        tracing::debug!(video = %video_path.display(), "dummy transcription");
        Ok(DUMMY_TRANSCRIPT.to_string())
    }
}

pub struct DummyTranslator;

#[async_trait]
impl Translator for DummyTranslator {
    async fn translate(&self, text: &str, language: &LanguageCode) -> Result<String, EngineError> {
        Ok(format!("[DUMMY {language}] {text}"))
    }
}

/// Emits a valid, zero-length mono PCM WAV regardless of input.
pub struct DummySynthesizer;

#[async_trait]
impl Synthesizer for DummySynthesizer {
    async fn synthesize(
        &self,
        _text: &str,
        _language: &LanguageCode,
    ) -> Result<Vec<u8>, EngineError> {
        Ok(silent_wav(DUMMY_SAMPLE_RATE, 1))
    }
}

/// 16-bit PCM WAV header with an empty data chunk.
pub fn silent_wav(sample_rate: u32, channels: u16) -> Vec<u8> {
    const BITS_PER_SAMPLE: u16 = 16;
    let block_align = channels * (BITS_PER_SAMPLE / 8);
    let byte_rate = sample_rate * u32::from(block_align);
    let data_len: u32 = 0;

    let mut out = Vec::with_capacity(44);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes()); // PCM
    out.extend_from_slice(&channels.to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
    out
}
