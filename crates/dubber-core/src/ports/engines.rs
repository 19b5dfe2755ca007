//! Engine capabilities.
//!
//! Engines are external collaborators (ML models, remote APIs). The pipeline
//! only sees these narrow text/audio contracts.

use std::path::Path;

use async_trait::async_trait;

use crate::domain::LanguageCode;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("engine unavailable: {0}")]
    Unavailable(String),
    #[error("unsupported language: {0}")]
    UnsupportedLanguage(LanguageCode),
    #[error("{0}")]
    Failed(String),
}

#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, video_path: &Path) -> Result<String, EngineError>;
}

#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, language: &LanguageCode) -> Result<String, EngineError>;
}

/// Returns encoded audio (WAV) for `text` spoken in `language`.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, language: &LanguageCode)
    -> Result<Vec<u8>, EngineError>;
}
