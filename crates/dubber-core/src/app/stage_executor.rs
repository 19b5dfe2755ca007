//! Runs one stage: engine lookup, engine call, artifact write.
//!
//! The executor knows nothing about jobs. It is handed everything a stage
//! needs and returns what the stage produced.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::domain::{
    ArtifactKind, LanguageCode, PipelineError, StageKind, StageResult, VideoId,
};
use crate::ports::ArtifactStore;

use super::registry::EngineRegistry;

/// Everything one stage needs. The variant picks the stage, and with it the
/// artifact kind written.
#[derive(Debug, Clone)]
pub enum StageInput {
    Transcribe {
        video_id: VideoId,
        video_path: PathBuf,
        engine: String,
    },
    Translate {
        video_id: VideoId,
        text: String,
        language: LanguageCode,
        engine: String,
    },
    Synthesize {
        video_id: VideoId,
        text: String,
        language: LanguageCode,
        engine: String,
    },
}

impl StageInput {
    pub fn stage(&self) -> StageKind {
        match self {
            StageInput::Transcribe { .. } => StageKind::Transcription,
            StageInput::Translate { .. } => StageKind::Translation,
            StageInput::Synthesize { .. } => StageKind::Synthesis,
        }
    }

    pub fn engine(&self) -> &str {
        match self {
            StageInput::Transcribe { engine, .. }
            | StageInput::Translate { engine, .. }
            | StageInput::Synthesize { engine, .. } => engine,
        }
    }

    fn target(&self) -> (ArtifactKind, &VideoId, Option<&LanguageCode>) {
        match self {
            StageInput::Transcribe { video_id, .. } => (ArtifactKind::Transcript, video_id, None),
            StageInput::Translate {
                video_id, language, ..
            } => (ArtifactKind::Translation, video_id, Some(language)),
            StageInput::Synthesize {
                video_id, language, ..
            } => (ArtifactKind::Dub, video_id, Some(language)),
        }
    }
}

/// Engine output: bytes to persist plus text for downstream stages.
struct EngineOutput {
    bytes: Vec<u8>,
    text: Option<String>,
}

impl EngineOutput {
    fn text(text: String) -> Self {
        Self {
            bytes: text.as_bytes().to_vec(),
            text: Some(text),
        }
    }

    fn audio(bytes: Vec<u8>) -> Self {
        Self { bytes, text: None }
    }
}

pub struct StageExecutor {
    registry: Arc<EngineRegistry>,
    artifacts: Arc<dyn ArtifactStore>,
    timeout: Option<Duration>,
}

impl StageExecutor {
    pub fn new(registry: Arc<EngineRegistry>, artifacts: Arc<dyn ArtifactStore>) -> Self {
        Self {
            registry,
            artifacts,
            timeout: None,
        }
    }

    /// Engine calls running longer than `timeout` fail with `EngineFailure`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run one stage and persist its single artifact.
    ///
    /// Nothing is written unless the engine succeeds. The artifact path is
    /// derived up front, so an invalid kind and language pairing fails before
    /// the engine runs.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::UnknownEngine`] if the engine is not registered.
    /// - [`PipelineError::EngineFailure`] if the engine errors, panics or
    ///   exceeds the timeout.
    /// - [`PipelineError::StorageFailure`] if the artifact cannot be written.
    pub async fn execute(&self, input: StageInput) -> Result<StageResult, PipelineError> {
        let stage = input.stage();
        let engine = input.engine().to_string();
        let (kind, video_id, language) = input.target();
        let artifact = self.artifacts.artifact_for(kind, video_id, language)?;

        let started = Instant::now();
        let call = self.spawn_engine_call(input)?;
        let output = self.await_engine(stage, &engine, call).await?;

        self.artifacts.write(&artifact.path, &output.bytes).await?;

        let elapsed = started.elapsed();
        tracing::info!(
            %stage,
            %engine,
            path = %artifact.path.display(),
            elapsed_ms = elapsed.as_millis() as u64,
            "stage completed"
        );
        Ok(StageResult {
            stage,
            artifact,
            text: output.text,
            elapsed,
        })
    }

    /// Resolves the engine and starts the call on its own task. Unknown
    /// engines fail here, before anything is written.
    fn spawn_engine_call(
        &self,
        input: StageInput,
    ) -> Result<tokio::task::JoinHandle<Result<EngineOutput, PipelineError>>, PipelineError> {
        let handle = match input {
            StageInput::Transcribe {
                video_path, engine, ..
            } => {
                let transcriber = self.registry.transcriber(&engine)?;
                tokio::spawn(async move {
                    transcriber
                        .transcribe(&video_path)
                        .await
                        .map(EngineOutput::text)
                        .map_err(|e| {
                            PipelineError::engine_failure(StageKind::Transcription, engine, e)
                        })
                })
            }
            StageInput::Translate {
                text,
                language,
                engine,
                ..
            } => {
                let translator = self.registry.translator(&engine)?;
                tokio::spawn(async move {
                    translator
                        .translate(&text, &language)
                        .await
                        .map(EngineOutput::text)
                        .map_err(|e| PipelineError::engine_failure(StageKind::Translation, engine, e))
                })
            }
            StageInput::Synthesize {
                text,
                language,
                engine,
                ..
            } => {
                let synthesizer = self.registry.synthesizer(&engine)?;
                tokio::spawn(async move {
                    synthesizer
                        .synthesize(&text, &language)
                        .await
                        .map(EngineOutput::audio)
                        .map_err(|e| PipelineError::engine_failure(StageKind::Synthesis, engine, e))
                })
            }
        };
        Ok(handle)
    }

    async fn await_engine(
        &self,
        stage: StageKind,
        engine: &str,
        mut call: tokio::task::JoinHandle<Result<EngineOutput, PipelineError>>,
    ) -> Result<EngineOutput, PipelineError> {
        let joined = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, &mut call).await {
                Ok(joined) => joined,
                Err(_) => {
                    call.abort();
                    return Err(PipelineError::engine_failure(
                        stage,
                        engine,
                        format!("timed out after {}s", limit.as_secs_f64()),
                    ));
                }
            },
            None => call.await,
        };

        match joined {
            Ok(result) => result,
            Err(e) if e.is_panic() => Err(PipelineError::engine_failure(
                stage,
                engine,
                "engine panicked",
            )),
            Err(e) => Err(PipelineError::engine_failure(stage, engine, e)),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::impls::FsArtifactStore;
    use crate::impls::noop_engines::DUMMY_TRANSCRIPT;
    use crate::ports::{EngineError, Synthesizer, Translator};
    use async_trait::async_trait;
    use std::path::Path;

    pub(crate) struct PanickingTranslator;

    #[async_trait]
    impl Translator for PanickingTranslator {
        async fn translate(&self, _text: &str, _language: &LanguageCode) -> Result<String, EngineError> {
            panic!("model weights missing");
        }
    }

    pub(crate) struct SlowSynthesizer;

    #[async_trait]
    impl Synthesizer for SlowSynthesizer {
        async fn synthesize(&self, _text: &str, _language: &LanguageCode) -> Result<Vec<u8>, EngineError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(Vec::new())
        }
    }

    fn executor(root: &Path) -> StageExecutor {
        let mut registry = EngineRegistry::with_builtin();
        registry
            .register_translator("panicky", Arc::new(PanickingTranslator))
            .unwrap();
        registry
            .register_synthesizer("slow", Arc::new(SlowSynthesizer))
            .unwrap();
        StageExecutor::new(Arc::new(registry), Arc::new(FsArtifactStore::new(root)))
    }

    fn vid() -> VideoId {
        VideoId::parse("v1").unwrap()
    }

    fn fr() -> LanguageCode {
        LanguageCode::parse("fr").unwrap()
    }

    #[tokio::test]
    async fn transcription_writes_transcript_and_returns_text() {
        let dir = tempfile::tempdir().unwrap();
        let result = executor(dir.path())
            .execute(StageInput::Transcribe {
                video_id: vid(),
                video_path: dir.path().join("videos/v1.mp4"),
                engine: "dummy".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(result.stage, StageKind::Transcription);
        assert_eq!(result.text.as_deref(), Some(DUMMY_TRANSCRIPT));
        assert_eq!(
            result.artifact.path,
            dir.path().join("transcripts/v1_transcript.txt")
        );
        assert_eq!(
            std::fs::read_to_string(&result.artifact.path).unwrap(),
            DUMMY_TRANSCRIPT
        );
    }

    #[tokio::test]
    async fn synthesis_writes_dub_without_text() {
        let dir = tempfile::tempdir().unwrap();
        let result = executor(dir.path())
            .execute(StageInput::Synthesize {
                video_id: vid(),
                text: "bonjour".to_string(),
                language: fr(),
                engine: "dummy".to_string(),
            })
            .await
            .unwrap();

        assert!(result.text.is_none());
        assert!(result.artifact.path.ends_with("dubs/v1_fr.wav"));
        assert_eq!(std::fs::read(&result.artifact.path).unwrap().len(), 44);
    }

    #[tokio::test]
    async fn unknown_engine_fails_before_any_write() {
        let dir = tempfile::tempdir().unwrap();
        let err = executor(dir.path())
            .execute(StageInput::Translate {
                video_id: vid(),
                text: "hello".to_string(),
                language: fr(),
                engine: "nonexistent".to_string(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::UnknownEngine { stage: StageKind::Translation, .. }));
        assert!(!dir.path().join("translations").exists());
    }

    #[tokio::test]
    async fn panicking_engine_becomes_engine_failure() {
        let dir = tempfile::tempdir().unwrap();
        let err = executor(dir.path())
            .execute(StageInput::Translate {
                video_id: vid(),
                text: "hello".to_string(),
                language: fr(),
                engine: "panicky".to_string(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::EngineFailure { .. }));
        assert!(err.to_string().contains("panicked"));
        assert!(!dir.path().join("translations/v1_fr.txt").exists());
    }

    #[tokio::test]
    async fn slow_engine_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let err = executor(dir.path())
            .with_timeout(Some(Duration::from_millis(50)))
            .execute(StageInput::Synthesize {
                video_id: vid(),
                text: "bonjour".to_string(),
                language: fr(),
                engine: "slow".to_string(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::EngineFailure { stage: StageKind::Synthesis, .. }));
        assert!(err.to_string().contains("timed out"));
    }
}
