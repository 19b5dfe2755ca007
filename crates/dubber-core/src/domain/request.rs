//! Job submission inputs.
//!
//! `JobSubmission` is what a caller hands in (engines optional, languages as
//! typed by a user). `JobRequest` is the validated form the orchestrator runs:
//! languages parsed and deduplicated, every engine name filled in.

use serde::{Deserialize, Serialize};

use super::errors::PipelineError;
use super::ids::VideoId;
use super::language::LanguageCode;
use super::stage::StageKind;

/// Name the built-in placeholder engines are registered under, and the
/// fallback for any stage without a configured engine.
pub const DEFAULT_ENGINE: &str = "dummy";

/// Optional per-stage engine override supplied by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSelection {
    #[serde(default)]
    pub transcription: Option<String>,
    #[serde(default)]
    pub translation: Option<String>,
    #[serde(default)]
    pub synthesis: Option<String>,
}

impl EngineSelection {
    /// Fill every missing stage from `defaults`.
    pub fn resolve(&self, defaults: &EngineNames) -> EngineNames {
        EngineNames {
            transcription: self
                .transcription
                .clone()
                .unwrap_or_else(|| defaults.transcription.clone()),
            translation: self
                .translation
                .clone()
                .unwrap_or_else(|| defaults.translation.clone()),
            synthesis: self
                .synthesis
                .clone()
                .unwrap_or_else(|| defaults.synthesis.clone()),
        }
    }
}

/// A concrete engine name for every stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineNames {
    pub transcription: String,
    pub translation: String,
    pub synthesis: String,
}

impl EngineNames {
    pub fn uniform(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            transcription: name.clone(),
            translation: name.clone(),
            synthesis: name,
        }
    }

    pub fn for_stage(&self, stage: StageKind) -> &str {
        match stage {
            StageKind::Transcription => &self.transcription,
            StageKind::Translation => &self.translation,
            StageKind::Synthesis => &self.synthesis,
        }
    }
}

impl Default for EngineNames {
    fn default() -> Self {
        Self::uniform(DEFAULT_ENGINE)
    }
}

/// Raw submission as received from a caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSubmission {
    pub video_id: String,
    pub target_languages: Vec<String>,
    #[serde(default)]
    pub engines: EngineSelection,
}

impl JobSubmission {
    pub fn new<L: Into<String>>(
        video_id: impl Into<String>,
        target_languages: impl IntoIterator<Item = L>,
    ) -> Self {
        Self {
            video_id: video_id.into(),
            target_languages: target_languages.into_iter().map(Into::into).collect(),
            engines: EngineSelection::default(),
        }
    }

    pub fn with_engines(mut self, engines: EngineSelection) -> Self {
        self.engines = engines;
        self
    }
}

/// Validated request driven through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRequest {
    pub video_id: VideoId,
    /// Non-empty, duplicate-free, in caller order.
    pub languages: Vec<LanguageCode>,
    pub engines: EngineNames,
}

impl JobRequest {
    /// Duplicates are dropped, keeping the first occurrence in place:
    /// `["fr", "es", "FR"]` runs as `["fr", "es"]`.
    pub fn new(
        video_id: VideoId,
        languages: impl IntoIterator<Item = LanguageCode>,
        engines: EngineNames,
    ) -> Result<Self, PipelineError> {
        let mut unique: Vec<LanguageCode> = Vec::new();
        for lang in languages {
            if !unique.contains(&lang) {
                unique.push(lang);
            }
        }
        if unique.is_empty() {
            return Err(PipelineError::InvalidRequest(
                "at least one target language is required".to_string(),
            ));
        }
        Ok(Self {
            video_id,
            languages: unique,
            engines,
        })
    }

    /// Parse and validate a raw submission against the configured defaults.
    pub fn from_submission(
        submission: &JobSubmission,
        defaults: &EngineNames,
    ) -> Result<Self, PipelineError> {
        let video_id = VideoId::parse(submission.video_id.as_str())
            .map_err(|e| PipelineError::InvalidRequest(e.to_string()))?;
        let languages = submission
            .target_languages
            .iter()
            .map(|raw| LanguageCode::parse(raw))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| PipelineError::InvalidRequest(e.to_string()))?;
        Self::new(video_id, languages, submission.engines.resolve(defaults))
    }
}
