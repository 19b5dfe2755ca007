//! Pipeline stages and the step labels pollers see.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use super::artifact::Artifact;
use super::language::LanguageCode;

/// The three kinds of pipeline work. Each stage produces exactly one artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Transcription,
    Translation,
    Synthesis,
}

impl StageKind {
    /// Every stage, in pipeline order.
    pub const ALL: [StageKind; 3] = [
        StageKind::Transcription,
        StageKind::Translation,
        StageKind::Synthesis,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StageKind::Transcription => "transcription",
            StageKind::Translation => "translation",
            StageKind::Synthesis => "synthesis",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Human-readable label of the step a job is on: `transcribe`,
/// `translate:{lang}` or `tts:{lang}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepLabel(String);

impl StepLabel {
    pub fn for_stage(stage: StageKind, language: Option<&LanguageCode>) -> Self {
        match (stage, language) {
            (StageKind::Transcription, _) => Self("transcribe".to_string()),
            (StageKind::Translation, Some(lang)) => Self(format!("translate:{lang}")),
            (StageKind::Translation, None) => Self("translate".to_string()),
            (StageKind::Synthesis, Some(lang)) => Self(format!("tts:{lang}")),
            (StageKind::Synthesis, None) => Self("tts".to_string()),
        }
    }

    pub fn transcribe() -> Self {
        Self::for_stage(StageKind::Transcription, None)
    }

    pub fn translate(language: &LanguageCode) -> Self {
        Self::for_stage(StageKind::Translation, Some(language))
    }

    pub fn tts(language: &LanguageCode) -> Self {
        Self::for_stage(StageKind::Synthesis, Some(language))
    }

    /// Bookkeeping step before any stage runs (handing the job to the queue).
    pub fn enqueue() -> Self {
        Self("enqueue".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StepLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl PartialEq<&str> for StepLabel {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Stage counter reported alongside a step label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    /// Stages finished before the current one.
    pub completed: u32,
    /// 1 transcription + 2 per language.
    pub total: u32,
}

impl Progress {
    pub fn start(language_count: usize) -> Self {
        Self {
            completed: 0,
            total: 1 + 2 * language_count as u32,
        }
    }

    pub fn advance(self) -> Self {
        Self {
            completed: (self.completed + 1).min(self.total),
            ..self
        }
    }
}

/// What a single stage execution produced.
#[derive(Debug, Clone)]
pub struct StageResult {
    pub stage: StageKind,
    pub artifact: Artifact,
    /// Text kept in memory for downstream stages (transcript or translation).
    /// `None` for synthesis.
    pub text: Option<String>,
    pub elapsed: Duration,
}
