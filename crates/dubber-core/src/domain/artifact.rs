//! Artifact descriptors.
//!
//! Only the `ArtifactStore` decides where an artifact lives; everything here
//! just carries the path it handed out.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use super::ids::VideoId;
use super::language::LanguageCode;
use super::stage::StageKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Transcript,
    Translation,
    Dub,
}

impl ArtifactKind {
    /// Directory under the storage root holding this kind.
    pub fn dir_name(self) -> &'static str {
        match self {
            ArtifactKind::Transcript => "transcripts",
            ArtifactKind::Translation => "translations",
            ArtifactKind::Dub => "dubs",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ArtifactKind::Transcript | ArtifactKind::Translation => "txt",
            ArtifactKind::Dub => "wav",
        }
    }

    pub fn is_per_language(self) -> bool {
        !matches!(self, ArtifactKind::Transcript)
    }

    pub fn produced_by(stage: StageKind) -> Self {
        match stage {
            StageKind::Transcription => ArtifactKind::Transcript,
            StageKind::Translation => ArtifactKind::Translation,
            StageKind::Synthesis => ArtifactKind::Dub,
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ArtifactKind::Transcript => "transcript",
            ArtifactKind::Translation => "translation",
            ArtifactKind::Dub => "dub",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub video_id: VideoId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<LanguageCode>,
    pub path: PathBuf,
}

/// All artifacts known for one video, grouped by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetListing {
    pub transcripts: Vec<PathBuf>,
    pub translations: Vec<PathBuf>,
    pub dubs: Vec<PathBuf>,
}

impl AssetListing {
    pub fn is_empty(&self) -> bool {
        self.transcripts.is_empty() && self.translations.is_empty() && self.dubs.is_empty()
    }
}
