//! ArtifactStore port.
//!
//! The store is the only component allowed to decide where an artifact lives.
//! Paths are a pure function of (kind, video id, language): the same inputs
//! always give the same path, so re-running a job overwrites instead of
//! duplicating.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::domain::{
    Artifact, ArtifactKind, AssetListing, AudioFormat, LanguageCode, PipelineError, VideoId,
};

/// Naming scheme and persistence for pipeline outputs.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Deterministic location of an artifact.
    ///
    /// Per-language kinds require a language; transcripts reject one.
    fn path_for(
        &self,
        kind: ArtifactKind,
        video_id: &VideoId,
        language: Option<&LanguageCode>,
    ) -> Result<PathBuf, PipelineError>;

    /// Deterministic location of converted audio for a video.
    fn audio_path_for(&self, video_id: &VideoId, format: AudioFormat) -> PathBuf;

    /// Write (or overwrite) `content` at `path`, creating directories on demand.
    /// Readers never observe a partially written file.
    async fn write(&self, path: &Path, content: &[u8]) -> Result<(), PipelineError>;

    /// Create the directory that will hold `path`.
    async fn ensure_parent_dir(&self, path: &Path) -> Result<(), PipelineError>;

    /// Artifacts of one kind for a video, sorted. Missing directories yield an
    /// empty list.
    async fn list(&self, kind: ArtifactKind, video_id: &VideoId)
    -> Result<Vec<PathBuf>, PipelineError>;

    /// [`ArtifactStore::path_for`] wrapped with its descriptor.
    fn artifact_for(
        &self,
        kind: ArtifactKind,
        video_id: &VideoId,
        language: Option<&LanguageCode>,
    ) -> Result<Artifact, PipelineError> {
        let path = self.path_for(kind, video_id, language)?;
        Ok(Artifact {
            kind,
            video_id: video_id.clone(),
            language: language.cloned(),
            path,
        })
    }

    /// Every artifact of a video, grouped by kind.
    async fn list_all(&self, video_id: &VideoId) -> Result<AssetListing, PipelineError> {
        Ok(AssetListing {
            transcripts: self.list(ArtifactKind::Transcript, video_id).await?,
            translations: self.list(ArtifactKind::Translation, video_id).await?,
            dubs: self.list(ArtifactKind::Dub, video_id).await?,
        })
    }
}
