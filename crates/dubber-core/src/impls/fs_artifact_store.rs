//! Filesystem artifact store.
//!
//! Layout under the storage root:
//! - `transcripts/{video_id}_transcript.txt`
//! - `translations/{video_id}_{lang}.txt`
//! - `dubs/{video_id}_{lang}.wav`
//! - `audio/{video_id}.{wav|mp3}`
//!
//! Writes go to a hidden temp file in the target directory and are renamed
//! into place, so a reader sees either the old content or the new one.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use ulid::Ulid;

use crate::domain::{ArtifactKind, AudioFormat, LanguageCode, PipelineError, VideoId};
use crate::ports::ArtifactStore;

pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    /// Store rooted at `root`. Directories are created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn file_name(
        kind: ArtifactKind,
        video_id: &VideoId,
        language: Option<&LanguageCode>,
    ) -> Result<String, PipelineError> {
        match (kind.is_per_language(), language) {
            (false, None) => Ok(format!("{video_id}_transcript.{}", kind.extension())),
            (true, Some(lang)) => Ok(format!("{video_id}_{lang}.{}", kind.extension())),
            (false, Some(lang)) => Err(PipelineError::InvalidRequest(format!(
                "{kind} artifacts are not per-language (got '{lang}')"
            ))),
            (true, None) => Err(PipelineError::InvalidRequest(format!(
                "{kind} artifacts need a language"
            ))),
        }
    }

    /// Does `name` belong to `video_id` under the naming scheme for `kind`?
    fn matches(kind: ArtifactKind, video_id: &VideoId, name: &str) -> bool {
        let Some(rest) = name.strip_prefix(video_id.as_str()) else {
            return false;
        };
        let Some(rest) = rest.strip_prefix('_') else {
            return false;
        };
        let Some(stem) = rest
            .strip_suffix(kind.extension())
            .and_then(|s| s.strip_suffix('.'))
        else {
            return false;
        };
        if kind.is_per_language() {
            LanguageCode::parse(stem).is_ok_and(|lang| lang.as_str() == stem)
        } else {
            stem == "transcript"
        }
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    fn path_for(
        &self,
        kind: ArtifactKind,
        video_id: &VideoId,
        language: Option<&LanguageCode>,
    ) -> Result<PathBuf, PipelineError> {
        let name = Self::file_name(kind, video_id, language)?;
        Ok(self.root.join(kind.dir_name()).join(name))
    }

    fn audio_path_for(&self, video_id: &VideoId, format: AudioFormat) -> PathBuf {
        self.root
            .join("audio")
            .join(format!("{video_id}.{}", format.extension()))
    }

    async fn write(&self, path: &Path, content: &[u8]) -> Result<(), PipelineError> {
        self.ensure_parent_dir(path).await?;

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                PipelineError::storage(
                    path,
                    io::Error::new(io::ErrorKind::InvalidInput, "artifact path has no file name"),
                )
            })?;
        let tmp = path.with_file_name(format!(".{file_name}.{}.tmp", Ulid::new()));

        if let Err(e) = tokio::fs::write(&tmp, content).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(PipelineError::storage(path, e));
        }
        if let Err(e) = tokio::fs::rename(&tmp, path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(PipelineError::storage(path, e));
        }

        tracing::debug!(path = %path.display(), bytes = content.len(), "artifact written");
        Ok(())
    }

    async fn ensure_parent_dir(&self, path: &Path) -> Result<(), PipelineError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| PipelineError::storage(parent, e))?;
        }
        Ok(())
    }

    async fn list(
        &self,
        kind: ArtifactKind,
        video_id: &VideoId,
    ) -> Result<Vec<PathBuf>, PipelineError> {
        let dir = self.root.join(kind.dir_name());
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(PipelineError::storage(dir, e)),
        };

        let mut paths = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| PipelineError::storage(&dir, e))?
        {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if Self::matches(kind, video_id, name) {
                paths.push(entry.path());
            }
        }
        paths.sort();
        Ok(paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn vid(s: &str) -> VideoId {
        VideoId::parse(s).unwrap()
    }

    fn lang(s: &str) -> LanguageCode {
        LanguageCode::parse(s).unwrap()
    }

    #[rstest]
    #[case(ArtifactKind::Transcript, None, "transcripts/v1_transcript.txt")]
    #[case(ArtifactKind::Translation, Some("fr"), "translations/v1_fr.txt")]
    #[case(ArtifactKind::Dub, Some("pt-BR"), "dubs/v1_pt-BR.wav")]
    fn path_for_follows_naming_scheme(
        #[case] kind: ArtifactKind,
        #[case] language: Option<&str>,
        #[case] expected: &str,
    ) {
        let store = FsArtifactStore::new("/data");
        let language = language.map(lang);
        let path = store.path_for(kind, &vid("v1"), language.as_ref()).unwrap();
        assert_eq!(path, Path::new("/data").join(expected));
    }

    #[test]
    fn path_for_is_deterministic() {
        let store = FsArtifactStore::new("/data");
        let fr = lang("fr");
        let a = store
            .path_for(ArtifactKind::Dub, &vid("v1"), Some(&fr))
            .unwrap();
        let b = store
            .path_for(ArtifactKind::Dub, &vid("v1"), Some(&fr))
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn path_for_rejects_language_mismatch() {
        let store = FsArtifactStore::new("/data");
        assert!(
            store
                .path_for(ArtifactKind::Transcript, &vid("v1"), Some(&lang("fr")))
                .is_err()
        );
        assert!(store.path_for(ArtifactKind::Dub, &vid("v1"), None).is_err());
    }

    #[test]
    fn audio_path_uses_format_extension() {
        let store = FsArtifactStore::new("/data");
        assert_eq!(
            store.audio_path_for(&vid("v1"), AudioFormat::Mp3),
            Path::new("/data/audio/v1.mp3")
        );
    }

    #[tokio::test]
    async fn write_creates_directories_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path());
        let path = store
            .path_for(ArtifactKind::Translation, &vid("v1"), Some(&lang("fr")))
            .unwrap();

        store.write(&path, b"first").await.unwrap();
        store.write(&path, b"second").await.unwrap();

        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"second");
        let listed = store.list(ArtifactKind::Translation, &vid("v1")).await.unwrap();
        assert_eq!(listed, vec![path]);
    }

    #[tokio::test]
    async fn write_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path());
        let path = store
            .path_for(ArtifactKind::Transcript, &vid("v1"), None)
            .unwrap();
        store.write(&path, b"hello").await.unwrap();

        let names: Vec<String> = std::fs::read_dir(dir.path().join("transcripts"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["v1_transcript.txt".to_string()]);
    }

    #[tokio::test]
    async fn list_is_empty_when_nothing_exists() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path());
        let listing = store.list_all(&vid("v1")).await.unwrap();
        assert!(listing.is_empty());
    }

    #[tokio::test]
    async fn list_only_returns_the_requested_video() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path());
        for (video, language) in [("v1", "fr"), ("v1", "es"), ("v10", "fr"), ("v1-b", "de")] {
            let path = store
                .path_for(ArtifactKind::Dub, &vid(video), Some(&lang(language)))
                .unwrap();
            store.write(&path, b"").await.unwrap();
        }
        std::fs::write(dir.path().join("dubs/notes.txt"), b"x").unwrap();

        let listed = store.list(ArtifactKind::Dub, &vid("v1")).await.unwrap();
        let names: Vec<String> = listed
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["v1_es.wav", "v1_fr.wav"]);
    }
}
