//! Filesystem video store: uploads live at `videos/{video_id}{.ext}`.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{PipelineError, VideoId};
use crate::ports::{IdGenerator, VideoStore};

pub struct FsVideoStore {
    dir: PathBuf,
    ids: Arc<dyn IdGenerator>,
}

impl FsVideoStore {
    /// Videos are kept in `root/videos`.
    pub fn new(root: impl AsRef<Path>, ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            dir: root.as_ref().join("videos"),
            ids,
        }
    }

    /// Lowercased extension of the uploaded name, if it looks like one.
    fn extension_of(original_name: &str) -> Option<String> {
        let ext = Path::new(original_name).extension()?.to_str()?;
        let valid = !ext.is_empty()
            && ext.len() <= 8
            && ext.chars().all(|c| c.is_ascii_alphanumeric());
        valid.then(|| ext.to_ascii_lowercase())
    }

    fn is_video_file(video_id: &VideoId, name: &str) -> bool {
        match name.strip_prefix(video_id.as_str()) {
            Some("") => true,
            Some(rest) => rest.starts_with('.') && !rest[1..].contains('.'),
            None => false,
        }
    }
}

#[async_trait]
impl VideoStore for FsVideoStore {
    async fn put(&self, original_name: &str, bytes: &[u8]) -> Result<VideoId, PipelineError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| PipelineError::storage(&self.dir, e))?;

        let video_id = self.ids.generate_video_id();
        let name = match Self::extension_of(original_name) {
            Some(ext) => format!("{video_id}.{ext}"),
            None => video_id.to_string(),
        };
        let path = self.dir.join(name);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| PipelineError::storage(&path, e))?;

        tracing::info!(%video_id, path = %path.display(), bytes = bytes.len(), "video stored");
        Ok(video_id)
    }

    async fn resolve(&self, video_id: &VideoId) -> Result<PathBuf, PipelineError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(PipelineError::VideoNotFound(video_id.clone()));
            }
            Err(e) => return Err(PipelineError::storage(&self.dir, e)),
        };

        let mut found = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| PipelineError::storage(&self.dir, e))?
        {
            if let Some(name) = entry.file_name().to_str()
                && Self::is_video_file(video_id, name)
            {
                found.push(entry.path());
            }
        }
        found.sort();
        found
            .into_iter()
            .next()
            .ok_or_else(|| PipelineError::VideoNotFound(video_id.clone()))
    }
}
