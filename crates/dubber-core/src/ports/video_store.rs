//! VideoStore port: where uploaded source videos live.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::domain::{PipelineError, VideoId};

#[async_trait]
pub trait VideoStore: Send + Sync {
    /// Persist raw upload bytes under a freshly generated id. The original
    /// file name only contributes its extension.
    async fn put(&self, original_name: &str, bytes: &[u8]) -> Result<VideoId, PipelineError>;

    /// Path of the stored video, or `VideoNotFound`.
    async fn resolve(&self, video_id: &VideoId) -> Result<PathBuf, PipelineError>;
}
