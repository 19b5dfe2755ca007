//! MediaTranscoder port.

use std::path::Path;

use async_trait::async_trait;

use crate::domain::{PipelineError, TranscodeOptions};

/// External, blocking transcode. Either `output` exists with the requested
/// format when this returns `Ok`, or it returns `TranscodeFailure`.
#[async_trait]
pub trait MediaTranscoder: Send + Sync {
    async fn transcode(
        &self,
        input: &Path,
        output: &Path,
        options: &TranscodeOptions,
    ) -> Result<(), PipelineError>;
}
