//! Error types and their classification.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use super::ids::{JobId, VideoId};
use super::stage::StageKind;

/// Serializable classification of a pipeline error.
///
/// This is what a poller sees in a failed `JobView`; the full error text goes
/// alongside it as a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    VideoNotFound,
    InvalidRequest,
    UnknownEngine,
    EngineFailure,
    StorageFailure,
    TranscodeFailure,
    UnknownJob,
    Canceled,
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::VideoNotFound => "video_not_found",
            ErrorKind::InvalidRequest => "invalid_request",
            ErrorKind::UnknownEngine => "unknown_engine",
            ErrorKind::EngineFailure => "engine_failure",
            ErrorKind::StorageFailure => "storage_failure",
            ErrorKind::TranscodeFailure => "transcode_failure",
            ErrorKind::UnknownJob => "unknown_job",
            ErrorKind::Canceled => "canceled",
            ErrorKind::Internal => "internal",
        };
        f.write_str(s)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("video not found: {0}")]
    VideoNotFound(VideoId),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("unknown {stage} engine '{name}'")]
    UnknownEngine { stage: StageKind, name: String },

    #[error("{stage} engine '{engine}' failed: {message}")]
    EngineFailure {
        stage: StageKind,
        engine: String,
        message: String,
    },

    #[error("storage failure at {}: {source}", .path.display())]
    StorageFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("transcode failed: {0}")]
    TranscodeFailure(String),

    #[error("unknown job: {0}")]
    UnknownJob(JobId),

    #[error("job canceled")]
    Canceled,

    #[error(transparent)]
    StateStore(#[from] StateStoreError),

    #[error(transparent)]
    Queue(#[from] QueueError),
}

impl PipelineError {
    pub fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::StorageFailure {
            path: path.into(),
            source,
        }
    }

    pub fn engine_failure(
        stage: StageKind,
        engine: impl Into<String>,
        message: impl fmt::Display,
    ) -> Self {
        Self::EngineFailure {
            stage,
            engine: engine.into(),
            message: message.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::VideoNotFound(_) => ErrorKind::VideoNotFound,
            PipelineError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            PipelineError::UnknownEngine { .. } => ErrorKind::UnknownEngine,
            PipelineError::EngineFailure { .. } => ErrorKind::EngineFailure,
            PipelineError::StorageFailure { .. } => ErrorKind::StorageFailure,
            PipelineError::TranscodeFailure(_) => ErrorKind::TranscodeFailure,
            PipelineError::UnknownJob(_) => ErrorKind::UnknownJob,
            PipelineError::Canceled => ErrorKind::Canceled,
            PipelineError::StateStore(StateStoreError::UnknownJob(_)) => ErrorKind::UnknownJob,
            PipelineError::StateStore(_) | PipelineError::Queue(_) => ErrorKind::Internal,
        }
    }

    /// Errors a best-effort fan-out may pin on a single language and move past.
    /// Storage and bookkeeping failures always end the job.
    pub fn is_language_scoped(&self) -> bool {
        matches!(
            self,
            PipelineError::EngineFailure { .. } | PipelineError::UnknownEngine { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateStoreError {
    #[error("job {0} already exists")]
    AlreadyExists(JobId),

    #[error("job {0} is not known to the state store")]
    UnknownJob(JobId),

    /// A terminal job was asked to change. Terminal states never reopen.
    #[error("job {0} is already terminal")]
    AlreadyTerminal(JobId),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    #[error("task queue is not running")]
    NotRunning,

    #[error("task queue is already running")]
    AlreadyRunning,

    #[error("task queue operation failed: {0}")]
    OperationFailed(String),

    /// Every allowed delivery of a job failed; `reason` is the last failure.
    #[error("gave up after {attempts} deliveries: {reason}")]
    DeliveriesExhausted { attempts: u32, reason: String },
}
