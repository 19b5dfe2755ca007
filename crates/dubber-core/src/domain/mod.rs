//! Domain model (ids, requests, stages, artifacts, job views, errors).
//!
//! Nothing in here performs I/O.

pub mod artifact;
pub mod errors;
pub mod ids;
pub mod job;
pub mod language;
pub mod request;
pub mod stage;
pub mod transcode;

pub use artifact::{Artifact, ArtifactKind, AssetListing};
pub use errors::{ErrorKind, PipelineError, QueueError, StateStoreError};
pub use ids::{DeliveryId, JobId, VideoId};
pub use job::{
    FailurePolicy, JobFailure, JobRecord, JobResult, JobState, JobView, LanguageOutcome,
    LanguageStatus, StageError,
};
pub use language::LanguageCode;
pub use request::{DEFAULT_ENGINE, EngineNames, EngineSelection, JobRequest, JobSubmission};
pub use stage::{Progress, StageKind, StageResult, StepLabel};
pub use transcode::{AudioFormat, TranscodeOptions};
