//! JobStateStore port.
//!
//! A passive store: it records what the orchestrator tells it and answers
//! polls. It never decides anything about a job.
//!
//! State machine: `queued → started(s1) → started(s2) → … → succeeded | failed`.
//! Every mutation of a terminal job fails with `StateStoreError::AlreadyTerminal`.

use async_trait::async_trait;

use crate::domain::{
    JobFailure, JobId, JobRequest, JobResult, JobView, Progress, StateStoreError, StepLabel,
};

#[async_trait]
pub trait JobStateStore: Send + Sync {
    /// Record a new `queued` job. Fails with `AlreadyExists` on a reused id.
    async fn create(&self, job_id: JobId, request: JobRequest) -> Result<(), StateStoreError>;

    /// Move a job to `started(step)`. The first call also leaves `queued`.
    async fn update(
        &self,
        job_id: JobId,
        step: StepLabel,
        progress: Progress,
    ) -> Result<(), StateStoreError>;

    /// Terminal success.
    async fn complete(&self, job_id: JobId, result: JobResult) -> Result<(), StateStoreError>;

    /// Terminal failure.
    async fn fail(&self, job_id: JobId, failure: JobFailure) -> Result<(), StateStoreError>;

    /// `None` means the id was never created here, which is different from a
    /// job in the `failed` state.
    async fn get(&self, job_id: JobId) -> Option<JobView>;

    /// Views the job went through, oldest first.
    async fn history(&self, job_id: JobId) -> Option<Vec<JobView>>;

    /// Ask a running job to stop at its next stage boundary. Refused with
    /// `AlreadyTerminal` once the job has finished.
    async fn request_cancel(&self, job_id: JobId) -> Result<(), StateStoreError>;

    /// Checked by the orchestrator before every stage.
    async fn is_cancel_requested(&self, job_id: JobId) -> Result<bool, StateStoreError>;
}
