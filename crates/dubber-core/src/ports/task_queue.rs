//! TaskQueue port.
//!
//! The execution substrate jobs run on. It mints job ids, runs each job on a
//! worker separate from the submitter and delivers at least once: a delivery
//! that does not finish cleanly may be handed out again, so runners must be
//! safe to re-run from the top.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{DeliveryId, JobId, JobRequest, PipelineError, QueueError};

/// The unit of work a queue executes.
///
/// A runner sees the same job again whenever a previous delivery panicked or
/// returned `Err`, and must tolerate that: a job that already reached a
/// terminal state is left alone, and artifacts are overwritten in place.
#[async_trait]
pub trait JobRunner: Send + Sync {
    /// Run `job_id` from the top.
    ///
    /// `Err` means the outcome could not be recorded and the delivery should
    /// be retried. Business failures (engine errors, ...) are recorded in the
    /// job state and reported as `Ok`.
    ///
    /// `delivery` identifies this attempt; it is only meant for logs.
    async fn run(
        &self,
        job_id: JobId,
        request: JobRequest,
        delivery: DeliveryId,
    ) -> Result<(), PipelineError>;

    /// Called once the queue stops redelivering `job_id`.
    ///
    /// `error` is [`QueueError::DeliveriesExhausted`] carrying the last
    /// failure. Runners that track job state should record a terminal
    /// failure here, otherwise pollers wait on the job forever. The default
    /// only logs.
    async fn abandon(&self, job_id: JobId, error: QueueError) {
        tracing::error!(%job_id, %error, "job abandoned by the task queue");
    }
}

/// Execution substrate for jobs.
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Id for the next job. Ids are owned by the queue, so callers take one
    /// from here before creating the job's state.
    fn next_job_id(&self) -> JobId;

    /// Schedule `request` under `job_id`.
    ///
    /// Deliveries enqueued before [`TaskQueue::start`] are kept and run once
    /// workers exist. Fails with [`QueueError::NotRunning`] after shutdown.
    async fn enqueue(&self, job_id: JobId, request: JobRequest) -> Result<(), QueueError>;

    /// Begin executing deliveries with `runner`.
    ///
    /// A queue starts at most once; a second call fails with
    /// [`QueueError::AlreadyRunning`].
    async fn start(&self, runner: Arc<dyn JobRunner>) -> Result<(), QueueError>;

    /// Stop taking new deliveries and wait for in-flight ones. Deliveries
    /// still waiting are not run.
    async fn shutdown(&self);

    /// Deliveries waiting for a worker.
    async fn pending(&self) -> usize;
}
