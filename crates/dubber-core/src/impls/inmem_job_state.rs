//! In-memory `JobStateStore`.
//!
//! All records sit in one `HashMap` behind a tokio `Mutex`. Transitions are
//! delegated to `JobRecord`, which refuses to touch a terminal job, so this
//! file only handles lookup and the clock. State does not survive a restart.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{
    JobFailure, JobId, JobRecord, JobRequest, JobResult, JobView, Progress, StateStoreError,
    StepLabel,
};
use crate::observability::JobCounts;
use crate::ports::{Clock, JobStateStore};

pub struct InMemoryJobStateStore {
    jobs: Mutex<HashMap<JobId, JobRecord>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryJobStateStore {
    /// `clock` stamps every transition.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            jobs: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Jobs per state, for status output.
    pub async fn counts(&self) -> JobCounts {
        let jobs = self.jobs.lock().await;
        JobCounts::from_views(jobs.values().map(|r| &r.view))
    }

    async fn with_record<F>(&self, job_id: JobId, f: F) -> Result<(), StateStoreError>
    where
        F: FnOnce(&mut JobRecord) -> Result<(), StateStoreError>,
    {
        let mut jobs = self.jobs.lock().await;
        let record = jobs
            .get_mut(&job_id)
            .ok_or(StateStoreError::UnknownJob(job_id))?;
        f(record)
    }
}

#[async_trait]
impl JobStateStore for InMemoryJobStateStore {
    async fn create(&self, job_id: JobId, request: JobRequest) -> Result<(), StateStoreError> {
        let mut jobs = self.jobs.lock().await;
        if jobs.contains_key(&job_id) {
            return Err(StateStoreError::AlreadyExists(job_id));
        }
        jobs.insert(job_id, JobRecord::new(job_id, request, self.clock.now()));
        Ok(())
    }

    async fn update(
        &self,
        job_id: JobId,
        step: StepLabel,
        progress: Progress,
    ) -> Result<(), StateStoreError> {
        let now = self.clock.now();
        self.with_record(job_id, |r| r.start_step(step, progress, now))
            .await
    }

    async fn complete(&self, job_id: JobId, result: JobResult) -> Result<(), StateStoreError> {
        let now = self.clock.now();
        self.with_record(job_id, |r| r.mark_succeeded(result, now))
            .await
    }

    async fn fail(&self, job_id: JobId, failure: JobFailure) -> Result<(), StateStoreError> {
        let now = self.clock.now();
        self.with_record(job_id, |r| r.mark_failed(failure, now))
            .await
    }

    async fn get(&self, job_id: JobId) -> Option<JobView> {
        self.jobs.lock().await.get(&job_id).map(|r| r.view.clone())
    }

    async fn history(&self, job_id: JobId) -> Option<Vec<JobView>> {
        self.jobs
            .lock()
            .await
            .get(&job_id)
            .map(|r| r.history.clone())
    }

    async fn request_cancel(&self, job_id: JobId) -> Result<(), StateStoreError> {
        let now = self.clock.now();
        self.with_record(job_id, |r| r.request_cancel(now)).await
    }

    async fn is_cancel_requested(&self, job_id: JobId) -> Result<bool, StateStoreError> {
        self.jobs
            .lock()
            .await
            .get(&job_id)
            .map(|r| r.cancel_requested)
            .ok_or(StateStoreError::UnknownJob(job_id))
    }
}
