//! Drives one job through transcription and the per-language fan-out.
//!
//! The orchestrator is the only writer of a job's state while it runs:
//! it reports each step before starting it and records exactly one terminal
//! outcome at the end.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::Instrument;

use crate::domain::{
    DeliveryId, FailurePolicy, JobFailure, JobId, JobRequest, JobResult, LanguageCode,
    LanguageOutcome, LanguageStatus, PipelineError, Progress, QueueError, StageError,
    StageResult, StateStoreError, StepLabel,
};
use crate::ports::{JobRunner, JobStateStore, VideoStore};

use super::stage_executor::{StageExecutor, StageInput};

/// [`JobRunner`] for dubbing jobs. Steps run in order: `transcribe`, then
/// `translate:{lang}` and `tts:{lang}` for each language in request order.
/// The [`FailurePolicy`] decides whether a failing language ends the job.
pub struct JobOrchestrator {
    executor: StageExecutor,
    state: Arc<dyn JobStateStore>,
    videos: Arc<dyn VideoStore>,
    policy: FailurePolicy,
}

/// Where a language's fan-out stopped.
struct LanguageFailure {
    step: StepLabel,
    error: PipelineError,
    translation: Option<std::path::PathBuf>,
}

impl JobOrchestrator {
    pub fn new(
        executor: StageExecutor,
        state: Arc<dyn JobStateStore>,
        videos: Arc<dyn VideoStore>,
        policy: FailurePolicy,
    ) -> Self {
        Self {
            executor,
            state,
            videos,
            policy,
        }
    }

    /// Runs every stage of the job and returns its outcome without recording
    /// it. Progress updates are written as the job advances.
    pub async fn process(
        &self,
        job_id: JobId,
        request: &JobRequest,
    ) -> Result<JobResult, JobFailure> {
        let base = Progress::start(request.languages.len());

        let step = StepLabel::transcribe();
        let transcription = match self.transcribe(job_id, request, &step, base).await {
            Ok(transcription) => transcription,
            Err(e) => return Err(JobFailure::at(step, &e)),
        };

        let transcript_path = transcription.artifact.path;
        let transcript = transcription.text.unwrap_or_default();

        let mut outcomes: Vec<LanguageOutcome> = Vec::with_capacity(request.languages.len());
        let mut last_failure: Option<(StepLabel, PipelineError)> = None;

        for (index, language) in request.languages.iter().enumerate() {
            let progress = Progress {
                completed: 1 + 2 * index as u32,
                ..base
            };
            match self
                .fan_out(job_id, request, language, &transcript, progress)
                .await
            {
                Ok(outcome) => outcomes.push(outcome),
                Err(failure) => {
                    let continue_job = self.policy == FailurePolicy::BestEffort
                        && failure.error.is_language_scoped();
                    tracing::warn!(
                        %language,
                        step = %failure.step,
                        error = %failure.error,
                        continue_job,
                        "language failed"
                    );
                    outcomes.push(LanguageOutcome {
                        language: language.clone(),
                        status: LanguageStatus::Failed,
                        translation: failure.translation,
                        dub: None,
                        error: Some(StageError::new(failure.step.clone(), &failure.error)),
                    });

                    if !continue_job {
                        outcomes.extend(
                            request.languages[index + 1..]
                                .iter()
                                .cloned()
                                .map(LanguageOutcome::skipped),
                        );
                        return Err(JobFailure::at(failure.step, &failure.error)
                            .with_partial(transcript_path, outcomes));
                    }
                    last_failure = Some((failure.step, failure.error));
                }
            }
        }

        let any_succeeded = outcomes
            .iter()
            .any(|o| o.status == LanguageStatus::Succeeded);
        match last_failure {
            Some((step, error)) if !any_succeeded => {
                Err(JobFailure::at(step, &error).with_partial(transcript_path, outcomes))
            }
            _ => Ok(JobResult {
                transcript: transcript_path,
                languages: outcomes,
            }),
        }
    }

    /// Translate then synthesize one language.
    async fn fan_out(
        &self,
        job_id: JobId,
        request: &JobRequest,
        language: &LanguageCode,
        transcript: &str,
        progress: Progress,
    ) -> Result<LanguageOutcome, LanguageFailure> {
        let step = StepLabel::translate(language);
        let input = StageInput::Translate {
            video_id: request.video_id.clone(),
            text: transcript.to_string(),
            language: language.clone(),
            engine: request.engines.translation.clone(),
        };
        let translation = match self.stage(job_id, &step, progress, input).await {
            Ok(translation) => translation,
            Err(error) => {
                return Err(LanguageFailure {
                    step,
                    error,
                    translation: None,
                });
            }
        };

        let translation_path = translation.artifact.path;
        let translated = translation.text.unwrap_or_default();

        let step = StepLabel::tts(language);
        let input = StageInput::Synthesize {
            video_id: request.video_id.clone(),
            text: translated,
            language: language.clone(),
            engine: request.engines.synthesis.clone(),
        };
        let dub = match self.stage(job_id, &step, progress.advance(), input).await {
            Ok(dub) => dub,
            Err(error) => {
                return Err(LanguageFailure {
                    step,
                    error,
                    translation: Some(translation_path),
                });
            }
        };

        Ok(LanguageOutcome {
            language: language.clone(),
            status: LanguageStatus::Succeeded,
            translation: Some(translation_path),
            dub: Some(dub.artifact.path),
            error: None,
        })
    }

    async fn transcribe(
        &self,
        job_id: JobId,
        request: &JobRequest,
        step: &StepLabel,
        progress: Progress,
    ) -> Result<StageResult, PipelineError> {
        self.checkpoint(job_id, step, progress).await?;
        let video_path = self.videos.resolve(&request.video_id).await?;
        self.executor
            .execute(StageInput::Transcribe {
                video_id: request.video_id.clone(),
                video_path,
                engine: request.engines.transcription.clone(),
            })
            .await
    }

    async fn stage(
        &self,
        job_id: JobId,
        step: &StepLabel,
        progress: Progress,
        input: StageInput,
    ) -> Result<StageResult, PipelineError> {
        self.checkpoint(job_id, step, progress).await?;
        self.executor.execute(input).await
    }

    /// Stage boundary: honor a pending cancel, then publish the step.
    async fn checkpoint(
        &self,
        job_id: JobId,
        step: &StepLabel,
        progress: Progress,
    ) -> Result<(), PipelineError> {
        if self.state.is_cancel_requested(job_id).await? {
            return Err(PipelineError::Canceled);
        }
        self.state.update(job_id, step.clone(), progress).await?;
        tracing::debug!(%step, completed = progress.completed, total = progress.total, "stage started");
        Ok(())
    }
}

#[async_trait]
impl JobRunner for JobOrchestrator {
    async fn run(
        &self,
        job_id: JobId,
        request: JobRequest,
        delivery: DeliveryId,
    ) -> Result<(), PipelineError> {
        let span = tracing::info_span!("job", %job_id, %delivery, video_id = %request.video_id);
        async move {
            match self.state.get(job_id).await {
                None => {
                    tracing::error!("job is unknown to the state store, dropping delivery");
                    return Ok(());
                }
                Some(view) if view.is_terminal() => {
                    tracing::info!(state = %view.summary(), "job already terminal, skipping");
                    return Ok(());
                }
                Some(_) => {}
            }

            let started = Instant::now();
            let recorded = match self.process(job_id, &request).await {
                Ok(result) => {
                    tracing::info!(
                        languages = result.languages.len(),
                        all_succeeded = result.all_succeeded(),
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "job succeeded"
                    );
                    self.state.complete(job_id, result).await
                }
                Err(failure) => {
                    tracing::warn!(
                        step = %failure.step,
                        kind = %failure.kind,
                        message = %failure.message,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "job failed"
                    );
                    self.state.fail(job_id, failure).await
                }
            };

            match recorded {
                Ok(()) => Ok(()),
                Err(StateStoreError::AlreadyTerminal(_)) => {
                    tracing::warn!("job reached a terminal state elsewhere, outcome discarded");
                    Ok(())
                }
                Err(e) => Err(PipelineError::from(e)),
            }
        }
        .instrument(span)
        .await
    }

    /// Fails a job the queue gave up on, at the step it was stuck on.
    async fn abandon(&self, job_id: JobId, error: QueueError) {
        let span = tracing::info_span!("job", %job_id);
        async move {
            let step = match self.state.get(job_id).await {
                None => return,
                Some(view) if view.is_terminal() => return,
                Some(view) => view.step().cloned().unwrap_or_else(StepLabel::transcribe),
            };
            let error = PipelineError::from(error);
            tracing::error!(%step, %error, "job abandoned");
            match self.state.fail(job_id, JobFailure::at(step, &error)).await {
                Ok(()) | Err(StateStoreError::AlreadyTerminal(_)) => {}
                Err(e) => tracing::error!(error = %e, "could not record abandoned job"),
            }
        }
        .instrument(span)
        .await
    }
}
