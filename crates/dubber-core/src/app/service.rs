//! DubbingService: the surface callers use.
//!
//! Every request is validated here, before a job exists. Once `submit`
//! returns a job id, the job is `queued` and owned by the queue and the
//! orchestrator.
//!
//! Typical flow:
//!
//! ```text
//! upload_video("talk.mp4", bytes) -> VideoId
//! submit(JobSubmission::new(video_id, ["fr", "es"])) -> JobId
//! status(job_id) / wait(job_id, poll) -> JobView
//! list_assets(&video_id) -> AssetListing
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::domain::{
    AssetListing, EngineNames, JobFailure, JobId, JobRequest, JobSubmission, JobView,
    PipelineError, StageKind, StateStoreError, StepLabel, TranscodeOptions, VideoId,
};
use crate::impls::{InMemoryJobStateStore, InMemoryTaskQueue};
use crate::observability::{JobCounts, QueueCounts};
use crate::ports::{ArtifactStore, JobStateStore, MediaTranscoder, TaskQueue, VideoStore};

use super::orchestrator::JobOrchestrator;
use super::registry::EngineRegistry;

/// Built by [`super::PipelineBuilder`].
pub struct DubbingService {
    pub(super) videos: Arc<dyn VideoStore>,
    pub(super) artifacts: Arc<dyn ArtifactStore>,
    pub(super) state: Arc<dyn JobStateStore>,
    pub(super) jobs: Arc<InMemoryJobStateStore>,
    pub(super) queue: Arc<dyn TaskQueue>,
    pub(super) queue_stats: Arc<InMemoryTaskQueue>,
    pub(super) registry: Arc<EngineRegistry>,
    pub(super) orchestrator: Arc<JobOrchestrator>,
    pub(super) transcoder: Arc<dyn MediaTranscoder>,
    pub(super) defaults: EngineNames,
}

/// Engines available for one stage, plus the one used when a submission
/// names none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageEngines {
    pub stage: StageKind,
    pub default: String,
    /// Sorted.
    pub registered: Vec<String>,
}

fn unknown_job(e: StateStoreError) -> PipelineError {
    match e {
        StateStoreError::UnknownJob(id) => PipelineError::UnknownJob(id),
        other => PipelineError::StateStore(other),
    }
}

impl DubbingService {
    /// Start the worker pool. Jobs submitted earlier wait in the queue.
    pub async fn start(&self) -> Result<(), PipelineError> {
        self.queue.start(self.orchestrator.clone()).await?;
        Ok(())
    }

    /// Stop taking deliveries and wait for running jobs.
    pub async fn shutdown(&self) {
        self.queue.shutdown().await;
    }

    /// Registered engines per stage, in pipeline order.
    pub fn engines(&self) -> Vec<StageEngines> {
        StageKind::ALL
            .into_iter()
            .map(|stage| StageEngines {
                stage,
                default: self.defaults.for_stage(stage).to_string(),
                registered: self.registry.names(stage),
            })
            .collect()
    }

    /// Store an uploaded video and return its new id.
    ///
    /// `original_name` only contributes its extension, so
    /// `talk.MP4` is stored as `videos/{id}.mp4`.
    pub async fn upload_video(
        &self,
        original_name: &str,
        bytes: &[u8],
    ) -> Result<VideoId, PipelineError> {
        self.videos.put(original_name, bytes).await
    }

    /// Validate and enqueue. On rejection no job is created.
    ///
    /// Engines left unset in `submission` fall back to the configured
    /// defaults. Languages are parsed and deduplicated.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::InvalidRequest`] for a malformed video id, a bad
    ///   language code or an empty language list.
    /// - [`PipelineError::VideoNotFound`] if nothing was uploaded under the id.
    /// - [`PipelineError::UnknownEngine`] if a stage names an unregistered engine.
    /// - [`PipelineError::Queue`] if the queue refuses the job; the job is
    ///   then recorded as failed at step `enqueue`.
    pub async fn submit(&self, submission: JobSubmission) -> Result<JobId, PipelineError> {
        let request = JobRequest::from_submission(&submission, &self.defaults)?;
        self.videos.resolve(&request.video_id).await?;
        for stage in StageKind::ALL {
            let name = request.engines.for_stage(stage);
            if !self.registry.contains(stage, name) {
                return Err(PipelineError::UnknownEngine {
                    stage,
                    name: name.to_string(),
                });
            }
        }

        let job_id = self.queue.next_job_id();
        self.state.create(job_id, request.clone()).await?;
        if let Err(e) = self.queue.enqueue(job_id, request).await {
            let err = PipelineError::from(e);
            let _ = self
                .state
                .fail(job_id, JobFailure::at(StepLabel::enqueue(), &err))
                .await;
            return Err(err);
        }

        tracing::info!(%job_id, video_id = %submission.video_id, "job submitted");
        Ok(job_id)
    }

    /// Current view of a job, or [`PipelineError::UnknownJob`].
    pub async fn status(&self, job_id: JobId) -> Result<JobView, PipelineError> {
        self.state
            .get(job_id)
            .await
            .ok_or(PipelineError::UnknownJob(job_id))
    }

    /// Views the job went through, oldest first.
    pub async fn history(&self, job_id: JobId) -> Result<Vec<JobView>, PipelineError> {
        self.state
            .history(job_id)
            .await
            .ok_or(PipelineError::UnknownJob(job_id))
    }

    /// Poll every `poll` until the job is terminal. Callers wanting a
    /// deadline wrap this in `tokio::time::timeout`.
    pub async fn wait(&self, job_id: JobId, poll: Duration) -> Result<JobView, PipelineError> {
        loop {
            let view = self.status(job_id).await?;
            if view.is_terminal() {
                return Ok(view);
            }
            tokio::time::sleep(poll).await;
        }
    }

    /// Ask a job to stop at its next stage boundary.
    pub async fn cancel(&self, job_id: JobId) -> Result<(), PipelineError> {
        self.state.request_cancel(job_id).await.map_err(unknown_job)?;
        tracing::info!(%job_id, "cancel requested");
        Ok(())
    }

    /// Transcript, translations and dubs stored for `video_id`, sorted by
    /// path. Unknown videos yield an empty listing.
    pub async fn list_assets(&self, video_id: &VideoId) -> Result<AssetListing, PipelineError> {
        self.artifacts.list_all(video_id).await
    }

    /// Extract the audio track of a stored video into `audio/{video_id}.{ext}`.
    pub async fn convert_audio(
        &self,
        video_id: &VideoId,
        options: TranscodeOptions,
    ) -> Result<PathBuf, PipelineError> {
        options.validate()?;
        let input = self.videos.resolve(video_id).await?;
        let output = self.artifacts.audio_path_for(video_id, options.format);
        self.artifacts.ensure_parent_dir(&output).await?;
        self.transcoder.transcode(&input, &output, &options).await?;
        tracing::info!(%video_id, path = %output.display(), "audio converted");
        Ok(output)
    }

    /// Jobs per state, for health output.
    pub async fn job_counts(&self) -> JobCounts {
        self.jobs.counts().await
    }

    /// Delivery counters of the task queue.
    pub async fn queue_counts(&self) -> QueueCounts {
        self.queue_stats.counts().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::builder::PipelineBuilder;
    use crate::domain::{
        AudioFormat, EngineSelection, ErrorKind, FailurePolicy, LanguageCode, LanguageStatus,
        QueueError,
    };
    use crate::ports::{EngineError, Translator};
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::Mutex;

    const POLL: Duration = Duration::from_millis(5);

    struct FailingFor(&'static str);

    #[async_trait]
    impl Translator for FailingFor {
        async fn translate(&self, text: &str, language: &LanguageCode) -> Result<String, EngineError> {
            if language.as_str() == self.0 {
                return Err(EngineError::Failed("quota exceeded".to_string()));
            }
            Ok(format!("<{language}> {text}"))
        }
    }

    /// Records calls and creates the output file.
    #[derive(Default)]
    struct RecordingTranscoder {
        calls: Mutex<Vec<(PathBuf, PathBuf, TranscodeOptions)>>,
    }

    #[async_trait]
    impl MediaTranscoder for RecordingTranscoder {
        async fn transcode(
            &self,
            input: &Path,
            output: &Path,
            options: &TranscodeOptions,
        ) -> Result<(), PipelineError> {
            self.calls
                .lock()
                .unwrap()
                .push((input.to_path_buf(), output.to_path_buf(), *options));
            tokio::fs::write(output, b"audio")
                .await
                .map_err(|e| PipelineError::storage(output, e))
        }
    }

    async fn service(root: &Path, policy: FailurePolicy) -> DubbingService {
        let service = PipelineBuilder::new(root)
            .register_translator("no-es", Arc::new(FailingFor("es")))
            .unwrap()
            .failure_policy(policy)
            .workers(2)
            .transcoder(Arc::new(RecordingTranscoder::default()))
            .build()
            .unwrap();
        service.start().await.unwrap();
        service
    }

    async fn submit_and_wait(service: &DubbingService, submission: JobSubmission) -> (JobId, JobView) {
        let job_id = service.submit(submission).await.unwrap();
        let view = tokio::time::timeout(Duration::from_secs(5), service.wait(job_id, POLL))
            .await
            .expect("job did not finish")
            .unwrap();
        (job_id, view)
    }

    fn names(paths: &[PathBuf]) -> Vec<String> {
        paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[tokio::test]
    async fn engines_lists_registered_names_and_defaults_per_stage() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path(), FailurePolicy::FailFast).await;

        let engines = service.engines();
        let stages: Vec<StageKind> = engines.iter().map(|e| e.stage).collect();
        assert_eq!(stages, StageKind::ALL.to_vec());
        assert_eq!(engines[1].default, "dummy");
        assert_eq!(engines[1].registered, vec!["dummy", "no-es"]);
        assert_eq!(engines[0].registered, vec!["dummy"]);
        service.shutdown().await;
    }

    #[tokio::test]
    async fn upload_submit_and_list_assets() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path(), FailurePolicy::FailFast).await;

        let video_id = service.upload_video("talk.mp4", b"video").await.unwrap();
        let (job_id, view) =
            submit_and_wait(&service, JobSubmission::new(video_id.as_str(), ["fr", "es"])).await;
        assert!(matches!(view, JobView::Succeeded { .. }), "{view:?}");

        let history: Vec<String> = service
            .history(job_id)
            .await
            .unwrap()
            .iter()
            .map(JobView::summary)
            .collect();
        assert_eq!(
            history,
            vec![
                "queued",
                "started(transcribe)",
                "started(translate:fr)",
                "started(tts:fr)",
                "started(translate:es)",
                "started(tts:es)",
                "succeeded",
            ]
        );

        let assets = service.list_assets(&video_id).await.unwrap();
        assert_eq!(
            names(&assets.transcripts),
            vec![format!("{video_id}_transcript.txt")]
        );
        assert_eq!(
            names(&assets.translations),
            vec![format!("{video_id}_es.txt"), format!("{video_id}_fr.txt")]
        );
        assert_eq!(
            names(&assets.dubs),
            vec![format!("{video_id}_es.wav"), format!("{video_id}_fr.wav")]
        );
        service.shutdown().await;
    }

    #[tokio::test]
    async fn resubmitting_overwrites_instead_of_duplicating() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path(), FailurePolicy::FailFast).await;
        let video_id = service.upload_video("talk.mp4", b"video").await.unwrap();

        for _ in 0..2 {
            submit_and_wait(&service, JobSubmission::new(video_id.as_str(), ["fr"])).await;
        }

        let assets = service.list_assets(&video_id).await.unwrap();
        assert_eq!(assets.transcripts.len(), 1);
        assert_eq!(assets.translations.len(), 1);
        assert_eq!(assets.dubs.len(), 1);
        service.shutdown().await;
    }

    #[tokio::test]
    async fn unknown_video_is_rejected_without_a_job() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path(), FailurePolicy::FailFast).await;

        let err = service
            .submit(JobSubmission::new("missing", ["fr"]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::VideoNotFound);
        assert_eq!(service.job_counts().await.total(), 0);
        service.shutdown().await;
    }

    #[tokio::test]
    async fn unknown_engine_is_rejected_before_any_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path(), FailurePolicy::FailFast).await;
        let video_id = service.upload_video("talk.mp4", b"video").await.unwrap();

        let submission = JobSubmission::new(video_id.as_str(), ["fr"]).with_engines(
            EngineSelection {
                translation: Some("nonexistent".to_string()),
                ..Default::default()
            },
        );
        let err = service.submit(submission).await.unwrap_err();

        assert!(matches!(
            err,
            PipelineError::UnknownEngine { stage: StageKind::Translation, ref name } if name == "nonexistent"
        ));
        assert_eq!(service.job_counts().await.total(), 0);
        assert!(service.list_assets(&video_id).await.unwrap().is_empty());
        service.shutdown().await;
    }

    #[tokio::test]
    async fn invalid_languages_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path(), FailurePolicy::FailFast).await;
        let video_id = service.upload_video("talk.mp4", b"video").await.unwrap();

        for langs in [vec![], vec!["fr", "not a language"]] {
            let err = service
                .submit(JobSubmission::new(video_id.as_str(), langs))
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidRequest);
        }
        service.shutdown().await;
    }

    #[tokio::test]
    async fn fail_fast_reports_the_failing_language_and_what_exists() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path(), FailurePolicy::FailFast).await;
        let video_id = service.upload_video("talk.mp4", b"video").await.unwrap();

        let submission = JobSubmission::new(video_id.as_str(), ["fr", "es"]).with_engines(
            EngineSelection {
                translation: Some("no-es".to_string()),
                ..Default::default()
            },
        );
        let (_, view) = submit_and_wait(&service, submission).await;

        let JobView::Failed { failure } = view else {
            panic!("expected failure, got {view:?}");
        };
        assert_eq!(failure.step, "translate:es");
        assert_eq!(failure.kind, ErrorKind::EngineFailure);
        assert!(failure.message.contains("quota exceeded"));
        assert_eq!(failure.outcome("fr").unwrap().status, LanguageStatus::Succeeded);

        let assets = service.list_assets(&video_id).await.unwrap();
        assert_eq!(names(&assets.dubs), vec![format!("{video_id}_fr.wav")]);
        service.shutdown().await;
    }

    #[tokio::test]
    async fn status_of_unknown_job_is_distinct_from_failed() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path(), FailurePolicy::FailFast).await;
        let job_id = JobId::from_ulid(ulid::Ulid::new());

        let err = service.status(job_id).await.unwrap_err();
        assert!(matches!(err, PipelineError::UnknownJob(id) if id == job_id));
        assert!(matches!(service.cancel(job_id).await, Err(PipelineError::UnknownJob(_))));
        service.shutdown().await;
    }

    #[tokio::test]
    async fn cancel_before_workers_start_fails_the_job() {
        let dir = tempfile::tempdir().unwrap();
        let service = PipelineBuilder::new(dir.path()).build().unwrap();
        let video_id = service.upload_video("talk.mp4", b"video").await.unwrap();

        let job_id = service
            .submit(JobSubmission::new(video_id.as_str(), ["fr"]))
            .await
            .unwrap();
        assert_eq!(service.status(job_id).await.unwrap(), JobView::Queued);
        service.cancel(job_id).await.unwrap();

        service.start().await.unwrap();
        let view = tokio::time::timeout(Duration::from_secs(5), service.wait(job_id, POLL))
            .await
            .unwrap()
            .unwrap();
        let JobView::Failed { failure } = view else {
            panic!("expected failure, got {view:?}");
        };
        assert_eq!(failure.kind, ErrorKind::Canceled);
        assert!(service.list_assets(&video_id).await.unwrap().is_empty());
        service.shutdown().await;
    }

    #[tokio::test]
    async fn submit_after_shutdown_fails_the_created_job() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path(), FailurePolicy::FailFast).await;
        let video_id = service.upload_video("talk.mp4", b"video").await.unwrap();
        service.shutdown().await;

        let err = service
            .submit(JobSubmission::new(video_id.as_str(), ["fr"]))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Queue(QueueError::NotRunning)));
        let counts = service.job_counts().await;
        assert_eq!(counts.failed, 1);
    }

    #[tokio::test]
    async fn convert_audio_writes_to_the_audio_directory() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path(), FailurePolicy::FailFast).await;
        let video_id = service.upload_video("talk.mp4", b"video").await.unwrap();

        let options = TranscodeOptions {
            format: AudioFormat::Mp3,
            bitrate_kbps: Some(128),
            ..Default::default()
        };
        let path = service.convert_audio(&video_id, options).await.unwrap();

        assert_eq!(path, dir.path().join("audio").join(format!("{video_id}.mp3")));
        assert_eq!(std::fs::read(&path).unwrap(), b"audio");
        service.shutdown().await;
    }

    #[tokio::test]
    async fn convert_audio_rejects_unknown_video_and_bad_options() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path(), FailurePolicy::FailFast).await;

        let missing = VideoId::parse("missing").unwrap();
        let err = service
            .convert_audio(&missing, TranscodeOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::VideoNotFound);

        let video_id = service.upload_video("talk.mp4", b"video").await.unwrap();
        let err = service
            .convert_audio(
                &video_id,
                TranscodeOptions {
                    sample_rate: 1,
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
        assert!(!dir.path().join("audio").exists());
        service.shutdown().await;
    }
}
