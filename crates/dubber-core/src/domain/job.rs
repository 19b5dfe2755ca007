//! Job record, result and status views.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use super::errors::{ErrorKind, PipelineError, StateStoreError};
use super::ids::JobId;
use super::language::LanguageCode;
use super::request::JobRequest;
use super::stage::{Progress, StepLabel};

/// What the orchestrator does when one language's translate/synthesize stage fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Abort the job at the first failing language.
    #[default]
    FailFast,
    /// Record the failure against the language and continue with the rest.
    BestEffort,
}

impl std::str::FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "fail_fast" => Ok(FailurePolicy::FailFast),
            "best_effort" => Ok(FailurePolicy::BestEffort),
            other => Err(format!(
                "invalid failure policy '{other}', expected fail_fast or best_effort"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Queued,
    Started,
    Succeeded,
    Failed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LanguageStatus {
    Succeeded,
    Failed,
    /// Never attempted because the job aborted earlier.
    Skipped,
}

/// Error summary attached to a language or a failed job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageError {
    pub step: StepLabel,
    pub kind: ErrorKind,
    pub message: String,
}

impl StageError {
    pub fn new(step: StepLabel, error: &PipelineError) -> Self {
        Self {
            step,
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageOutcome {
    pub language: LanguageCode,
    pub status: LanguageStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dub: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<StageError>,
}

impl LanguageOutcome {
    pub fn skipped(language: LanguageCode) -> Self {
        Self {
            language,
            status: LanguageStatus::Skipped,
            translation: None,
            dub: None,
            error: None,
        }
    }
}

/// Result of a job whose transcription succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResult {
    pub transcript: PathBuf,
    /// One entry per requested language, in request order.
    pub languages: Vec<LanguageOutcome>,
}

impl JobResult {
    pub fn translation_paths(&self) -> Vec<&PathBuf> {
        self.languages
            .iter()
            .filter_map(|l| l.translation.as_ref())
            .collect()
    }

    pub fn dub_paths(&self) -> Vec<&PathBuf> {
        self.languages.iter().filter_map(|l| l.dub.as_ref()).collect()
    }

    pub fn outcome(&self, language: &str) -> Option<&LanguageOutcome> {
        self.languages.iter().find(|l| l.language.as_str() == language)
    }

    pub fn all_succeeded(&self) -> bool {
        self.languages
            .iter()
            .all(|l| l.status == LanguageStatus::Succeeded)
    }
}

/// Terminal failure report: the failing step plus whatever was produced before it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobFailure {
    pub step: StepLabel,
    pub kind: ErrorKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub languages: Vec<LanguageOutcome>,
}

impl JobFailure {
    pub fn at(step: StepLabel, error: &PipelineError) -> Self {
        Self {
            step,
            kind: error.kind(),
            message: error.to_string(),
            transcript: None,
            languages: Vec::new(),
        }
    }

    pub fn with_partial(mut self, transcript: PathBuf, languages: Vec<LanguageOutcome>) -> Self {
        self.transcript = Some(transcript);
        self.languages = languages;
        self
    }

    pub fn outcome(&self, language: &str) -> Option<&LanguageOutcome> {
        self.languages.iter().find(|l| l.language.as_str() == language)
    }
}

impl fmt::Display for JobFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed at {} ({}): {}", self.step, self.kind, self.message)
    }
}

/// What a poller sees. Non-terminal variants carry a step label, terminal ones
/// carry a result or an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum JobView {
    Queued,
    Started { step: StepLabel, progress: Progress },
    Succeeded { result: JobResult },
    Failed { failure: JobFailure },
}

impl JobView {
    pub fn state(&self) -> JobState {
        match self {
            JobView::Queued => JobState::Queued,
            JobView::Started { .. } => JobState::Started,
            JobView::Succeeded { .. } => JobState::Succeeded,
            JobView::Failed { .. } => JobState::Failed,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state().is_terminal()
    }

    /// Current step for started jobs, failing step for failed ones.
    pub fn step(&self) -> Option<&StepLabel> {
        match self {
            JobView::Started { step, .. } => Some(step),
            JobView::Failed { failure } => Some(&failure.step),
            _ => None,
        }
    }

    /// Compact form used in logs and transition histories:
    /// `queued`, `started(tts:fr)`, `succeeded`, `failed(transcribe)`.
    pub fn summary(&self) -> String {
        match self {
            JobView::Queued => "queued".to_string(),
            JobView::Started { step, .. } => format!("started({step})"),
            JobView::Succeeded { .. } => "succeeded".to_string(),
            JobView::Failed { failure } => format!("failed({})", failure.step),
        }
    }
}

/// Stored job. State changes only go through the methods below, which refuse
/// to touch a terminal job.
#[derive(Debug, Clone)]
pub struct JobRecord {
    pub job_id: JobId,
    pub request: JobRequest,
    pub view: JobView,
    pub cancel_requested: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Every view the job has been in, oldest first.
    pub history: Vec<JobView>,
}

impl JobRecord {
    pub fn new(job_id: JobId, request: JobRequest, now: DateTime<Utc>) -> Self {
        Self {
            job_id,
            request,
            view: JobView::Queued,
            cancel_requested: false,
            created_at: now,
            updated_at: now,
            history: vec![JobView::Queued],
        }
    }

    pub fn start_step(
        &mut self,
        step: StepLabel,
        progress: Progress,
        now: DateTime<Utc>,
    ) -> Result<(), StateStoreError> {
        self.transition(JobView::Started { step, progress }, now)
    }

    pub fn mark_succeeded(
        &mut self,
        result: JobResult,
        now: DateTime<Utc>,
    ) -> Result<(), StateStoreError> {
        self.transition(JobView::Succeeded { result }, now)
    }

    pub fn mark_failed(
        &mut self,
        failure: JobFailure,
        now: DateTime<Utc>,
    ) -> Result<(), StateStoreError> {
        self.transition(JobView::Failed { failure }, now)
    }

    pub fn request_cancel(&mut self, now: DateTime<Utc>) -> Result<(), StateStoreError> {
        if self.view.is_terminal() {
            return Err(StateStoreError::AlreadyTerminal(self.job_id));
        }
        self.cancel_requested = true;
        self.updated_at = now;
        Ok(())
    }

    fn transition(&mut self, next: JobView, now: DateTime<Utc>) -> Result<(), StateStoreError> {
        if self.view.is_terminal() {
            return Err(StateStoreError::AlreadyTerminal(self.job_id));
        }
        self.history.push(next.clone());
        self.view = next;
        self.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ids::VideoId;
    use crate::domain::request::EngineNames;
    use rstest::rstest;
    use ulid::Ulid;

    fn record() -> JobRecord {
        let request = JobRequest::new(
            VideoId::parse("v1").unwrap(),
            vec![LanguageCode::parse("fr").unwrap()],
            EngineNames::default(),
        )
        .unwrap();
        JobRecord::new(JobId::from_ulid(Ulid::new()), request, Utc::now())
    }

    fn result() -> JobResult {
        JobResult {
            transcript: PathBuf::from("transcripts/v1_transcript.txt"),
            languages: vec![],
        }
    }

    #[test]
    fn new_job_starts_queued() {
        let job = record();
        assert_eq!(job.view, JobView::Queued);
        assert_eq!(job.history.len(), 1);
    }

    #[test]
    fn steps_are_recorded_in_order() {
        let mut job = record();
        let fr = LanguageCode::parse("fr").unwrap();
        let p = Progress::start(1);
        job.start_step(StepLabel::transcribe(), p, Utc::now()).unwrap();
        job.start_step(StepLabel::translate(&fr), p.advance(), Utc::now())
            .unwrap();
        job.mark_succeeded(result(), Utc::now()).unwrap();

        let summary: Vec<String> = job.history.iter().map(JobView::summary).collect();
        assert_eq!(
            summary,
            vec!["queued", "started(transcribe)", "started(translate:fr)", "succeeded"]
        );
    }

    #[rstest]
    #[case::after_success(true)]
    #[case::after_failure(false)]
    fn terminal_jobs_do_not_reopen(#[case] succeed: bool) {
        let mut job = record();
        if succeed {
            job.mark_succeeded(result(), Utc::now()).unwrap();
        } else {
            let failure = JobFailure::at(StepLabel::transcribe(), &PipelineError::Canceled);
            job.mark_failed(failure, Utc::now()).unwrap();
        }
        let before = job.view.clone();

        let err = job
            .start_step(StepLabel::transcribe(), Progress::start(1), Utc::now())
            .unwrap_err();
        assert_eq!(err, StateStoreError::AlreadyTerminal(job.job_id));
        assert!(job.mark_succeeded(result(), Utc::now()).is_err());
        assert!(job.request_cancel(Utc::now()).is_err());
        assert_eq!(job.view, before);
    }

    #[test]
    fn view_serializes_with_state_tag() {
        let view = JobView::Started {
            step: StepLabel::transcribe(),
            progress: Progress::start(2),
        };
        let v = serde_json::to_value(&view).unwrap();
        assert_eq!(v["state"], "started");
        assert_eq!(v["step"], "transcribe");
        assert_eq!(v["progress"]["total"], 5);

        let queued = serde_json::to_value(JobView::Queued).unwrap();
        assert_eq!(queued, serde_json::json!({ "state": "queued" }));
    }

    #[test]
    fn failed_view_exposes_step_and_cause() {
        let failure = JobFailure::at(
            StepLabel::transcribe(),
            &PipelineError::engine_failure(
                crate::domain::StageKind::Transcription,
                "dummy",
                "model crashed",
            ),
        );
        let view = JobView::Failed { failure };
        assert_eq!(view.step().map(|s| s.as_str()), Some("transcribe"));
        assert_eq!(view.summary(), "failed(transcribe)");
        let v = serde_json::to_value(&view).unwrap();
        assert_eq!(v["failure"]["kind"], "engine_failure");
        assert!(v["failure"]["message"].as_str().unwrap().contains("model crashed"));
    }

    #[test]
    fn failure_policy_parses_both_spellings() {
        assert_eq!("best-effort".parse::<FailurePolicy>(), Ok(FailurePolicy::BestEffort));
        assert_eq!("fail_fast".parse::<FailurePolicy>(), Ok(FailurePolicy::FailFast));
        assert!("retry".parse::<FailurePolicy>().is_err());
    }
}
