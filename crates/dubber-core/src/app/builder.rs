//! PipelineBuilder: wiring plus fail-fast startup checks.
//!
//! `build()` refuses to produce a service whose default engines are not
//! registered, so a misconfigured deployment fails at startup rather than
//! on its first job.
//!
//! The builder owns the choice of adapters: filesystem stores under the
//! storage root, the in-memory state store and task queue, and ffmpeg for
//! audio extraction. Engines are registered on top of the built-in
//! `dummy` set.
//!
//! ```text
//! PipelineBuilder::from_config(&config)
//!     .register_translator("deepl", Arc::new(DeepL::new(key)))?
//!     .build()?            // BuildError::MissingEngines if a default is absent
//!     .start().await?;     // spawn the worker pool
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::config::PipelineConfig;
use crate::domain::{EngineNames, FailurePolicy, StageKind};
use crate::impls::{
    FfmpegTranscoder, FsArtifactStore, FsVideoStore, InMemoryJobStateStore, InMemoryTaskQueue,
};
use crate::ports::{
    ArtifactStore, Clock, IdGenerator, JobStateStore, MediaTranscoder, Synthesizer, SystemClock,
    TaskQueue, Transcriber, Translator, UlidGenerator, VideoStore,
};

use super::orchestrator::JobOrchestrator;
use super::registry::{EngineRegistry, RegistryError};
use super::service::DubbingService;
use super::stage_executor::StageExecutor;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    /// Each entry is `stage:name`, e.g. `translation:deepl`.
    #[error("default engines are not registered: {}", .0.join(", "))]
    MissingEngines(Vec<String>),
}

/// Assembles a [`DubbingService`]. Setters consume and return the builder.
pub struct PipelineBuilder {
    storage_root: PathBuf,
    registry: EngineRegistry,
    defaults: EngineNames,
    policy: FailurePolicy,
    workers: usize,
    max_deliveries: u32,
    stage_timeout: Option<Duration>,
    clock: Arc<dyn Clock>,
    transcoder: Option<Arc<dyn MediaTranscoder>>,
    ffmpeg_path: PathBuf,
}

impl PipelineBuilder {
    /// Builder with the built-in engines and default settings.
    pub fn new(storage_root: impl Into<PathBuf>) -> Self {
        let defaults = PipelineConfig::default();
        Self {
            storage_root: storage_root.into(),
            registry: EngineRegistry::with_builtin(),
            defaults: defaults.engine_names(),
            policy: defaults.failure_policy,
            workers: defaults.workers,
            max_deliveries: defaults.max_deliveries,
            stage_timeout: defaults.stage_timeout(),
            clock: Arc::new(SystemClock),
            transcoder: None,
            ffmpeg_path: defaults.ffmpeg_path,
        }
    }

    /// Builder seeded from a loaded configuration. Engines still have to be
    /// registered for any default that is not `dummy`.
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.storage_dir.clone())
            .default_engines(config.engine_names())
            .failure_policy(config.failure_policy)
            .workers(config.workers)
            .max_deliveries(config.max_deliveries)
            .stage_timeout(config.stage_timeout())
            .ffmpeg_path(config.ffmpeg_path.clone())
    }

    /// Add a transcription engine under `name`.
    ///
    /// # Errors
    ///
    /// [`RegistryError::AlreadyRegistered`] if `name` is taken, including by
    /// a built-in engine.
    pub fn register_transcriber(
        mut self,
        name: impl Into<String>,
        engine: Arc<dyn Transcriber>,
    ) -> Result<Self, RegistryError> {
        self.registry.register_transcriber(name, engine)?;
        Ok(self)
    }

    /// Add a translation engine under `name`. Errors as
    /// [`PipelineBuilder::register_transcriber`].
    pub fn register_translator(
        mut self,
        name: impl Into<String>,
        engine: Arc<dyn Translator>,
    ) -> Result<Self, RegistryError> {
        self.registry.register_translator(name, engine)?;
        Ok(self)
    }

    /// Add a speech synthesis engine under `name`. Errors as
    /// [`PipelineBuilder::register_transcriber`].
    pub fn register_synthesizer(
        mut self,
        name: impl Into<String>,
        engine: Arc<dyn Synthesizer>,
    ) -> Result<Self, RegistryError> {
        self.registry.register_synthesizer(name, engine)?;
        Ok(self)
    }

    /// Engines used for stages a submission leaves unset. Checked by
    /// [`PipelineBuilder::build`].
    pub fn default_engines(mut self, names: EngineNames) -> Self {
        self.defaults = names;
        self
    }

    /// How the per-language fan-out reacts to a failing language.
    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Number of queue workers, i.e. jobs processed concurrently. At least 1.
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Attempts per job before the queue gives up on it and the job is
    /// failed. At least 1.
    pub fn max_deliveries(mut self, max_deliveries: u32) -> Self {
        self.max_deliveries = max_deliveries;
        self
    }

    /// Upper bound on a single engine call. `None` lets calls run forever.
    pub fn stage_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.stage_timeout = timeout;
        self
    }

    /// Clock for timestamps and ULID generation.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// ffmpeg binary used by the default transcoder. Ignored when
    /// [`PipelineBuilder::transcoder`] is set.
    pub fn ffmpeg_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ffmpeg_path = path.into();
        self
    }

    /// Replace the ffmpeg transcoder.
    pub fn transcoder(mut self, transcoder: Arc<dyn MediaTranscoder>) -> Self {
        self.transcoder = Some(transcoder);
        self
    }

    /// Validate the defaults and wire the service. Workers are not started;
    /// call [`DubbingService::start`].
    pub fn build(self) -> Result<DubbingService, BuildError> {
        let missing: Vec<String> = StageKind::ALL
            .into_iter()
            .filter(|&stage| !self.registry.contains(stage, self.defaults.for_stage(stage)))
            .map(|stage| format!("{stage}:{}", self.defaults.for_stage(stage)))
            .collect();
        if !missing.is_empty() {
            return Err(BuildError::MissingEngines(missing));
        }

        let ids: Arc<dyn IdGenerator> = Arc::new(UlidGenerator::new(Arc::clone(&self.clock)));
        let registry = Arc::new(self.registry);
        let artifacts: Arc<dyn ArtifactStore> =
            Arc::new(FsArtifactStore::new(self.storage_root.clone()));
        let videos: Arc<dyn VideoStore> =
            Arc::new(FsVideoStore::new(&self.storage_root, Arc::clone(&ids)));
        let jobs = Arc::new(InMemoryJobStateStore::new(Arc::clone(&self.clock)));
        let state: Arc<dyn JobStateStore> = jobs.clone();
        let queue = Arc::new(InMemoryTaskQueue::new(
            Arc::clone(&ids),
            self.workers,
            self.max_deliveries,
        ));
        let transcoder = self
            .transcoder
            .unwrap_or_else(|| Arc::new(FfmpegTranscoder::new(self.ffmpeg_path)) as Arc<dyn MediaTranscoder>);

        let executor = StageExecutor::new(Arc::clone(&registry), Arc::clone(&artifacts))
            .with_timeout(self.stage_timeout);
        let orchestrator = Arc::new(JobOrchestrator::new(
            executor,
            Arc::clone(&state),
            Arc::clone(&videos),
            self.policy,
        ));

        tracing::debug!(
            root = %self.storage_root.display(),
            policy = ?self.policy,
            workers = self.workers,
            "pipeline built"
        );
        Ok(DubbingService {
            videos,
            artifacts,
            state,
            jobs,
            queue: queue.clone() as Arc<dyn TaskQueue>,
            queue_stats: queue,
            registry,
            orchestrator,
            transcoder,
            defaults: self.defaults,
        })
    }
}
