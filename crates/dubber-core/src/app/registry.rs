//! Engine registry: stage + name -> engine.
//!
//! Built once during startup (mutable), then shared read-only behind an
//! `Arc`, so lookups take no locks.

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::{DEFAULT_ENGINE, PipelineError, StageKind};
use crate::impls::{DummySynthesizer, DummyTranscriber, DummyTranslator};
use crate::ports::{Synthesizer, Transcriber, Translator};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("{stage} engine '{name}' is already registered")]
    AlreadyRegistered { stage: StageKind, name: String },
}

/// One name space per stage: a translator and a synthesizer may share a name.
#[derive(Default)]
pub struct EngineRegistry {
    transcribers: HashMap<String, Arc<dyn Transcriber>>,
    translators: HashMap<String, Arc<dyn Translator>>,
    synthesizers: HashMap<String, Arc<dyn Synthesizer>>,
}

fn insert<E: ?Sized>(
    map: &mut HashMap<String, Arc<E>>,
    stage: StageKind,
    name: impl Into<String>,
    engine: Arc<E>,
) -> Result<(), RegistryError> {
    let name = name.into();
    if map.contains_key(&name) {
        return Err(RegistryError::AlreadyRegistered { stage, name });
    }
    map.insert(name, engine);
    Ok(())
}

fn lookup<E: ?Sized>(
    map: &HashMap<String, Arc<E>>,
    stage: StageKind,
    name: &str,
) -> Result<Arc<E>, PipelineError> {
    map.get(name)
        .cloned()
        .ok_or_else(|| PipelineError::UnknownEngine {
            stage,
            name: name.to_string(),
        })
}

impl EngineRegistry {
    /// Empty registry, without the built-in engines.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the placeholder engines under [`DEFAULT_ENGINE`].
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.transcribers.insert(DEFAULT_ENGINE.to_string(), Arc::new(DummyTranscriber));
        registry.translators.insert(DEFAULT_ENGINE.to_string(), Arc::new(DummyTranslator));
        registry.synthesizers.insert(DEFAULT_ENGINE.to_string(), Arc::new(DummySynthesizer));
        registry
    }

    /// Fails with [`RegistryError::AlreadyRegistered`] instead of replacing
    /// an engine. The same holds for the other `register_*` methods.
    pub fn register_transcriber(
        &mut self,
        name: impl Into<String>,
        engine: Arc<dyn Transcriber>,
    ) -> Result<(), RegistryError> {
        insert(&mut self.transcribers, StageKind::Transcription, name, engine)
    }

    pub fn register_translator(
        &mut self,
        name: impl Into<String>,
        engine: Arc<dyn Translator>,
    ) -> Result<(), RegistryError> {
        insert(&mut self.translators, StageKind::Translation, name, engine)
    }

    pub fn register_synthesizer(
        &mut self,
        name: impl Into<String>,
        engine: Arc<dyn Synthesizer>,
    ) -> Result<(), RegistryError> {
        insert(&mut self.synthesizers, StageKind::Synthesis, name, engine)
    }

    /// Engine registered under `name`, or [`PipelineError::UnknownEngine`].
    pub fn transcriber(&self, name: &str) -> Result<Arc<dyn Transcriber>, PipelineError> {
        lookup(&self.transcribers, StageKind::Transcription, name)
    }

    pub fn translator(&self, name: &str) -> Result<Arc<dyn Translator>, PipelineError> {
        lookup(&self.translators, StageKind::Translation, name)
    }

    pub fn synthesizer(&self, name: &str) -> Result<Arc<dyn Synthesizer>, PipelineError> {
        lookup(&self.synthesizers, StageKind::Synthesis, name)
    }

    /// Used to reject submissions before a job exists.
    pub fn contains(&self, stage: StageKind, name: &str) -> bool {
        match stage {
            StageKind::Transcription => self.transcribers.contains_key(name),
            StageKind::Translation => self.translators.contains_key(name),
            StageKind::Synthesis => self.synthesizers.contains_key(name),
        }
    }

    /// Registered names for a stage, sorted.
    pub fn names(&self, stage: StageKind) -> Vec<String> {
        let mut names: Vec<String> = match stage {
            StageKind::Transcription => self.transcribers.keys().cloned().collect(),
            StageKind::Translation => self.translators.keys().cloned().collect(),
            StageKind::Synthesis => self.synthesizers.keys().cloned().collect(),
        };
        names.sort();
        names
    }
}
