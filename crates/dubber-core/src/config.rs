//! Pipeline configuration.
//!
//! Sources, later ones win:
//! 1. built-in defaults
//! 2. `dubber.toml` in the working directory (optional), or an explicit file
//! 3. environment variables prefixed `DUBBER`, nested with `__`
//!    (`DUBBER__WORKERS=4`, `DUBBER__ENGINES__TRANSLATION=deepl`)

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::domain::{DEFAULT_ENGINE, EngineNames, FailurePolicy};

pub const DEFAULT_CONFIG_FILE: &str = "dubber";
pub const ENV_PREFIX: &str = "DUBBER";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EngineDefaults {
    #[serde(default = "default_engine")]
    pub transcription: String,
    #[serde(default = "default_engine")]
    pub translation: String,
    #[serde(default = "default_engine")]
    pub synthesis: String,
}

impl Default for EngineDefaults {
    fn default() -> Self {
        Self {
            transcription: default_engine(),
            translation: default_engine(),
            synthesis: default_engine(),
        }
    }
}

impl From<EngineDefaults> for EngineNames {
    fn from(d: EngineDefaults) -> Self {
        EngineNames {
            transcription: d.transcription,
            translation: d.translation,
            synthesis: d.synthesis,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_max_deliveries")]
    pub max_deliveries: u32,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
    #[serde(default)]
    pub stage_timeout_secs: Option<u64>,
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,
    #[serde(default)]
    pub engines: EngineDefaults,
}

fn default_engine() -> String {
    DEFAULT_ENGINE.to_string()
}

fn default_storage_dir() -> PathBuf {
    PathBuf::from("storage")
}

fn default_workers() -> usize {
    2
}

fn default_max_deliveries() -> u32 {
    3
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            storage_dir: default_storage_dir(),
            workers: default_workers(),
            max_deliveries: default_max_deliveries(),
            failure_policy: FailurePolicy::default(),
            stage_timeout_secs: None,
            ffmpeg_path: default_ffmpeg_path(),
            engines: EngineDefaults::default(),
        }
    }
}

impl PipelineConfig {
    /// Load from `path` (required when given) or the optional `dubber.toml`,
    /// then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(
            path,
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
    }

    pub fn load_with_env(path: Option<&Path>, env: Environment) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };
        let config: PipelineConfig = Config::builder()
            .add_source(file)
            .add_source(env)
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::Invalid("workers must be at least 1".to_string()));
        }
        if self.max_deliveries == 0 {
            return Err(ConfigError::Invalid(
                "max_deliveries must be at least 1".to_string(),
            ));
        }
        if self.stage_timeout_secs == Some(0) {
            return Err(ConfigError::Invalid(
                "stage_timeout_secs must be positive when set".to_string(),
            ));
        }
        let engines = [
            ("transcription", &self.engines.transcription),
            ("translation", &self.engines.translation),
            ("synthesis", &self.engines.synthesis),
        ];
        for (stage, name) in engines {
            if name.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "engines.{stage} must not be empty"
                )));
            }
        }
        Ok(())
    }

    pub fn stage_timeout(&self) -> Option<Duration> {
        self.stage_timeout_secs.map(Duration::from_secs)
    }

    pub fn engine_names(&self) -> EngineNames {
        self.engines.clone().into()
    }
}
