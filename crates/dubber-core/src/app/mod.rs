//! Application layer: engine registry, stage execution, job orchestration,
//! and the service façade that wires them to the ports.

pub mod builder;
pub mod orchestrator;
pub mod registry;
pub mod service;
pub mod stage_executor;

pub use self::builder::{BuildError, PipelineBuilder};
pub use self::orchestrator::JobOrchestrator;
pub use self::registry::{EngineRegistry, RegistryError};
pub use self::service::{DubbingService, StageEngines};
pub use self::stage_executor::{StageExecutor, StageInput};
