//! Ports: the seams between the pipeline and the outside world.
//!
//! Every collaborator the orchestrator talks to (storage, state, queue,
//! engines, transcoder, clock, id generation) sits behind one of these traits.
//! In-process implementations live in `impls`.

pub mod artifact_store;
pub mod clock;
pub mod engines;
pub mod id_generator;
pub mod job_state_store;
pub mod task_queue;
pub mod transcoder;
pub mod video_store;

pub use self::artifact_store::ArtifactStore;
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::engines::{EngineError, Synthesizer, Transcriber, Translator};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::job_state_store::JobStateStore;
pub use self::task_queue::{JobRunner, TaskQueue};
pub use self::transcoder::MediaTranscoder;
pub use self::video_store::VideoStore;
