//! Adapters for the ports: filesystem stores, in-memory state and queue,
//! the ffmpeg transcoder and the built-in placeholder engines.

pub mod ffmpeg_transcoder;
pub mod fs_artifact_store;
pub mod fs_video_store;
pub mod inmem_job_state;
pub mod inmem_task_queue;
pub mod noop_engines;

pub use ffmpeg_transcoder::FfmpegTranscoder;
pub use fs_artifact_store::FsArtifactStore;
pub use fs_video_store::FsVideoStore;
pub use inmem_job_state::InMemoryJobStateStore;
pub use inmem_task_queue::InMemoryTaskQueue;
pub use noop_engines::{DummySynthesizer, DummyTranscriber, DummyTranslator};
