//! dubber-core
//!
//! Asynchronous dubbing pipeline: a source video goes through transcription,
//! then translation and speech synthesis for every requested language.
//!
//! - **domain**: ids, requests, stages, artifacts, job views, errors
//! - **ports**: traits for storage, state, queue, engines, clock, ids
//! - **impls**: filesystem and in-memory adapters, ffmpeg, placeholder engines
//! - **app**: engine registry, stage executor, orchestrator, builder, service
//! - **config**: `PipelineConfig` from file + environment
//! - **observability**: tracing setup and status counters

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod observability;
pub mod ports;

pub use crate::app::{DubbingService, PipelineBuilder};
pub use crate::config::PipelineConfig;
