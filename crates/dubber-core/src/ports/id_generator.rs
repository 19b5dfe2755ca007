//! IdGenerator port.
//!
//! Ids are minted by the execution substrate, never chosen by callers or by
//! the orchestrator.

use crate::domain::ids::{DeliveryId, JobId, VideoId};
use crate::ports::Clock;
use ulid::Ulid;

pub trait IdGenerator: Send + Sync {
    fn generate_job_id(&self) -> JobId;

    fn generate_delivery_id(&self) -> DeliveryId;

    fn generate_video_id(&self) -> VideoId;
}

/// ULID generator whose timestamp part comes from a [`Clock`].
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    fn next_ulid(&self) -> Ulid {
        let timestamp_ms = self.clock.now().timestamp_millis() as u64;
        Ulid::from_parts(timestamp_ms, rand::random())
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_job_id(&self) -> JobId {
        JobId::from(self.next_ulid())
    }

    fn generate_delivery_id(&self) -> DeliveryId {
        DeliveryId::from(self.next_ulid())
    }

    fn generate_video_id(&self) -> VideoId {
        VideoId::generate(self.next_ulid())
    }
}
