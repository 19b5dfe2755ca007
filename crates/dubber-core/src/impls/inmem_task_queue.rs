//! In-memory task queue with a tokio worker group.
//!
//! Deliveries sit in a `VecDeque` behind a `Mutex`, and workers wait on a
//! `Notify`. Each delivery runs in its own spawned task, so a panicking
//! runner costs one delivery and never a worker. A delivery that panics or
//! returns `Err` goes back to the tail of the queue until it has been tried
//! `max_deliveries` times. After the last attempt the runner is told through
//! [`JobRunner::abandon`].

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify, watch};
use tokio::task::JoinHandle;

use crate::domain::{JobId, JobRequest, QueueError};
use crate::observability::QueueCounts;
use crate::ports::{IdGenerator, JobRunner, TaskQueue};

#[derive(Debug, Clone)]
struct Delivery {
    job_id: JobId,
    request: JobRequest,
    attempt: u32,
}

#[derive(Default)]
struct QueueState {
    ready: VecDeque<Delivery>,
    closed: bool,
    counts: QueueCounts,
}

struct Shared {
    state: Mutex<QueueState>,
    notify: Notify,
    max_deliveries: u32,
}

impl Shared {
    async fn push(&self, delivery: Delivery) -> Result<(), QueueError> {
        {
            let mut state = self.state.lock().await;
            if state.closed {
                return Err(QueueError::NotRunning);
            }
            state.ready.push_back(delivery);
            state.counts.pending = state.ready.len();
        }
        self.notify.notify_one();
        Ok(())
    }

    /// Waits until a delivery is available.
    async fn pop(&self) -> Delivery {
        loop {
            {
                let mut state = self.state.lock().await;
                if let Some(delivery) = state.ready.pop_front() {
                    state.counts.pending = state.ready.len();
                    state.counts.in_flight += 1;
                    return delivery;
                }
            }
            self.notify.notified().await;
        }
    }
}

/// Worker group handle. Dropping `shutdown_tx` or sending `true` stops
/// workers from taking new deliveries; in-flight ones run to completion.
struct WorkerGroup {
    shutdown_tx: watch::Sender<bool>,
    joins: Vec<JoinHandle<()>>,
}

impl WorkerGroup {
    async fn shutdown_and_join(self) {
        let _ = self.shutdown_tx.send(true);
        for join in self.joins {
            let _ = join.await;
        }
    }
}

/// Process-local [`TaskQueue`]. Deliveries are lost on restart.
pub struct InMemoryTaskQueue {
    shared: Arc<Shared>,
    ids: Arc<dyn IdGenerator>,
    workers: usize,
    group: Mutex<Option<WorkerGroup>>,
}

impl InMemoryTaskQueue {
    /// `workers` and `max_deliveries` are clamped to at least 1.
    pub fn new(ids: Arc<dyn IdGenerator>, workers: usize, max_deliveries: u32) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(QueueState::default()),
                notify: Notify::new(),
                max_deliveries: max_deliveries.max(1),
            }),
            ids,
            workers: workers.max(1),
            group: Mutex::new(None),
        }
    }

    /// Snapshot of the delivery counters.
    pub async fn counts(&self) -> QueueCounts {
        self.shared.state.lock().await.counts.clone()
    }
}

#[async_trait]
impl TaskQueue for InMemoryTaskQueue {
    fn next_job_id(&self) -> JobId {
        self.ids.generate_job_id()
    }

    async fn enqueue(&self, job_id: JobId, request: JobRequest) -> Result<(), QueueError> {
        self.shared
            .push(Delivery {
                job_id,
                request,
                attempt: 0,
            })
            .await?;
        tracing::debug!(%job_id, "job enqueued");
        Ok(())
    }

    async fn start(&self, runner: Arc<dyn JobRunner>) -> Result<(), QueueError> {
        let mut group = self.group.lock().await;
        if group.is_some() {
            return Err(QueueError::AlreadyRunning);
        }
        if self.shared.state.lock().await.closed {
            return Err(QueueError::NotRunning);
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut joins = Vec::with_capacity(self.workers);
        for worker_id in 0..self.workers {
            let shared = Arc::clone(&self.shared);
            let ids = Arc::clone(&self.ids);
            let runner = Arc::clone(&runner);
            let rx = shutdown_rx.clone();
            joins.push(tokio::spawn(worker_loop(worker_id, shared, ids, runner, rx)));
        }
        tracing::info!(workers = self.workers, "task queue started");
        *group = Some(WorkerGroup { shutdown_tx, joins });
        Ok(())
    }

    async fn shutdown(&self) {
        self.shared.state.lock().await.closed = true;
        let group = self.group.lock().await.take();
        if let Some(group) = group {
            group.shutdown_and_join().await;
            tracing::info!("task queue stopped");
        }
    }

    async fn pending(&self) -> usize {
        self.shared.state.lock().await.ready.len()
    }
}

async fn worker_loop(
    worker_id: usize,
    shared: Arc<Shared>,
    ids: Arc<dyn IdGenerator>,
    runner: Arc<dyn JobRunner>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        let delivery = tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                continue;
            }
            delivery = shared.pop() => delivery,
        };

        let delivery_id = ids.generate_delivery_id();
        let job_id = delivery.job_id;
        let attempt = delivery.attempt + 1;
        tracing::debug!(worker_id, %job_id, %delivery_id, attempt, "delivery leased");

        let run = {
            let runner = Arc::clone(&runner);
            let request = delivery.request.clone();
            tokio::spawn(async move { runner.run(job_id, request, delivery_id).await })
        };
        let failure = match run.await {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e.to_string()),
            Err(join) if join.is_panic() => Some("runner panicked".to_string()),
            Err(join) => Some(join.to_string()),
        };

        let mut state = shared.state.lock().await;
        state.counts.in_flight = state.counts.in_flight.saturating_sub(1);
        match failure {
            None => state.counts.completed += 1,
            Some(reason) if attempt < shared.max_deliveries && !state.closed => {
                tracing::warn!(worker_id, %job_id, attempt, %reason, "delivery failed, redelivering");
                state.counts.redelivered += 1;
                state.ready.push_back(Delivery {
                    attempt,
                    ..delivery
                });
                state.counts.pending = state.ready.len();
                drop(state);
                shared.notify.notify_one();
            }
            Some(reason) => {
                tracing::error!(worker_id, %job_id, attempt, %reason, "delivery dropped");
                state.counts.dropped += 1;
                drop(state);
                abandon(&runner, job_id, attempt, reason).await;
            }
        }
    }
}

/// Runs `JobRunner::abandon` on its own task so a panic there stays contained.
async fn abandon(runner: &Arc<dyn JobRunner>, job_id: JobId, attempts: u32, reason: String) {
    let runner = Arc::clone(runner);
    let error = QueueError::DeliveriesExhausted { attempts, reason };
    let handle = tokio::spawn(async move { runner.abandon(job_id, error).await });
    if let Err(join) = handle.await {
        tracing::error!(%job_id, error = %join, "abandon hook failed");
    }
}
