//! Ingest worker pool
//!
//! Fixed set of tokio workers draining one job queue. Each worker runs a job
//! to completion before taking the next; a failed job is logged and counted
//! and never stops the pool.

use af_common::{Error, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Jobs buffered per worker before `submit` waits
const QUEUE_DEPTH_PER_WORKER: usize = 4;

/// Work performed for each queued job
#[async_trait]
pub trait JobHandler<J>: Send + Sync + 'static {
    async fn handle(&self, job: J) -> Result<()>;
}

/// Job counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub submitted: usize,
    pub completed: usize,
    pub failed: usize,
}

impl IngestStats {
    /// Jobs not yet finished
    pub fn pending(&self) -> usize {
        self.submitted.saturating_sub(self.completed + self.failed)
    }
}

#[derive(Default)]
struct Counters {
    submitted: AtomicUsize,
    completed: AtomicUsize,
    failed: AtomicUsize,
}

impl Counters {
    fn snapshot(&self) -> IngestStats {
        IngestStats {
            submitted: self.submitted.load(Ordering::SeqCst),
            completed: self.completed.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
        }
    }
}

/// Worker pool over jobs of type `J`
pub struct IngestPool<J> {
    sender: Option<mpsc::Sender<J>>,
    workers: Vec<JoinHandle<()>>,
    counters: Arc<Counters>,
}

impl<J: Send + 'static> IngestPool<J> {
    /// Start `worker_count` workers (at least one) running `handler`
    pub fn new<H: JobHandler<J>>(handler: Arc<H>, worker_count: usize) -> Self {
        let worker_count = worker_count.max(1);
        let (sender, receiver) = mpsc::channel(worker_count * QUEUE_DEPTH_PER_WORKER);
        let receiver = Arc::new(Mutex::new(receiver));
        let counters = Arc::new(Counters::default());

        let workers = (0..worker_count)
            .map(|worker_id| {
                let receiver = Arc::clone(&receiver);
                let handler = Arc::clone(&handler);
                let counters = Arc::clone(&counters);
                tokio::spawn(Self::worker_loop(worker_id, receiver, handler, counters))
            })
            .collect();

        info!("Ingest pool started with {} workers", worker_count);

        Self {
            sender: Some(sender),
            workers,
            counters,
        }
    }

    /// Queue a job, waiting while the queue is full
    pub async fn submit(&self, job: J) -> Result<()> {
        let sender = self
            .sender
            .as_ref()
            .ok_or_else(|| Error::Internal("Ingest pool is shutting down".to_string()))?;

        sender
            .send(job)
            .await
            .map_err(|_| Error::Internal("Ingest pool workers have stopped".to_string()))?;
        self.counters.submitted.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    /// Current counters
    pub fn stats(&self) -> IngestStats {
        self.counters.snapshot()
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Stop accepting jobs, drain the queue and wait for every worker
    pub async fn shutdown(mut self) -> IngestStats {
        drop(self.sender.take());

        for handle in self.workers.drain(..) {
            if let Err(e) = handle.await {
                error!("Ingest worker terminated abnormally: {}", e);
            }
        }

        let stats = self.counters.snapshot();
        if stats.pending() > 0 {
            // Only a panicking job can leave work behind
            error!(pending = stats.pending(), "Ingest jobs lost to a crashed worker");
        }
        info!(
            submitted = stats.submitted,
            completed = stats.completed,
            failed = stats.failed,
            "Ingest pool stopped"
        );
        stats
    }

    async fn worker_loop<H: JobHandler<J>>(
        worker_id: usize,
        receiver: Arc<Mutex<mpsc::Receiver<J>>>,
        handler: Arc<H>,
        counters: Arc<Counters>,
    ) {
        debug!("Worker {} started", worker_id);

        loop {
            // Only the idle worker holding the lock waits on the channel
            let job = receiver.lock().await.recv().await;
            let Some(job) = job else {
                break;
            };

            match handler.handle(job).await {
                Ok(()) => {
                    counters.completed.fetch_add(1, Ordering::SeqCst);
                }
                Err(e) => {
                    warn!(worker_id, error = %e, "Ingest job failed");
                    counters.failed.fetch_add(1, Ordering::SeqCst);
                }
            }
        }

        debug!("Worker {} stopped", worker_id);
    }
}
