//! Main parallel processor
//!
//! Wires the batcher to a fixed pool of worker threads through a bounded
//! batch queue.

use anyhow::{Context, Result};
use crossbeam_channel::bounded;
use std::io::BufRead;
use std::thread::{self, JoinHandle};
use tracing::error;

use super::batching::run_batcher;
use super::types::{Batch, BatcherSummary, ParallelConfig};
use super::worker::{worker_thread, WorkerContext};

/// The running worker threads.
///
/// The binary never joins them: once input ends it exits and abandons
/// whatever is still queued.
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn spawn(
        num_workers: usize,
        batch_receiver: crossbeam_channel::Receiver<Batch>,
        ctx: WorkerContext,
    ) -> Result<Self> {
        let handles = (0..num_workers)
            .map(|worker_id| {
                let batch_receiver = batch_receiver.clone();
                let ctx = ctx.clone();
                thread::Builder::new()
                    .name(format!("worker-{}", worker_id))
                    .spawn(move || worker_thread(worker_id, batch_receiver, ctx))
                    .with_context(|| format!("Failed to spawn worker {}", worker_id))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { handles })
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Wait for every worker to drain the batch queue and exit.
    pub fn join(self) {
        for handle in self.handles {
            if handle.join().is_err() {
                error!("worker thread panicked");
            }
        }
    }
}

/// Main parallel processor
pub struct ParallelProcessor {
    config: ParallelConfig,
}

impl ParallelProcessor {
    pub fn new(config: ParallelConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ParallelConfig {
        &self.config
    }

    /// Spawn the workers, then run the batcher on the calling thread until
    /// the input ends. Returns as soon as the batch queue is closed; the
    /// workers may still be busy.
    pub fn run<R: BufRead>(
        &self,
        reader: R,
        ctx: WorkerContext,
    ) -> Result<(BatcherSummary, WorkerPool)> {
        let (batch_sender, batch_receiver) = bounded(self.config.batch_queue_capacity);

        let pool = WorkerPool::spawn(self.config.num_workers, batch_receiver, ctx)?;
        let summary = run_batcher(reader, batch_sender);

        Ok((summary, pool))
    }
}
