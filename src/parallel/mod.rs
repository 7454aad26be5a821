//! Parallel processing module for fancy
//!
//! Lines are read by a single batcher, grouped into fixed-size batches and
//! handed to a fixed pool of worker threads through a bounded queue.
//!
//! # Module Structure
//!
//! - `types`: Batch layout, summary and configuration
//! - `batching`: Accumulator and the batcher loop
//! - `throttle`: Rate limit for overflow warnings
//! - `worker`: Worker thread and per-line routing
//! - `processor`: ParallelProcessor orchestration

mod batching;
mod processor;
mod throttle;
mod types;
mod worker;

// Re-export public types
pub use batching::run_batcher;
pub use processor::{ParallelProcessor, WorkerPool};
pub use types::{Batch, BatcherSummary, InputEnd, ParallelConfig, RawLine, BATCH_SIZE};
pub use worker::{LineOutcome, Route, TagPolicy, WorkerContext};
