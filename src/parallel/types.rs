//! Type definitions for the batching pipeline
//!
//! Contains the batch layout, the batcher's summary and pool configuration.

use std::fmt;

/// Lines per batch. Only full batches are handed to workers.
pub const BATCH_SIZE: usize = 20;

/// One input line including its `\n` terminator.
pub type RawLine = Vec<u8>;

/// A full batch of lines in input order.
///
/// The array length makes a short batch unrepresentable.
#[derive(Debug)]
pub struct Batch {
    pub id: u64,
    pub lines: [RawLine; BATCH_SIZE],
}

/// Configuration for the worker pool and its queues
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParallelConfig {
    pub num_workers: usize,
    /// Capacity of the queue between the batcher and the workers, in batches.
    pub batch_queue_capacity: usize,
    /// Capacity of the queue between the workers and the shipper, in records.
    pub output_queue_capacity: usize,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            num_workers: 8,
            batch_queue_capacity: 1000,
            output_queue_capacity: 10000,
        }
    }
}

/// How the input stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEnd {
    Eof,
    Error(String),
    /// Every worker is gone, so nothing could receive batches.
    WorkersGone,
}

impl fmt::Display for InputEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputEnd::Eof => write!(f, "EOF"),
            InputEnd::Error(e) => write!(f, "read error: {}", e),
            InputEnd::WorkersGone => write!(f, "workers gone"),
        }
    }
}

/// What the batcher did before it returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatcherSummary {
    pub lines_read: u64,
    pub batches_sent: u64,
    /// Complete lines left in the accumulator when input ended.
    pub discarded_lines: usize,
    /// Bytes of a final line that had no terminator.
    pub unterminated_bytes: usize,
    pub end: InputEnd,
}

impl fmt::Display for BatcherSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "lines_read={} batches={} discarded_lines={} input_end={}",
            self.lines_read, self.batches_sent, self.discarded_lines, self.end
        )?;
        if self.unterminated_bytes > 0 {
            write!(f, " unterminated_bytes={}", self.unterminated_bytes)?;
        }
        Ok(())
    }
}
