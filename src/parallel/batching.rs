//! Batcher logic for the parallel pipeline
//!
//! Reads newline-terminated lines and groups them into fixed-size batches.

use crossbeam_channel::Sender;
use std::io::{BufRead, ErrorKind};
use tracing::{error, info};

use super::types::{Batch, BatcherSummary, InputEnd, RawLine, BATCH_SIZE};

/// The batch being filled. Owned by the batcher alone.
pub(crate) struct Accumulator {
    buf: [RawLine; BATCH_SIZE],
    pos: usize,
    next_id: u64,
}

fn empty_slots() -> [RawLine; BATCH_SIZE] {
    std::array::from_fn(|_| Vec::new())
}

impl Accumulator {
    pub(crate) fn new() -> Self {
        Self {
            buf: empty_slots(),
            pos: 0,
            next_id: 0,
        }
    }

    /// Store `line` in the next slot; returns the batch once it is full.
    pub(crate) fn push(&mut self, line: RawLine) -> Option<Batch> {
        self.buf[self.pos] = line;
        self.pos += 1;
        if self.pos < BATCH_SIZE {
            return None;
        }

        self.pos = 0;
        let id = self.next_id;
        self.next_id += 1;
        Some(Batch {
            id,
            lines: std::mem::replace(&mut self.buf, empty_slots()),
        })
    }

    /// Lines waiting for the batch to fill up.
    pub(crate) fn pending(&self) -> usize {
        self.pos
    }
}

/// Batcher loop - runs until the input ends, then drops `batch_sender`,
/// which closes the batch queue for the workers.
///
/// Sending blocks while the queue is full; this is the only place the
/// pipeline pushes back on its input. Lines that never fill a batch are
/// discarded.
pub fn run_batcher<R: BufRead>(mut reader: R, batch_sender: Sender<Batch>) -> BatcherSummary {
    let mut acc = Accumulator::new();
    let mut lines_read = 0u64;
    let mut batches_sent = 0u64;
    let mut unterminated_bytes = 0usize;

    let end = loop {
        let mut line = Vec::new();
        match reader.read_until(b'\n', &mut line) {
            Ok(0) => break InputEnd::Eof,
            Ok(n) if line.last() != Some(&b'\n') => {
                // Stream ended mid-line.
                unterminated_bytes = n;
                break InputEnd::Eof;
            }
            Ok(_) => {
                lines_read += 1;
                if let Some(batch) = acc.push(line) {
                    if batch_sender.send(batch).is_err() {
                        break InputEnd::WorkersGone;
                    }
                    batches_sent += 1;
                }
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => break InputEnd::Error(e.to_string()),
        }
    };

    drop(batch_sender);

    match &end {
        InputEnd::Eof => info!("input closed: EOF"),
        other => error!("input stopped: {}", other),
    }

    BatcherSummary {
        lines_read,
        batches_sent,
        discarded_lines: acc.pending(),
        unterminated_bytes,
        end,
    }
}
