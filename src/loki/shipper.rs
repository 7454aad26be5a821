use std::fmt;
use std::io;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError};
use tracing::{debug, error, info};

use super::client::LokiClient;
use crate::event::LogLine;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShipperConfig {
    /// Flush once the pending line bytes reach this size
    pub batch_bytes: usize,

    /// Flush once the oldest pending line has waited this long
    pub batch_wait: Duration,
}

impl Default for ShipperConfig {
    fn default() -> Self {
        Self {
            batch_bytes: 102_400,
            batch_wait: Duration::from_secs(4),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShipperSummary {
    pub pushes: u64,
    pub lines_shipped: u64,
    pub lines_lost: u64,
}

impl fmt::Display for ShipperSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pushes={} lines_shipped={} lines_lost={}",
            self.pushes, self.lines_shipped, self.lines_lost
        )
    }
}

struct PendingBatch {
    lines: Vec<LogLine>,
    bytes: usize,
    started: Option<Instant>,
}

impl PendingBatch {
    fn new() -> Self {
        Self {
            lines: Vec::new(),
            bytes: 0,
            started: None,
        }
    }

    fn add(&mut self, line: LogLine) {
        self.started.get_or_insert_with(Instant::now);
        self.bytes += line.shipped_line().len();
        self.lines.push(line);
    }

    fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    fn take(&mut self) -> Vec<LogLine> {
        self.bytes = 0;
        self.started = None;
        std::mem::take(&mut self.lines)
    }
}

/// Ships forwarded lines to Loki from a dedicated thread.
pub struct Shipper {
    config: ShipperConfig,
    client: LokiClient,
}

impl Shipper {
    pub fn new(config: ShipperConfig, client: LokiClient) -> Self {
        Self { config, client }
    }

    /// Start the shipper thread. It runs until every sender of `receiver`
    /// is dropped, flushing what is pending on the way out.
    pub fn spawn(self, receiver: Receiver<LogLine>) -> io::Result<JoinHandle<ShipperSummary>> {
        thread::Builder::new()
            .name("loki-shipper".to_string())
            .spawn(move || self.run(receiver))
    }

    /// Batch and push lines until the channel disconnects.
    pub fn run(self, receiver: Receiver<LogLine>) -> ShipperSummary {
        let mut summary = ShipperSummary::default();
        let mut pending = PendingBatch::new();

        info!(
            "Loki shipper started (batch_bytes={}, batch_wait={:?})",
            self.config.batch_bytes, self.config.batch_wait
        );

        loop {
            let timeout = match pending.started {
                Some(started) => self.config.batch_wait.saturating_sub(started.elapsed()),
                None => self.config.batch_wait,
            };

            match receiver.recv_timeout(timeout) {
                Ok(line) => {
                    pending.add(line);
                    if self.batch_is_due(&pending) {
                        self.flush(&mut pending, &mut summary);
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    if !pending.is_empty() {
                        self.flush(&mut pending, &mut summary);
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    if !pending.is_empty() {
                        self.flush(&mut pending, &mut summary);
                    }
                    break;
                }
            }
        }

        info!("Loki shipper stopped: {}", summary);
        summary
    }

    fn batch_is_due(&self, pending: &PendingBatch) -> bool {
        pending.bytes >= self.config.batch_bytes
            || pending
                .started
                .is_some_and(|started| started.elapsed() >= self.config.batch_wait)
    }

    fn flush(&self, pending: &mut PendingBatch, summary: &mut ShipperSummary) {
        let bytes = pending.bytes;
        let lines = pending.take();
        let count = lines.len() as u64;

        summary.pushes += 1;
        match self.client.push(&lines) {
            Ok(()) => {
                debug!("Pushed {} lines ({} bytes) to Loki", count, bytes);
                summary.lines_shipped += count;
            }
            Err(e) => {
                error!("Failed to push {} lines to Loki, dropping them: {}", count, e);
                summary.lines_lost += count;
            }
        }
    }
}
