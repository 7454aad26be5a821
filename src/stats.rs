use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared by all workers for the end-of-run summary.
#[derive(Debug, Default)]
pub struct PipelineStats {
    parsed: AtomicU64,
    parse_errors: AtomicU64,
    transform_errors: AtomicU64,
    forwarded: AtomicU64,
    dropped: AtomicU64,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_parsed(&self) {
        self.parsed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_parse_error(&self) {
        self.parse_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_transform_error(&self) {
        self.transform_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_forwarded(&self) {
        self.forwarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            parsed: self.parsed.load(Ordering::Relaxed),
            parse_errors: self.parse_errors.load(Ordering::Relaxed),
            transform_errors: self.transform_errors.load(Ordering::Relaxed),
            forwarded: self.forwarded.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`PipelineStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub parsed: u64,
    pub parse_errors: u64,
    pub transform_errors: u64,
    pub forwarded: u64,
    pub dropped: u64,
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "parsed={} parse_errors={} transform_errors={} forwarded={} dropped={}",
            self.parsed, self.parse_errors, self.transform_errors, self.forwarded, self.dropped
        )
    }
}
