//! Prometheus counters for metric-only mode.
//!
//! Two counter vectors are exported:
//! - `fancy_input_scan_total{hostname,program,level,tag}`: lines received
//! - `fancy_input_raw_bytes_total{hostname,program}`: raw bytes received
//!
//! Workers only see the [`ScanCounters`] trait, so tests can substitute an
//! in-memory registry.

use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

/// Label-keyed counters the worker pool writes to. Implementations must be
/// safe to call from all workers at once without external locking.
pub trait ScanCounters: Send + Sync {
    fn inc_scan(&self, hostname: &str, program: &str, level: &str, tag: &str);
    fn add_raw_bytes(&self, hostname: &str, program: &str, bytes: u64);
}

/// Counter registry backed by a private `prometheus::Registry`.
#[derive(Clone)]
pub struct PromCounters {
    registry: Registry,
    scan_total: IntCounterVec,
    raw_bytes_total: IntCounterVec,
}

impl PromCounters {
    /// Create and register both counter vectors.
    ///
    /// # Errors
    ///
    /// Returns an error if metric registration fails.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let scan_total = IntCounterVec::new(
            Opts::new(
                "fancy_input_scan_total",
                "Total number of logs received from rsyslog fancy template",
            ),
            &["hostname", "program", "level", "tag"],
        )?;

        let raw_bytes_total = IntCounterVec::new(
            Opts::new(
                "fancy_input_raw_bytes_total",
                "Total number of bytes received from rsyslog fancy template",
            ),
            &["hostname", "program"],
        )?;

        registry.register(Box::new(scan_total.clone()))?;
        registry.register(Box::new(raw_bytes_total.clone()))?;

        Ok(Self {
            registry,
            scan_total,
            raw_bytes_total,
        })
    }

    /// Current value of one scan counter. Reading a series that was never
    /// written creates it at zero.
    pub fn scan_count(&self, hostname: &str, program: &str, level: &str, tag: &str) -> u64 {
        self.scan_total
            .get_metric_with_label_values(&[hostname, program, level, tag])
            .map(|c| c.get())
            .unwrap_or(0)
    }

    /// Current value of one byte counter.
    pub fn raw_bytes(&self, hostname: &str, program: &str) -> u64 {
        self.raw_bytes_total
            .get_metric_with_label_values(&[hostname, program])
            .map(|c| c.get())
            .unwrap_or(0)
    }

    /// Encode all counters in the Prometheus text exposition format.
    pub fn gather(&self) -> Result<String, prometheus::Error> {
        let metric_families = self.registry.gather();

        let mut buffer = Vec::new();
        TextEncoder::new().encode(&metric_families, &mut buffer)?;

        String::from_utf8(buffer).map_err(|e| {
            prometheus::Error::Msg(format!(
                "metrics encoder produced invalid UTF-8 at byte {}",
                e.utf8_error().valid_up_to()
            ))
        })
    }
}

impl ScanCounters for PromCounters {
    fn inc_scan(&self, hostname: &str, program: &str, level: &str, tag: &str) {
        self.scan_total
            .with_label_values(&[hostname, program, level, tag])
            .inc();
    }

    fn add_raw_bytes(&self, hostname: &str, program: &str, bytes: u64) {
        self.raw_bytes_total
            .with_label_values(&[hostname, program])
            .inc_by(bytes);
    }
}
