//! Worker thread for the parallel pipeline
//!
//! Parses every line of a batch and routes the record either to the scan
//! counters (metric-only mode) or to the output queue (forwarding mode).

use crossbeam_channel::{Receiver, Sender, TrySendError};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, warn};

use crate::event::LogLine;
use crate::metrics::ScanCounters;
use crate::parsers::LineParser;
use crate::stats::PipelineStats;
use crate::transform::MessageTransform;

use super::throttle::{OverflowThrottle, OVERFLOW_LOG_INTERVAL};
use super::types::Batch;

/// Tag label applied to scan counters, optionally gated by a substring of
/// the message body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagPolicy {
    tag: String,
    filter: Vec<u8>,
}

impl TagPolicy {
    pub fn new(tag: impl Into<String>, filter: impl Into<Vec<u8>>) -> Self {
        Self {
            tag: tag.into(),
            filter: filter.into(),
        }
    }

    /// Tag for one record: empty when a filter is set and the message does
    /// not contain it (exact, case-sensitive byte match).
    pub fn effective_tag(&self, message: &[u8]) -> &str {
        if !self.filter.is_empty() && !contains(message, &self.filter) {
            return "";
        }
        &self.tag
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    needle.len() <= haystack.len() && haystack.windows(needle.len()).any(|w| w == needle)
}

/// Where parsed records go.
#[derive(Clone)]
pub enum Route {
    Metrics {
        counters: Arc<dyn ScanCounters>,
        tag: TagPolicy,
    },
    Forward {
        transform: Option<Arc<dyn MessageTransform>>,
        output: Sender<LogLine>,
    },
}

impl Route {
    pub fn metric_only(&self) -> bool {
        matches!(self, Route::Metrics { .. })
    }
}

/// Everything a worker needs; cloned once per worker.
#[derive(Clone)]
pub struct WorkerContext {
    pub parser: Arc<dyn LineParser>,
    pub route: Route,
    pub stats: Arc<PipelineStats>,
}

/// What happened to one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOutcome {
    Counted,
    Forwarded,
    Dropped,
    ParseFailed,
    TransformFailed,
}

/// Worker thread: processes batches until the batch queue is closed and empty.
pub(crate) fn worker_thread(worker_id: usize, batch_receiver: Receiver<Batch>, ctx: WorkerContext) {
    debug!(worker_id, "worker started");

    let mut throttle = OverflowThrottle::new(OVERFLOW_LOG_INTERVAL);
    for batch in batch_receiver.iter() {
        process_batch(batch, &ctx, &mut throttle);
    }

    debug!(worker_id, "worker stopped");
}

fn process_batch(batch: Batch, ctx: &WorkerContext, throttle: &mut OverflowThrottle) {
    for raw in batch.lines {
        process_line(raw, ctx, throttle);
    }
}

pub(crate) fn process_line(
    raw: Vec<u8>,
    ctx: &WorkerContext,
    throttle: &mut OverflowThrottle,
) -> LineOutcome {
    let mut record = match ctx.parser.parse(raw, ctx.route.metric_only()) {
        Ok(record) => record,
        Err(e) => {
            error!("{}", e);
            ctx.stats.add_parse_error();
            return LineOutcome::ParseFailed;
        }
    };
    ctx.stats.add_parsed();

    match &ctx.route {
        Route::Metrics { counters, tag } => {
            let tag = tag.effective_tag(record.message_bytes());
            counters.inc_scan(&record.hostname, &record.program, &record.severity, tag);
            counters.add_raw_bytes(&record.hostname, &record.program, record.raw_len() as u64);
            LineOutcome::Counted
        }
        Route::Forward { transform, output } => {
            if let Some(transform) = transform {
                match transform.transform(record.message_bytes()) {
                    Ok(out) => record.msg = Some(String::from_utf8_lossy(&out).into_owned()),
                    Err(e) => {
                        error!("{}", e);
                        ctx.stats.add_transform_error();
                        return LineOutcome::TransformFailed;
                    }
                }
            }

            match output.try_send(record) {
                Ok(()) => {
                    ctx.stats.add_forwarded();
                    LineOutcome::Forwarded
                }
                Err(TrySendError::Full(_)) => {
                    ctx.stats.add_dropped();
                    if let Some(suppressed) = throttle.on_drop(Instant::now()) {
                        warn!(
                            "overflowing output queue capacity ({}), dropping records; {} more dropped since last warning",
                            output.capacity().unwrap_or_default(),
                            suppressed
                        );
                    }
                    LineOutcome::Dropped
                }
                Err(TrySendError::Disconnected(_)) => {
                    // Shipper thread is gone; nothing will drain the queue again.
                    ctx.stats.add_dropped();
                    if let Some(suppressed) = throttle.on_drop(Instant::now()) {
                        error!(
                            "output queue closed (Loki shipper stopped), dropping records; {} more dropped since last error",
                            suppressed
                        );
                    }
                    LineOutcome::Dropped
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ParseError, TransformError};
    use crate::parsers::FancyParser;
    use crossbeam_channel::bounded;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingCounters {
        scans: Mutex<HashMap<(String, String, String, String), u64>>,
        bytes: Mutex<HashMap<(String, String), u64>>,
    }

    impl RecordingCounters {
        fn scan(&self, h: &str, p: &str, l: &str, t: &str) -> u64 {
            let key = (h.to_string(), p.to_string(), l.to_string(), t.to_string());
            *self.scans.lock().unwrap().get(&key).unwrap_or(&0)
        }

        fn bytes(&self, h: &str, p: &str) -> u64 {
            *self
                .bytes
                .lock()
                .unwrap()
                .get(&(h.to_string(), p.to_string()))
                .unwrap_or(&0)
        }
    }

    impl ScanCounters for RecordingCounters {
        fn inc_scan(&self, hostname: &str, program: &str, level: &str, tag: &str) {
            let key = (
                hostname.to_string(),
                program.to_string(),
                level.to_string(),
                tag.to_string(),
            );
            *self.scans.lock().unwrap().entry(key).or_default() += 1;
        }

        fn add_raw_bytes(&self, hostname: &str, program: &str, bytes: u64) {
            *self
                .bytes
                .lock()
                .unwrap()
                .entry((hostname.to_string(), program.to_string()))
                .or_default() += bytes;
        }
    }

    struct Upper;

    impl MessageTransform for Upper {
        fn transform(&self, message: &[u8]) -> Result<Vec<u8>, TransformError> {
            Ok(message.to_ascii_uppercase())
        }
    }

    struct Broken;

    impl MessageTransform for Broken {
        fn transform(&self, _message: &[u8]) -> Result<Vec<u8>, TransformError> {
            Err(TransformError::Io {
                program: "broken".to_string(),
                source: std::io::Error::new(std::io::ErrorKind::Other, "nope"),
            })
        }
    }

    /// Fails every line; proves parse errors never reach a route.
    struct Rejecting;

    impl LineParser for Rejecting {
        fn parse(&self, raw: Vec<u8>, _metric_only: bool) -> Result<LogLine, ParseError> {
            Err(ParseError::Malformed(String::from_utf8_lossy(&raw).into_owned()))
        }
    }

    const LINE: &[u8] = b"2024-03-01T12:30:45Z web01 nginx info GET /health 200\n";

    fn metrics_ctx(counters: Arc<RecordingCounters>, tag: TagPolicy) -> WorkerContext {
        WorkerContext {
            parser: Arc::new(FancyParser::new()),
            route: Route::Metrics { counters, tag },
            stats: Arc::new(PipelineStats::new()),
        }
    }

    fn forward_ctx(
        transform: Option<Arc<dyn MessageTransform>>,
        output: Sender<LogLine>,
    ) -> WorkerContext {
        WorkerContext {
            parser: Arc::new(FancyParser::new()),
            route: Route::Forward { transform, output },
            stats: Arc::new(PipelineStats::new()),
        }
    }

    fn throttle() -> OverflowThrottle {
        OverflowThrottle::new(OVERFLOW_LOG_INTERVAL)
    }

    #[test]
    fn test_tag_policy() {
        let untagged = TagPolicy::default();
        assert_eq!(untagged.effective_tag(b"anything"), "");

        let always = TagPolicy::new("edge", Vec::new());
        assert_eq!(always.effective_tag(b"anything"), "edge");

        let gated = TagPolicy::new("T", b"X".to_vec());
        assert_eq!(gated.effective_tag(b"has X inside"), "T");
        assert_eq!(gated.effective_tag(b"has x inside"), "");
        assert_eq!(gated.effective_tag(b""), "");
    }

    #[test]
    fn test_metric_route_counts_lines_and_bytes() {
        let counters = Arc::new(RecordingCounters::default());
        let ctx = metrics_ctx(Arc::clone(&counters), TagPolicy::default());
        let mut throttle = throttle();

        for _ in 0..3 {
            assert_eq!(
                process_line(LINE.to_vec(), &ctx, &mut throttle),
                LineOutcome::Counted
            );
        }

        assert_eq!(counters.scan("web01", "nginx", "info", ""), 3);
        assert_eq!(counters.bytes("web01", "nginx"), 3 * LINE.len() as u64);
        assert_eq!(ctx.stats.snapshot().parsed, 3);
    }

    #[test]
    fn test_tag_suppression_is_per_record() {
        let counters = Arc::new(RecordingCounters::default());
        let ctx = metrics_ctx(Arc::clone(&counters), TagPolicy::new("T", b"X".to_vec()));
        let mut throttle = throttle();

        let with_x = b"2024-03-01T12:30:45Z h p info has X\n".to_vec();
        let without_x = b"2024-03-01T12:30:45Z h p info plain\n".to_vec();

        process_line(without_x.clone(), &ctx, &mut throttle);
        process_line(with_x.clone(), &ctx, &mut throttle);
        process_line(without_x, &ctx, &mut throttle);
        process_line(with_x, &ctx, &mut throttle);

        assert_eq!(counters.scan("h", "p", "info", ""), 2);
        assert_eq!(counters.scan("h", "p", "info", "T"), 2);
    }

    #[test]
    fn test_filter_only_looks_at_message_body() {
        let counters = Arc::new(RecordingCounters::default());
        let ctx = metrics_ctx(Arc::clone(&counters), TagPolicy::new("T", b"web01".to_vec()));
        process_line(LINE.to_vec(), &ctx, &mut throttle());
        assert_eq!(counters.scan("web01", "nginx", "info", ""), 1);
    }

    #[test]
    fn test_parse_failure_skips_line() {
        let counters = Arc::new(RecordingCounters::default());
        let ctx = WorkerContext {
            parser: Arc::new(Rejecting),
            route: Route::Metrics {
                counters: counters.clone(),
                tag: TagPolicy::default(),
            },
            stats: Arc::new(PipelineStats::new()),
        };

        assert_eq!(
            process_line(LINE.to_vec(), &ctx, &mut throttle()),
            LineOutcome::ParseFailed
        );
        assert_eq!(counters.scan("web01", "nginx", "info", ""), 0);
        assert_eq!(ctx.stats.snapshot().parse_errors, 1);
        assert_eq!(ctx.stats.snapshot().parsed, 0);
    }

    #[test]
    fn test_forward_route_enqueues_record() {
        let (tx, rx) = bounded(4);
        let ctx = forward_ctx(None, tx);

        assert_eq!(
            process_line(LINE.to_vec(), &ctx, &mut throttle()),
            LineOutcome::Forwarded
        );
        let record = rx.try_recv().unwrap();
        assert_eq!(record.hostname, "web01");
        assert_eq!(record.shipped_line(), "GET /health 200");
        assert!(record.timestamp_ns.is_some());
    }

    #[test]
    fn test_transform_rewrites_message() {
        let (tx, rx) = bounded(4);
        let ctx = forward_ctx(Some(Arc::new(Upper)), tx);

        process_line(LINE.to_vec(), &ctx, &mut throttle());
        let record = rx.try_recv().unwrap();
        assert_eq!(record.msg.as_deref(), Some("GET /HEALTH 200\n"));
        assert_eq!(record.raw, LINE);
    }

    #[test]
    fn test_transform_failure_skips_record() {
        let (tx, rx) = bounded(4);
        let ctx = forward_ctx(Some(Arc::new(Broken)), tx);

        assert_eq!(
            process_line(LINE.to_vec(), &ctx, &mut throttle()),
            LineOutcome::TransformFailed
        );
        assert!(rx.try_recv().is_err());
        assert_eq!(ctx.stats.snapshot().transform_errors, 1);
    }

    #[test]
    fn test_full_output_queue_drops_without_blocking() {
        let (tx, rx) = bounded(2);
        let ctx = forward_ctx(None, tx);
        let mut throttle = throttle();

        let outcomes: Vec<LineOutcome> = (0..5)
            .map(|_| process_line(LINE.to_vec(), &ctx, &mut throttle))
            .collect();

        assert_eq!(
            outcomes,
            vec![
                LineOutcome::Forwarded,
                LineOutcome::Forwarded,
                LineOutcome::Dropped,
                LineOutcome::Dropped,
                LineOutcome::Dropped,
            ]
        );
        assert_eq!(rx.len(), 2);
        let snap = ctx.stats.snapshot();
        assert_eq!(snap.forwarded, 2);
        assert_eq!(snap.dropped, 3);
    }

    #[test]
    fn test_closed_output_queue_drops_record() {
        let (tx, rx) = bounded(2);
        drop(rx);
        let ctx = forward_ctx(None, tx);
        let mut throttle = throttle();

        for _ in 0..3 {
            assert_eq!(
                process_line(LINE.to_vec(), &ctx, &mut throttle),
                LineOutcome::Dropped
            );
        }

        let snap = ctx.stats.snapshot();
        assert_eq!(snap.forwarded, 0);
        assert_eq!(snap.dropped, 3);
    }

    #[test]
    fn test_worker_thread_exits_when_queue_closes() {
        let counters = Arc::new(RecordingCounters::default());
        let ctx = metrics_ctx(Arc::clone(&counters), TagPolicy::default());
        let (batch_tx, batch_rx) = bounded(2);

        let handle = std::thread::spawn(move || worker_thread(0, batch_rx, ctx));
        batch_tx
            .send(Batch {
                id: 0,
                lines: std::array::from_fn(|_| LINE.to_vec()),
            })
            .unwrap();
        drop(batch_tx);
        handle.join().unwrap();

        assert_eq!(counters.scan("web01", "nginx", "info", ""), 20);
    }
}
