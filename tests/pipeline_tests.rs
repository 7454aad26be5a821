use std::io::Cursor;
use std::sync::Arc;

use crossbeam_channel::bounded;
use fancy::parallel::{Route, TagPolicy, WorkerContext};
use fancy::{
    FancyParser, LogLine, ParallelConfig, ParallelProcessor, PipelineStats, PromCounters,
};

fn line(host: &str, program: &str, level: &str, body: &str) -> String {
    format!("2024-03-01T12:30:45Z {} {} {} {}\n", host, program, level, body)
}

fn metrics_context(tag: TagPolicy) -> (WorkerContext, Arc<PromCounters>, Arc<PipelineStats>) {
    let counters = Arc::new(PromCounters::new().unwrap());
    let stats = Arc::new(PipelineStats::new());
    let ctx = WorkerContext {
        parser: Arc::new(FancyParser::new()),
        route: Route::Metrics {
            counters: counters.clone(),
            tag,
        },
        stats: Arc::clone(&stats),
    };
    (ctx, counters, stats)
}

#[test]
fn test_counters_match_parsed_lines() {
    let mut input = String::new();
    let mut web_bytes = 0u64;
    for i in 0..60 {
        let l = if i % 3 == 0 {
            line("db01", "postgres", "err", &format!("deadlock {}", i))
        } else {
            let l = line("web01", "nginx", "info", &format!("GET /{}", i));
            web_bytes += l.len() as u64;
            l
        };
        input.push_str(&l);
    }

    let (ctx, counters, stats) = metrics_context(TagPolicy::default());
    let (summary, pool) = ParallelProcessor::new(ParallelConfig::default())
        .run(Cursor::new(input), ctx)
        .unwrap();
    pool.join();

    assert_eq!(summary.batches_sent, 3);
    assert_eq!(stats.snapshot().parsed, 60);
    assert_eq!(counters.scan_count("db01", "postgres", "err", ""), 20);
    assert_eq!(counters.scan_count("web01", "nginx", "info", ""), 40);
    assert_eq!(counters.raw_bytes("web01", "nginx"), web_bytes);
}

#[test]
fn test_trailing_lines_are_never_counted() {
    let input = line("web01", "sshd", "info", "hello").repeat(25);

    let (ctx, counters, stats) = metrics_context(TagPolicy::default());
    let (summary, pool) = ParallelProcessor::new(ParallelConfig::default())
        .run(Cursor::new(input), ctx)
        .unwrap();
    pool.join();

    assert_eq!(summary.discarded_lines, 5);
    assert_eq!(stats.snapshot().parsed, 20);
    assert_eq!(counters.scan_count("web01", "sshd", "info", ""), 20);
}

#[test]
fn test_malformed_lines_are_skipped() {
    let mut input = line("web01", "sshd", "info", "ok").repeat(18);
    input.push_str("garbage\n");
    input.push_str(&line("web01", "sshd", "shouting", "bad level"));

    let (ctx, counters, stats) = metrics_context(TagPolicy::default());
    let (_summary, pool) = ParallelProcessor::new(ParallelConfig::default())
        .run(Cursor::new(input), ctx)
        .unwrap();
    pool.join();

    let snapshot = stats.snapshot();
    assert_eq!(snapshot.parsed, 18);
    assert_eq!(snapshot.parse_errors, 2);
    assert_eq!(counters.scan_count("web01", "sshd", "info", ""), 18);
}

#[test]
fn test_tag_follows_filter_per_record() {
    let mut input = String::new();
    for i in 0..40 {
        let body = if i % 2 == 0 {
            "Failed password for root"
        } else {
            "Accepted password for root"
        };
        input.push_str(&line("bastion", "sshd", "notice", body));
    }

    let (ctx, counters, _stats) = metrics_context(TagPolicy::new("bruteforce", "Failed"));
    let (_summary, pool) = ParallelProcessor::new(ParallelConfig::default())
        .run(Cursor::new(input), ctx)
        .unwrap();
    pool.join();

    assert_eq!(counters.scan_count("bastion", "sshd", "notice", "bruteforce"), 20);
    assert_eq!(counters.scan_count("bastion", "sshd", "notice", ""), 20);
}

#[test]
fn test_full_output_queue_drops_without_blocking() {
    let capacity = 5;
    let (output, receiver) = bounded::<LogLine>(capacity);
    let stats = Arc::new(PipelineStats::new());
    let ctx = WorkerContext {
        parser: Arc::new(FancyParser::new()),
        route: Route::Forward {
            transform: None,
            output,
        },
        stats: Arc::clone(&stats),
    };

    let input = line("web01", "app", "info", "burst").repeat(200);
    let (_summary, pool) = ParallelProcessor::new(ParallelConfig::default())
        .run(Cursor::new(input), ctx)
        .unwrap();
    pool.join();

    let snapshot = stats.snapshot();
    assert_eq!(snapshot.forwarded, capacity as u64);
    assert_eq!(snapshot.dropped, 200 - capacity as u64);
    assert_eq!(receiver.len(), capacity);
}

#[test]
fn test_forwarded_records_keep_their_fields() {
    let (output, receiver) = bounded::<LogLine>(100);
    let stats = Arc::new(PipelineStats::new());
    let ctx = WorkerContext {
        parser: Arc::new(FancyParser::new()),
        route: Route::Forward {
            transform: None,
            output,
        },
        stats,
    };

    let input = line("web01", "cron", "debug", "tick").repeat(20);
    let (_summary, pool) = ParallelProcessor::new(ParallelConfig::default())
        .run(Cursor::new(input), ctx)
        .unwrap();
    pool.join();

    let records: Vec<LogLine> = receiver.iter().collect();
    assert_eq!(records.len(), 20);
    for record in records {
        assert_eq!(record.hostname, "web01");
        assert_eq!(record.program, "cron");
        assert_eq!(record.severity, "debug");
        assert_eq!(record.timestamp_ns, Some(1_709_296_245_000_000_000));
        assert_eq!(record.shipped_line(), "tick");
    }
}

#[cfg(unix)]
#[test]
fn test_command_rewrites_forwarded_messages() {
    use fancy::{CommandTransform, MessageTransform};

    let transform = CommandTransform::from_command_line("tr a-z A-Z").unwrap();
    let (output, receiver) = bounded::<LogLine>(100);
    let ctx = WorkerContext {
        parser: Arc::new(FancyParser::new()),
        route: Route::Forward {
            transform: Some(Arc::new(transform) as Arc<dyn MessageTransform>),
            output,
        },
        stats: Arc::new(PipelineStats::new()),
    };

    let input = line("web01", "app", "info", "quiet please").repeat(20);
    let (_summary, pool) = ParallelProcessor::new(ParallelConfig {
        num_workers: 2,
        ..ParallelConfig::default()
    })
    .run(Cursor::new(input), ctx)
    .unwrap();
    pool.join();

    let shipped: Vec<String> = receiver.iter().map(|r| r.shipped_line()).collect();
    assert_eq!(shipped.len(), 20);
    assert!(shipped.iter().all(|m| m == "QUIET PLEASE"));
}
