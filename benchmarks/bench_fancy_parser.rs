use std::hint::black_box;
use std::io::Cursor;
use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion, Throughput};

use fancy::parallel::{Route, TagPolicy, WorkerContext};
use fancy::{FancyParser, LineParser, ParallelConfig, ParallelProcessor, PipelineStats, PromCounters};

const LINE: &[u8] =
    b"2024-03-01T12:30:45.123456+00:00 web01 nginx info GET /api/v1/users?id=42 HTTP/1.1 200 512\n";

fn bench_parse_metric_only(c: &mut Criterion) {
    let parser = FancyParser::new();
    c.bench_function("parse_metric_only", |b| {
        b.iter(|| black_box(parser.parse(black_box(LINE.to_vec()), true)));
    });
}

fn bench_parse_forwarding(c: &mut Criterion) {
    let parser = FancyParser::new();
    c.bench_function("parse_forwarding", |b| {
        b.iter(|| black_box(parser.parse(black_box(LINE.to_vec()), false)));
    });
}

fn bench_metric_pipeline(c: &mut Criterion) {
    let lines = 20_000;
    let input = LINE.repeat(lines);

    let mut group = c.benchmark_group("metric_pipeline");
    group.throughput(Throughput::Elements(lines as u64));
    group.sample_size(20);
    group.bench_function("20k_lines", |b| {
        b.iter(|| {
            let ctx = WorkerContext {
                parser: Arc::new(FancyParser::new()),
                route: Route::Metrics {
                    counters: Arc::new(PromCounters::new().unwrap()),
                    tag: TagPolicy::new("bench", "users"),
                },
                stats: Arc::new(PipelineStats::new()),
            };
            let (summary, pool) = ParallelProcessor::new(ParallelConfig::default())
                .run(Cursor::new(input.as_slice()), ctx)
                .unwrap();
            pool.join();
            black_box(summary)
        });
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_parse_metric_only,
    bench_parse_forwarding,
    bench_metric_pipeline
);
criterion_main!(benches);
