//! Criterion benchmarks for rust_batch_logger

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use rust_batch_logger::prelude::*;
use rust_batch_logger::info;
use std::sync::Arc;

struct Discard;

impl Sink for Discard {
    fn handle(&mut self, record: &Record) -> Result<()> {
        black_box(record);
        Ok(())
    }

    fn name(&self) -> &str {
        "discard"
    }
}

fn logger(registry: &Arc<LoggerRegistry>, name: &str, async_logging: bool) -> Logger {
    registry
        .configure_with_sinks(
            LoggerConfig::new(name)
                .console(false, false)
                .level(LogLevel::Info)
                .async_logging(async_logging),
            vec![Box::new(Discard)],
        )
        .unwrap()
}

fn sample_record(level: LogLevel) -> Record {
    Record::new(
        level,
        "bench",
        "request handled in 12ms".to_string(),
        SourceLocation::new("server.rs", 120, "handle"),
    )
}

// ============================================================================
// Producer Path Benchmarks
// ============================================================================

fn bench_level_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("level_filter");
    group.throughput(Throughput::Elements(1));

    let registry = LoggerRegistry::new();
    let logger = logger(&registry, "filter", true);

    group.bench_function("filtered_method", |b| {
        b.iter(|| logger.debug(black_box("never formatted")));
    });

    group.bench_function("filtered_macro", |b| {
        b.iter(|| rust_batch_logger::debug!(logger, "value {}", black_box(42)));
    });

    group.finish();
    registry.shutdown(DEFAULT_SHUTDOWN_TIMEOUT);
}

fn bench_async_logging(c: &mut Criterion) {
    let mut group = c.benchmark_group("async_logging");
    group.throughput(Throughput::Elements(1));

    let registry = LoggerRegistry::new();
    let logger = logger(&registry, "async", true);

    group.bench_function("info", |b| {
        b.iter(|| logger.info(black_box("Info message")));
    });

    group.bench_function("info_macro", |b| {
        b.iter(|| info!(logger, "user {} logged in", black_box(7)));
    });

    group.finish();
    registry.shutdown(DEFAULT_SHUTDOWN_TIMEOUT);
}

fn bench_sync_logging(c: &mut Criterion) {
    let mut group = c.benchmark_group("sync_logging");
    group.throughput(Throughput::Elements(1));

    let registry = LoggerRegistry::new();
    let logger = logger(&registry, "sync", false);

    group.bench_function("info", |b| {
        b.iter(|| logger.info(black_box("Info message")));
    });

    group.bench_function("warning", |b| {
        b.iter(|| logger.warning(black_box("Warning message")));
    });

    group.finish();
    registry.shutdown(DEFAULT_SHUTDOWN_TIMEOUT);
}

// ============================================================================
// Formatting Benchmarks
// ============================================================================

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("render");
    group.throughput(Throughput::Elements(1));

    let renderer = Renderer::default();
    let compact = sample_record(LogLevel::Info);
    let expanded = sample_record(LogLevel::Error).with_exception("connection reset");

    group.bench_function("compact", |b| {
        b.iter(|| black_box(renderer.render(black_box(&compact))));
    });

    group.bench_function("expanded_with_exception", |b| {
        b.iter(|| black_box(renderer.render(black_box(&expanded))));
    });

    group.bench_function("colorize", |b| {
        let line = renderer.render(&expanded);
        b.iter(|| black_box(rust_batch_logger::colorize_level_tag(&line, LogLevel::Error)));
    });

    group.finish();
}

// ============================================================================
// Columnar Benchmarks
// ============================================================================

fn bench_columnar_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("columnar");
    group.sample_size(20);

    for batch in [10usize, 100, 1000] {
        group.throughput(Throughput::Elements(batch as u64));
        group.bench_function(format!("append_and_flush_{}", batch), |b| {
            b.iter_batched(
                || {
                    let dir = tempfile::tempdir().unwrap();
                    let sink = ColumnarBatchSink::new(
                        PartitionSpec::new(dir.path(), "bench", "bench"),
                        Renderer::default(),
                        batch,
                        Compression::Snappy,
                    );
                    (dir, sink)
                },
                |(dir, sink)| {
                    for _ in 0..batch {
                        sink.append(&sample_record(LogLevel::Info));
                    }
                    black_box(sink.metrics().rows_written());
                    drop(sink);
                    drop(dir);
                },
                BatchSize::PerIteration,
            );
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_level_filter,
    bench_async_logging,
    bench_sync_logging,
    bench_render,
    bench_columnar_batch,
);
criterion_main!(benches);
