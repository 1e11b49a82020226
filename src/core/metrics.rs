//! Pipeline metrics for observability
//!
//! Logging failures are silent towards the application; these counters are
//! the place where they remain visible.

use std::sync::atomic::{AtomicU64, Ordering};

/// Per-logger counters, shared by the producer side and the dispatcher.
///
/// # Example
///
/// ```
/// use rust_batch_logger::LoggerMetrics;
///
/// let metrics = LoggerMetrics::new();
/// metrics.record_enqueued();
/// metrics.record_delivered();
///
/// assert_eq!(metrics.enqueued(), 1);
/// assert_eq!(metrics.delivered(), 1);
/// ```
#[derive(Debug)]
pub struct LoggerMetrics {
    /// Records accepted by the pipeline
    enqueued: AtomicU64,

    /// Records delivered to every sink without error
    delivered: AtomicU64,

    /// Individual sink failures (errors and panics)
    sink_failures: AtomicU64,

    /// Records rejected because a bounded queue was full
    queue_full_events: AtomicU64,
}

impl LoggerMetrics {
    pub const fn new() -> Self {
        Self {
            enqueued: AtomicU64::new(0),
            delivered: AtomicU64::new(0),
            sink_failures: AtomicU64::new(0),
            queue_full_events: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn enqueued(&self) -> u64 {
        self.enqueued.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn sink_failures(&self) -> u64 {
        self.sink_failures.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn queue_full_events(&self) -> u64 {
        self.queue_full_events.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn record_enqueued(&self) -> u64 {
        self.enqueued.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_delivered(&self) -> u64 {
        self.delivered.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_sink_failure(&self) -> u64 {
        self.sink_failures.fetch_add(1, Ordering::Relaxed)
    }

    /// Returns the previous count.
    #[inline]
    pub fn record_queue_full(&self) -> u64 {
        self.queue_full_events.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for LoggerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Counters for a batching columnar sink.
#[derive(Debug, Default)]
pub struct ColumnarMetrics {
    /// Flushes that performed I/O (empty flushes are not counted)
    flushes: AtomicU64,
    rows_written: AtomicU64,
    failed_flushes: AtomicU64,
    /// Rows lost together with a failed batch
    dropped_rows: AtomicU64,
    /// Existing partition files that could not be read and were replaced
    corrupt_files_replaced: AtomicU64,
}

impl ColumnarMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn flushes(&self) -> u64 {
        self.flushes.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn rows_written(&self) -> u64 {
        self.rows_written.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn failed_flushes(&self) -> u64 {
        self.failed_flushes.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn dropped_rows(&self) -> u64 {
        self.dropped_rows.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn corrupt_files_replaced(&self) -> u64 {
        self.corrupt_files_replaced.load(Ordering::Relaxed)
    }

    pub fn record_flush(&self, rows: usize) {
        self.flushes.fetch_add(1, Ordering::Relaxed);
        self.rows_written.fetch_add(rows as u64, Ordering::Relaxed);
    }

    pub fn record_failed_flush(&self, rows: usize) {
        self.flushes.fetch_add(1, Ordering::Relaxed);
        self.failed_flushes.fetch_add(1, Ordering::Relaxed);
        self.dropped_rows.fetch_add(rows as u64, Ordering::Relaxed);
    }

    pub fn record_corrupt_replaced(&self) {
        self.corrupt_files_replaced.fetch_add(1, Ordering::Relaxed);
    }
}
