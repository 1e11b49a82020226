//! Batched columnar sink
//!
//! Buffers records in memory and persists them as Parquet rows once the
//! buffer reaches the flush threshold, on explicit flush, when the owning
//! pipeline stops, and from the exit hooks.
//!
//! # Directory Structure
//!
//! ```text
//! <base_path>/
//! └── <project>/
//!     └── <environment>/
//!         └── 2026-10-19/
//!             └── log.parquet
//! ```
//!
//! One file per project, environment and local calendar day. The date is
//! taken when a batch is flushed.

mod schema;
mod writer;

pub use schema::{log_schema, rows_from_record_batch, rows_to_record_batch, LogRow};
pub use writer::{merge_and_write, read_rows, write_rows, WriteOutcome};

use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

use chrono::{Local, NaiveDate};
use parking_lot::Mutex;

use crate::core::{
    ColumnarMetrics, Compression, ExitFlush, LoggerConfig, LoggerError, Record, Renderer, Result,
    Sink,
};

/// File name of every partition file
pub const LOG_FILE_NAME: &str = "log.parquet";

/// Expand a leading `~/` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
    path.to_str()
        .and_then(|s| s.strip_prefix("~/"))
        .and_then(|stripped| dirs::home_dir().map(|home| home.join(stripped)))
        .unwrap_or_else(|| path.to_path_buf())
}

/// Partition key minus the date: base path, project and environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionSpec {
    base_path: PathBuf,
    project: String,
    environment: String,
}

impl PartitionSpec {
    pub fn new(
        base_path: impl AsRef<Path>,
        project: impl Into<String>,
        environment: impl Into<String>,
    ) -> Self {
        Self {
            base_path: expand_tilde(base_path.as_ref()),
            project: project.into(),
            environment: environment.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn directory_for(&self, date: NaiveDate) -> PathBuf {
        self.base_path
            .join(&self.project)
            .join(&self.environment)
            .join(date.format("%Y-%m-%d").to_string())
    }

    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.directory_for(date).join(LOG_FILE_NAME)
    }

    pub fn current_path(&self) -> PathBuf {
        self.path_for(Local::now().date_naive())
    }
}

struct ColumnarInner {
    partition: PartitionSpec,
    renderer: Renderer,
    threshold: usize,
    compression: Compression,
    buffer: Mutex<Vec<LogRow>>,
    /// Keeps this sink's batches in swap order. Lock order: `io_lock`, then
    /// `buffer`, then the partition file lock taken by `merge_and_write`.
    io_lock: Mutex<()>,
    metrics: ColumnarMetrics,
}

impl ColumnarInner {
    fn append(&self, record: &Record) -> usize {
        let row = LogRow::from_record(record, &self.renderer);
        let full = {
            let mut buffer = self.buffer.lock();
            buffer.push(row);
            buffer.len() >= self.threshold
        };
        if full {
            self.flush()
        } else {
            0
        }
    }

    fn flush(&self) -> usize {
        let _io = self.io_lock.lock();
        let rows = std::mem::take(&mut *self.buffer.lock());
        if rows.is_empty() {
            return 0;
        }

        let count = rows.len();
        match self.persist(rows) {
            Ok(outcome) => {
                if outcome.replaced_corrupt {
                    self.metrics.record_corrupt_replaced();
                }
                self.metrics.record_flush(count);
                count
            }
            Err(e) => {
                eprintln!(
                    "[LOGGER ERROR] Columnar flush failed, {} records dropped: {}",
                    count, e
                );
                self.metrics.record_failed_flush(count);
                0
            }
        }
    }

    fn persist(&self, rows: Vec<LogRow>) -> Result<WriteOutcome> {
        let directory = self.partition.directory_for(Local::now().date_naive());
        std::fs::create_dir_all(&directory).map_err(|e| {
            LoggerError::io_operation(
                "creating partition directory",
                directory.display().to_string(),
                e,
            )
        })?;
        merge_and_write(&directory.join(LOG_FILE_NAME), rows, self.compression)
    }
}

impl ExitFlush for ColumnarInner {
    fn flush_on_exit(&self) -> usize {
        self.flush()
    }
}

impl Drop for ColumnarInner {
    fn drop(&mut self) {
        self.flush();
    }
}

/// Sink that batches records into partitioned Parquet files.
///
/// Clones share one buffer. A failed flush is reported on stderr and its
/// batch is dropped; it never reaches the logging caller.
///
/// # Example
///
/// ```no_run
/// use rust_batch_logger::sinks::{ColumnarBatchSink, PartitionSpec};
/// use rust_batch_logger::{Compression, Renderer};
///
/// let sink = ColumnarBatchSink::new(
///     PartitionSpec::new("~/.rust_batch_logger/logs", "billing", "production"),
///     Renderer::default(),
///     100,
///     Compression::Zstd,
/// );
/// assert_eq!(sink.buffered_len(), 0);
/// ```
#[derive(Clone)]
pub struct ColumnarBatchSink {
    inner: Arc<ColumnarInner>,
}

impl ColumnarBatchSink {
    pub fn new(
        partition: PartitionSpec,
        renderer: Renderer,
        threshold: usize,
        compression: Compression,
    ) -> Self {
        Self {
            inner: Arc::new(ColumnarInner {
                partition,
                renderer,
                threshold: threshold.max(1),
                compression,
                buffer: Mutex::new(Vec::with_capacity(threshold.max(1))),
                io_lock: Mutex::new(()),
                metrics: ColumnarMetrics::new(),
            }),
        }
    }

    pub fn from_config(config: &LoggerConfig, renderer: Renderer) -> Result<Self> {
        if config.flush_threshold == 0 {
            return Err(LoggerError::config(
                "ColumnarBatchSink",
                "flush_threshold must be > 0",
            ));
        }
        let partition = PartitionSpec::new(
            &config.columnar_base_path,
            config.resolved_project(),
            config.environment.clone(),
        );
        Ok(Self::new(
            partition,
            renderer,
            config.flush_threshold,
            config.compression,
        ))
    }

    /// Handle for the exit-flush registry. Does not keep the sink alive.
    pub fn exit_handle(&self) -> Weak<dyn ExitFlush> {
        let weak: Weak<ColumnarInner> = Arc::downgrade(&self.inner);
        weak
    }

    /// Buffer one record, flushing when the threshold is reached. Returns
    /// the rows persisted by that flush.
    pub fn append(&self, record: &Record) -> usize {
        self.inner.append(record)
    }

    /// Persist the whole buffer. Returns the rows written; `0` when the
    /// buffer was empty or the write failed.
    pub fn flush(&self) -> usize {
        self.inner.flush()
    }

    pub fn buffered_len(&self) -> usize {
        self.inner.buffer.lock().len()
    }

    pub fn threshold(&self) -> usize {
        self.inner.threshold
    }

    pub fn partition(&self) -> &PartitionSpec {
        &self.inner.partition
    }

    pub fn partition_path_for(&self, date: NaiveDate) -> PathBuf {
        self.inner.partition.path_for(date)
    }

    pub fn current_partition_path(&self) -> PathBuf {
        self.inner.partition.current_path()
    }

    pub fn metrics(&self) -> &ColumnarMetrics {
        &self.inner.metrics
    }
}

impl Sink for ColumnarBatchSink {
    fn handle(&mut self, record: &Record) -> Result<()> {
        self.inner.append(record);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.inner.flush();
        Ok(())
    }

    fn name(&self) -> &str {
        "columnar"
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{LogLevel, SourceLocation};
    use std::thread;
    use tempfile::tempdir;

    fn sink(base: &Path, threshold: usize) -> ColumnarBatchSink {
        ColumnarBatchSink::new(
            PartitionSpec::new(base, "proj", "test"),
            Renderer::default(),
            threshold,
            Compression::Snappy,
        )
    }

    fn record(message: &str) -> Record {
        Record::new(
            LogLevel::Info,
            "columnar",
            message.to_string(),
            SourceLocation::new("columnar.rs", 3, "test"),
        )
    }

    #[test]
    fn test_partition_layout() {
        let spec = PartitionSpec::new("/data/logs", "proj", "production");
        let date = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        assert_eq!(
            spec.path_for(date),
            PathBuf::from("/data/logs/proj/production/2026-10-19/log.parquet")
        );
    }

    #[test]
    fn test_tilde_expansion() {
        let expanded = expand_tilde(Path::new("~/logs"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expanded, home.join("logs"));
        }
        assert_eq!(expand_tilde(Path::new("/abs/logs")), PathBuf::from("/abs/logs"));
    }

    #[test]
    fn test_threshold_one_writes_each_record() {
        let dir = tempdir().unwrap();
        let sink = sink(dir.path(), 1);

        for message in ["first", "second", "third"] {
            assert_eq!(sink.append(&record(message)), 1);
        }

        let rows = read_rows(&sink.current_partition_path()).unwrap();
        let messages: Vec<&str> = rows.iter().map(|r| r.raw_message.as_str()).collect();
        assert_eq!(messages, vec!["first", "second", "third"]);
        assert_eq!(sink.metrics().flushes(), 3);
    }

    #[test]
    fn test_empty_flush_is_a_no_op() {
        let dir = tempdir().unwrap();
        let sink = sink(dir.path(), 10);
        sink.append(&record("only"));
        assert_eq!(sink.flush(), 1);

        let path = sink.current_partition_path();
        let before = std::fs::read(&path).unwrap();
        assert_eq!(sink.flush(), 0);
        assert_eq!(std::fs::read(&path).unwrap(), before);
        assert_eq!(sink.metrics().flushes(), 1);
    }

    #[test]
    fn test_flush_below_threshold_keeps_buffer() {
        let dir = tempdir().unwrap();
        let sink = sink(dir.path(), 5);
        for i in 0..4 {
            assert_eq!(sink.append(&record(&i.to_string())), 0);
        }
        assert_eq!(sink.buffered_len(), 4);
        assert!(!sink.current_partition_path().exists());
    }

    #[test]
    fn test_unwritable_base_drops_batch() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"a file, not a directory").unwrap();
        let sink = sink(&blocker, 2);

        sink.append(&record("a"));
        assert_eq!(sink.append(&record("b")), 0);

        assert_eq!(sink.buffered_len(), 0);
        assert_eq!(sink.metrics().failed_flushes(), 1);
        assert_eq!(sink.metrics().dropped_rows(), 2);
    }

    #[test]
    fn test_concurrent_flushes_lose_nothing() {
        let dir = tempdir().unwrap();
        let sink = sink(dir.path(), 7);

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let sink = sink.clone();
                thread::spawn(move || {
                    for i in 0..50 {
                        sink.append(&record(&format!("{}-{}", t, i)));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        sink.flush();

        assert_eq!(read_rows(&sink.current_partition_path()).unwrap().len(), 200);
        assert_eq!(sink.metrics().rows_written(), 200);
    }

    #[test]
    fn test_two_sinks_share_one_partition_file() {
        let dir = tempdir().unwrap();
        let first = sink(dir.path(), 1);
        let second = sink(dir.path(), 3);

        thread::scope(|scope| {
            for (tag, sink) in [("a", &first), ("b", &second)] {
                scope.spawn(move || {
                    for i in 0..60 {
                        sink.append(&record(&format!("{}-{}", tag, i)));
                    }
                });
            }
        });
        first.flush();
        second.flush();

        let rows = read_rows(&first.current_partition_path()).unwrap();
        assert_eq!(rows.len(), 120);
        for tag in ["a", "b"] {
            let sequence: Vec<usize> = rows
                .iter()
                .filter_map(|r| r.raw_message.strip_prefix(&format!("{}-", tag)).map(str::to_string))
                .map(|i| i.parse().unwrap())
                .collect();
            assert_eq!(sequence, (0..60).collect::<Vec<_>>());
        }
        assert_eq!(first.metrics().corrupt_files_replaced(), 0);
        assert_eq!(second.metrics().corrupt_files_replaced(), 0);
    }

    #[test]
    fn test_exit_handle_is_weak_and_flushes() {
        let dir = tempdir().unwrap();
        let sink = sink(dir.path(), 100);
        sink.append(&record("pending"));

        let handle = sink.exit_handle();
        assert_eq!(handle.upgrade().unwrap().flush_on_exit(), 1);

        drop(sink);
        assert!(handle.upgrade().is_none());
    }
}
