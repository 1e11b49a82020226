//! Parquet read-merge-rewrite
//!
//! Parquet has no append mode, so a flush reads the existing partition file,
//! concatenates the new rows after the stored ones and writes the result to
//! a uniquely named temporary sibling that is then renamed over the
//! partition file.
//!
//! Merges of one partition file are serialized process-wide, whichever sink
//! or logger issues them.

use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;

use super::schema::{log_schema, rows_from_record_batch, rows_to_record_batch, LogRow};
use crate::core::{Compression, LoggerError, Result};

/// Result of a successful [`merge_and_write`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOutcome {
    /// Rows from the new batch
    pub appended: usize,
    /// Rows in the file after the write
    pub total: usize,
    /// The existing file was unreadable and was overwritten
    pub replaced_corrupt: bool,
}

/// Read every row of a partition file.
pub fn read_rows(path: &Path) -> Result<Vec<LogRow>> {
    let corrupt = |message: String| LoggerError::corrupt_file(path.display().to_string(), message);

    let file = File::open(path)
        .map_err(|e| LoggerError::io_operation("opening partition file", path.display().to_string(), e))?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .and_then(|builder| builder.build())
        .map_err(|e| corrupt(e.to_string()))?;

    let mut rows = Vec::new();
    for batch in reader {
        let batch = batch.map_err(|e| corrupt(e.to_string()))?;
        rows.extend(rows_from_record_batch(&batch).map_err(|e| corrupt(e.to_string()))?);
    }
    Ok(rows)
}

/// Write `rows` as a complete Parquet file at `path`, replacing any content.
pub fn write_rows(path: &Path, rows: &[LogRow], compression: Compression) -> Result<()> {
    let file = File::create(path)
        .map_err(|e| LoggerError::io_operation("creating parquet file", path.display().to_string(), e))?;
    write_batch(file, rows, compression)
}

fn write_batch<W: Write + Send>(writer: W, rows: &[LogRow], compression: Compression) -> Result<()> {
    let schema = log_schema();
    let record_batch = rows_to_record_batch(rows, schema.clone())?;
    let props = WriterProperties::builder()
        .set_compression(compression.to_parquet())
        .build();

    let mut writer = ArrowWriter::try_new(writer, schema, Some(props))?;
    writer.write(&record_batch)?;
    writer.close()?;
    Ok(())
}

/// Write lock shared by every merge of the partition file at `path`.
fn partition_lock(path: &Path) -> Arc<Mutex<()>> {
    static LOCKS: OnceLock<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> = OnceLock::new();

    // Key on the resolved directory so different spellings of one file share a lock.
    let key = path
        .parent()
        .and_then(|dir| dir.canonicalize().ok())
        .zip(path.file_name())
        .map(|(dir, name)| dir.join(name))
        .unwrap_or_else(|| path.to_path_buf());

    let mut locks = LOCKS.get_or_init(Default::default).lock();
    Arc::clone(locks.entry(key).or_default())
}

fn write_replacement(path: &Path, rows: &[LogRow], compression: Compression) -> Result<()> {
    let directory = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let prefix = format!(
        ".{}.",
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    );
    let io_error = |operation: &str, e: std::io::Error| {
        LoggerError::io_operation(operation, path.display().to_string(), e)
    };

    // Removed on drop unless persisted.
    let mut tmp = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(".tmp")
        .tempfile_in(directory)
        .map_err(|e| io_error("creating temporary partition file", e))?;
    write_batch(tmp.as_file_mut(), rows, compression)?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| io_error("syncing temporary partition file", e))?;
    tmp.persist(path)
        .map_err(|e| io_error("replacing partition file", e.error))?;
    Ok(())
}

/// Append `new_rows` to the partition file at `path`.
///
/// Existing rows keep their order and come first. An unreadable existing
/// file is replaced by the new rows alone.
pub fn merge_and_write(
    path: &Path,
    new_rows: Vec<LogRow>,
    compression: Compression,
) -> Result<WriteOutcome> {
    let lock = partition_lock(path);
    let _guard = lock.lock();

    let appended = new_rows.len();
    let mut replaced_corrupt = false;

    let merged = if path.exists() {
        match read_rows(path) {
            Ok(mut existing) => {
                existing.extend(new_rows);
                existing
            }
            Err(e) => {
                eprintln!(
                    "[LOGGER WARNING] Replacing unreadable partition file {}: {}",
                    path.display(),
                    e
                );
                replaced_corrupt = true;
                new_rows
            }
        }
    } else {
        new_rows
    };

    write_replacement(path, &merged, compression)?;

    Ok(WriteOutcome {
        appended,
        total: merged.len(),
        replaced_corrupt,
    })
}
