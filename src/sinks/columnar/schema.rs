//! Arrow schema and row conversions for `log.parquet`
//!
//! Column order: timestamp, level, logger_name, message, raw_message,
//! file, line, function, exception.

use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, StringArray, TimestampMillisecondArray, UInt32Array,
};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use arrow::record_batch::RecordBatch;

use crate::core::{Compression, LoggerError, Record, Renderer, Result};

// =============================================================================
// Row type
// =============================================================================

/// One stored log row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRow {
    /// Milliseconds since the Unix epoch, UTC
    pub timestamp: i64,
    pub level: String,
    pub logger_name: String,
    /// Display line rendered with the configured templates
    pub message: String,
    /// Record message
    pub raw_message: String,
    pub file: String,
    pub line: u32,
    pub function: String,
    pub exception: Option<String>,
}

impl LogRow {
    pub fn from_record(record: &Record, renderer: &Renderer) -> Self {
        Self {
            timestamp: record.timestamp.timestamp_millis(),
            level: record.level.to_str().to_string(),
            logger_name: record.logger_name.clone(),
            message: renderer.render(record),
            raw_message: record.message.clone(),
            file: record.location.file.clone(),
            line: record.location.line,
            function: record.location.function.clone(),
            exception: record.exception.clone(),
        }
    }
}

// =============================================================================
// Schema
// =============================================================================

pub fn log_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new(
            "timestamp",
            DataType::Timestamp(TimeUnit::Millisecond, Some("UTC".into())),
            false,
        ),
        Field::new("level", DataType::Utf8, false),
        Field::new("logger_name", DataType::Utf8, false),
        Field::new("message", DataType::Utf8, false),
        Field::new("raw_message", DataType::Utf8, false),
        Field::new("file", DataType::Utf8, false),
        Field::new("line", DataType::UInt32, false),
        Field::new("function", DataType::Utf8, false),
        Field::new("exception", DataType::Utf8, true),
    ]))
}

impl Compression {
    /// Convert to parquet compression type
    pub fn to_parquet(self) -> parquet::basic::Compression {
        match self {
            Self::None => parquet::basic::Compression::UNCOMPRESSED,
            Self::Snappy => parquet::basic::Compression::SNAPPY,
            Self::Lz4 => parquet::basic::Compression::LZ4,
            Self::Zstd => parquet::basic::Compression::ZSTD(Default::default()),
        }
    }
}

// =============================================================================
// Conversions
// =============================================================================

/// Convert rows to an Arrow RecordBatch (columns in schema order)
pub fn rows_to_record_batch(
    rows: &[LogRow],
    schema: SchemaRef,
) -> std::result::Result<RecordBatch, arrow::error::ArrowError> {
    let len = rows.len();

    let mut timestamps = Vec::with_capacity(len);
    let mut levels = Vec::with_capacity(len);
    let mut logger_names = Vec::with_capacity(len);
    let mut messages = Vec::with_capacity(len);
    let mut raw_messages = Vec::with_capacity(len);
    let mut files = Vec::with_capacity(len);
    let mut lines = Vec::with_capacity(len);
    let mut functions = Vec::with_capacity(len);
    let mut exceptions: Vec<Option<&str>> = Vec::with_capacity(len);

    for row in rows {
        timestamps.push(row.timestamp);
        levels.push(row.level.as_str());
        logger_names.push(row.logger_name.as_str());
        messages.push(row.message.as_str());
        raw_messages.push(row.raw_message.as_str());
        files.push(row.file.as_str());
        lines.push(row.line);
        functions.push(row.function.as_str());
        exceptions.push(row.exception.as_deref());
    }

    let columns: Vec<ArrayRef> = vec![
        Arc::new(TimestampMillisecondArray::from(timestamps).with_timezone("UTC")), // 0: timestamp
        Arc::new(StringArray::from(levels)),       // 1: level
        Arc::new(StringArray::from(logger_names)), // 2: logger_name
        Arc::new(StringArray::from(messages)),     // 3: message
        Arc::new(StringArray::from(raw_messages)), // 4: raw_message
        Arc::new(StringArray::from(files)),        // 5: file
        Arc::new(UInt32Array::from(lines)),        // 6: line
        Arc::new(StringArray::from(functions)),    // 7: function
        Arc::new(StringArray::from(exceptions)),   // 8: exception
    ];

    RecordBatch::try_new(schema, columns)
}

fn column<'a, T: Array + 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
    batch
        .column_by_name(name)
        .and_then(|column| column.as_any().downcast_ref::<T>())
        .ok_or_else(|| LoggerError::other(format!("column '{}' is missing or mistyped", name)))
}

/// Convert a RecordBatch read back from storage into rows
pub fn rows_from_record_batch(batch: &RecordBatch) -> Result<Vec<LogRow>> {
    let timestamps = column::<TimestampMillisecondArray>(batch, "timestamp")?;
    let levels = column::<StringArray>(batch, "level")?;
    let logger_names = column::<StringArray>(batch, "logger_name")?;
    let messages = column::<StringArray>(batch, "message")?;
    let raw_messages = column::<StringArray>(batch, "raw_message")?;
    let files = column::<StringArray>(batch, "file")?;
    let lines = column::<UInt32Array>(batch, "line")?;
    let functions = column::<StringArray>(batch, "function")?;
    let exceptions = column::<StringArray>(batch, "exception")?;

    Ok((0..batch.num_rows())
        .map(|i| LogRow {
            timestamp: timestamps.value(i),
            level: levels.value(i).to_string(),
            logger_name: logger_names.value(i).to_string(),
            message: messages.value(i).to_string(),
            raw_message: raw_messages.value(i).to_string(),
            file: files.value(i).to_string(),
            line: lines.value(i),
            function: functions.value(i).to_string(),
            exception: (!exceptions.is_null(i)).then(|| exceptions.value(i).to_string()),
        })
        .collect())
}

// =============================================================================
// Tests
// =============================================================================
