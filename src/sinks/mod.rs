//! Sink implementations

pub mod console;
pub mod file;

#[cfg(feature = "columnar")]
pub mod columnar;

pub use console::ConsoleSink;
pub use file::FileSink;

#[cfg(feature = "columnar")]
pub use columnar::{ColumnarBatchSink, LogRow, PartitionSpec, LOG_FILE_NAME};

pub use crate::core::{ExitFlush, Sink};
