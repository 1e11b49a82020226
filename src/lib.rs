//! # Rust Batch Logger
//!
//! Asynchronous logging with per-logger dispatcher threads and a batched
//! columnar sink.
//!
//! ## Features
//!
//! - **Non-blocking producers**: records are filtered by level, then handed
//!   to a dedicated worker per logger name
//! - **Multiple Sinks**: console, plain text file and partitioned Parquet
//! - **Failure isolation**: a failing or panicking sink never reaches the caller
//! - **Exit durability**: buffered rows are flushed on shutdown and on
//!   SIGINT/SIGTERM
//!
//! ```no_run
//! use rust_batch_logger::prelude::*;
//! use rust_batch_logger::info;
//!
//! let registry = LoggerRegistry::new();
//! let _exit = ExitHooks::install(registry.clone()).unwrap();
//!
//! let logger = registry
//!     .configure(LoggerConfig::new("api").columnar("~/.rust_batch_logger/logs"))
//!     .unwrap();
//! info!(logger, "listening on port {}", 8080);
//! ```

pub mod core;
pub mod macros;
pub mod sinks;

pub mod prelude {
    pub use crate::core::{
        Compression, ExitHooks, ExitPolicy, ExitSignal, LogLevel, Logger, LoggerConfig,
        LoggerError, LoggerRegistry, Record, Renderer, Result, Sink, SourceLocation,
        TimestampFormat, DEFAULT_SHUTDOWN_TIMEOUT,
    };
    pub use crate::sinks::{ConsoleSink, FileSink};

    #[cfg(feature = "columnar")]
    pub use crate::sinks::{ColumnarBatchSink, PartitionSpec};
}

pub use core::{
    colorize_level_tag, render, ColumnarMetrics, Compression, Dispatcher, ExitFlush, ExitHooks,
    ExitPolicy, ExitSignal, LogLevel, Logger, LoggerConfig, LoggerError, LoggerMetrics,
    LoggerRegistry, Pipeline, QueueCapacity, Record, Renderer, Result, Sink, SourceLocation,
    Template, TimestampFormat, DEFAULT_FLUSH_THRESHOLD, DEFAULT_SHUTDOWN_TIMEOUT,
};
pub use sinks::{ConsoleSink, FileSink};

#[cfg(feature = "columnar")]
pub use sinks::{ColumnarBatchSink, PartitionSpec};
