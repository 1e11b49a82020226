//! Core logger types and traits

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod exit_hooks;
pub mod format;
pub mod log_level;
pub mod logger;
pub mod metrics;
pub mod record;
pub mod registry;
pub mod sink;

pub use config::{Compression, LoggerConfig, DEFAULT_FLUSH_THRESHOLD};
pub use dispatcher::{Dispatcher, Pipeline, QueueCapacity, DEFAULT_SHUTDOWN_TIMEOUT};
pub use error::{LoggerError, Result};
pub use exit_hooks::{ExitHooks, ExitPolicy, ExitSignal};
pub use format::{colorize_level_tag, render, Renderer, Template, TimestampFormat};
pub use log_level::LogLevel;
pub use logger::Logger;
pub use metrics::{ColumnarMetrics, LoggerMetrics};
pub use record::{Record, SourceLocation};
pub use registry::LoggerRegistry;
pub use sink::{ExitFlush, Sink};
