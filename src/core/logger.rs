//! Logger facade

use super::{
    config::LoggerConfig,
    dispatcher::{Pipeline, DEFAULT_SHUTDOWN_TIMEOUT},
    error::{LoggerError, Result},
    log_level::LogLevel,
    metrics::LoggerMetrics,
    record::{Record, SourceLocation},
    registry::LoggerRegistry,
};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Per-name state shared by every `Logger` handle with that name: the level
/// threshold and the currently attached pipeline.
pub(crate) struct Channel {
    name: String,
    level: AtomicU8,
    pipeline: RwLock<Option<Pipeline>>,
    metrics: Arc<LoggerMetrics>,
}

impl Channel {
    pub(crate) fn new(name: &str, level: LogLevel) -> Self {
        Self {
            name: name.to_string(),
            level: AtomicU8::new(level.as_u8()),
            pipeline: RwLock::new(None),
            metrics: Arc::new(LoggerMetrics::new()),
        }
    }

    pub(crate) fn metrics(&self) -> Arc<LoggerMetrics> {
        Arc::clone(&self.metrics)
    }

    pub(crate) fn set_level(&self, level: LogLevel) {
        self.level.store(level.as_u8(), Ordering::Relaxed);
    }

    /// Swap in a new pipeline. Producers submit under the read lock, so every
    /// record lands either in the returned pipeline or in the new one.
    pub(crate) fn replace_pipeline(&self, pipeline: Option<Pipeline>) -> Option<Pipeline> {
        std::mem::replace(&mut *self.pipeline.write(), pipeline)
    }

    /// Stop and drain the current pipeline, then attach the one produced by
    /// `build`. Producers block on the lock in between, so records of this
    /// name keep their order across the switch.
    ///
    /// Returns whether the previous pipeline stopped within `timeout`.
    pub(crate) fn reconfigure<F>(&self, level: LogLevel, timeout: Duration, build: F) -> Result<bool>
    where
        F: FnOnce() -> Result<Pipeline>,
    {
        let mut slot = self.pipeline.write();
        let clean = slot.take().map_or(true, |previous| previous.stop(timeout));
        self.set_level(level);
        *slot = Some(build()?);
        Ok(clean)
    }

    pub(crate) fn has_running_worker(&self) -> bool {
        matches!(&*self.pipeline.read(), Some(Pipeline::Async(d)) if d.is_running())
    }

    pub(crate) fn has_pipeline(&self) -> bool {
        self.pipeline.read().is_some()
    }

    fn submit(&self, record: Record) -> Result<()> {
        match self.pipeline.read().as_ref() {
            Some(pipeline) => pipeline.submit(record),
            None => Err(LoggerError::stopped(&self.name)),
        }
    }

    pub(crate) fn flush(&self, timeout: Duration) -> Result<()> {
        let start = Instant::now();
        // Wait for the worker outside the lock so reconfiguration is not held up.
        let ack = match self.pipeline.read().as_ref() {
            Some(Pipeline::Async(dispatcher)) => dispatcher.begin_flush(timeout)?,
            Some(Pipeline::Sync(delivery)) => {
                delivery.flush();
                return Ok(());
            }
            None => return Err(LoggerError::stopped(&self.name)),
        };
        ack.recv_timeout(timeout.saturating_sub(start.elapsed()))
            .map_err(|_| LoggerError::Timeout(format!("flush of '{}'", self.name)))
    }
}

/// Handle used by application code to emit records.
///
/// Handles are cheap to clone and share the level and sinks of their name:
/// reconfiguring the name through the registry redirects every handle.
///
/// # Example
///
/// ```no_run
/// use rust_batch_logger::prelude::*;
///
/// let registry = LoggerRegistry::new();
/// let logger = Logger::new(&registry, LoggerConfig::new("app").level(LogLevel::Debug)).unwrap();
///
/// logger.info("service started");
/// logger.warning("disk usage above 80%");
/// logger.flush().unwrap();
/// registry.shutdown(DEFAULT_SHUTDOWN_TIMEOUT);
/// ```
#[derive(Clone)]
pub struct Logger {
    channel: Arc<Channel>,
}

impl Logger {
    /// Configure (or reconfigure) `config.name` in `registry`.
    pub fn new(registry: &LoggerRegistry, config: LoggerConfig) -> Result<Self> {
        registry.configure(config)
    }

    pub(crate) fn from_channel(channel: Arc<Channel>) -> Self {
        Self { channel }
    }

    pub fn name(&self) -> &str {
        &self.channel.name
    }

    pub fn level(&self) -> LogLevel {
        LogLevel::try_from(self.channel.level.load(Ordering::Relaxed)).unwrap_or_default()
    }

    /// Change the threshold for records created from now on.
    pub fn set_level(&self, level: LogLevel) {
        self.channel.set_level(level);
    }

    #[inline]
    pub fn is_enabled(&self, level: LogLevel) -> bool {
        level.as_u8() >= self.channel.level.load(Ordering::Relaxed)
    }

    #[track_caller]
    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        if !self.is_enabled(level) {
            return;
        }
        let record = Record::new(level, self.name(), message.into(), SourceLocation::caller());
        self.dispatch(record);
    }

    /// Like [`log`](Self::log) but reports a full bounded queue or a stopped
    /// pipeline to the caller. Filtered records return `Ok(())`.
    #[track_caller]
    pub fn try_log(&self, level: LogLevel, message: impl Into<String>) -> Result<()> {
        if !self.is_enabled(level) {
            return Ok(());
        }
        let record = Record::new(level, self.name(), message.into(), SourceLocation::caller());
        self.channel.submit(record)
    }

    /// Entry point for the logging macros, which check the level before
    /// formatting.
    pub fn log_at(
        &self,
        level: LogLevel,
        message: String,
        raw_message: &str,
        location: SourceLocation,
    ) {
        if !self.is_enabled(level) {
            return;
        }
        let record =
            Record::new(level, self.name(), message, location).with_raw_message(raw_message);
        self.dispatch(record);
    }

    /// Submit a pre-built record. The level threshold still applies.
    pub fn log_record(&self, record: Record) -> Result<()> {
        if !self.is_enabled(record.level) {
            return Ok(());
        }
        self.channel.submit(record)
    }

    fn dispatch(&self, record: Record) {
        match self.channel.submit(record) {
            Ok(()) | Err(LoggerError::QueueFull { .. }) | Err(LoggerError::LoggerStopped { .. }) => {}
            Err(e) => eprintln!("[LOGGER ERROR] Logger '{}' dropped a record: {}", self.name(), e),
        }
    }

    #[inline]
    #[track_caller]
    pub fn debug(&self, message: impl Into<String>) {
        self.log(LogLevel::Debug, message);
    }

    #[inline]
    #[track_caller]
    pub fn info(&self, message: impl Into<String>) {
        self.log(LogLevel::Info, message);
    }

    #[inline]
    #[track_caller]
    pub fn warning(&self, message: impl Into<String>) {
        self.log(LogLevel::Warning, message);
    }

    #[inline]
    #[track_caller]
    pub fn error(&self, message: impl Into<String>) {
        self.log(LogLevel::Error, message);
    }

    #[inline]
    #[track_caller]
    pub fn critical(&self, message: impl Into<String>) {
        self.log(LogLevel::Critical, message);
    }

    /// Log at ERROR with the error and its source chain as exception text.
    #[track_caller]
    pub fn exception(&self, message: impl Into<String>, err: &dyn std::error::Error) {
        if !self.is_enabled(LogLevel::Error) {
            return;
        }
        let record = Record::new(
            LogLevel::Error,
            self.name(),
            message.into(),
            SourceLocation::caller(),
        )
        .with_exception(Record::describe_error(err));
        self.dispatch(record);
    }

    /// Wait until everything logged so far reached the sinks and the sinks
    /// are flushed.
    pub fn flush(&self) -> Result<()> {
        self.channel.flush(DEFAULT_SHUTDOWN_TIMEOUT)
    }

    pub fn metrics(&self) -> &LoggerMetrics {
        &self.channel.metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sink::Sink;
    use parking_lot::Mutex;

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<Record>>>);

    impl Sink for Capture {
        fn handle(&mut self, record: &Record) -> Result<()> {
            self.0.lock().push(record.clone());
            Ok(())
        }

        fn name(&self) -> &str {
            "capture"
        }
    }

    fn quiet(name: &str) -> LoggerConfig {
        LoggerConfig::new(name).console(false, false)
    }

    fn capture_logger(level: LogLevel, async_logging: bool) -> (Arc<LoggerRegistry>, Logger, Capture) {
        let registry = LoggerRegistry::new();
        let capture = Capture::default();
        let logger = registry
            .configure_with_sinks(
                quiet("unit").level(level).async_logging(async_logging),
                vec![Box::new(capture.clone())],
            )
            .unwrap();
        (registry, logger, capture)
    }

    #[test]
    fn test_level_filtering() {
        let (_registry, logger, capture) = capture_logger(LogLevel::Warning, true);

        logger.debug("dropped");
        logger.info("dropped");
        logger.warning("kept");
        logger.critical("kept");
        logger.flush().unwrap();

        let records = capture.0.lock();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.level >= LogLevel::Warning));
        assert_eq!(logger.metrics().enqueued(), 2);
    }

    #[test]
    fn test_set_level_applies_to_new_records() {
        let (_registry, logger, capture) = capture_logger(LogLevel::Info, false);

        logger.debug("before");
        logger.set_level(LogLevel::Debug);
        assert_eq!(logger.level(), LogLevel::Debug);
        logger.debug("after");

        let records = capture.0.lock();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].message, "after");
    }

    #[test]
    fn test_track_caller_location() {
        let (_registry, logger, capture) = capture_logger(LogLevel::Debug, false);
        logger.info("where am I");

        let records = capture.0.lock();
        assert!(records[0].location.file.ends_with("logger.rs"));
        assert!(records[0].location.line > 0);
    }

    #[test]
    fn test_exception_carries_error_chain() {
        let (_registry, logger, capture) = capture_logger(LogLevel::Info, false);
        let err = std::io::Error::new(std::io::ErrorKind::Other, "connection reset");
        logger.exception("request failed", &err);

        let records = capture.0.lock();
        assert_eq!(records[0].level, LogLevel::Error);
        assert_eq!(records[0].exception.as_deref(), Some("connection reset"));
    }

    #[test]
    fn test_try_log_after_shutdown() {
        let (registry, logger, _capture) = capture_logger(LogLevel::Info, true);
        assert!(registry.shutdown(DEFAULT_SHUTDOWN_TIMEOUT));

        assert!(matches!(
            logger.try_log(LogLevel::Error, "late"),
            Err(LoggerError::LoggerStopped { .. })
        ));
        // The plain API stays silent.
        logger.error("late");
    }
}
