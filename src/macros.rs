//! Logging macros for ergonomic log message formatting.
//!
//! The level is checked before the message is formatted, and the call site
//! (file, line, enclosing function) plus the unformatted template travel
//! with the record.
//!
//! # Examples
//!
//! ```
//! use rust_batch_logger::prelude::*;
//! use rust_batch_logger::info;
//!
//! let registry = LoggerRegistry::new();
//! let logger = registry
//!     .configure(LoggerConfig::new("macros").async_logging(false))
//!     .unwrap();
//!
//! // Basic logging
//! info!(logger, "Server started");
//!
//! // With format arguments
//! let port = 8080;
//! info!(logger, "Server listening on port {}", port);
//! ```

/// Name of the enclosing function, closures skipped.
#[doc(hidden)]
#[macro_export]
macro_rules! __function_name {
    () => {{
        fn f() {}
        fn type_name_of<T>(_: T) -> &'static str {
            ::std::any::type_name::<T>()
        }
        let name = type_name_of(f);
        let name = name.strip_suffix("::f").unwrap_or(name);
        name.rsplit("::")
            .find(|segment| *segment != "{{closure}}")
            .unwrap_or(name)
    }};
}

/// Log a message with automatic formatting.
///
/// # Examples
///
/// ```
/// # use rust_batch_logger::prelude::*;
/// # let registry = LoggerRegistry::new();
/// # let logger = registry.configure(LoggerConfig::new("doc").console(false, false)).unwrap();
/// use rust_batch_logger::log;
/// log!(logger, LogLevel::Info, "Simple message");
/// log!(logger, LogLevel::Error, "Error code: {}", 500);
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr, $fmt:literal $($rest:tt)*) => {{
        let logger = &$logger;
        let level: $crate::LogLevel = $level;
        if logger.is_enabled(level) {
            logger.log_at(
                level,
                format!($fmt $($rest)*),
                $fmt,
                $crate::SourceLocation::new(file!(), line!(), $crate::__function_name!()),
            );
        }
    }};
}

/// Log a debug-level message.
///
/// ```
/// # use rust_batch_logger::prelude::*;
/// # let registry = LoggerRegistry::new();
/// # let logger = registry.configure(LoggerConfig::new("doc").console(false, false)).unwrap();
/// use rust_batch_logger::debug;
/// debug!(logger, "Counter value: {}", 10);
/// ```
#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Debug, $($arg)+)
    };
}

/// Log an info-level message.
#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Info, $($arg)+)
    };
}

/// Log a warning-level message. Rendered with the expanded template.
///
/// ```
/// # use rust_batch_logger::prelude::*;
/// # let registry = LoggerRegistry::new();
/// # let logger = registry.configure(LoggerConfig::new("doc").console(false, false)).unwrap();
/// use rust_batch_logger::warning;
/// warning!(logger, "Retry attempt {} of {}", 3, 5);
/// ```
#[macro_export]
macro_rules! warning {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Warning, $($arg)+)
    };
}

/// Log an error-level message.
#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Error, $($arg)+)
    };
}

/// Log a critical-level message.
#[macro_export]
macro_rules! critical {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Critical, $($arg)+)
    };
}

#[cfg(test)]
mod tests {
    use crate::core::{LogLevel, LoggerConfig, LoggerRegistry, Record, Result, Sink};
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

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

    fn setup(level: LogLevel) -> (Arc<LoggerRegistry>, crate::core::Logger, Capture) {
        let registry = LoggerRegistry::new();
        let capture = Capture::default();
        let logger = registry
            .configure_with_sinks(
                LoggerConfig::new("macros")
                    .console(false, false)
                    .async_logging(false)
                    .level(level),
                vec![Box::new(capture.clone())],
            )
            .unwrap();
        (registry, logger, capture)
    }

    #[test]
    fn test_macros_capture_call_site() {
        let (_registry, logger, capture) = setup(LogLevel::Debug);

        info!(logger, "user {} logged in", 42);

        let records = capture.0.lock();
        assert_eq!(records[0].message, "user 42 logged in");
        assert_eq!(records[0].raw_message, "user {} logged in");
        assert!(records[0].location.file.ends_with("macros.rs"));
        assert_eq!(records[0].location.function, "test_macros_capture_call_site");
    }

    #[test]
    fn test_every_level_macro() {
        let (_registry, logger, capture) = setup(LogLevel::Debug);

        debug!(logger, "d");
        info!(logger, "i");
        warning!(logger, "w {}", 1);
        error!(logger, "e");
        critical!(logger, "c");
        log!(logger, LogLevel::Info, "named {value}", value = 7);

        let levels: Vec<LogLevel> = capture.0.lock().iter().map(|r| r.level).collect();
        assert_eq!(
            levels,
            vec![
                LogLevel::Debug,
                LogLevel::Info,
                LogLevel::Warning,
                LogLevel::Error,
                LogLevel::Critical,
                LogLevel::Info,
            ]
        );
        assert_eq!(capture.0.lock()[5].message, "named 7");
    }

    #[test]
    fn test_filtered_macro_skips_formatting() {
        let (_registry, logger, capture) = setup(LogLevel::Error);
        let evaluated = AtomicUsize::new(0);
        let expensive = || {
            evaluated.fetch_add(1, Ordering::SeqCst);
            "value"
        };

        debug!(logger, "never {}", expensive());
        error!(logger, "always {}", expensive());

        assert_eq!(evaluated.load(Ordering::SeqCst), 1);
        assert_eq!(capture.0.lock().len(), 1);
    }

    #[test]
    fn test_function_name_inside_closure() {
        let (_registry, logger, capture) = setup(LogLevel::Info);
        let run = || info!(logger, "from closure");
        run();

        assert_eq!(
            capture.0.lock()[0].location.function,
            "test_function_name_inside_closure"
        );
    }
}
