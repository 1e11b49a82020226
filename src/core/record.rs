//! Log record structure

use super::log_level::LogLevel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;

thread_local! {
    static THREAD_NAME_CACHE: RefCell<Option<Option<String>>> = const { RefCell::new(None) };
}

fn current_thread_name() -> Option<String> {
    THREAD_NAME_CACHE.with(|cache| {
        cache
            .borrow_mut()
            .get_or_insert_with(|| std::thread::current().name().map(String::from))
            .clone()
    })
}

/// Call site of a log statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
    pub function: String,
}

impl SourceLocation {
    pub const UNKNOWN_FUNCTION: &'static str = "<unknown>";

    pub fn new(file: impl Into<String>, line: u32, function: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line,
            function: function.into(),
        }
    }

    /// Location of the caller, for call paths annotated with `#[track_caller]`.
    #[track_caller]
    pub fn caller() -> Self {
        let location = std::panic::Location::caller();
        Self::new(location.file(), location.line(), Self::UNKNOWN_FUNCTION)
    }
}

/// One structured log event. Immutable once built; ownership moves to the
/// dispatcher on enqueue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub logger_name: String,
    /// Interpolated message text.
    pub message: String,
    /// Format template the message was produced from.
    pub raw_message: String,
    pub location: SourceLocation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception: Option<String>,
    pub thread_name: Option<String>,
}

impl Record {
    /// Escape line breaks and tabs so a record always renders as one line.
    pub fn sanitize(text: &str) -> String {
        text.replace('\n', "\\n")
            .replace('\r', "\\r")
            .replace('\t', "\\t")
    }

    pub fn new(
        level: LogLevel,
        logger_name: impl Into<String>,
        message: String,
        location: SourceLocation,
    ) -> Self {
        let message = Self::sanitize(&message);
        Self {
            timestamp: Utc::now(),
            level,
            logger_name: logger_name.into(),
            raw_message: message.clone(),
            message,
            location,
            exception: None,
            thread_name: current_thread_name(),
        }
    }

    pub fn with_raw_message(mut self, raw: impl Into<String>) -> Self {
        self.raw_message = raw.into();
        self
    }

    pub fn with_exception(mut self, exception: impl Into<String>) -> Self {
        self.exception = Some(exception.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Render an error and its `source()` chain as exception text.
    pub fn describe_error(err: &dyn std::error::Error) -> String {
        let mut text = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            text.push_str("\nCaused by: ");
            text.push_str(&cause.to_string());
            source = cause.source();
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_is_single_line() {
        let record = Record::new(
            LogLevel::Info,
            "app",
            "first\nsecond\tthird".to_string(),
            SourceLocation::new("main.rs", 1, "main"),
        );
        assert_eq!(record.message, "first\\nsecond\\tthird");
        assert_eq!(record.raw_message, record.message);
        assert!(record.exception.is_none());
    }

    #[test]
    fn test_caller_location() {
        let location = SourceLocation::caller();
        assert!(location.file.ends_with("record.rs"));
        assert_eq!(location.function, SourceLocation::UNKNOWN_FUNCTION);
    }

    #[test]
    fn test_describe_error_chain() {
        #[derive(Debug, thiserror::Error)]
        #[error("outer failure")]
        struct Outer(#[source] std::io::Error);

        let err = Outer(std::io::Error::new(std::io::ErrorKind::NotFound, "missing file"));
        let text = Record::describe_error(&err);
        assert_eq!(text, "outer failure\nCaused by: missing file");
    }
}
