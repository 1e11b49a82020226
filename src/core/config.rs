//! Logger configuration
//!
//! `LoggerConfig` enumerates every recognized option with its default and is
//! validated before any sink or worker is created.

use super::dispatcher::QueueCapacity;
use super::error::{LoggerError, Result};
use super::format::{
    Renderer, Template, TimestampFormat, DEFAULT_COMPACT_TEMPLATE, DEFAULT_EXPANDED_TEMPLATE,
};
use super::log_level::LogLevel;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_FLUSH_THRESHOLD: usize = 100;
pub const DEFAULT_COLUMNAR_BASE_PATH: &str = "~/.rust_batch_logger/logs";
pub const DEFAULT_ENVIRONMENT: &str = "development";

/// Compression codec for columnar files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    None,
    #[default]
    Snappy,
    Lz4,
    Zstd,
}

impl Compression {
    /// Parse from string representation
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "none" | "uncompressed" => Some(Self::None),
            "snappy" => Some(Self::Snappy),
            "lz4" => Some(Self::Lz4),
            "zstd" => Some(Self::Zstd),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    pub name: String,
    pub level: LogLevel,

    pub console: bool,
    pub colored_console: bool,

    /// Plain text file target; disabled when `None`
    pub log_file: Option<PathBuf>,

    pub columnar: bool,
    pub columnar_base_path: PathBuf,
    /// Defaults to the current directory name
    pub project: Option<String>,
    pub environment: String,
    /// Records per batch
    pub flush_threshold: usize,
    pub compression: Compression,

    pub async_logging: bool,
    /// `None` means unbounded
    pub queue_capacity: Option<usize>,

    pub compact_template: String,
    pub expanded_template: String,
    pub timestamp_format: TimestampFormat,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            level: LogLevel::Info,
            console: true,
            colored_console: true,
            log_file: None,
            columnar: false,
            columnar_base_path: PathBuf::from(DEFAULT_COLUMNAR_BASE_PATH),
            project: None,
            environment: DEFAULT_ENVIRONMENT.to_string(),
            flush_threshold: DEFAULT_FLUSH_THRESHOLD,
            compression: Compression::default(),
            async_logging: true,
            queue_capacity: None,
            compact_template: DEFAULT_COMPACT_TEMPLATE.to_string(),
            expanded_template: DEFAULT_EXPANDED_TEMPLATE.to_string(),
            timestamp_format: TimestampFormat::default(),
        }
    }
}

impl LoggerConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Per-environment defaults for `development`, `test` and `production`.
    /// Unknown environments get the development settings.
    pub fn preset(environment: &str, name: impl Into<String>) -> Self {
        let today = Local::now().format("%Y-%m-%d");
        let base = Self::new(name);
        match environment {
            "production" => Self {
                level: LogLevel::Warning,
                console: false,
                colored_console: false,
                log_file: Some(PathBuf::from(format!("logs/production/{}/app.log", today))),
                columnar: true,
                environment: "production".to_string(),
                flush_threshold: 30,
                ..base
            },
            "test" => Self {
                level: LogLevel::Info,
                log_file: Some(PathBuf::from(format!("logs/test/{}/app.log", today))),
                columnar: true,
                environment: "test".to_string(),
                flush_threshold: 10,
                ..base
            },
            _ => Self {
                level: LogLevel::Debug,
                log_file: Some(PathBuf::from(format!("logs/development/{}/app.log", today))),
                columnar: true,
                environment: DEFAULT_ENVIRONMENT.to_string(),
                flush_threshold: 20,
                ..base
            },
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    #[must_use]
    pub fn level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    #[must_use]
    pub fn console(mut self, enabled: bool, colored: bool) -> Self {
        self.console = enabled;
        self.colored_console = colored;
        self
    }

    #[must_use]
    pub fn log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    #[must_use]
    pub fn columnar(mut self, base_path: impl Into<PathBuf>) -> Self {
        self.columnar = true;
        self.columnar_base_path = base_path.into();
        self
    }

    #[must_use]
    pub fn project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    #[must_use]
    pub fn environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    #[must_use]
    pub fn flush_threshold(mut self, threshold: usize) -> Self {
        self.flush_threshold = threshold;
        self
    }

    #[must_use]
    pub fn compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    #[must_use]
    pub fn async_logging(mut self, enabled: bool) -> Self {
        self.async_logging = enabled;
        self
    }

    #[must_use]
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = Some(capacity);
        self
    }

    #[must_use]
    pub fn templates(mut self, compact: impl Into<String>, expanded: impl Into<String>) -> Self {
        self.compact_template = compact.into();
        self.expanded_template = expanded.into();
        self
    }

    #[must_use]
    pub fn timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.timestamp_format = format;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(LoggerError::config("LoggerConfig", "name must not be empty"));
        }
        if self.flush_threshold == 0 {
            return Err(LoggerError::config("LoggerConfig", "flush_threshold must be > 0"));
        }
        if self.queue_capacity == Some(0) {
            return Err(LoggerError::config("LoggerConfig", "queue_capacity must be > 0"));
        }
        if self.columnar {
            if self.environment.trim().is_empty() {
                return Err(LoggerError::config("LoggerConfig", "environment must not be empty"));
            }
            if cfg!(not(feature = "columnar")) {
                return Err(LoggerError::config(
                    "LoggerConfig",
                    "columnar logging requires the `columnar` feature",
                ));
            }
        }
        self.renderer().map(|_| ())
    }

    pub fn renderer(&self) -> Result<Renderer> {
        Ok(Renderer::new(
            Template::parse(&self.compact_template)?,
            Template::parse(&self.expanded_template)?,
            self.timestamp_format.clone(),
        ))
    }

    pub fn capacity(&self) -> QueueCapacity {
        self.queue_capacity
            .map_or(QueueCapacity::Unbounded, QueueCapacity::Bounded)
    }

    /// Configured project, or the name of the working directory.
    pub fn resolved_project(&self) -> String {
        self.project.clone().unwrap_or_else(|| {
            std::env::current_dir()
                .ok()
                .and_then(|dir| dir.file_name().map(|n| n.to_string_lossy().into_owned()))
                .unwrap_or_else(|| "default".to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LoggerConfig::new("app");
        assert_eq!(config.level, LogLevel::Info);
        assert!(config.console);
        assert!(config.async_logging);
        assert_eq!(config.flush_threshold, DEFAULT_FLUSH_THRESHOLD);
        assert_eq!(config.capacity(), QueueCapacity::Unbounded);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        assert!(LoggerConfig::new("").validate().is_err());
        assert!(LoggerConfig::new("app").flush_threshold(0).validate().is_err());
        assert!(LoggerConfig::new("app").queue_capacity(0).validate().is_err());
        assert!(LoggerConfig::new("app")
            .templates("{timestamp} {bogus}", DEFAULT_EXPANDED_TEMPLATE)
            .validate()
            .is_err());
    }

    #[test]
    fn test_presets() {
        let prod = LoggerConfig::preset("production", "svc");
        assert_eq!(prod.level, LogLevel::Warning);
        assert!(!prod.console);
        assert_eq!(prod.flush_threshold, 30);

        let test = LoggerConfig::preset("test", "svc");
        assert_eq!(test.flush_threshold, 10);

        let fallback = LoggerConfig::preset("staging", "svc");
        assert_eq!(fallback.level, LogLevel::Debug);
        assert_eq!(fallback.environment, "development");
        assert!(fallback.log_file.unwrap().starts_with("logs/development"));
    }

    #[test]
    fn test_from_json() {
        let config = LoggerConfig::from_json_str(
            r#"{"name": "api", "level": "warning", "flush_threshold": 5,
                "compression": "zstd", "queue_capacity": 64}"#,
        )
        .unwrap();
        assert_eq!(config.name, "api");
        assert_eq!(config.level, LogLevel::Warning);
        assert_eq!(config.compression, Compression::Zstd);
        assert_eq!(config.capacity(), QueueCapacity::Bounded(64));
        assert!(config.console);

        assert!(LoggerConfig::from_json_str(r#"{"name": "api", "level": "loud"}"#).is_err());
    }

    #[test]
    fn test_compression_parse() {
        assert_eq!(Compression::parse("uncompressed"), Some(Compression::None));
        assert_eq!(Compression::parse("SNAPPY"), Some(Compression::Snappy));
        assert_eq!(Compression::parse("brotli"), None);
    }
}
