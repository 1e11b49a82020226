//! Display rendering for records
//!
//! Text sinks share one pure rendering path: a record is turned into a line
//! using either the compact template or, for WARNING and above, the
//! expanded template that carries the source location. Templates are
//! parsed once and never mutated, so a `Renderer` can be shared freely.

use super::error::{LoggerError, Result};
use super::log_level::LogLevel;
use super::record::Record;
use chrono::{DateTime, Local, Utc};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::str::FromStr;

pub const DEFAULT_COMPACT_TEMPLATE: &str = "{timestamp} [{level}] {name}: {message}";
pub const DEFAULT_EXPANDED_TEMPLATE: &str =
    "{timestamp} [{level}] {name} ({file}:{line} - {function}): {message}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Timestamp,
    Level,
    Name,
    Message,
    File,
    Line,
    Function,
    Thread,
}

impl FromStr for Field {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s {
            "timestamp" => Field::Timestamp,
            "level" => Field::Level,
            "name" => Field::Name,
            "message" => Field::Message,
            "file" => Field::File,
            "line" => Field::Line,
            "function" => Field::Function,
            "thread" => Field::Thread,
            _ => return Err(()),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field(Field),
}

/// A parsed display template such as `{timestamp} [{level}] {name}: {message}`.
///
/// `{{` and `}}` produce literal braces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
}

impl Template {
    pub fn parse(source: &str) -> Result<Self> {
        let invalid = |message: String| LoggerError::config("template", message);
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = source.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some(ch) => name.push(ch),
                            None => return Err(invalid(format!("unclosed placeholder in '{source}'"))),
                        }
                    }
                    let field = name
                        .parse::<Field>()
                        .map_err(|_| invalid(format!("unknown placeholder '{{{name}}}'")))?;
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Field(field));
                }
                '}' => return Err(invalid(format!("unmatched '}}' in '{source}'"))),
                other => literal.push(other),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    fn write(&self, out: &mut String, record: &Record, timestamp: &str) {
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field(Field::Timestamp) => out.push_str(timestamp),
                Segment::Field(Field::Level) => out.push_str(record.level.to_str()),
                Segment::Field(Field::Name) => out.push_str(&record.logger_name),
                Segment::Field(Field::Message) => out.push_str(&record.message),
                Segment::Field(Field::File) => out.push_str(&record.location.file),
                Segment::Field(Field::Line) => {
                    let _ = write!(out, "{}", record.location.line);
                }
                Segment::Field(Field::Function) => out.push_str(&record.location.function),
                Segment::Field(Field::Thread) => {
                    out.push_str(record.thread_name.as_deref().unwrap_or("-"))
                }
            }
        }
    }
}

/// Timestamp rendering for the `{timestamp}` placeholder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimestampFormat {
    /// Local time, `2025-01-08 10:30:45.123`
    #[default]
    Local,
    /// UTC ISO 8601 with milliseconds, `2025-01-08T10:30:45.123Z`
    Iso8601,
    /// RFC 3339 with offset
    Rfc3339,
    /// Custom strftime format, evaluated in local time
    Custom(String),
}

impl TimestampFormat {
    #[must_use]
    pub fn format(&self, datetime: &DateTime<Utc>) -> String {
        match self {
            TimestampFormat::Local => datetime
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S%.3f")
                .to_string(),
            TimestampFormat::Iso8601 => datetime.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
            TimestampFormat::Rfc3339 => datetime.to_rfc3339(),
            TimestampFormat::Custom(pattern) => {
                let mut out = String::new();
                // An invalid strftime pattern makes Display fail; fall back to ISO 8601.
                if write!(out, "{}", datetime.with_timezone(&Local).format(pattern)).is_err() {
                    out = TimestampFormat::Iso8601.format(datetime);
                }
                out
            }
        }
    }
}

/// Render a record with the template selected by its level.
pub fn render(
    record: &Record,
    compact: &Template,
    expanded: &Template,
    timestamp_format: &TimestampFormat,
) -> String {
    let template = if record.level.uses_expanded_template() {
        expanded
    } else {
        compact
    };
    let timestamp = timestamp_format.format(&record.timestamp);
    let mut line = String::with_capacity(template.source.len() + record.message.len() + 32);
    template.write(&mut line, record, &timestamp);

    if let Some(ref exception) = record.exception {
        line.push_str(" | ");
        line.push_str(&Record::sanitize(exception));
    }
    line
}

/// Color only the `[LEVEL]` tag of an already rendered line. The colored
/// segment ends with the ANSI reset sequence `ESC[0m`.
pub fn colorize_level_tag(line: &str, level: LogLevel) -> String {
    let tag = format!("[{}]", level.to_str());
    let mut styled = tag.as_str().color(level.color_code());
    if level.is_bold() {
        styled = styled.bold();
    }
    line.replacen(&tag, &styled.to_string(), 1)
}

/// Compact/expanded template pair plus timestamp format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Renderer {
    compact: Template,
    expanded: Template,
    timestamp_format: TimestampFormat,
}

impl Renderer {
    pub fn new(compact: Template, expanded: Template, timestamp_format: TimestampFormat) -> Self {
        Self {
            compact,
            expanded,
            timestamp_format,
        }
    }

    pub fn from_templates(compact: &str, expanded: &str) -> Result<Self> {
        Ok(Self::new(
            Template::parse(compact)?,
            Template::parse(expanded)?,
            TimestampFormat::default(),
        ))
    }

    #[must_use]
    pub fn with_timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.timestamp_format = format;
        self
    }

    pub fn render(&self, record: &Record) -> String {
        render(record, &self.compact, &self.expanded, &self.timestamp_format)
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(
            Template {
                source: DEFAULT_COMPACT_TEMPLATE.to_string(),
                segments: vec![
                    Segment::Field(Field::Timestamp),
                    Segment::Literal(" [".into()),
                    Segment::Field(Field::Level),
                    Segment::Literal("] ".into()),
                    Segment::Field(Field::Name),
                    Segment::Literal(": ".into()),
                    Segment::Field(Field::Message),
                ],
            },
            Template {
                source: DEFAULT_EXPANDED_TEMPLATE.to_string(),
                segments: vec![
                    Segment::Field(Field::Timestamp),
                    Segment::Literal(" [".into()),
                    Segment::Field(Field::Level),
                    Segment::Literal("] ".into()),
                    Segment::Field(Field::Name),
                    Segment::Literal(" (".into()),
                    Segment::Field(Field::File),
                    Segment::Literal(":".into()),
                    Segment::Field(Field::Line),
                    Segment::Literal(" - ".into()),
                    Segment::Field(Field::Function),
                    Segment::Literal("): ".into()),
                    Segment::Field(Field::Message),
                ],
            },
            TimestampFormat::default(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::record::SourceLocation;
    use chrono::TimeZone;

    fn record(level: LogLevel) -> Record {
        Record::new(
            level,
            "svc",
            "disk at 91%".to_string(),
            SourceLocation::new("src/disk.rs", 42, "check_disk"),
        )
        .with_timestamp(Utc.with_ymd_and_hms(2025, 1, 8, 10, 30, 45).unwrap())
    }

    fn renderer() -> Renderer {
        Renderer::default().with_timestamp_format(TimestampFormat::Iso8601)
    }

    #[test]
    fn test_default_templates_match_parsed() {
        let parsed =
            Renderer::from_templates(DEFAULT_COMPACT_TEMPLATE, DEFAULT_EXPANDED_TEMPLATE).unwrap();
        assert_eq!(parsed, Renderer::default());
    }

    #[test]
    fn test_compact_below_warning() {
        let line = renderer().render(&record(LogLevel::Info));
        assert_eq!(line, "2025-01-08T10:30:45.000Z [INFO] svc: disk at 91%");
    }

    #[test]
    fn test_expanded_from_warning() {
        let line = renderer().render(&record(LogLevel::Warning));
        assert_eq!(
            line,
            "2025-01-08T10:30:45.000Z [WARNING] svc (src/disk.rs:42 - check_disk): disk at 91%"
        );
    }

    #[test]
    fn test_exception_appended_on_same_line() {
        let rec = record(LogLevel::Error).with_exception("boom\nCaused by: io");
        let line = renderer().render(&rec);
        assert!(line.ends_with(" | boom\\nCaused by: io"));
        assert_eq!(line.lines().count(), 1);
    }

    #[test]
    fn test_template_errors() {
        assert!(Template::parse("{timestamp} {nope}").is_err());
        assert!(Template::parse("{timestamp").is_err());
        assert!(Template::parse("oops }").is_err());
        let escaped = Template::parse("{{{level}}}").unwrap();
        let mut out = String::new();
        escaped.write(&mut out, &record(LogLevel::Debug), "");
        assert_eq!(out, "{DEBUG}");
    }

    #[test]
    fn test_colorize_only_level_tag() {
        colored::control::set_override(true);
        let line = "t [ERROR] svc: [ERROR] inside message";
        let colored_line = colorize_level_tag(line, LogLevel::Error);
        assert!(colored_line.starts_with("t \u{1b}["));
        assert!(colored_line.contains("[ERROR]\u{1b}[0m svc"));
        assert!(colored_line.ends_with("svc: [ERROR] inside message"));
    }
}
