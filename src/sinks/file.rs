//! File sink implementation

use crate::core::{LoggerError, Record, Renderer, Result, Sink};
use std::fs::{self, File, OpenOptions};
use std::io::{LineWriter, Write};
use std::path::{Path, PathBuf};

/// Appends one rendered line per record to a text file.
///
/// The file is opened lazily in append mode; missing parent directories are
/// created on first use.
pub struct FileSink {
    path: PathBuf,
    renderer: Renderer,
    writer: Option<LineWriter<File>>,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>, renderer: Renderer) -> Self {
        Self {
            path: path.into(),
            renderer,
            writer: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn writer(&mut self) -> Result<&mut LineWriter<File>> {
        if self.writer.is_none() {
            if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).map_err(|e| {
                    LoggerError::io_operation(
                        "creating log directory",
                        parent.display().to_string(),
                        e,
                    )
                })?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .map_err(|e| {
                    LoggerError::io_operation("opening log file", self.path.display().to_string(), e)
                })?;
            self.writer = Some(LineWriter::new(file));
        }

        self.writer
            .as_mut()
            .ok_or_else(|| LoggerError::other("file writer not initialized"))
    }
}

impl Sink for FileSink {
    fn handle(&mut self, record: &Record) -> Result<()> {
        let mut line = self.renderer.render(record);
        line.push('\n');
        // One write per line so appenders sharing the file interleave whole lines.
        self.writer()?.write_all(line.as_bytes())?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(ref mut writer) = self.writer {
            writer.flush()?;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "file"
    }
}

impl Drop for FileSink {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}
