//! Console sink implementation

use crate::core::{colorize_level_tag, Record, Renderer, Result, Sink};
use std::io::{self, Write};

pub struct ConsoleSink {
    renderer: Renderer,
    use_colors: bool,
    writer: Box<dyn Write + Send>,
}

impl ConsoleSink {
    pub fn new(renderer: Renderer) -> Self {
        Self {
            renderer,
            use_colors: true,
            writer: Box::new(io::stdout()),
        }
    }

    #[must_use]
    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    /// Redirect output, e.g. to stderr or an in-memory buffer
    ///
    /// # Example
    ///
    /// ```
    /// use rust_batch_logger::sinks::ConsoleSink;
    /// use rust_batch_logger::Renderer;
    ///
    /// let sink = ConsoleSink::new(Renderer::default())
    ///     .with_colors(false)
    ///     .with_writer(Box::new(std::io::stderr()));
    /// ```
    #[must_use]
    pub fn with_writer(mut self, writer: Box<dyn Write + Send>) -> Self {
        self.writer = writer;
        self
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new(Renderer::default())
    }
}

impl Sink for ConsoleSink {
    fn handle(&mut self, record: &Record) -> Result<()> {
        let line = self.renderer.render(record);
        let output = if self.use_colors {
            colorize_level_tag(&line, record.level)
        } else {
            line
        };
        writeln!(self.writer, "{}", output)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    fn name(&self) -> &str {
        "console"
    }
}
