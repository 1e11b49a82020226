//! Sink trait for log output destinations

use super::{error::Result, record::Record};

/// A destination for records.
///
/// A sink is owned by exactly one delivery path (a dispatcher worker or the
/// synchronous caller path), so `handle` takes `&mut self`. Errors are
/// returned to the dispatcher, which reports and swallows them.
pub trait Sink: Send {
    fn handle(&mut self, record: &Record) -> Result<()>;

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str;
}

/// Sinks holding buffered state that must be persisted before the process
/// exits. Implementations swallow their own I/O errors.
pub trait ExitFlush: Send + Sync {
    /// Persist buffered records; returns the number of records written.
    fn flush_on_exit(&self) -> usize;
}
