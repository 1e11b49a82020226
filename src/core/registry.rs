//! Process-wide registry of loggers
//!
//! The registry is an explicit object, created once by the application and
//! passed to every logger construction. It guarantees a single active
//! pipeline (and so a single worker) per logger name, and it tracks the
//! sinks that need a final flush when the process exits.
//!
//! Lifecycle: `LoggerRegistry::new()` on first use; teardown through
//! [`LoggerRegistry::shutdown`], usually driven by an
//! [`ExitHooks`](super::exit_hooks::ExitHooks) guard.

use super::{
    config::LoggerConfig,
    dispatcher::{Pipeline, DEFAULT_SHUTDOWN_TIMEOUT},
    error::Result,
    logger::{Channel, Logger},
    sink::{ExitFlush, Sink},
};
use crate::sinks::{ConsoleSink, FileSink};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

#[derive(Default)]
pub struct LoggerRegistry {
    channels: Mutex<HashMap<String, Arc<Channel>>>,
    exit_sinks: Mutex<Vec<Weak<dyn ExitFlush>>>,
}

impl LoggerRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Create or reconfigure the logger named in `config`.
    ///
    /// When the name is already configured, the previous pipeline is
    /// stopped and drained and its sinks detached before this call returns,
    /// so the name never has two live workers.
    pub fn configure(&self, config: LoggerConfig) -> Result<Logger> {
        self.configure_with_sinks(config, Vec::new())
    }

    /// Like [`configure`](Self::configure), with caller-provided sinks
    /// appended after the ones the configuration enables.
    pub fn configure_with_sinks(
        &self,
        config: LoggerConfig,
        extra_sinks: Vec<Box<dyn Sink>>,
    ) -> Result<Logger> {
        config.validate()?;

        let mut sinks = self.build_sinks(&config)?;
        sinks.extend(extra_sinks);

        let channel = {
            let mut channels = self.channels.lock();
            Arc::clone(
                channels
                    .entry(config.name.clone())
                    .or_insert_with(|| Arc::new(Channel::new(&config.name, config.level))),
            )
        };

        let clean = channel.reconfigure(config.level, DEFAULT_SHUTDOWN_TIMEOUT, || {
            Pipeline::build(
                &config.name,
                sinks,
                config.async_logging,
                config.capacity(),
                channel.metrics(),
            )
        })?;
        if !clean {
            eprintln!(
                "[LOGGER WARNING] Previous pipeline of '{}' did not stop cleanly during reconfiguration",
                config.name
            );
        }

        Ok(Logger::from_channel(channel))
    }

    fn build_sinks(&self, config: &LoggerConfig) -> Result<Vec<Box<dyn Sink>>> {
        let renderer = config.renderer()?;
        let mut sinks: Vec<Box<dyn Sink>> = Vec::new();

        if config.console {
            sinks.push(Box::new(
                ConsoleSink::new(renderer.clone()).with_colors(config.colored_console),
            ));
        }

        if let Some(ref path) = config.log_file {
            sinks.push(Box::new(FileSink::new(path, renderer.clone())));
        }

        #[cfg(feature = "columnar")]
        if config.columnar {
            let sink = crate::sinks::ColumnarBatchSink::from_config(config, renderer)?;
            self.register_exit_flush(sink.exit_handle());
            sinks.push(Box::new(sink));
        }

        Ok(sinks)
    }

    /// Existing handle for `name`, if it was ever configured.
    pub fn logger(&self, name: &str) -> Option<Logger> {
        self.channels
            .lock()
            .get(name)
            .map(|channel| Logger::from_channel(Arc::clone(channel)))
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.channels.lock().keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of dispatcher worker threads currently running.
    pub fn active_workers(&self) -> usize {
        self.channels
            .lock()
            .values()
            .filter(|channel| channel.has_running_worker())
            .count()
    }

    /// Track a sink that must be flushed on process exit. Dead entries are
    /// pruned as new ones arrive.
    pub fn register_exit_flush(&self, sink: Weak<dyn ExitFlush>) {
        let mut exit_sinks = self.exit_sinks.lock();
        exit_sinks.retain(|weak| weak.strong_count() > 0);
        exit_sinks.push(sink);
    }

    /// Number of tracked exit-flush sinks that are still alive.
    pub fn live_exit_sinks(&self) -> usize {
        self.exit_sinks
            .lock()
            .iter()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    /// Flush every tracked exit-flush sink. Returns rows persisted.
    pub fn flush_exit_sinks(&self) -> usize {
        let live: Vec<Arc<dyn ExitFlush>> = {
            let mut exit_sinks = self.exit_sinks.lock();
            exit_sinks.retain(|weak| weak.strong_count() > 0);
            exit_sinks.iter().filter_map(Weak::upgrade).collect()
        };
        live.iter().map(|sink| sink.flush_on_exit()).sum()
    }

    /// Drain every logger's queue into its sinks, then flush all exit-flush
    /// sinks. Loggers stay usable afterwards.
    pub fn flush_all(&self, timeout: Duration) -> usize {
        for channel in self.channel_snapshot() {
            if !channel.has_pipeline() {
                continue;
            }
            if let Err(e) = channel.flush(timeout) {
                eprintln!("[LOGGER WARNING] Flush of a logger failed: {}", e);
            }
        }
        self.flush_exit_sinks()
    }

    /// Stop every pipeline (draining queued records) and flush remaining
    /// exit-flush sinks. Idempotent; later log calls are silently dropped.
    ///
    /// Returns `true` if every worker stopped within `timeout`.
    pub fn shutdown(&self, timeout: Duration) -> bool {
        let mut clean = true;
        for channel in self.channel_snapshot() {
            if let Some(pipeline) = channel.replace_pipeline(None) {
                clean &= pipeline.stop(timeout);
            }
        }
        self.flush_exit_sinks();
        clean
    }

    fn channel_snapshot(&self) -> Vec<Arc<Channel>> {
        self.channels.lock().values().cloned().collect()
    }
}
