//! Record delivery: the background dispatcher and the synchronous path
//!
//! A [`Dispatcher`] owns one worker thread and the queue feeding it. The
//! worker is the only consumer for its logger name, so sinks never need to
//! synchronize against another consumer. Records are delivered in FIFO
//! order to every sink in registration order.

use super::{
    error::{LoggerError, Result},
    metrics::LoggerMetrics,
    record::Record,
    sink::Sink,
};
use crossbeam_channel::{bounded, unbounded, Receiver, SendTimeoutError, Sender, TrySendError};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Default time allowed for a worker to drain its queue on stop.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Queue sizing for a dispatcher.
///
/// `Unbounded` keeps producers non-blocking at the cost of unbounded memory
/// growth under sustained overload. `Bounded` rejects records once full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum QueueCapacity {
    #[default]
    Unbounded,
    Bounded(usize),
}

enum Envelope {
    Record(Record),
    Flush(Sender<()>),
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

/// Deliver one record to every sink with per-sink error and panic isolation.
pub(crate) fn deliver(sinks: &mut [Box<dyn Sink>], record: &Record, metrics: &LoggerMetrics) {
    let mut has_error = false;

    for sink in sinks.iter_mut() {
        let result = catch_unwind(AssertUnwindSafe(|| sink.handle(record)));
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                eprintln!("[LOGGER ERROR] Sink '{}' failed: {}", sink.name(), e);
                metrics.record_sink_failure();
                has_error = true;
            }
            Err(panic_info) => {
                eprintln!(
                    "[LOGGER CRITICAL] Sink '{}' panicked: {}. \
                     Other sinks continue to function.",
                    sink.name(),
                    panic_message(&*panic_info)
                );
                metrics.record_sink_failure();
                has_error = true;
            }
        }
    }

    if !has_error {
        metrics.record_delivered();
    }
}

fn flush_sinks(sinks: &mut [Box<dyn Sink>]) {
    for sink in sinks.iter_mut() {
        match catch_unwind(AssertUnwindSafe(|| sink.flush())) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => eprintln!("[LOGGER ERROR] Sink '{}' flush failed: {}", sink.name(), e),
            Err(panic_info) => eprintln!(
                "[LOGGER CRITICAL] Sink '{}' panicked during flush: {}",
                sink.name(),
                panic_message(&*panic_info)
            ),
        }
    }
}

fn run_worker(receiver: Receiver<Envelope>, mut sinks: Vec<Box<dyn Sink>>, metrics: &LoggerMetrics) {
    // Ends once every sender is gone and the queue is drained.
    for envelope in receiver.iter() {
        match envelope {
            Envelope::Record(record) => deliver(&mut sinks, &record, metrics),
            Envelope::Flush(ack) => {
                flush_sinks(&mut sinks);
                let _ = ack.send(());
            }
        }
    }
    flush_sinks(&mut sinks);
}

/// Queue plus dedicated worker thread for one logger name.
pub struct Dispatcher {
    name: String,
    capacity: QueueCapacity,
    sender: Option<Sender<Envelope>>,
    handle: Option<thread::JoinHandle<()>>,
    metrics: Arc<LoggerMetrics>,
}

impl Dispatcher {
    pub fn spawn(
        name: impl Into<String>,
        sinks: Vec<Box<dyn Sink>>,
        capacity: QueueCapacity,
        metrics: Arc<LoggerMetrics>,
    ) -> Result<Self> {
        let name = name.into();
        let (sender, receiver) = match capacity {
            QueueCapacity::Unbounded => unbounded(),
            QueueCapacity::Bounded(size) => bounded(size),
        };

        let worker_metrics = Arc::clone(&metrics);
        let handle = thread::Builder::new()
            .name(format!("log-dispatch-{}", name))
            .spawn(move || run_worker(receiver, sinks, &worker_metrics))
            .map_err(|e| {
                LoggerError::io_operation("spawning dispatcher", format!("logger '{}'", name), e)
            })?;

        Ok(Self {
            name,
            capacity,
            sender: Some(sender),
            handle: Some(handle),
            metrics,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Hand a record to the worker without blocking.
    ///
    /// Fails only when the queue is bounded and full, or after `stop`.
    pub fn enqueue(&self, record: Record) -> Result<()> {
        let sender = self
            .sender
            .as_ref()
            .ok_or_else(|| LoggerError::stopped(&self.name))?;

        match sender.try_send(Envelope::Record(record)) {
            Ok(()) => {
                self.metrics.record_enqueued();
                Ok(())
            }
            Err(TrySendError::Full(_)) => {
                let previous = self.metrics.record_queue_full();
                if previous == 0 || (previous + 1) % 1000 == 0 {
                    eprintln!(
                        "[LOGGER WARNING] Queue for '{}' full, {} records rejected. \
                         Consider an unbounded queue or a larger capacity.",
                        self.name,
                        previous + 1
                    );
                }
                let capacity = match self.capacity {
                    QueueCapacity::Bounded(size) => size,
                    QueueCapacity::Unbounded => usize::MAX,
                };
                Err(LoggerError::queue_full(capacity))
            }
            Err(TrySendError::Disconnected(_)) => Err(LoggerError::stopped(&self.name)),
        }
    }

    /// Queue a flush marker and return the receiver that is signalled once
    /// the worker has reached it and flushed every sink.
    pub fn begin_flush(&self, timeout: Duration) -> Result<Receiver<()>> {
        let sender = self
            .sender
            .as_ref()
            .ok_or_else(|| LoggerError::stopped(&self.name))?;
        let (ack_tx, ack_rx) = bounded(1);

        match sender.send_timeout(Envelope::Flush(ack_tx), timeout) {
            Ok(()) => Ok(ack_rx),
            Err(SendTimeoutError::Timeout(_)) => {
                Err(LoggerError::Timeout(format!("queue space in '{}'", self.name)))
            }
            Err(SendTimeoutError::Disconnected(_)) => Err(LoggerError::stopped(&self.name)),
        }
    }

    /// Block until every record enqueued so far is delivered and all sinks
    /// have been flushed.
    pub fn flush(&self, timeout: Duration) -> Result<()> {
        let start = Instant::now();
        let ack = self.begin_flush(timeout)?;
        ack.recv_timeout(timeout.saturating_sub(start.elapsed()))
            .map_err(|_| LoggerError::Timeout(format!("flush of '{}'", self.name)))
    }

    /// Stop accepting records, let the worker drain what is queued, and
    /// join it.
    ///
    /// Returns `true` if the worker finished within `timeout`.
    pub fn stop(&mut self, timeout: Duration) -> bool {
        // Closing the channel is the stop signal; queued records still drain.
        drop(self.sender.take());

        let Some(handle) = self.handle.take() else {
            return true;
        };
        let start = Instant::now();

        loop {
            if handle.is_finished() {
                if let Err(e) = handle.join() {
                    eprintln!(
                        "[LOGGER ERROR] Dispatcher '{}' panicked during shutdown: {:?}",
                        self.name, e
                    );
                    return false;
                }
                return true;
            }

            if start.elapsed() >= timeout {
                eprintln!(
                    "[LOGGER WARNING] Dispatcher '{}' did not finish within {:?}. \
                     Some records may be lost.",
                    self.name, timeout
                );
                return false;
            }

            thread::sleep(Duration::from_millis(5));
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.stop(DEFAULT_SHUTDOWN_TIMEOUT);
    }
}

/// Delivery on the caller's thread, used when asynchronous logging is off.
pub struct SyncDelivery {
    sinks: Mutex<Vec<Box<dyn Sink>>>,
    metrics: Arc<LoggerMetrics>,
}

impl SyncDelivery {
    pub fn new(sinks: Vec<Box<dyn Sink>>, metrics: Arc<LoggerMetrics>) -> Self {
        Self {
            sinks: Mutex::new(sinks),
            metrics,
        }
    }

    pub fn submit(&self, record: Record) {
        self.metrics.record_enqueued();
        let mut sinks = self.sinks.lock();
        deliver(&mut sinks, &record, &self.metrics);
    }

    pub fn flush(&self) {
        flush_sinks(&mut self.sinks.lock());
    }
}

/// The active delivery path of a logger.
pub enum Pipeline {
    Async(Dispatcher),
    Sync(SyncDelivery),
}

impl Pipeline {
    pub fn build(
        name: &str,
        sinks: Vec<Box<dyn Sink>>,
        async_mode: bool,
        capacity: QueueCapacity,
        metrics: Arc<LoggerMetrics>,
    ) -> Result<Self> {
        if async_mode {
            Dispatcher::spawn(name, sinks, capacity, metrics).map(Pipeline::Async)
        } else {
            Ok(Pipeline::Sync(SyncDelivery::new(sinks, metrics)))
        }
    }

    pub fn submit(&self, record: Record) -> Result<()> {
        match self {
            Pipeline::Async(dispatcher) => dispatcher.enqueue(record),
            Pipeline::Sync(delivery) => {
                delivery.submit(record);
                Ok(())
            }
        }
    }

    pub fn flush(&self, timeout: Duration) -> Result<()> {
        match self {
            Pipeline::Async(dispatcher) => dispatcher.flush(timeout),
            Pipeline::Sync(delivery) => {
                delivery.flush();
                Ok(())
            }
        }
    }

    pub fn is_async(&self) -> bool {
        matches!(self, Pipeline::Async(_))
    }

    /// Drain and tear down. Sinks are flushed and dropped.
    pub fn stop(self, timeout: Duration) -> bool {
        match self {
            Pipeline::Async(mut dispatcher) => dispatcher.stop(timeout),
            Pipeline::Sync(delivery) => {
                delivery.flush();
                true
            }
        }
    }
}
