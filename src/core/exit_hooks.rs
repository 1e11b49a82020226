//! Flush-on-exit supervision
//!
//! Signal handlers never run logging code themselves. A supervising thread
//! waits for SIGINT/SIGTERM through tokio's signal driver (or for events
//! posted with [`ExitHooks::trigger`]) and performs the flush on its own
//! stack, where taking the sinks' locks cannot deadlock the interrupted
//! thread.
//!
//! Normal exit is the guard going out of scope: dropping [`ExitHooks`]
//! stops every pipeline and flushes all buffered records.

use super::{
    dispatcher::DEFAULT_SHUTDOWN_TIMEOUT,
    error::{LoggerError, Result},
    registry::LoggerRegistry,
};
use crossbeam_channel::bounded;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc;

#[cfg(unix)]
use libc::{SIGINT, SIGTERM};
#[cfg(not(unix))]
const SIGINT: i32 = 2;
#[cfg(not(unix))]
const SIGTERM: i32 = 15;

const READY_TIMEOUT: Duration = Duration::from_secs(5);

/// Termination signals the supervisor reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitSignal {
    Interrupt,
    Terminate,
}

impl ExitSignal {
    pub fn number(self) -> i32 {
        match self {
            ExitSignal::Interrupt => SIGINT,
            ExitSignal::Terminate => SIGTERM,
        }
    }

    /// Exit status of a process ended by this signal, as shells report it.
    /// Used when the signal cannot be re-raised.
    pub fn exit_status(self) -> i32 {
        128 + self.number()
    }
}

#[derive(Debug, Clone)]
pub struct ExitPolicy {
    /// Install SIGINT/SIGTERM listeners
    pub listen_for_signals: bool,
    /// After flushing on a signal, stop all pipelines, restore the default
    /// disposition and re-raise the signal
    pub terminate_after_signal: bool,
    pub flush_timeout: Duration,
}

impl Default for ExitPolicy {
    fn default() -> Self {
        Self {
            listen_for_signals: true,
            terminate_after_signal: true,
            flush_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }
}

enum Notice {
    Signal(ExitSignal, crossbeam_channel::Sender<usize>),
    Stop,
}

struct SignalListener {
    #[cfg(unix)]
    interrupt: tokio::signal::unix::Signal,
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
}

impl SignalListener {
    #[cfg(unix)]
    fn new() -> std::io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};
        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    #[cfg(not(unix))]
    fn new() -> std::io::Result<Self> {
        Ok(Self {})
    }

    #[cfg(unix)]
    async fn recv(&mut self) -> ExitSignal {
        tokio::select! {
            _ = self.interrupt.recv() => ExitSignal::Interrupt,
            _ = self.terminate.recv() => ExitSignal::Terminate,
        }
    }

    #[cfg(not(unix))]
    async fn recv(&mut self) -> ExitSignal {
        match tokio::signal::ctrl_c().await {
            Ok(()) => ExitSignal::Interrupt,
            Err(_) => std::future::pending().await,
        }
    }
}

async fn next_signal(listener: &mut Option<SignalListener>) -> ExitSignal {
    match listener {
        Some(listener) => listener.recv().await,
        None => std::future::pending().await,
    }
}

async fn supervise(
    registry: Arc<LoggerRegistry>,
    mut notices: mpsc::UnboundedReceiver<Notice>,
    policy: ExitPolicy,
    ready: crossbeam_channel::Sender<()>,
) {
    let mut listener = if policy.listen_for_signals {
        match SignalListener::new() {
            Ok(listener) => Some(listener),
            Err(e) => {
                eprintln!("[LOGGER WARNING] Could not install signal listeners: {}", e);
                None
            }
        }
    } else {
        None
    };
    let _ = ready.send(());

    loop {
        let (signal, ack) = tokio::select! {
            notice = notices.recv() => match notice {
                Some(Notice::Signal(signal, ack)) => (signal, Some(ack)),
                Some(Notice::Stop) | None => break,
            },
            signal = next_signal(&mut listener) => (signal, None),
        };

        let rows = registry.flush_all(policy.flush_timeout);
        if let Some(ack) = ack {
            let _ = ack.send(rows);
        }

        if policy.terminate_after_signal {
            registry.shutdown(policy.flush_timeout);
            terminate_with(signal);
        }
    }
}

/// End the process the way `signal` would have without our listener, so
/// the parent observes a signal death.
#[cfg(unix)]
fn terminate_with(signal: ExitSignal) -> ! {
    // SAFETY: `signal` and `raise` only change the process disposition and
    // deliver a signal; no Rust state is touched.
    unsafe {
        libc::signal(signal.number(), libc::SIG_DFL);
        libc::raise(signal.number());
    }
    // Reached only if the signal is blocked on this thread.
    std::process::exit(signal.exit_status())
}

#[cfg(not(unix))]
fn terminate_with(signal: ExitSignal) -> ! {
    std::process::exit(signal.exit_status())
}

/// Guard owning the exit supervisor for one registry.
///
/// Keep it alive for the lifetime of the program, typically as a binding in
/// `main`.
///
/// ```no_run
/// use rust_batch_logger::prelude::*;
///
/// let registry = LoggerRegistry::new();
/// let _exit = ExitHooks::install(registry.clone()).unwrap();
/// let logger = registry.configure(LoggerConfig::new("app")).unwrap();
/// logger.info("running");
/// // dropping `_exit` drains and flushes everything
/// ```
pub struct ExitHooks {
    registry: Arc<LoggerRegistry>,
    notices: mpsc::UnboundedSender<Notice>,
    supervisor: Option<thread::JoinHandle<()>>,
    flush_timeout: Duration,
    finished: bool,
}

impl ExitHooks {
    /// Start the supervisor. Returns once its signal listeners are in place.
    pub fn install(registry: Arc<LoggerRegistry>) -> Result<Self> {
        Self::with_policy(registry, ExitPolicy::default())
    }

    pub fn with_policy(registry: Arc<LoggerRegistry>, policy: ExitPolicy) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| LoggerError::io_operation("building signal runtime", "exit hooks", e))?;

        let (notices, receiver) = mpsc::unbounded_channel();
        let (ready_tx, ready_rx) = bounded(1);
        let flush_timeout = policy.flush_timeout;
        let supervised = Arc::clone(&registry);
        let supervisor = thread::Builder::new()
            .name("log-exit-supervisor".to_string())
            .spawn(move || runtime.block_on(supervise(supervised, receiver, policy, ready_tx)))
            .map_err(|e| LoggerError::io_operation("spawning exit supervisor", "exit hooks", e))?;

        // Signals sent after this point are caught by the supervisor.
        if ready_rx.recv_timeout(READY_TIMEOUT).is_err() {
            eprintln!("[LOGGER WARNING] Exit supervisor did not report ready in time");
        }

        Ok(Self {
            registry,
            notices,
            supervisor: Some(supervisor),
            flush_timeout,
            finished: false,
        })
    }

    /// Deliver `signal` to the supervisor as if the OS had sent it and wait
    /// for the resulting flush. Returns the rows persisted by exit-flush
    /// sinks. With `terminate_after_signal` set the process exits instead of
    /// returning.
    pub fn trigger(&self, signal: ExitSignal) -> Result<usize> {
        let (ack_tx, ack_rx) = bounded(1);
        self.notices
            .send(Notice::Signal(signal, ack_tx))
            .map_err(|_| LoggerError::other("exit supervisor is not running"))?;
        ack_rx
            .recv_timeout(self.flush_timeout + Duration::from_secs(1))
            .map_err(|_| LoggerError::Timeout("exit flush".to_string()))
    }

    /// Stop the supervisor, drain every pipeline and flush all sinks.
    pub fn shutdown(mut self) -> bool {
        self.finish()
    }

    fn finish(&mut self) -> bool {
        if self.finished {
            return true;
        }
        self.finished = true;

        let _ = self.notices.send(Notice::Stop);
        if let Some(handle) = self.supervisor.take() {
            if handle.join().is_err() {
                eprintln!("[LOGGER ERROR] Exit supervisor panicked");
            }
        }
        self.registry.shutdown(self.flush_timeout)
    }
}

impl Drop for ExitHooks {
    fn drop(&mut self) {
        self.finish();
    }
}
