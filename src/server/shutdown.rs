//! Shutdown triggers, the one-shot shutdown latch, and process termination.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info, warn};

/// What started the shutdown sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownTrigger {
    /// A supervised task panicked.
    UncaughtFault(String),
    /// A supervised task returned an error nobody handled.
    UnhandledRejection(String),
    /// The process received a termination or interrupt signal.
    Signal(&'static str),
}

impl ShutdownTrigger {
    /// Exit code the process terminates with for this trigger.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::UncaughtFault(_) => 1,
            Self::UnhandledRejection(_) | Self::Signal(_) => 2,
        }
    }
}

impl fmt::Display for ShutdownTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UncaughtFault(reason) => write!(f, "uncaught error: {}", reason),
            Self::UnhandledRejection(reason) => write!(f, "unhandled rejection: {}", reason),
            Self::Signal(name) => write!(f, "caught {}", name),
        }
    }
}

/// Latch closed by the first shutdown trigger. Later triggers are ignored.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    tx: Arc<watch::Sender<Option<ShutdownTrigger>>>,
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Close the latch. Returns `false` if it was already closed.
    pub fn trigger(&self, trigger: ShutdownTrigger) -> bool {
        let candidate = trigger.clone();
        let accepted = self.tx.send_if_modified(move |current| {
            if current.is_some() {
                return false;
            }
            *current = Some(candidate);
            true
        });

        if !accepted {
            debug!(%trigger, "shutdown already in progress, trigger ignored");
            return false;
        }

        match &trigger {
            ShutdownTrigger::UncaughtFault(reason) => {
                error!("There was an uncaught error: {}", reason)
            }
            ShutdownTrigger::UnhandledRejection(reason) => {
                error!("Unhandled rejection at task: {}", reason)
            }
            ShutdownTrigger::Signal(name) => info!("Caught {}", name),
        }
        true
    }

    /// The trigger that closed the latch, if any.
    pub fn triggered(&self) -> Option<ShutdownTrigger> {
        self.tx.borrow().clone()
    }

    /// Resolve once the latch is closed.
    pub async fn wait(&self) -> ShutdownTrigger {
        let mut rx = self.tx.subscribe();
        loop {
            let current = rx.borrow_and_update().clone();
            if let Some(trigger) = current {
                return trigger;
            }
            // The sender lives as long as `self`, so this only fails if the
            // channel is torn down underneath us.
            if rx.changed().await.is_err() {
                return std::future::pending().await;
            }
        }
    }

    /// Watch a spawned task: a panic closes the latch as an uncaught fault,
    /// an `Err` result as an unhandled rejection.
    pub fn supervise<E>(&self, name: &'static str, handle: JoinHandle<Result<(), E>>) -> JoinHandle<()>
    where
        E: fmt::Display + Send + 'static,
    {
        let signal = self.clone();
        tokio::spawn(async move {
            match handle.await {
                Ok(Ok(())) => debug!(task = name, "supervised task finished"),
                Ok(Err(e)) => {
                    signal.trigger(ShutdownTrigger::UnhandledRejection(format!("{}: {}", name, e)));
                }
                Err(e) => signal.report_join_error(name, e),
            }
        })
    }

    /// Watch a spawned task without a result: only a panic closes the
    /// latch, as an uncaught fault.
    pub fn supervise_panics(&self, name: &'static str, handle: JoinHandle<()>) -> JoinHandle<()> {
        let signal = self.clone();
        tokio::spawn(async move {
            match handle.await {
                Ok(()) => debug!(task = name, "supervised task finished"),
                Err(e) => signal.report_join_error(name, e),
            }
        })
    }

    fn report_join_error(&self, name: &'static str, error: JoinError) {
        if error.is_panic() {
            let reason = panic_message(error.into_panic());
            self.trigger(ShutdownTrigger::UncaughtFault(format!("{}: {}", name, reason)));
        } else {
            debug!(task = name, "supervised task cancelled");
        }
    }
}

/// Wait for SIGINT or SIGTERM and close the latch with it.
///
/// Returns early without triggering if the latch closes for another reason.
pub async fn listen_for_signals(signal: ShutdownSignal) {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => "SIGINT",
            Err(e) => {
                warn!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending().await
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                "SIGTERM"
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending().await
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<&'static str>();

    let name = tokio::select! {
        name = ctrl_c => name,
        name = terminate => name,
        _ = signal.wait() => return,
    };

    signal.trigger(ShutdownTrigger::Signal(name));
}

/// Ends the process.
pub trait Terminator: Send + Sync {
    fn terminate(&self, exit_code: i32);
}

/// Exits the real process.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessTerminator;

impl Terminator for ProcessTerminator {
    fn terminate(&self, exit_code: i32) {
        info!(exit_code, "Exiting");
        std::process::exit(exit_code);
    }
}

pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
