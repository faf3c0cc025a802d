//! The server runtime: owns the shared state and drives the process
//! lifecycle from listening to termination.

use std::net::SocketAddr;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use super::shutdown::{listen_for_signals, panic_message, ShutdownSignal, ShutdownTrigger, Terminator};
use crate::api::{create_router, AppState};
use crate::config::Config;
use crate::error::Result;
use crate::system::SystemProbe;

/// How long in-flight requests get to finish once shutdown begins.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

type CleanupHook = Box<dyn Fn() -> Result<()> + Send + Sync>;

/// Owns the app state, the shutdown latch and the cleanup routine.
pub struct ServerRuntime {
    state: AppState,
    terminator: Arc<dyn Terminator>,
    cleanup: Vec<CleanupHook>,
}

impl ServerRuntime {
    pub fn new(config: Config, probe: Arc<dyn SystemProbe>, terminator: Arc<dyn Terminator>) -> Self {
        Self {
            state: AppState::new(config, probe),
            terminator,
            cleanup: Vec::new(),
        }
    }

    /// Register an extra step to run during shutdown, after realtime
    /// connections are closed.
    pub fn with_cleanup<F>(mut self, hook: F) -> Self
    where
        F: Fn() -> Result<()> + Send + Sync + 'static,
    {
        self.cleanup.push(Box::new(hook));
        self
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// The latch shared with handlers and realtime connection tasks.
    pub fn shutdown_signal(&self) -> &ShutdownSignal {
        &self.state.shutdown
    }

    /// Router bound to this runtime's state.
    pub fn router(&self) -> Router {
        create_router(self.state.clone())
    }

    /// Bind `0.0.0.0:<port>` and serve until a shutdown trigger fires.
    pub async fn start(&self) -> Result<ShutdownTrigger> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.state.config.port));
        let listener = TcpListener::bind(addr).await?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener until a shutdown trigger fires.
    ///
    /// The HTTP server task is supervised and SIGINT/SIGTERM are watched.
    /// Returns the trigger after in-flight requests drained or the drain
    /// timed out.
    pub async fn serve(&self, listener: TcpListener) -> Result<ShutdownTrigger> {
        let port = listener.local_addr()?.port();
        info!("Server running on port {}", port);

        let app = self
            .router()
            .into_make_service_with_connect_info::<SocketAddr>();
        let signal = self.shutdown_signal();
        let graceful = signal.clone();
        let server = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    graceful.wait().await;
                })
                .await
        });
        let server = signal.supervise("http server", server);

        tokio::spawn(listen_for_signals(signal.clone()));

        let trigger = signal.wait().await;
        debug!(%trigger, "draining in-flight requests");
        if tokio::time::timeout(DRAIN_TIMEOUT, server).await.is_err() {
            warn!("in-flight requests did not drain in time");
        }

        Ok(trigger)
    }

    /// Run cleanup and terminate with `exit_code`, or with 1 if cleanup
    /// fails.
    pub fn shutdown(&self, exit_code: i32) {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.run_cleanup()));

        let exit_code = match outcome {
            Ok(Ok(())) => {
                info!("Shutdown complete");
                exit_code
            }
            Ok(Err(e)) => {
                error!(error = %e, "Error during shutdown");
                1
            }
            Err(payload) => {
                error!(error = %panic_message(payload), "Error during shutdown");
                1
            }
        };

        self.terminator.terminate(exit_code);
    }

    fn run_cleanup(&self) -> Result<()> {
        let closed = self.state.connections.close_all();
        info!(closed, "closed realtime connections");

        for hook in &self.cleanup {
            hook()?;
        }
        Ok(())
    }
}
