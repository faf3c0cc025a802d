//! Server bootstrap and graceful shutdown.
//!
//! A process-level fault or a termination signal closes the
//! [`ShutdownSignal`] latch once; [`ServerRuntime::shutdown`] then runs
//! cleanup and ends the process with the trigger's exit code:
//!
//! | trigger | exit code |
//! |---|---|
//! | uncaught fault (supervised task panicked) | 1 |
//! | unhandled rejection (supervised task errored) | 2 |
//! | SIGINT / SIGTERM | 2 |
//! | cleanup fault | 1 |

pub mod runtime;
pub mod shutdown;

pub use runtime::ServerRuntime;
pub use shutdown::{
    listen_for_signals, ProcessTerminator, ShutdownSignal, ShutdownTrigger, Terminator,
};
