//! Unified error types for the diagnostic server.

use thiserror::Error;

/// Unified error type for the diagnostic server.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Configuration loading error.
    #[error("configuration error: {0}")]
    Config(#[from] envy::Error),

    /// Configuration loaded but failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Host introspection error.
    #[error("probe error: {0}")]
    Probe(#[from] ProbeError),

    /// Cleanup failed while shutting down.
    #[error("shutdown error: {0}")]
    Shutdown(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while reading process or host state.
#[derive(Error, Debug)]
pub enum ProbeError {
    /// The current process could not be located in the process table.
    #[error("current process not found")]
    ProcessNotFound,

    /// Allocator statistics are unavailable.
    #[error("heap statistics unavailable: {0}")]
    Allocator(String),

    /// Per-core CPU time counters could not be parsed.
    #[error("failed to read cpu times: {0}")]
    CpuTimes(String),

    /// IO error while reading kernel interfaces.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, ServerError>;
