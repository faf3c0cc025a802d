//! Heap statistics from jemalloc.
//!
//! With the `jemalloc` feature (on by default) jemalloc is the global
//! allocator of every artifact linking this crate, so its counters cover
//! all Rust allocations in the process.

use crate::error::ProbeError;

#[cfg(feature = "jemalloc")]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

/// Allocator counters in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeapStats {
    /// Bytes allocated by the application.
    pub allocated: u64,
    /// Bytes in active pages, a multiple of the page size and at least
    /// `allocated`.
    pub active: u64,
}

/// Read fresh allocator counters.
#[cfg(feature = "jemalloc")]
pub fn heap_stats() -> Result<HeapStats, ProbeError> {
    use tikv_jemalloc_ctl::{epoch, stats};

    // Counters are cached by jemalloc until the epoch advances.
    epoch::advance().map_err(|e| ProbeError::Allocator(e.to_string()))?;

    let allocated = stats::allocated::read().map_err(|e| ProbeError::Allocator(e.to_string()))?;
    let active = stats::active::read().map_err(|e| ProbeError::Allocator(e.to_string()))?;

    Ok(HeapStats {
        allocated: allocated as u64,
        active: active as u64,
    })
}

#[cfg(not(feature = "jemalloc"))]
pub fn heap_stats() -> Result<HeapStats, ProbeError> {
    Err(ProbeError::Allocator(
        "built without the jemalloc feature".to_string(),
    ))
}
