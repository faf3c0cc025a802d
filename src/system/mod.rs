//! Process and host introspection.
//!
//! Controllers read host state through the [`SystemProbe`] trait so tests
//! can substitute fixed readings. [`HostProbe`] is the production
//! implementation.

pub mod format;
pub mod heap;
pub mod host;

use std::time::Duration;

use serde::Serialize;

use crate::error::ProbeError;

pub use format::{cpu_usage_percentages, format_long_date, format_megabytes, humanize_duration};
pub use heap::{heap_stats, HeapStats};
pub use host::HostProbe;

/// Raw memory counters in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemorySnapshot {
    /// Resident set size.
    pub rss: u64,
    /// Bytes in pages the allocator holds for live allocations.
    pub heap_total: u64,
    /// Bytes currently allocated and not yet freed.
    pub heap_used: u64,
    /// Resident bytes outside the allocator's active pages.
    pub external: u64,
}

/// Cumulative time buckets of one logical core since boot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CpuTimes {
    pub user: u64,
    pub nice: u64,
    pub sys: u64,
    pub idle: u64,
    pub irq: u64,
}

impl CpuTimes {
    /// Sum of all buckets.
    pub fn total(&self) -> u64 {
        self.user + self.nice + self.sys + self.idle + self.irq
    }
}

/// One logical core as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpuSnapshot {
    /// Brand string.
    pub model: String,
    /// Clock speed in MHz.
    pub speed: u64,
    /// Accumulated times.
    pub times: CpuTimes,
}

/// Read access to process and host state.
pub trait SystemProbe: Send + Sync {
    /// Identifier of the running process.
    fn process_id(&self) -> u32;

    /// Time since the process started. Never decreases.
    fn uptime(&self) -> Duration;

    /// Current memory counters of the running process.
    fn memory(&self) -> Result<MemorySnapshot, ProbeError>;

    /// Every logical core, in OS order.
    fn cpus(&self) -> Result<Vec<CpuSnapshot>, ProbeError>;
}
