//! Production probe backed by sysinfo, jemalloc and the kernel's
//! `/proc/stat`.

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use sysinfo::{CpuRefreshKind, Pid, ProcessRefreshKind, ProcessesToUpdate, RefreshKind, System};
use tracing::debug;

use super::heap::heap_stats;
use super::{CpuSnapshot, CpuTimes, MemorySnapshot, SystemProbe};
use crate::error::ProbeError;

/// Reads live state of the current process and host CPUs.
///
/// Calls block on `/proc` reads; async callers should go through
/// `spawn_blocking`.
pub struct HostProbe {
    pid: Pid,
    system: Mutex<System>,
    /// Age of the process when the probe was created.
    age_at_creation: Duration,
    created: Instant,
}

impl HostProbe {
    /// Create a probe for the running process.
    pub fn new() -> Result<Self, ProbeError> {
        let pid = sysinfo::get_current_pid().map_err(|_| ProbeError::ProcessNotFound)?;
        let mut system = System::new_with_specifics(
            RefreshKind::new().with_cpu(CpuRefreshKind::new().with_frequency()),
        );
        refresh_own_process(&mut system, pid);

        let age_at_creation = system
            .process(pid)
            .map(|process| process_age(process.start_time()))
            .unwrap_or_default();

        debug!(
            pid = pid.as_u32(),
            cores = system.cpus().len(),
            age_secs = age_at_creation.as_secs(),
            "host probe ready"
        );

        Ok(Self {
            pid,
            system: Mutex::new(system),
            age_at_creation,
            created: Instant::now(),
        })
    }
}

impl SystemProbe for HostProbe {
    fn process_id(&self) -> u32 {
        self.pid.as_u32()
    }

    fn uptime(&self) -> Duration {
        self.age_at_creation + self.created.elapsed()
    }

    fn memory(&self) -> Result<MemorySnapshot, ProbeError> {
        let rss = {
            let mut system = self.system.lock();
            refresh_own_process(&mut system, self.pid);
            system
                .process(self.pid)
                .ok_or(ProbeError::ProcessNotFound)?
                .memory()
        };
        let heap = heap_stats()?;

        Ok(MemorySnapshot {
            rss,
            heap_total: heap.active,
            heap_used: heap.allocated,
            external: rss.saturating_sub(heap.active),
        })
    }

    fn cpus(&self) -> Result<Vec<CpuSnapshot>, ProbeError> {
        let times = read_cpu_times()?;

        let mut system = self.system.lock();
        system.refresh_cpu_specifics(CpuRefreshKind::new().with_frequency());

        Ok(system
            .cpus()
            .iter()
            .enumerate()
            .map(|(index, cpu)| CpuSnapshot {
                model: cpu.brand().to_string(),
                speed: cpu.frequency(),
                times: times.get(index).copied().unwrap_or_default(),
            })
            .collect())
    }
}

/// Refresh only this process's entry, leaving the rest of the table alone.
fn refresh_own_process(system: &mut System, pid: Pid) {
    system.refresh_processes_specifics(
        ProcessesToUpdate::Some(&[pid]),
        true,
        ProcessRefreshKind::new().with_memory(),
    );
}

/// Time elapsed since `start_time` seconds after the Unix epoch.
fn process_age(start_time: u64) -> Duration {
    UNIX_EPOCH
        .checked_add(Duration::from_secs(start_time))
        .and_then(|started| SystemTime::now().duration_since(started).ok())
        .unwrap_or_default()
}

#[cfg(target_os = "linux")]
fn read_cpu_times() -> Result<Vec<CpuTimes>, ProbeError> {
    let stat = std::fs::read_to_string("/proc/stat")?;
    parse_proc_stat(&stat)
}

// Other platforms expose no per-core counters through sysinfo.
#[cfg(not(target_os = "linux"))]
fn read_cpu_times() -> Result<Vec<CpuTimes>, ProbeError> {
    Ok(Vec::new())
}

/// Parse the per-core `cpuN` lines of `/proc/stat`.
///
/// Column order: user nice system idle iowait irq softirq steal ...
pub fn parse_proc_stat(stat: &str) -> Result<Vec<CpuTimes>, ProbeError> {
    stat.lines()
        .filter(|line| {
            line.strip_prefix("cpu")
                .is_some_and(|rest| rest.starts_with(|c: char| c.is_ascii_digit()))
        })
        .map(parse_cpu_line)
        .collect()
}

fn parse_cpu_line(line: &str) -> Result<CpuTimes, ProbeError> {
    let fields = line
        .split_whitespace()
        .skip(1)
        .map(|field| {
            field
                .parse::<u64>()
                .map_err(|e| ProbeError::CpuTimes(format!("{}: {}", line, e)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    if fields.len() < 6 {
        return Err(ProbeError::CpuTimes(format!("too few columns: {}", line)));
    }

    Ok(CpuTimes {
        user: fields[0],
        nice: fields[1],
        sys: fields[2],
        idle: fields[3],
        irq: fields[5],
    })
}
