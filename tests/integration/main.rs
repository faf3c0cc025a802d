//! Integration tests for the diagnostic server.
//!
//! Router tests drive the full middleware stack in-process; realtime tests
//! bind a loopback listener and talk WebSocket to it.

mod realtime;
mod router;

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use server_vitals::error::ProbeError;
use server_vitals::server::Terminator;
use server_vitals::system::{CpuSnapshot, CpuTimes, MemorySnapshot, SystemProbe};

/// Fixed readings: two cores, 50 MB resident, up for 12 seconds.
pub struct FixedProbe;

impl SystemProbe for FixedProbe {
    fn process_id(&self) -> u32 {
        31337
    }

    fn uptime(&self) -> Duration {
        Duration::from_secs(12)
    }

    fn memory(&self) -> Result<MemorySnapshot, ProbeError> {
        Ok(MemorySnapshot {
            rss: 52_428_800,
            heap_total: 209_715_200,
            heap_used: 10_485_760,
            external: 41_943_040,
        })
    }

    fn cpus(&self) -> Result<Vec<CpuSnapshot>, ProbeError> {
        let core = |user| CpuSnapshot {
            model: "Fixed CPU @ 3.00GHz".to_string(),
            speed: 3000,
            times: CpuTimes {
                user,
                nice: 0,
                sys: 25,
                idle: 75 - user,
                irq: 0,
            },
        };
        Ok(vec![core(50), core(25)])
    }
}

/// Memory and CPU readings always fail.
pub struct BrokenProbe;

impl SystemProbe for BrokenProbe {
    fn process_id(&self) -> u32 {
        1
    }

    fn uptime(&self) -> Duration {
        Duration::ZERO
    }

    fn memory(&self) -> Result<MemorySnapshot, ProbeError> {
        Err(ProbeError::ProcessNotFound)
    }

    fn cpus(&self) -> Result<Vec<CpuSnapshot>, ProbeError> {
        Err(ProbeError::CpuTimes("no stat".to_string()))
    }
}

/// Terminator that records exit codes instead of exiting.
#[derive(Default)]
pub struct RecordingTerminator {
    pub codes: Mutex<Vec<i32>>,
}

impl Terminator for RecordingTerminator {
    fn terminate(&self, exit_code: i32) {
        self.codes.lock().push(exit_code);
    }
}

pub fn fixed_probe() -> Arc<dyn SystemProbe> {
    Arc::new(FixedProbe)
}
