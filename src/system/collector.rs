use std::collections::HashSet;
use std::ffi::OsStr;

use sysinfo::{
    Disks, Networks, ProcessRefreshKind, ProcessStatus, ProcessesToUpdate, System,
};

use super::source::{
    CounterSource, DiskCounters, MemoryCounters, NetCounters, ProcessReadError, RawProcess,
    SourceError,
};

/// [`CounterSource`] backed by `sysinfo`.
pub struct SysinfoSource {
    sys: System,
    disks: Disks,
    networks: Networks,
}

impl Default for SysinfoSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SysinfoSource {
    pub fn new() -> Self {
        let mut sys = System::new();
        sys.refresh_memory();
        sys.refresh_cpu_usage();
        sys.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::nothing().with_memory().with_cpu(),
        );
        SysinfoSource {
            sys,
            disks: Disks::new_with_refreshed_list(),
            networks: Networks::new_with_refreshed_list(),
        }
    }
}

impl CounterSource for SysinfoSource {
    fn refresh_system(&mut self) {
        self.sys.refresh_memory();
        self.sys.refresh_cpu_usage();
        self.disks.refresh(true);
        self.networks.refresh(true);
    }

    fn refresh_processes(&mut self) {
        self.sys.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::nothing().with_memory().with_cpu(),
        );
    }

    fn cpu_percent(&mut self) -> Result<f32, SourceError> {
        if self.sys.cpus().is_empty() {
            return Err(SourceError::Unavailable("cpu"));
        }
        Ok(self.sys.global_cpu_usage())
    }

    fn virtual_memory(&mut self) -> Result<MemoryCounters, SourceError> {
        let total = self.sys.total_memory();
        if total == 0 {
            return Err(SourceError::Unavailable("memory"));
        }
        Ok(MemoryCounters::from_used_total(self.sys.used_memory(), total))
    }

    fn disk_io(&mut self) -> Result<DiskCounters, SourceError> {
        if self.disks.list().is_empty() {
            return Err(SourceError::Unavailable("disk"));
        }
        Ok(sum_per_device(self.disks.list().iter().map(|disk| {
            let usage = disk.usage();
            (disk.name(), usage.total_read_bytes, usage.total_written_bytes)
        })))
    }

    fn net_io(&mut self) -> Result<NetCounters, SourceError> {
        if self.networks.list().is_empty() {
            return Err(SourceError::Unavailable("network"));
        }
        let mut counters = NetCounters::default();
        for data in self.networks.list().values() {
            counters.sent_bytes = counters.sent_bytes.saturating_add(data.total_transmitted());
            counters.recv_bytes = counters.recv_bytes.saturating_add(data.total_received());
        }
        Ok(counters)
    }

    fn processes(&mut self) -> Vec<Result<RawProcess, ProcessReadError>> {
        let total_memory = self.sys.total_memory();

        self.sys
            .processes()
            .iter()
            .filter_map(|(pid, process)| checked_pid(pid.as_u32()).map(|pid| (pid, process)))
            .map(|(pid, process)| {
                let memory = process.memory();
                let status = process.status();

                // Zombies keep their table slot but lose their address space.
                if status == ProcessStatus::Zombie && memory == 0 {
                    return Err(ProcessReadError::Zombie(pid));
                }

                let memory_percent = if total_memory > 0 {
                    (memory as f64 / total_memory as f64 * 100.0) as f32
                } else {
                    0.0
                };

                Ok(RawProcess {
                    pid,
                    name: process.name().to_string_lossy().to_string(),
                    cpu_percent: process.cpu_usage(),
                    memory_percent,
                    resident_set_bytes: memory,
                    status: status.to_string(),
                })
            })
            .collect()
    }
}

fn checked_pid(raw: u32) -> Option<i32> {
    let pid = i32::try_from(raw).ok();
    if pid.is_none() {
        tracing::trace!(pid = raw, "pid out of range, skipping");
    }
    pid
}

/// Totals per device. `Disks` lists mount points, and a device mounted
/// twice reports the same counters for each mount.
fn sum_per_device<'a>(entries: impl IntoIterator<Item = (&'a OsStr, u64, u64)>) -> DiskCounters {
    let mut seen = HashSet::new();
    let mut counters = DiskCounters::default();
    for (device, read, written) in entries {
        if !seen.insert(device) {
            continue;
        }
        counters.read_bytes = counters.read_bytes.saturating_add(read);
        counters.write_bytes = counters.write_bytes.saturating_add(written);
    }
    counters
}
