use thiserror::Error;

/// Instantaneous memory reading.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MemoryCounters {
    pub used: u64,
    pub total: u64,
    pub percent: f32,
}

impl MemoryCounters {
    pub fn from_used_total(used: u64, total: u64) -> Self {
        let percent = if total > 0 {
            (used as f64 / total as f64 * 100.0) as f32
        } else {
            0.0
        };
        Self {
            used,
            total,
            percent,
        }
    }
}

/// Cumulative disk bytes since boot (or since the OS last reset them).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DiskCounters {
    pub read_bytes: u64,
    pub write_bytes: u64,
}

/// Cumulative network bytes across all interfaces.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NetCounters {
    pub sent_bytes: u64,
    pub recv_bytes: u64,
}

/// One process as reported by the source, before conversion.
#[derive(Clone, Debug, PartialEq)]
pub struct RawProcess {
    pub pid: i32,
    pub name: String,
    pub cpu_percent: f32,
    pub memory_percent: f32,
    pub resident_set_bytes: u64,
    pub status: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("{0} counters are not available on this platform")]
    Unavailable(&'static str),

    #[error("failed to read {subsystem} counters: {reason}")]
    Read {
        subsystem: &'static str,
        reason: String,
    },
}

/// Why a single process could not be read. Always recoverable.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessReadError {
    #[error("process {0} exited during enumeration")]
    Gone(i32),

    #[error("access to process {0} denied")]
    AccessDenied(i32),

    #[error("process {0} is a zombie with unavailable fields")]
    Zombie(i32),
}

/// Raw OS counters consumed by the sampler.
///
/// Implementations may cache between calls; the sampler calls
/// [`refresh_system`](Self::refresh_system) once before the subsystem reads of
/// a cycle and [`refresh_processes`](Self::refresh_processes) once before
/// [`processes`](Self::processes).
pub trait CounterSource: Send {
    fn refresh_system(&mut self) {}

    fn refresh_processes(&mut self) {}

    fn cpu_percent(&mut self) -> Result<f32, SourceError>;

    fn virtual_memory(&mut self) -> Result<MemoryCounters, SourceError>;

    fn disk_io(&mut self) -> Result<DiskCounters, SourceError>;

    fn net_io(&mut self) -> Result<NetCounters, SourceError>;

    /// Every visible process; each entry fails independently.
    fn processes(&mut self) -> Vec<Result<RawProcess, ProcessReadError>>;
}

impl<S: CounterSource + ?Sized> CounterSource for Box<S> {
    fn refresh_system(&mut self) {
        (**self).refresh_system();
    }

    fn refresh_processes(&mut self) {
        (**self).refresh_processes();
    }

    fn cpu_percent(&mut self) -> Result<f32, SourceError> {
        (**self).cpu_percent()
    }

    fn virtual_memory(&mut self) -> Result<MemoryCounters, SourceError> {
        (**self).virtual_memory()
    }

    fn disk_io(&mut self) -> Result<DiskCounters, SourceError> {
        (**self).disk_io()
    }

    fn net_io(&mut self) -> Result<NetCounters, SourceError> {
        (**self).net_io()
    }

    fn processes(&mut self) -> Vec<Result<RawProcess, ProcessReadError>> {
        (**self).processes()
    }
}
