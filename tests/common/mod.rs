#![allow(dead_code)]

use std::collections::VecDeque;
use std::fmt::{self, Write};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use tracing::field::{Field, Visit};
use tracing::subscriber::DefaultGuard;
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

use procpulse::system::source::{
    CounterSource, DiskCounters, MemoryCounters, NetCounters, ProcessReadError, RawProcess,
    SourceError,
};

/// Queue of readings; the last one repeats once the queue runs dry.
pub struct Script<T> {
    queue: VecDeque<Result<T, SourceError>>,
}

impl<T: Clone> Script<T> {
    pub fn new(readings: Vec<Result<T, SourceError>>) -> Self {
        Self {
            queue: readings.into(),
        }
    }

    fn next(&mut self, subsystem: &'static str) -> Result<T, SourceError> {
        if self.queue.len() > 1 {
            return self
                .queue
                .pop_front()
                .unwrap_or(Err(SourceError::Unavailable(subsystem)));
        }
        self.queue
            .front()
            .cloned()
            .unwrap_or(Err(SourceError::Unavailable(subsystem)))
    }
}

pub struct ScriptedSource {
    pub disk: Script<DiskCounters>,
    pub net: Script<NetCounters>,
    pub cpu: Script<f32>,
    pub memory: Script<MemoryCounters>,
    pub processes: Vec<Result<RawProcess, ProcessReadError>>,
    pub process_reads: Arc<AtomicUsize>,
}

impl Default for ScriptedSource {
    fn default() -> Self {
        Self {
            disk: Script::new(vec![Ok(DiskCounters::default())]),
            net: Script::new(vec![Ok(NetCounters::default())]),
            cpu: Script::new(vec![Ok(0.0)]),
            memory: Script::new(vec![Ok(MemoryCounters::from_used_total(1, 4))]),
            processes: Vec::new(),
            process_reads: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl CounterSource for ScriptedSource {
    fn cpu_percent(&mut self) -> Result<f32, SourceError> {
        self.cpu.next("cpu")
    }

    fn virtual_memory(&mut self) -> Result<MemoryCounters, SourceError> {
        self.memory.next("memory")
    }

    fn disk_io(&mut self) -> Result<DiskCounters, SourceError> {
        self.disk.next("disk")
    }

    fn net_io(&mut self) -> Result<NetCounters, SourceError> {
        self.net.next("network")
    }

    fn processes(&mut self) -> Vec<Result<RawProcess, ProcessReadError>> {
        self.process_reads.fetch_add(1, Ordering::SeqCst);
        self.processes.clone()
    }
}

/// Every call returns a reading derived from one shared counter, so a torn
/// sample would show mismatched fields.
#[derive(Default)]
pub struct CountingSource {
    calls: u64,
}

impl CounterSource for CountingSource {
    fn refresh_system(&mut self) {
        self.calls += 1;
    }

    fn cpu_percent(&mut self) -> Result<f32, SourceError> {
        Ok((self.calls % 100) as f32)
    }

    fn virtual_memory(&mut self) -> Result<MemoryCounters, SourceError> {
        Ok(MemoryCounters {
            used: self.calls,
            total: self.calls,
            percent: (self.calls % 100) as f32,
        })
    }

    fn disk_io(&mut self) -> Result<DiskCounters, SourceError> {
        Ok(DiskCounters {
            read_bytes: self.calls * 1024,
            write_bytes: self.calls * 1024,
        })
    }

    fn net_io(&mut self) -> Result<NetCounters, SourceError> {
        Ok(NetCounters {
            sent_bytes: self.calls,
            recv_bytes: self.calls,
        })
    }

    fn processes(&mut self) -> Vec<Result<RawProcess, ProcessReadError>> {
        (1..=3)
            .map(|pid| Ok(raw_process(pid, self.calls as f32)))
            .collect()
    }
}

/// Blocks inside its refresh hooks like a slow `/proc` walk. Configure the
/// sampler to rebuild processes every cycle so `processes()` closes a cycle.
#[derive(Clone, Default)]
pub struct SlowSource {
    pub system_delay: Duration,
    pub process_delay: Duration,
    pub started: Arc<AtomicUsize>,
    pub finished: Arc<AtomicUsize>,
    pub overlaps: Arc<AtomicUsize>,
    busy: Arc<AtomicBool>,
}

impl SlowSource {
    pub fn new(system_delay: Duration, process_delay: Duration) -> Self {
        Self {
            system_delay,
            process_delay,
            ..Self::default()
        }
    }
}

impl CounterSource for SlowSource {
    fn refresh_system(&mut self) {
        self.started.fetch_add(1, Ordering::SeqCst);
        if self.busy.swap(true, Ordering::SeqCst) {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        thread::sleep(self.system_delay);
    }

    fn refresh_processes(&mut self) {
        thread::sleep(self.process_delay);
    }

    fn cpu_percent(&mut self) -> Result<f32, SourceError> {
        Ok(1.0)
    }

    fn virtual_memory(&mut self) -> Result<MemoryCounters, SourceError> {
        Ok(MemoryCounters::from_used_total(1, 2))
    }

    fn disk_io(&mut self) -> Result<DiskCounters, SourceError> {
        Ok(DiskCounters::default())
    }

    fn net_io(&mut self) -> Result<NetCounters, SourceError> {
        Ok(NetCounters::default())
    }

    fn processes(&mut self) -> Vec<Result<RawProcess, ProcessReadError>> {
        self.busy.store(false, Ordering::SeqCst);
        self.finished.fetch_add(1, Ordering::SeqCst);
        vec![Ok(raw_process(1, 1.0))]
    }
}

/// Records every tracing event on the current thread as
/// `message field=value ...`.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<String>>>);

impl CapturedLogs {
    pub fn set_default(&self) -> DefaultGuard {
        tracing::subscriber::set_default(tracing_subscriber::registry().with(self.clone()))
    }

    pub fn lines(&self) -> Vec<String> {
        self.0.lock().expect("log lock").clone()
    }

    pub fn has_event(&self, message: &str, field: &str) -> bool {
        self.lines()
            .iter()
            .any(|line| line.starts_with(message) && line.contains(field))
    }
}

impl<S: Subscriber> Layer<S> for CapturedLogs {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut line = EventLine::default();
        event.record(&mut line);
        self.0
            .lock()
            .expect("log lock")
            .push(format!("{}{}", line.message, line.fields));
    }
}

#[derive(Default)]
struct EventLine {
    message: String,
    fields: String,
}

impl Visit for EventLine {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            let _ = write!(self.fields, " {}={}", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }
}

pub fn disk(read_bytes: u64, write_bytes: u64) -> DiskCounters {
    DiskCounters {
        read_bytes,
        write_bytes,
    }
}

pub fn net(sent_bytes: u64, recv_bytes: u64) -> NetCounters {
    NetCounters {
        sent_bytes,
        recv_bytes,
    }
}

pub fn raw_process(pid: i32, cpu_percent: f32) -> RawProcess {
    RawProcess {
        pid,
        name: format!("proc_{pid}"),
        cpu_percent,
        memory_percent: 0.5,
        resident_set_bytes: 4 * 1024 * 1024,
        status: "Sleeping".to_string(),
    }
}
