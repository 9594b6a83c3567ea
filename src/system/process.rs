use std::cmp::Ordering;
use std::time::SystemTime;

use serde::Serialize;

use super::source::{CounterSource, RawProcess};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProcessRecord {
    pub pid: i32,
    pub name: String,
    pub cpu_percent: f32,
    pub memory_percent: f32,
    pub memory_mb: f64,
    pub status: String,
}

impl From<RawProcess> for ProcessRecord {
    fn from(raw: RawProcess) -> Self {
        ProcessRecord {
            pid: raw.pid,
            name: raw.name,
            cpu_percent: raw.cpu_percent,
            memory_percent: raw.memory_percent,
            memory_mb: raw.resident_set_bytes as f64 / BYTES_PER_MB,
            status: raw.status,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Cpu,
    Memory,
}

impl SortKey {
    pub fn label(self) -> &'static str {
        match self {
            SortKey::Cpu => "CPU",
            SortKey::Memory => "Memory",
        }
    }

    /// Parse a config or CLI value. Unknown names yield `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "cpu" => Some(SortKey::Cpu),
            "memory" | "mem" => Some(SortKey::Memory),
            _ => None,
        }
    }

    fn value(self, record: &ProcessRecord) -> f32 {
        match self {
            SortKey::Cpu => record.cpu_percent,
            SortKey::Memory => record.memory_percent,
        }
    }
}

/// All readable processes of one sampling cycle, ordered by `sort_key`.
#[derive(Clone, Debug, Serialize)]
pub struct ProcessSnapshot {
    pub records: Vec<ProcessRecord>,
    pub sort_key: SortKey,
    pub taken_at: SystemTime,
    /// Processes dropped because they could not be read.
    pub skipped: usize,
}

impl Default for ProcessSnapshot {
    fn default() -> Self {
        ProcessSnapshot {
            records: Vec::new(),
            sort_key: SortKey::default(),
            taken_at: SystemTime::UNIX_EPOCH,
            skipped: 0,
        }
    }
}

impl ProcessSnapshot {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, pid: i32) -> Option<&ProcessRecord> {
        self.records.iter().find(|r| r.pid == pid)
    }

    pub fn pids(&self) -> impl Iterator<Item = i32> + '_ {
        self.records.iter().map(|r| r.pid)
    }
}

/// Enumerate every process through `source` and order by CPU.
///
/// Unreadable processes are skipped and counted, never partially recorded.
pub fn build_snapshot<S: CounterSource + ?Sized>(source: &mut S) -> ProcessSnapshot {
    let _span = tracing::debug_span!("process.build_snapshot").entered();

    source.refresh_processes();

    let mut records = Vec::new();
    let mut skipped = 0usize;
    for entry in source.processes() {
        match entry {
            Ok(raw) => records.push(ProcessRecord::from(raw)),
            Err(err) => {
                tracing::trace!(%err, "skipping process");
                skipped += 1;
            }
        }
    }

    sort_records(&mut records, SortKey::Cpu);
    tracing::debug!(processes = records.len(), skipped, "process snapshot built");

    ProcessSnapshot {
        records,
        sort_key: SortKey::Cpu,
        taken_at: SystemTime::now(),
        skipped,
    }
}

/// Copy of `snapshot` ordered descending by `key`, ties by ascending pid.
pub fn reorder(snapshot: &ProcessSnapshot, key: SortKey) -> ProcessSnapshot {
    let mut records = snapshot.records.clone();
    sort_records(&mut records, key);
    ProcessSnapshot {
        records,
        sort_key: key,
        taken_at: snapshot.taken_at,
        skipped: snapshot.skipped,
    }
}

pub fn sort_records(records: &mut [ProcessRecord], key: SortKey) {
    records.sort_by(|a, b| descending(key.value(a), key.value(b)).then(a.pid.cmp(&b.pid)));
}

// NaN sorts below every number.
fn descending(a: f32, b: f32) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}
