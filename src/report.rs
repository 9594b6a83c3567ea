//! Line-oriented rendering of published samples for the headless binary.

use serde::Serialize;

use crate::format::{format_bytes, format_rate, truncate_unicode};
use crate::system::history::HistoryPoint;
use crate::system::process::{ProcessRecord, ProcessSnapshot, SortKey};
use crate::system::snapshot::SystemSample;

const NAME_WIDTH: usize = 20;

pub fn render_summary(sample: &SystemSample) -> String {
    format!(
        "cpu {:>5.1}%  mem {:>5.1}% ({} / {})  disk r {} w {}  net tx {} rx {}",
        sample.cpu_percent,
        sample.memory_percent,
        format_bytes(sample.memory_used_bytes as f64),
        format_bytes(sample.memory_total_bytes as f64),
        format_rate(sample.disk_read_rate),
        format_rate(sample.disk_write_rate),
        format_rate(sample.net_sent_rate),
        format_rate(sample.net_recv_rate),
    )
}

pub fn render_history(points: &[HistoryPoint], capacity: usize) -> String {
    let mut out = format!("history {}/{}", points.len(), capacity);
    if points.is_empty() {
        return out;
    }
    let cpu = Spread::of(points.iter().map(|p| p.cpu_percent));
    let mem = Spread::of(points.iter().map(|p| p.memory_percent));
    out.push_str(&format!(
        "  cpu min {:.1} avg {:.1} max {:.1}  mem min {:.1} avg {:.1} max {:.1}",
        cpu.min, cpu.avg, cpu.max, mem.min, mem.avg, mem.max
    ));
    out
}

pub fn render_processes(snapshot: &ProcessSnapshot, top: usize) -> String {
    let mut lines = Vec::with_capacity(top.min(snapshot.len()) + 2);
    lines.push(format!(
        "{:>7}  {:<NAME_WIDTH$}  {:>6}  {:>6}  {:>9}  {}",
        "PID", "NAME", "CPU%", "MEM%", "MEM MB", "STATUS"
    ));
    for record in snapshot.records.iter().take(top) {
        lines.push(format!(
            "{:>7}  {:<NAME_WIDTH$}  {:>6.1}  {:>6.1}  {:>9.1}  {}",
            record.pid,
            truncate_unicode(&record.name, NAME_WIDTH),
            record.cpu_percent,
            record.memory_percent,
            record.memory_mb,
            record.status
        ));
    }
    lines.push(format!(
        "{} processes ({} unreadable), sorted by {}",
        snapshot.len(),
        snapshot.skipped,
        snapshot.sort_key.label()
    ));
    lines.join("\n")
}

pub fn render_text(
    sample: &SystemSample,
    history: &[HistoryPoint],
    history_capacity: usize,
    snapshot: &ProcessSnapshot,
    top: usize,
) -> String {
    [
        render_summary(sample),
        render_history(history, history_capacity),
        render_processes(snapshot, top),
    ]
    .join("\n")
}

/// One JSON line per published cycle.
#[derive(Debug, Serialize)]
pub struct JsonFrame<'a> {
    pub sample: &'a SystemSample,
    pub history: &'a [HistoryPoint],
    pub sort_key: SortKey,
    pub skipped: usize,
    pub processes: &'a [ProcessRecord],
}

impl<'a> JsonFrame<'a> {
    pub fn new(
        sample: &'a SystemSample,
        history: &'a [HistoryPoint],
        snapshot: &'a ProcessSnapshot,
        top: usize,
    ) -> Self {
        let shown = top.min(snapshot.records.len());
        JsonFrame {
            sample,
            history,
            sort_key: snapshot.sort_key,
            skipped: snapshot.skipped,
            processes: &snapshot.records[..shown],
        }
    }

    pub fn to_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

struct Spread {
    min: f32,
    avg: f32,
    max: f32,
}

impl Spread {
    fn of(values: impl Iterator<Item = f32>) -> Self {
        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;
        let mut sum = 0.0f64;
        let mut count = 0usize;
        for v in values {
            min = min.min(v);
            max = max.max(v);
            sum += f64::from(v);
            count += 1;
        }
        if count == 0 {
            return Spread {
                min: 0.0,
                avg: 0.0,
                max: 0.0,
            };
        }
        Spread {
            min,
            avg: (sum / count as f64) as f32,
            max,
        }
    }
}
