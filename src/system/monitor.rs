//! Published sampler output and the read-side handle the display layer uses.

use std::sync::Arc;

use arc_swap::ArcSwap;
use tokio::sync::watch;

use super::history::{HistoryPoint, SharedHistory};
use super::process::{self, ProcessSnapshot, SortKey};
use super::snapshot::SystemSample;

/// Single-writer state shared between the sampler and its readers.
///
/// Samples and snapshots are immutable once stored; the sampler replaces the
/// whole `Arc`, so a reader holding a previous one is never affected.
#[derive(Debug)]
pub(crate) struct Published {
    sample: ArcSwap<SystemSample>,
    processes: ArcSwap<ProcessSnapshot>,
    history: SharedHistory,
    cycles: watch::Sender<u64>,
}

impl Published {
    pub(crate) fn new(history_capacity: usize) -> Self {
        let (cycles, _) = watch::channel(0);
        Published {
            sample: ArcSwap::from_pointee(SystemSample::default()),
            processes: ArcSwap::from_pointee(ProcessSnapshot::default()),
            history: SharedHistory::new(history_capacity),
            cycles,
        }
    }

    pub(crate) fn push_history(&self, cpu_percent: f32, memory_percent: f32) {
        self.history.push(cpu_percent, memory_percent);
    }

    pub(crate) fn store_sample(&self, sample: SystemSample) {
        self.sample.store(Arc::new(sample));
    }

    pub(crate) fn store_processes(&self, snapshot: ProcessSnapshot) {
        self.processes.store(Arc::new(snapshot));
    }

    pub(crate) fn announce(&self, sequence: u64) {
        self.cycles.send_replace(sequence);
    }
}

/// Cheap, cloneable read handle onto the latest sampler output.
#[derive(Clone, Debug)]
pub struct MonitorView {
    inner: Arc<Published>,
}

impl MonitorView {
    pub(crate) fn new(inner: Arc<Published>) -> Self {
        Self { inner }
    }

    /// Last fully published system summary.
    pub fn latest_system_sample(&self) -> Arc<SystemSample> {
        self.inner.sample.load_full()
    }

    /// Last fully published process snapshot, in its default CPU order.
    pub fn latest_process_snapshot(&self) -> Arc<ProcessSnapshot> {
        self.inner.processes.load_full()
    }

    /// A re-sorted copy of `snapshot`; the published one is left as is.
    pub fn reorder(&self, snapshot: &ProcessSnapshot, key: SortKey) -> ProcessSnapshot {
        process::reorder(snapshot, key)
    }

    /// Oldest to newest.
    pub fn history_points(&self) -> Vec<HistoryPoint> {
        self.inner.history.points_in_order()
    }

    pub fn history_capacity(&self) -> usize {
        self.inner.history.capacity()
    }

    /// Receives the sequence number of every completed cycle.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.cycles.subscribe()
    }
}
