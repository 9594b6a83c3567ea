//! Background sampling loop.
//!
//! A [`Sampler`] owns its [`CounterSource`] and the previous cumulative
//! counters. Every tick it reads the source, converts counters into rates,
//! appends to the rolling history and publishes immutable results for any
//! number of [`MonitorView`]s. Process enumeration runs on every
//! `process_every`-th tick of the same timer, so the two cadences can never
//! overlap.

use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use super::monitor::{MonitorView, Published};
use super::process::build_snapshot;
use super::rate::rate_between;
use super::snapshot::SystemSample;
use super::source::{CounterSource, DiskCounters, MemoryCounters, NetCounters, SourceError};
use crate::config::SamplerConfig;

/// Previous cumulative readings. Only the sampler touches this.
#[derive(Debug, Default)]
struct RawCounterState {
    disk: Option<DiskCounters>,
    net: Option<NetCounters>,
    taken_at: Option<Instant>,
}

#[derive(Debug, Default)]
struct Degradation {
    cpu: bool,
    memory: bool,
    disk: bool,
    net: bool,
}

/// What one call to [`Sampler::cycle_at`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub sequence: u64,
    pub rebuilt_processes: bool,
    /// Subsystems that could not be read and were reported as 0.
    pub degraded: Vec<&'static str>,
}

pub struct Sampler<S> {
    source: S,
    counters: RawCounterState,
    degradation: Degradation,
    published: Arc<Published>,
    summary_interval: Duration,
    process_every: u64,
    cycles: u64,
}

impl<S: CounterSource> Sampler<S> {
    pub fn new(source: S, config: &SamplerConfig) -> Self {
        Sampler {
            source,
            counters: RawCounterState::default(),
            degradation: Degradation::default(),
            published: Arc::new(Published::new(config.history_capacity)),
            summary_interval: config.summary_interval(),
            process_every: config.process_every(),
            cycles: 0,
        }
    }

    pub fn view(&self) -> MonitorView {
        MonitorView::new(Arc::clone(&self.published))
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn cycle(&mut self) -> CycleReport {
        self.cycle_at(Instant::now())
    }

    /// Run one full cycle as if the clock read `now`.
    pub fn cycle_at(&mut self, now: Instant) -> CycleReport {
        let sequence = self.cycles + 1;
        let _span = tracing::debug_span!("sampler.cycle", sequence).entered();

        let elapsed = self
            .counters
            .taken_at
            .and_then(|prev| now.checked_duration_since(prev))
            .map_or(0.0, |d| d.as_secs_f64());

        self.source.refresh_system();
        let mut degraded = Vec::new();

        let disk = note(
            "disk",
            &mut self.degradation.disk,
            &mut degraded,
            self.source.disk_io(),
        );
        let net = note(
            "network",
            &mut self.degradation.net,
            &mut degraded,
            self.source.net_io(),
        );
        let cpu_percent = note(
            "cpu",
            &mut self.degradation.cpu,
            &mut degraded,
            self.source.cpu_percent(),
        )
        .unwrap_or(0.0);
        let memory = note(
            "memory",
            &mut self.degradation.memory,
            &mut degraded,
            self.source.virtual_memory(),
        )
        .unwrap_or_default();

        let sample = assemble(
            sequence,
            &self.counters,
            disk,
            net,
            cpu_percent,
            memory,
            elapsed,
        );
        self.published
            .push_history(sample.cpu_percent, sample.memory_percent);

        let rebuilt_processes = (sequence - 1) % self.process_every == 0;
        let processes = rebuilt_processes.then(|| build_snapshot(&mut self.source));

        debug!(
            cpu = sample.cpu_percent,
            memory = sample.memory_percent,
            disk_read = sample.disk_read_rate,
            disk_write = sample.disk_write_rate,
            net_sent = sample.net_sent_rate,
            net_recv = sample.net_recv_rate,
            "sample assembled"
        );

        self.published.store_sample(sample);
        if let Some(snapshot) = processes {
            self.published.store_processes(snapshot);
        }
        self.published.announce(sequence);

        self.counters = RawCounterState {
            disk,
            net,
            taken_at: Some(now),
        };
        self.cycles = sequence;

        CycleReport {
            sequence,
            rebuilt_processes,
            degraded,
        }
    }
}

impl<S: CounterSource + 'static> Sampler<S> {
    /// Move the sampler onto its own tokio task. Each cycle runs on the
    /// blocking pool.
    pub fn spawn(self) -> SamplerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let view = self.view();
        let task = tokio::spawn(self.run(shutdown_rx));
        SamplerHandle {
            shutdown: shutdown_tx,
            task,
            view,
        }
    }

    async fn run(self, mut shutdown: watch::Receiver<bool>) -> u64 {
        let summary_interval = self.summary_interval;
        let mut ticker = tokio::time::interval(summary_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            summary_interval_ms = summary_interval.as_millis() as u64,
            process_every = self.process_every,
            "sampler started"
        );

        let mut sampler = self;
        let mut completed = sampler.cycles;

        loop {
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    let started = Instant::now();
                    // Counter reads block, so they stay off the async workers.
                    let joined = tokio::task::spawn_blocking(move || {
                        sampler.cycle();
                        sampler
                    })
                    .await;
                    sampler = match joined {
                        Ok(sampler) => sampler,
                        Err(err) => {
                            error!(
                                %err,
                                cycles = completed,
                                "sampling cycle panicked, sampler stopped"
                            );
                            return completed;
                        }
                    };
                    completed = sampler.cycles;

                    let took = started.elapsed();
                    if took > summary_interval {
                        warn!(
                            took_ms = took.as_millis() as u64,
                            interval_ms = summary_interval.as_millis() as u64,
                            "sampling cycle overran its interval"
                        );
                    }
                }
            }
        }

        info!(cycles = completed, "sampler stopped");
        completed
    }
}

/// Control handle for a spawned [`Sampler`]. Dropping it also stops the loop.
pub struct SamplerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<u64>,
    view: MonitorView,
}

impl SamplerHandle {
    pub fn view(&self) -> MonitorView {
        self.view.clone()
    }

    /// Stop scheduling cycles, let an in-flight one finish, and return how
    /// many cycles completed.
    pub async fn shutdown(self) -> Result<u64, JoinError> {
        self.shutdown.send_replace(true);
        self.task.await
    }
}

fn note<T>(
    subsystem: &'static str,
    failing: &mut bool,
    degraded: &mut Vec<&'static str>,
    result: Result<T, SourceError>,
) -> Option<T> {
    match result {
        Ok(value) => {
            if *failing {
                info!(subsystem, "subsystem readable again");
                *failing = false;
            }
            Some(value)
        }
        Err(err) => {
            if *failing {
                debug!(subsystem, %err, "subsystem still unavailable");
            } else {
                warn!(subsystem, %err, "subsystem unavailable, reporting 0");
                *failing = true;
            }
            degraded.push(subsystem);
            None
        }
    }
}

fn assemble(
    sequence: u64,
    previous: &RawCounterState,
    disk: Option<DiskCounters>,
    net: Option<NetCounters>,
    cpu_percent: f32,
    memory: MemoryCounters,
    elapsed: f64,
) -> SystemSample {
    SystemSample {
        sequence,
        cpu_percent,
        memory_percent: memory.percent,
        memory_used_bytes: memory.used,
        memory_total_bytes: memory.total,
        disk_read_rate: rate_between(
            previous.disk.map(|d| d.read_bytes),
            disk.map(|d| d.read_bytes),
            elapsed,
        ),
        disk_write_rate: rate_between(
            previous.disk.map(|d| d.write_bytes),
            disk.map(|d| d.write_bytes),
            elapsed,
        ),
        net_sent_rate: rate_between(
            previous.net.map(|n| n.sent_bytes),
            net.map(|n| n.sent_bytes),
            elapsed,
        ),
        net_recv_rate: rate_between(
            previous.net.map(|n| n.recv_bytes),
            net.map(|n| n.recv_bytes),
            elapsed,
        ),
        sampled_at: SystemTime::now(),
    }
}
