use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use procpulse::config::SamplerConfig;
use procpulse::system::process::{ProcessRecord, ProcessSnapshot, SortKey, build_snapshot, reorder};
use procpulse::system::sampler::Sampler;
use procpulse::system::source::{
    CounterSource, DiskCounters, MemoryCounters, NetCounters, ProcessReadError, RawProcess,
    SourceError,
};
use std::hint::black_box;

struct FixedSource {
    processes: Vec<Result<RawProcess, ProcessReadError>>,
    ticks: u64,
}

impl FixedSource {
    fn new(n: usize) -> Self {
        let processes = (0..n)
            .map(|i| {
                if i % 97 == 0 {
                    return Err(ProcessReadError::Gone(i as i32 + 1));
                }
                Ok(RawProcess {
                    pid: i as i32 + 1,
                    name: format!("proc_{i}"),
                    cpu_percent: (i % 100) as f32,
                    memory_percent: ((n - i) % 50) as f32,
                    resident_set_bytes: ((n - i) as u64 + 1) * 1024,
                    status: "Sleeping".to_string(),
                })
            })
            .collect();
        Self {
            processes,
            ticks: 0,
        }
    }
}

impl CounterSource for FixedSource {
    fn refresh_system(&mut self) {
        self.ticks += 1;
    }

    fn cpu_percent(&mut self) -> Result<f32, SourceError> {
        Ok((self.ticks % 100) as f32)
    }

    fn virtual_memory(&mut self) -> Result<MemoryCounters, SourceError> {
        Ok(MemoryCounters::from_used_total(4 << 30, 16 << 30))
    }

    fn disk_io(&mut self) -> Result<DiskCounters, SourceError> {
        Ok(DiskCounters {
            read_bytes: self.ticks * 4096,
            write_bytes: self.ticks * 1024,
        })
    }

    fn net_io(&mut self) -> Result<NetCounters, SourceError> {
        Ok(NetCounters {
            sent_bytes: self.ticks * 512,
            recv_bytes: self.ticks * 2048,
        })
    }

    fn processes(&mut self) -> Vec<Result<RawProcess, ProcessReadError>> {
        self.processes.clone()
    }
}

fn make_snapshot(n: usize) -> ProcessSnapshot {
    let records: Vec<ProcessRecord> = FixedSource::new(n)
        .processes
        .into_iter()
        .filter_map(Result::ok)
        .map(ProcessRecord::from)
        .collect();
    ProcessSnapshot {
        records,
        ..ProcessSnapshot::default()
    }
}

fn bench_build_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_snapshot_500_1000_2000");

    for size in [500usize, 1000, 2000] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let mut source = FixedSource::new(size);
            b.iter(|| {
                let snapshot = build_snapshot(black_box(&mut source));
                black_box(snapshot);
            })
        });
    }

    group.finish();
}

fn bench_reorder(c: &mut Criterion) {
    let mut group = c.benchmark_group("reorder_memory_500_1000_2000");

    for size in [500usize, 1000, 2000] {
        let snapshot = make_snapshot(size);
        group.bench_with_input(
            BenchmarkId::from_parameter(size),
            &snapshot,
            |b, snapshot| {
                b.iter(|| {
                    let sorted = reorder(black_box(snapshot), SortKey::Memory);
                    black_box(sorted);
                })
            },
        );
    }

    group.finish();
}

fn bench_full_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("sampler_cycle_500_1000_2000");
    let config = SamplerConfig {
        process_interval_ms: 1000,
        ..SamplerConfig::default()
    };

    for size in [500usize, 1000, 2000] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let mut sampler = Sampler::new(FixedSource::new(size), &config);
            b.iter(|| {
                let report = sampler.cycle();
                black_box(report);
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_build_snapshot, bench_reorder, bench_full_cycle);
criterion_main!(benches);
