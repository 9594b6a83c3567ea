use std::time::SystemTime;

use serde::Serialize;

/// One point-in-time system summary. Rates are bytes per second.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SystemSample {
    pub sequence: u64,
    pub cpu_percent: f32,
    pub memory_percent: f32,
    pub memory_used_bytes: u64,
    pub memory_total_bytes: u64,
    pub disk_read_rate: f64,
    pub disk_write_rate: f64,
    pub net_sent_rate: f64,
    pub net_recv_rate: f64,
    pub sampled_at: SystemTime,
}

impl Default for SystemSample {
    fn default() -> Self {
        SystemSample {
            sequence: 0,
            cpu_percent: 0.0,
            memory_percent: 0.0,
            memory_used_bytes: 0,
            memory_total_bytes: 0,
            disk_read_rate: 0.0,
            disk_write_rate: 0.0,
            net_sent_rate: 0.0,
            net_recv_rate: 0.0,
            sampled_at: SystemTime::UNIX_EPOCH,
        }
    }
}

impl SystemSample {
    /// True for the placeholder published before the first cycle.
    pub fn is_placeholder(&self) -> bool {
        self.sequence == 0
    }
}
