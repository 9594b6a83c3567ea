pub mod config;
pub mod format;
pub mod report;
pub mod system;

pub use system::collector::SysinfoSource;
pub use system::monitor::MonitorView;
pub use system::process::{ProcessRecord, ProcessSnapshot, SortKey};
pub use system::sampler::{Sampler, SamplerHandle};
pub use system::snapshot::SystemSample;
