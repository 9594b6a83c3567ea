pub mod collector;
pub mod history;
pub mod monitor;
pub mod process;
pub mod rate;
pub mod sampler;
pub mod snapshot;
pub mod source;
