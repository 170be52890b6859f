pub mod cpu;
pub mod error;
pub mod platform;
pub mod process;
pub mod procfs;
pub mod relay;
pub mod summary;

pub use error::{ProbeError, ProbeResult};
