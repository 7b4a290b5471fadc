//! JSON configuration for the command-line driver.
pub mod sizing;

pub use sizing::{load_config, FrameSource, OutputConfig, RunConfig};
