//! Diagnostics returned alongside the measurements.
//!
//! Per-frame filter statistics, per-pair tracking counts and stage timings.
//! Everything is plain serializable data for reporting tools.

pub mod frames;
pub mod timing;

pub use frames::{FrameReport, PairReport, RejectCounts, SkippedFrame};
pub use timing::{elapsed_ms, StageTiming, TimingBreakdown};
