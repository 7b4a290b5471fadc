#![doc = include_str!("../README.md")]

// Measurement pipeline
pub mod candidate;
pub mod correction;
pub mod distribution;
pub mod focus;
pub mod pipeline;
pub mod tracking;
pub mod types;

// Supporting modules
pub mod background;
pub mod config;
pub mod diagnostics;
pub mod edges;
pub mod image;
pub mod stats;

// --- High-level re-exports -------------------------------------------------

pub use crate::candidate::{CandidateFilter, DiameterFloor, FilterOptions, RejectReason};
pub use crate::correction::{correction_factor, sampling_volume, CorrectionError, SensorGeometry};
pub use crate::distribution::{
    Distribution, DistributionAggregator, DistributionSummary, DropletAccumulator,
    VolumeHistogram, Weighting,
};
pub use crate::focus::{focus_score, FocusError, FocusEstimator, FocusWindow};
pub use crate::pipeline::{Frame, PipelineOptions, SequenceProcessor, SequenceReport};
pub use crate::tracking::{FrameTracker, TrackingError, TrackingOptions};
pub use crate::types::{Candidate, ImagingSetup, Region, RejectedDroplet, TrackedDroplet};

// --- Prelude ---------------------------------------------------------------

/// Small prelude for quick experiments.
///
/// ```no_run
/// use droplet_sizing::prelude::*;
///
/// # fn main() {
/// let (w, h) = (640usize, 480usize);
/// let gray = vec![255u8; w * h];
/// let img = ImageU8 { w, h, stride: w, data: &gray };
///
/// let frame = |id: &str| Frame {
///     id: id.to_string(),
///     image: ImageF32::from_u8(&img),
///     regions: vec![Region::disk(1, [240.0, 200.0], 10.0)],
/// };
///
/// let proc = SequenceProcessor::new(ImagingSetup::default(), PipelineOptions::default())
///     .expect("valid setup");
/// let report = proc.run(&[Some(frame("a")), Some(frame("b"))]);
/// println!("tracked={} empty={}", report.tracked.len(), report.distribution.is_empty());
/// # }
/// ```
pub mod prelude {
    pub use crate::image::{ImageF32, ImageU8};
    pub use crate::{
        Distribution, Frame, ImagingSetup, PipelineOptions, Region, SequenceProcessor,
    };
}
