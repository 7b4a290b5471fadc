//! Sequence processing: frames → candidates → tracked pairs → distribution.
//!
//! Stages per run:
//!
//! 1. Every available frame is filtered into candidates independently.
//! 2. Each consecutive pair `(t, t+1)` with both frames available is
//!    tracked; its output is appended to a shared [`DropletAccumulator`].
//! 3. Once all pairs are in, the accumulated droplets are aggregated.
//!
//! With the `parallel` feature, stages 1 and 2 fan out over rayon. Workers
//! own their frame data; the accumulator is the only shared state. A missing
//! frame is recorded as skipped and only drops the pairs it belongs to.
use crate::candidate::{CandidateFilter, FilterOptions};
use crate::diagnostics::{
    elapsed_ms, FrameReport, PairReport, RejectCounts, SkippedFrame, TimingBreakdown,
};
use crate::distribution::{
    Distribution, DistributionAggregator, DropletAccumulator, VolumeHistogram, Weighting,
};
use crate::image::ImageF32;
use crate::tracking::{FrameTracker, TrackingError, TrackingOptions};
use crate::types::{Candidate, ImagingSetup, Region, RejectedDroplet, TrackedDroplet};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// One acquired frame with its segmentation output.
#[derive(Clone, Debug)]
pub struct Frame {
    pub id: String,
    pub image: ImageF32,
    pub regions: Vec<Region>,
}

/// Stage options for a sequence run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineOptions {
    pub filter: FilterOptions,
    pub tracking: TrackingOptions,
    pub weighting: Weighting,
    /// Bins of the volume histogram in the report; 0 disables it.
    pub histogram_bins: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            filter: FilterOptions::default(),
            tracking: TrackingOptions::default(),
            weighting: Weighting::default(),
            histogram_bins: 50,
        }
    }
}

/// Admitted candidates of one frame.
#[derive(Clone, Debug)]
pub struct FrameCandidates {
    pub image: String,
    pub candidates: Vec<Candidate>,
    pub report: FrameReport,
}

/// Everything a run produces.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceReport {
    pub distribution: Distribution,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub histogram: Option<VolumeHistogram>,
    pub tracked: Vec<TrackedDroplet>,
    pub rejected: Vec<RejectedDroplet>,
    pub frames: Vec<FrameReport>,
    pub pairs: Vec<PairReport>,
    pub skipped: Vec<SkippedFrame>,
    pub timing: TimingBreakdown,
}

/// Runs filtering, tracking and aggregation with one fixed configuration.
#[derive(Clone, Debug)]
pub struct SequenceProcessor {
    filter: CandidateFilter,
    tracker: FrameTracker,
    aggregator: DistributionAggregator,
    histogram_bins: usize,
}

impl SequenceProcessor {
    pub fn new(setup: ImagingSetup, options: PipelineOptions) -> Result<Self, TrackingError> {
        let tracker = FrameTracker::new(setup.clone(), options.tracking)?;
        Ok(Self {
            filter: CandidateFilter::new(options.filter, setup.resolution),
            aggregator: DistributionAggregator::new(setup, options.weighting),
            tracker,
            histogram_bins: options.histogram_bins,
        })
    }

    pub fn aggregator(&self) -> &DistributionAggregator {
        &self.aggregator
    }

    /// Filter the regions of `frame` into candidates.
    pub fn extract(&self, frame: &Frame) -> FrameCandidates {
        let t0 = Instant::now();
        let set = self.filter.extract(&frame.image, &frame.regions);
        let report = FrameReport {
            image: frame.id.clone(),
            regions: frame.regions.len(),
            admitted: set.admitted.len(),
            rejected: RejectCounts::from_set(&set),
            elapsed_ms: elapsed_ms(t0),
        };
        FrameCandidates {
            image: frame.id.clone(),
            candidates: set.admitted,
            report,
        }
    }

    /// Track `first` against `second` and append the result to `acc`.
    pub fn track_pair(
        &self,
        first: &FrameCandidates,
        second: &FrameCandidates,
        acc: &DropletAccumulator,
    ) -> PairReport {
        let t0 = Instant::now();
        let result = self
            .tracker
            .track(&first.candidates, &second.candidates, &first.image);
        let report = PairReport {
            first: first.image.clone(),
            second: second.image.clone(),
            tracked: result.tracked.len(),
            rejected: result.rejected.len(),
            elapsed_ms: elapsed_ms(t0),
        };
        acc.append(result.tracked, result.rejected);
        report
    }

    /// Process a temporally ordered sequence. `None` marks a frame that
    /// could not be acquired.
    pub fn run(&self, frames: &[Option<Frame>]) -> SequenceReport {
        let t_run = Instant::now();
        let mut timing = TimingBreakdown::default();

        let t0 = Instant::now();
        let extracted = extract_all(self, frames);
        timing.push_since("candidates", t0);

        let skipped: Vec<SkippedFrame> = extracted
            .iter()
            .enumerate()
            .filter(|(_, f)| f.is_none())
            .map(|(index, _)| SkippedFrame {
                index,
                reason: "frame unavailable".to_string(),
            })
            .collect();
        for s in &skipped {
            warn!("frame {} skipped: {}", s.index, s.reason);
        }

        let t0 = Instant::now();
        let acc = DropletAccumulator::new();
        let pairs = track_all(self, &extracted, &acc);
        timing.push_since("tracking", t0);

        let (tracked, rejected) = acc.into_parts();
        let t0 = Instant::now();
        let distribution = self.aggregator.aggregate(&tracked);
        let histogram = if self.histogram_bins > 0 {
            self.aggregator.volume_histogram(&tracked, self.histogram_bins)
        } else {
            None
        };
        timing.push_since("distribution", t0);
        timing.total_ms = elapsed_ms(t_run);

        match distribution.summary() {
            Some(s) => info!(
                "sequence: frames={} pairs={} tracked={} rejected={} Dv10={:.2} Dv50={:.2} Dv90={:.2} µm span={:.3}",
                frames.len(),
                pairs.len(),
                tracked.len(),
                rejected.len(),
                s.dv10_um,
                s.dv50_um,
                s.dv90_um,
                s.span
            ),
            None => info!(
                "sequence: frames={} pairs={} no droplets contributed to the distribution",
                frames.len(),
                pairs.len()
            ),
        }

        SequenceReport {
            distribution,
            histogram,
            tracked,
            rejected,
            frames: extracted
                .into_iter()
                .flatten()
                .map(|f| f.report)
                .collect(),
            pairs,
            skipped,
            timing,
        }
    }
}

#[cfg(not(feature = "parallel"))]
fn extract_all(proc: &SequenceProcessor, frames: &[Option<Frame>]) -> Vec<Option<FrameCandidates>> {
    frames
        .iter()
        .map(|f| f.as_ref().map(|f| proc.extract(f)))
        .collect()
}

#[cfg(feature = "parallel")]
fn extract_all(proc: &SequenceProcessor, frames: &[Option<Frame>]) -> Vec<Option<FrameCandidates>> {
    use rayon::prelude::*;

    frames
        .par_iter()
        .map(|f| f.as_ref().map(|f| proc.extract(f)))
        .collect()
}

fn pair_of<'a>(
    window: &'a [Option<FrameCandidates>],
) -> Option<(&'a FrameCandidates, &'a FrameCandidates)> {
    match window {
        [Some(a), Some(b)] => Some((a, b)),
        _ => {
            debug!("pair skipped: missing frame");
            None
        }
    }
}

#[cfg(not(feature = "parallel"))]
fn track_all(
    proc: &SequenceProcessor,
    extracted: &[Option<FrameCandidates>],
    acc: &DropletAccumulator,
) -> Vec<PairReport> {
    extracted
        .windows(2)
        .filter_map(pair_of)
        .map(|(a, b)| proc.track_pair(a, b, acc))
        .collect()
}

#[cfg(feature = "parallel")]
fn track_all(
    proc: &SequenceProcessor,
    extracted: &[Option<FrameCandidates>],
    acc: &DropletAccumulator,
) -> Vec<PairReport> {
    use rayon::prelude::*;

    extracted
        .par_windows(2)
        .filter_map(pair_of)
        .map(|(a, b)| proc.track_pair(a, b, acc))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> ImagingSetup {
        ImagingSetup {
            resolution: 1e-5,
            frame_delay: 1e-4,
            ..Default::default()
        }
    }

    fn empty_frame(id: &str) -> Frame {
        Frame {
            id: id.to_string(),
            image: ImageF32::new(32, 32),
            regions: Vec::new(),
        }
    }

    #[test]
    fn sequence_without_regions_reports_empty_distribution() {
        let proc = SequenceProcessor::new(setup(), PipelineOptions::default()).unwrap();
        let frames = vec![Some(empty_frame("a")), Some(empty_frame("b"))];
        let report = proc.run(&frames);
        assert!(report.distribution.is_empty());
        assert!(report.histogram.is_none());
        assert_eq!(report.pairs.len(), 1);
        assert_eq!(report.frames.len(), 2);
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn missing_frame_drops_only_its_pairs() {
        let proc = SequenceProcessor::new(setup(), PipelineOptions::default()).unwrap();
        let frames = vec![
            Some(empty_frame("a")),
            None,
            Some(empty_frame("c")),
            Some(empty_frame("d")),
        ];
        let report = proc.run(&frames);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].index, 1);
        assert_eq!(report.pairs.len(), 1);
        assert_eq!(report.pairs[0].first, "c");
        assert_eq!(report.pairs[0].second, "d");
    }

    #[test]
    fn invalid_setup_is_rejected_up_front() {
        let bad = ImagingSetup {
            resolution: -1.0,
            ..setup()
        };
        assert!(SequenceProcessor::new(bad, PipelineOptions::default()).is_err());
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let opts: PipelineOptions =
            serde_json::from_str(r#"{"tracking": {"max_velocity": 12.0}, "weighting": "raw"}"#)
                .unwrap();
        assert_eq!(opts.tracking.max_velocity, 12.0);
        assert_eq!(opts.tracking.max_angle_deg, 30.0);
        assert_eq!(opts.weighting, Weighting::Raw);
        assert_eq!(opts.histogram_bins, 50);
    }
}
