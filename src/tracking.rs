//! Frame-to-frame droplet matching.
//!
//! For each frame-1 candidate the tracker looks for a frame-2 candidate that
//!
//! - moved along the bulk flow (positive component on the flow axis),
//! - within `max_angle_deg` of that axis,
//! - by less than `max_velocity · delay / resolution` pixels,
//! - and kept its diameter within `max_diameter_diff` (relative).
//!
//! When several partners qualify, the one with the smallest relative
//! diameter difference wins; an exact tie keeps the lower frame-2 index.
//! Every frame-1 candidate ends up in exactly one of the tracked or rejected
//! lists.
use crate::types::{sphere_volume, Candidate, ImagingSetup, RejectedDroplet, TrackedDroplet};
use log::debug;
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Matching tolerances.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingOptions {
    /// Largest accepted `|d1 - d2| / d1` (exclusive).
    pub max_diameter_diff: f64,
    /// Largest accepted angle between displacement and flow axis, degrees (exclusive).
    pub max_angle_deg: f64,
    /// Fastest plausible droplet, m/s.
    pub max_velocity: f64,
    /// Bulk flow direction in `[row, col]` centroid components.
    pub flow_axis: [f64; 2],
}

impl Default for TrackingOptions {
    fn default() -> Self {
        Self {
            max_diameter_diff: 0.1,
            max_angle_deg: 30.0,
            max_velocity: 20.0,
            flow_axis: [0.0, 1.0],
        }
    }
}

impl TrackingOptions {
    /// Check the tolerances against `setup`; returns the unit flow axis.
    pub fn validate(&self, setup: &ImagingSetup) -> Result<Vector2<f64>, TrackingError> {
        if !setup.is_valid() {
            return Err(TrackingError::InvalidSetup {
                resolution: setup.resolution,
                delay: setup.frame_delay,
            });
        }
        let axis = Vector2::new(self.flow_axis[0], self.flow_axis[1]);
        let norm = axis.norm();
        if !norm.is_finite() || norm == 0.0 {
            return Err(TrackingError::InvalidFlowAxis {
                axis: self.flow_axis,
            });
        }
        for (name, value) in [
            ("max_diameter_diff", self.max_diameter_diff),
            ("max_angle_deg", self.max_angle_deg),
            ("max_velocity", self.max_velocity),
        ] {
            if value.is_nan() || value <= 0.0 {
                return Err(TrackingError::InvalidTolerance { name, value });
            }
        }
        Ok(axis / norm)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrackingError {
    #[error("resolution and frame delay must be positive and finite (resolution={resolution}, delay={delay})")]
    InvalidSetup { resolution: f64, delay: f64 },
    #[error("flow axis must be a non-zero finite vector, got {axis:?}")]
    InvalidFlowAxis { axis: [f64; 2] },
    #[error("tolerance `{name}` must be positive, got {value}")]
    InvalidTolerance { name: &'static str, value: f64 },
}

/// Output of one frame pair.
#[derive(Clone, Debug, Default, Serialize)]
pub struct TrackingResult {
    pub tracked: Vec<TrackedDroplet>,
    pub rejected: Vec<RejectedDroplet>,
}

#[derive(Clone, Debug)]
pub struct FrameTracker {
    setup: ImagingSetup,
    options: TrackingOptions,
    flow: Vector2<f64>,
    max_angle: f64,
    max_displacement_px: f64,
}

impl FrameTracker {
    pub fn new(setup: ImagingSetup, options: TrackingOptions) -> Result<Self, TrackingError> {
        let flow = options.validate(&setup)?;
        let max_displacement_px = options.max_velocity * setup.frame_delay / setup.resolution;
        Ok(Self {
            flow,
            max_angle: options.max_angle_deg.to_radians(),
            max_displacement_px,
            setup,
            options,
        })
    }

    /// Largest displacement, in pixels, a droplet may cover in one delay.
    pub fn max_displacement_px(&self) -> f64 {
        self.max_displacement_px
    }

    fn admissible(&self, displacement: &Vector2<f64>) -> bool {
        let along = displacement.dot(&self.flow);
        if along <= 0.0 {
            return false;
        }
        let dist = displacement.norm();
        dist < self.max_displacement_px && self.flow.angle(displacement) < self.max_angle
    }

    /// Best frame-2 partner for `c1`: `(index, relative diameter difference, distance px)`.
    fn best_match(&self, c1: &Candidate, frame2: &[Candidate]) -> Option<(usize, f64, f64)> {
        let p1 = Vector2::new(c1.centroid[0], c1.centroid[1]);
        let mut best: Option<(usize, f64, f64)> = None;
        for (k, c2) in frame2.iter().enumerate() {
            let disp = Vector2::new(c2.centroid[0], c2.centroid[1]) - p1;
            if !self.admissible(&disp) {
                continue;
            }
            let diff = (c1.diameter - c2.diameter).abs() / c1.diameter;
            if diff.is_nan() || diff >= self.options.max_diameter_diff {
                continue;
            }
            if best.map_or(true, |(_, best_diff, _)| diff < best_diff) {
                best = Some((k, diff, disp.norm()));
            }
        }
        best
    }

    /// Match `frame1` against `frame2`; `image` labels the frame-1 source.
    pub fn track(&self, frame1: &[Candidate], frame2: &[Candidate], image: &str) -> TrackingResult {
        let mut result = TrackingResult::default();
        for c1 in frame1 {
            match self.best_match(c1, frame2) {
                Some((k, diff, dist)) => result.tracked.push(TrackedDroplet {
                    diameter: c1.diameter,
                    diameter_difference: diff,
                    volume: sphere_volume(c1.diameter),
                    displacement: dist,
                    velocity: dist * self.setup.resolution / self.setup.frame_delay,
                    centroids: [c1.centroid, frame2[k].centroid],
                    image: image.to_string(),
                    focus: c1.focus,
                }),
                None => result.rejected.push(RejectedDroplet {
                    diameter: c1.diameter,
                    centroid: c1.centroid,
                    image: image.to_string(),
                    focus: c1.focus,
                }),
            }
        }
        debug!(
            "FrameTracker::track image={image} frame1={} frame2={} tracked={} rejected={}",
            frame1.len(),
            frame2.len(),
            result.tracked.len(),
            result.rejected.len()
        );
        result
    }
}
