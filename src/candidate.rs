//! Droplet candidate filtering.
//!
//! A region becomes a candidate when it is clear of the frame border, large
//! enough, round enough and in focus. Failing a rule is ordinary filtering:
//! the region is dropped and the first failed rule is reported for
//! diagnostics.
use crate::focus::{FocusError, FocusEstimator, FocusWindow};
use crate::image::ImageF32;
use crate::types::{Candidate, Region};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// Default focus threshold from the focus-quality literature.
pub const DEFAULT_FOCUS_THRESHOLD: f32 = 0.23;

/// Smallest admissible droplet size.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiameterFloor {
    /// Equivalent-circle diameter in pixels.
    Pixels(f64),
    /// Physical diameter in metres.
    Meters(f64),
}

impl Default for DiameterFloor {
    fn default() -> Self {
        DiameterFloor::Pixels(5.0)
    }
}

impl DiameterFloor {
    /// Floor expressed in metres at `resolution` m/px.
    pub fn in_meters(&self, resolution: f64) -> f64 {
        match *self {
            DiameterFloor::Pixels(px) => px * resolution,
            DiameterFloor::Meters(m) => m,
        }
    }
}

/// Admission thresholds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterOptions {
    /// Inclusive lower circularity bound.
    pub circularity_min: f64,
    /// Inclusive upper circularity bound.
    pub circularity_max: f64,
    /// Candidates must score strictly above this.
    pub focus_threshold: f32,
    pub diameter_floor: DiameterFloor,
    pub focus_window: FocusWindow,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            circularity_min: 0.7,
            circularity_max: 1.5,
            focus_threshold: DEFAULT_FOCUS_THRESHOLD,
            diameter_floor: DiameterFloor::default(),
            focus_window: FocusWindow::default(),
        }
    }
}

/// First rule a region failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    TouchesBorder,
    BelowDiameterFloor,
    CircularityOutOfRange,
    OutOfFocus,
    UndefinedFocus,
}

/// Per-frame filtering outcome.
#[derive(Clone, Debug, Default)]
pub struct CandidateSet {
    pub admitted: Vec<Candidate>,
    /// `(region label, reason)`
    pub rejected: Vec<(u32, RejectReason)>,
}

impl CandidateSet {
    pub fn count(&self, reason: RejectReason) -> usize {
        self.rejected.iter().filter(|(_, r)| *r == reason).count()
    }
}

/// Applies [`FilterOptions`] to the regions of one frame.
#[derive(Clone, Debug)]
pub struct CandidateFilter {
    options: FilterOptions,
    resolution: f64,
}

impl CandidateFilter {
    pub fn new(options: FilterOptions, resolution: f64) -> Self {
        Self {
            options,
            resolution,
        }
    }

    pub fn options(&self) -> &FilterOptions {
        &self.options
    }

    /// Geometry rules: border contact, size floor, circularity range.
    pub fn check_geometry(
        &self,
        candidate: &Candidate,
        width: usize,
        height: usize,
    ) -> Result<(), RejectReason> {
        if candidate.bbox.touches_border(width, height) {
            return Err(RejectReason::TouchesBorder);
        }
        if candidate.diameter < self.options.diameter_floor.in_meters(self.resolution) {
            return Err(RejectReason::BelowDiameterFloor);
        }
        let c = candidate.circularity;
        if !(self.options.circularity_min..=self.options.circularity_max).contains(&c) {
            return Err(RejectReason::CircularityOutOfRange);
        }
        Ok(())
    }

    /// Every admission rule, including focus.
    pub fn check(
        &self,
        candidate: &Candidate,
        width: usize,
        height: usize,
    ) -> Result<(), RejectReason> {
        self.check_geometry(candidate, width, height)?;
        if candidate.focus > self.options.focus_threshold {
            Ok(())
        } else {
            Err(RejectReason::OutOfFocus)
        }
    }

    /// Measure, score and filter every region of `image`.
    ///
    /// Focus is only computed for regions that pass the geometric rules; the
    /// full-frame statistics are computed at most once per call.
    pub fn extract(&self, image: &ImageF32, regions: &[Region]) -> CandidateSet {
        let mut set = CandidateSet::default();
        let mut frame_estimator: Option<Result<FocusEstimator, FocusError>> = None;

        for region in regions {
            let unscored = Candidate::measure(region, self.resolution, 0.0);
            if let Err(reason) = self.check_geometry(&unscored, image.w, image.h) {
                set.rejected.push((region.label, reason));
                continue;
            }

            let focus = match self.options.focus_window {
                FocusWindow::FullFrame => frame_estimator
                    .get_or_insert_with(|| FocusEstimator::new(image))
                    .as_ref()
                    .map_err(Clone::clone)
                    .and_then(|est| est.score(unscored.diameter, self.resolution)),
                FocusWindow::Patch { pad_px } => {
                    FocusEstimator::for_patch(image, &region.bbox, pad_px)
                        .and_then(|est| est.score(unscored.diameter, self.resolution))
                }
            };
            let focus = match focus {
                Ok(f) => f,
                Err(err) => {
                    warn!("region {}: focus undefined, excluded: {err}", region.label);
                    set.rejected.push((region.label, RejectReason::UndefinedFocus));
                    continue;
                }
            };

            let candidate = Candidate { focus, ..unscored };
            match self.check(&candidate, image.w, image.h) {
                Ok(()) => set.admitted.push(candidate),
                Err(reason) => set.rejected.push((region.label, reason)),
            }
        }

        debug!(
            "CandidateFilter::extract regions={} admitted={} rejected={}",
            regions.len(),
            set.admitted.len(),
            set.rejected.len()
        );
        set
    }
}
