use crate::candidate::{CandidateSet, RejectReason};
use serde::Serialize;

/// How many regions each filter rule removed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectCounts {
    pub touches_border: usize,
    pub below_diameter_floor: usize,
    pub circularity_out_of_range: usize,
    pub out_of_focus: usize,
    pub undefined_focus: usize,
}

impl RejectCounts {
    pub fn from_set(set: &CandidateSet) -> Self {
        let mut counts = Self::default();
        for (_, reason) in &set.rejected {
            let slot = match reason {
                RejectReason::TouchesBorder => &mut counts.touches_border,
                RejectReason::BelowDiameterFloor => &mut counts.below_diameter_floor,
                RejectReason::CircularityOutOfRange => &mut counts.circularity_out_of_range,
                RejectReason::OutOfFocus => &mut counts.out_of_focus,
                RejectReason::UndefinedFocus => &mut counts.undefined_focus,
            };
            *slot += 1;
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.touches_border
            + self.below_diameter_floor
            + self.circularity_out_of_range
            + self.out_of_focus
            + self.undefined_focus
    }
}

/// Candidate extraction outcome of a single frame.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameReport {
    pub image: String,
    pub regions: usize,
    pub admitted: usize,
    pub rejected: RejectCounts,
    pub elapsed_ms: f64,
}

/// Tracking outcome of one consecutive frame pair.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PairReport {
    pub first: String,
    pub second: String,
    pub tracked: usize,
    pub rejected: usize,
    pub elapsed_ms: f64,
}

/// A frame or pair that could not be processed.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedFrame {
    pub index: usize,
    pub reason: String,
}
