//! Focus-quality score of a droplet following Lecuona et al. (2000).
//!
//! The score compares the gradient a droplet's boundary would produce with
//! the intensity step between droplet and background:
//!
//! 1. Gradient magnitudes of the whole image are ranked largest first. A
//!    droplet of diameter `d` has about `n = π·d/resolution` boundary pixels,
//!    so the mean magnitude over ranks `[n-3, n+3)` approximates its edge
//!    strength independently of absolute contrast.
//! 2. Background intensity is the mean of the 80th–90th percentile band of
//!    all pixel intensities (backlit frames are dominated by background).
//! 3. Particle intensity is the mean of the five darkest pixels.
//! 4. `score = edge_strength / |particle - background|`.
//!
//! Everything except step 1's rank depends on the image only, so a
//! [`FocusEstimator`] is built once per frame (or patch) and then queried
//! for every candidate diameter.
use crate::edges::gradient_magnitudes;
use crate::image::{ImageF32, ImageView};
use crate::stats::{
    lowest_mean, percentile_band_mean, rank_window_mean, sort_ascending, sort_descending,
};
use crate::types::BoundingBox;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use thiserror::Error;

/// Half width of the rank window averaged around the expected perimeter rank.
pub const EDGE_RANK_HALF_WINDOW: usize = 3;
/// Percentile band used as background intensity.
pub const BACKGROUND_BAND: (f64, f64) = (0.80, 0.90);
/// Number of darkest pixels averaged as particle intensity.
pub const PARTICLE_PIXELS: usize = 5;

/// Reasons a focus score cannot be computed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FocusError {
    #[error("image has no pixels")]
    EmptyImage,
    #[error("particle and background intensity are equal ({intensity:.4}); focus is undefined")]
    ZeroContrast { intensity: f32 },
    #[error("expected perimeter rank {rank} lies outside the {pixels} ranked gradients")]
    EdgeRankOutOfRange { rank: usize, pixels: usize },
    #[error("invalid droplet geometry: diameter={diameter:e} m, resolution={resolution:e} m/px")]
    InvalidGeometry { diameter: f64, resolution: f64 },
}

/// Which pixels a focus score is computed over.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FocusWindow {
    /// Rank over the whole frame; one estimator serves every candidate.
    #[default]
    FullFrame,
    /// Rank over the region's bounding box grown by `pad_px` on each side.
    Patch { pad_px: usize },
}

/// Per-image statistics from which focus scores are read.
#[derive(Clone, Debug)]
pub struct FocusEstimator {
    gradients_desc: Vec<f32>,
    background: f32,
    particle: f32,
}

impl FocusEstimator {
    /// Rank gradients and intensities of `image`.
    pub fn new(image: &ImageF32) -> Result<Self, FocusError> {
        if image.is_empty() {
            return Err(FocusError::EmptyImage);
        }
        let mut gradients_desc = gradient_magnitudes(image);
        sort_descending(&mut gradients_desc);

        let mut intensities = image.to_vec();
        sort_ascending(&mut intensities);
        let background = percentile_band_mean(&intensities, BACKGROUND_BAND.0, BACKGROUND_BAND.1)
            .ok_or(FocusError::EmptyImage)?;
        let particle =
            lowest_mean(&intensities, PARTICLE_PIXELS).ok_or(FocusError::EmptyImage)?;

        Ok(Self {
            gradients_desc,
            background,
            particle,
        })
    }

    /// Estimator restricted to `bbox` padded by `pad` pixels.
    pub fn for_patch(image: &ImageF32, bbox: &BoundingBox, pad: usize) -> Result<Self, FocusError> {
        Self::new(&image.crop(bbox, pad))
    }

    pub fn background_intensity(&self) -> f32 {
        self.background
    }

    pub fn particle_intensity(&self) -> f32 {
        self.particle
    }

    /// `|particle - background|`
    pub fn contrast(&self) -> f32 {
        (self.particle - self.background).abs()
    }

    /// Mean gradient magnitude around the rank a droplet perimeter would occupy.
    pub fn edge_strength(&self, diameter: f64, resolution: f64) -> Result<f32, FocusError> {
        if !(diameter.is_finite() && resolution.is_finite() && diameter > 0.0 && resolution > 0.0)
        {
            return Err(FocusError::InvalidGeometry {
                diameter,
                resolution,
            });
        }
        let perimeter_px = PI * diameter / resolution;
        let rank = perimeter_px.round() as usize;
        rank_window_mean(&self.gradients_desc, rank, EDGE_RANK_HALF_WINDOW).ok_or(
            FocusError::EdgeRankOutOfRange {
                rank,
                pixels: self.gradients_desc.len(),
            },
        )
    }

    /// Dimensionless focus score; larger is sharper.
    pub fn score(&self, diameter: f64, resolution: f64) -> Result<f32, FocusError> {
        let edge = self.edge_strength(diameter, resolution)?;
        let contrast = self.contrast();
        if contrast.is_nan() || contrast <= 0.0 {
            return Err(FocusError::ZeroContrast {
                intensity: self.background,
            });
        }
        Ok(edge / contrast)
    }
}

/// One-shot focus score of `image` for a droplet of `diameter` metres.
pub fn focus_score(image: &ImageF32, diameter: f64, resolution: f64) -> Result<f32, FocusError> {
    FocusEstimator::new(image)?.score(diameter, resolution)
}
