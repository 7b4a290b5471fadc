//! Background estimation and flat-field normalization of backlit frames.
//!
//! Droplets are transient and dark, so at every pixel the upper part of the
//! temporal intensity distribution over a stack of frames is background.
//! The composite background takes the nearest-rank 80th percentile per
//! pixel; a frame is then normalized as `255 · frame / background`, which
//! removes illumination non-uniformity before focus scoring.
use crate::image::{GrayImageU8, ImageU8, ImageView};
use crate::stats::nearest_rank;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackgroundError {
    #[error("no frames supplied for background estimation")]
    NoFrames,
    #[error("frame {index} is {actual:?}, expected {expected:?}")]
    DimensionMismatch {
        index: usize,
        expected: (usize, usize),
        actual: (usize, usize),
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackgroundOptions {
    /// Number of leading frames of the sequence used for the composite.
    pub frame_count: usize,
    /// Per-pixel temporal percentile in `[0, 1]`.
    pub percentile: f64,
}

impl Default for BackgroundOptions {
    fn default() -> Self {
        Self {
            frame_count: 25,
            percentile: 0.8,
        }
    }
}

/// Per-pixel nearest-rank `percentile` over `frames`.
pub fn composite_background(
    frames: &[ImageU8<'_>],
    percentile: f64,
) -> Result<GrayImageU8, BackgroundError> {
    let first = frames.first().ok_or(BackgroundError::NoFrames)?;
    let expected = first.dims();
    for (index, f) in frames.iter().enumerate() {
        if f.dims() != expected {
            return Err(BackgroundError::DimensionMismatch {
                index,
                expected,
                actual: f.dims(),
            });
        }
    }

    let (w, h) = expected;
    let mut out = Vec::with_capacity(w * h);
    let mut stack = vec![0u8; frames.len()];
    for y in 0..h {
        let rows: Vec<&[u8]> = frames.iter().map(|f| f.row(y)).collect();
        for x in 0..w {
            for (slot, row) in stack.iter_mut().zip(&rows) {
                *slot = row[x];
            }
            stack.sort_unstable();
            out.push(nearest_rank(&stack, percentile).unwrap_or(0));
        }
    }
    Ok(GrayImageU8::from_filled(w, h, out))
}

/// `clip(255 · frame / background)`, truncated to 8 bits. A zero background
/// pixel yields zero.
pub fn normalize_frame(
    frame: &ImageU8<'_>,
    background: &ImageU8<'_>,
) -> Result<GrayImageU8, BackgroundError> {
    if frame.dims() != background.dims() {
        return Err(BackgroundError::DimensionMismatch {
            index: 0,
            expected: background.dims(),
            actual: frame.dims(),
        });
    }
    let mut out = Vec::with_capacity(frame.pixel_count());
    for (src, bg) in frame.rows().zip(background.rows()) {
        out.extend(src.iter().zip(bg).map(|(&p, &b)| {
            if b == 0 {
                0
            } else {
                (255.0 * p as f32 / b as f32).clamp(0.0, 255.0) as u8
            }
        }));
    }
    Ok(GrayImageU8::from_filled(frame.w, frame.h, out))
}
