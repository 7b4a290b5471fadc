//! Records exchanged between the measurement stages.
//!
//! Centroids are `[row, col]` in pixels, diameters in metres, velocities in
//! m/s. Everything here is immutable once produced and serializable for
//! reporting tools.
use crate::correction::SensorGeometry;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Pixel bounding box with exclusive upper bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_row: usize,
    pub min_col: usize,
    pub max_row: usize,
    pub max_col: usize,
}

impl BoundingBox {
    /// True when the box is flush with any edge of a `width × height` frame.
    pub fn touches_border(&self, width: usize, height: usize) -> bool {
        self.min_row == 0 || self.min_col == 0 || self.max_row >= height || self.max_col >= width
    }
}

/// One connected foreground component reported by segmentation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub label: u32,
    /// `[row, col]` in pixels.
    pub centroid: [f64; 2],
    /// Pixel count.
    pub area: f64,
    /// Boundary length in pixels.
    pub perimeter: f64,
    pub bbox: BoundingBox,
}

impl Region {
    /// Ideal disk of `radius` pixels centred at `centroid`.
    pub fn disk(label: u32, centroid: [f64; 2], radius: f64) -> Self {
        let r = radius.max(0.0);
        let bbox = BoundingBox {
            min_row: (centroid[0] - r).floor().max(0.0) as usize,
            min_col: (centroid[1] - r).floor().max(0.0) as usize,
            max_row: (centroid[0] + r).ceil().max(0.0) as usize + 1,
            max_col: (centroid[1] + r).ceil().max(0.0) as usize + 1,
        };
        Self {
            label,
            centroid,
            area: PI * r * r,
            perimeter: 2.0 * PI * r,
            bbox,
        }
    }

    /// Diameter of the circle with the same area, in pixels.
    #[inline]
    pub fn equivalent_diameter_px(&self) -> f64 {
        2.0 * (self.area.max(0.0) / PI).sqrt()
    }

    /// `4π·area / perimeter²`; zero for a degenerate perimeter.
    #[inline]
    pub fn circularity(&self) -> f64 {
        if self.perimeter > 0.0 {
            4.0 * PI * self.area / (self.perimeter * self.perimeter)
        } else {
            0.0
        }
    }
}

/// Fixed acquisition parameters shared by tracking and correction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImagingSetup {
    /// Metres per pixel.
    pub resolution: f64,
    /// Time between the two exposures of a pair, seconds.
    pub frame_delay: f64,
    #[serde(default)]
    pub sensor: SensorGeometry,
}

impl Default for ImagingSetup {
    fn default() -> Self {
        Self {
            resolution: 9.86e-6,
            frame_delay: 1e-4,
            sensor: SensorGeometry::default(),
        }
    }
}

impl ImagingSetup {
    pub fn is_valid(&self) -> bool {
        self.resolution.is_finite()
            && self.resolution > 0.0
            && self.frame_delay.is_finite()
            && self.frame_delay > 0.0
    }
}

/// A region measured in physical units and scored for focus.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub label: u32,
    pub centroid: [f64; 2],
    /// Equivalent-circle diameter, metres.
    pub diameter: f64,
    pub circularity: f64,
    pub focus: f32,
    pub bbox: BoundingBox,
}

impl Candidate {
    /// Measure `region` at `resolution` m/px. Diameter and circularity come
    /// from the same region the focus score was computed for.
    pub fn measure(region: &Region, resolution: f64, focus: f32) -> Self {
        Self {
            label: region.label,
            centroid: region.centroid,
            diameter: region.equivalent_diameter_px() * resolution,
            circularity: region.circularity(),
            focus,
            bbox: region.bbox,
        }
    }
}

/// Volume of a sphere of diameter `d`.
#[inline]
pub fn sphere_volume(diameter: f64) -> f64 {
    PI / 6.0 * diameter * diameter * diameter
}

/// A droplet matched between two consecutive frames.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedDroplet {
    /// Frame-1 diameter, metres.
    pub diameter: f64,
    /// `|d1 - d2| / d1` of the accepted match.
    pub diameter_difference: f64,
    /// Sphere-equivalent volume of `diameter`, m³.
    pub volume: f64,
    /// Pixels travelled between the frames.
    pub displacement: f64,
    /// m/s
    pub velocity: f64,
    /// `[frame-1, frame-2]` centroids.
    pub centroids: [[f64; 2]; 2],
    pub image: String,
    pub focus: f32,
}

/// A frame-1 candidate without an acceptable partner in frame 2.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectedDroplet {
    pub diameter: f64,
    pub centroid: [f64; 2],
    pub image: String,
    pub focus: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disk_region_is_circular() {
        let r = Region::disk(3, [50.0, 60.0], 10.0);
        assert!((r.circularity() - 1.0).abs() < 1e-12);
        assert!((r.equivalent_diameter_px() - 20.0).abs() < 1e-9);
        assert_eq!(r.bbox.min_row, 40);
        assert_eq!(r.bbox.max_col, 71);
    }

    #[test]
    fn zero_perimeter_has_zero_circularity() {
        let mut r = Region::disk(1, [5.0, 5.0], 2.0);
        r.perimeter = 0.0;
        assert_eq!(r.circularity(), 0.0);
    }

    #[test]
    fn border_contact_checks_every_edge() {
        let inside = BoundingBox {
            min_row: 1,
            min_col: 1,
            max_row: 9,
            max_col: 19,
        };
        assert!(!inside.touches_border(20, 10));
        assert!(BoundingBox { min_row: 0, ..inside }.touches_border(20, 10));
        assert!(BoundingBox { min_col: 0, ..inside }.touches_border(20, 10));
        assert!(BoundingBox { max_row: 10, ..inside }.touches_border(20, 10));
        assert!(BoundingBox { max_col: 20, ..inside }.touches_border(20, 10));
    }

    #[test]
    fn candidate_uses_region_geometry() {
        let region = Region::disk(7, [30.0, 40.0], 5.0);
        let c = Candidate::measure(&region, 1e-5, 0.4);
        assert!((c.diameter - 1e-4).abs() < 1e-12);
        assert_eq!(c.label, 7);
        assert_eq!(c.centroid, [30.0, 40.0]);
    }

    #[test]
    fn sphere_volume_of_unit_diameter() {
        assert!((sphere_volume(1.0) - PI / 6.0).abs() < 1e-15);
    }
}
