//! Sampling-probability correction for tracked droplets.
//!
//! A droplet is only measured if it is inside the depth of field and still in
//! the field of view one frame delay later. Both the effective field of view
//! and the residence per unit time depend on size and velocity:
//!
//! ```text
//! FOV = (W·res − d/2 − v·Δt) · (H·res − d/2)
//! DOF = 0.85·d + 0.00078
//! P   = FOV·DOF / v
//! correction = 1 / P
//! ```
//!
//! `W` is the sensor extent along the flow, `H` across it. Fast droplets
//! have a small `P` and are up-weighted.
use crate::types::ImagingSetup;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Empirical depth-of-field slope (per metre of diameter).
pub const DOF_SLOPE: f64 = 0.85;
/// Empirical depth-of-field offset, metres.
pub const DOF_OFFSET: f64 = 0.00078;

/// Sensor size in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorGeometry {
    /// Pixels along the bulk flow direction.
    pub along_flow_px: u32,
    /// Pixels across the flow.
    pub across_flow_px: u32,
}

impl Default for SensorGeometry {
    fn default() -> Self {
        Self {
            along_flow_px: 1024,
            across_flow_px: 1280,
        }
    }
}

/// Geometrically invalid size/velocity combinations.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum CorrectionError {
    #[error("velocity must be positive, got {velocity} m/s")]
    NonPositiveVelocity { velocity: f64 },
    #[error("effective field of view is not positive ({fov:e} m²)")]
    FieldOfView { fov: f64 },
    #[error("effective depth of field is not positive ({dof:e} m)")]
    DepthOfField { dof: f64 },
}

/// Effective sampling area and depth for one droplet.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SamplingGeometry {
    /// m²
    pub field_of_view: f64,
    /// m
    pub depth_of_field: f64,
}

impl SamplingGeometry {
    pub fn new(
        velocity: f64,
        diameter: f64,
        setup: &ImagingSetup,
    ) -> Result<Self, CorrectionError> {
        let res = setup.resolution;
        let along = setup.sensor.along_flow_px as f64 * res;
        let across = setup.sensor.across_flow_px as f64 * res;
        let radius = diameter / 2.0;

        let along_eff = along - radius - velocity * setup.frame_delay;
        let across_eff = across - radius;
        let field_of_view = along_eff * across_eff;
        // Each side must be positive on its own; two negative sides multiply to a positive area.
        if along_eff.is_nan() || along_eff <= 0.0 || across_eff.is_nan() || across_eff <= 0.0 {
            return Err(CorrectionError::FieldOfView { fov: field_of_view });
        }
        let depth_of_field = DOF_SLOPE * diameter + DOF_OFFSET;
        if depth_of_field.is_nan() || depth_of_field <= 0.0 {
            return Err(CorrectionError::DepthOfField {
                dof: depth_of_field,
            });
        }
        Ok(Self {
            field_of_view,
            depth_of_field,
        })
    }
}

/// `P = FOV·DOF / v`, the volume swept through the measurement region per
/// unit velocity.
pub fn sampling_volume(
    velocity: f64,
    diameter: f64,
    setup: &ImagingSetup,
) -> Result<f64, CorrectionError> {
    if velocity.is_nan() || velocity <= 0.0 {
        return Err(CorrectionError::NonPositiveVelocity { velocity });
    }
    let geom = SamplingGeometry::new(velocity, diameter, setup)?;
    Ok(geom.field_of_view * geom.depth_of_field / velocity)
}

/// Multiplicative volume weight `1 / P`.
pub fn correction_factor(
    velocity: f64,
    diameter: f64,
    setup: &ImagingSetup,
) -> Result<f64, CorrectionError> {
    sampling_volume(velocity, diameter, setup).map(|p| 1.0 / p)
}
