//! Volume-weighted droplet size distribution.
//!
//! Droplets are weighted by their sphere-equivalent volume, optionally
//! multiplied by the sampling correction factor, then sorted by diameter.
//! `Dv_X` is the diameter at which the cumulative weighted volume first
//! reaches `X %`, interpolated linearly between the bracketing droplets.
//!
//! Tracked droplets from all frame pairs are collected in a
//! [`DropletAccumulator`], a mutex-guarded append-only buffer, before the
//! aggregator runs once over the whole sequence.
use crate::correction::correction_factor;
use crate::stats::interp_clamped;
use crate::types::{sphere_volume, ImagingSetup, RejectedDroplet, TrackedDroplet};
use log::{debug, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

const M_TO_UM: f64 = 1e6;

/// How droplet volumes are weighted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Weighting {
    /// Volume × sampling correction factor.
    #[default]
    Corrected,
    /// Plain volume.
    Raw,
}

/// Percentile statistics of a non-empty population.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributionSummary {
    pub dv10_um: f64,
    pub dv50_um: f64,
    pub dv90_um: f64,
    /// `(Dv90 - Dv10) / Dv50`
    pub span: f64,
    /// Droplets contributing to the statistics.
    pub count: usize,
    /// Droplets dropped because their correction was undefined.
    pub excluded: usize,
    /// Sum of sphere volumes of the contributing droplets, m³.
    pub raw_volume: f64,
    /// Sum of weighted volumes.
    pub corrected_volume: f64,
}

/// Result of an aggregation; `Empty` when no droplet could contribute.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Distribution {
    Empty { excluded: usize },
    Computed(DistributionSummary),
}

impl Distribution {
    pub fn summary(&self) -> Option<&DistributionSummary> {
        match self {
            Distribution::Computed(s) => Some(s),
            Distribution::Empty { .. } => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Distribution::Empty { .. })
    }

    pub fn count(&self) -> usize {
        self.summary().map_or(0, |s| s.count)
    }
}

/// Volume-weighted density histogram over diameter.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeHistogram {
    /// `bins + 1` ascending edges, µm.
    pub edges_um: Vec<f64>,
    /// Weighted volume per unit diameter, normalized to unit area.
    pub density: Vec<f64>,
}

#[derive(Clone, Copy, Debug)]
struct Weighted {
    diameter_um: f64,
    raw: f64,
    weight: f64,
}

/// Folds tracked droplets into a [`Distribution`].
#[derive(Clone, Debug)]
pub struct DistributionAggregator {
    setup: ImagingSetup,
    weighting: Weighting,
}

impl DistributionAggregator {
    pub fn new(setup: ImagingSetup, weighting: Weighting) -> Self {
        Self { setup, weighting }
    }

    /// Weight each droplet, dropping those whose correction is undefined.
    fn weigh(&self, droplets: &[TrackedDroplet]) -> (Vec<Weighted>, usize) {
        let mut out = Vec::with_capacity(droplets.len());
        let mut excluded = 0usize;
        for d in droplets {
            let raw = sphere_volume(d.diameter);
            let factor = match self.weighting {
                Weighting::Raw => 1.0,
                Weighting::Corrected => {
                    match correction_factor(d.velocity, d.diameter, &self.setup) {
                        Ok(f) => f,
                        Err(err) => {
                            warn!(
                                "droplet in {} (d={:.1} µm, v={:.2} m/s) excluded: {err}",
                                d.image,
                                d.diameter * M_TO_UM,
                                d.velocity
                            );
                            excluded += 1;
                            continue;
                        }
                    }
                }
            };
            out.push(Weighted {
                diameter_um: d.diameter * M_TO_UM,
                raw,
                weight: raw * factor,
            });
        }
        out.sort_by(|a, b| a.diameter_um.total_cmp(&b.diameter_um));
        (out, excluded)
    }

    pub fn aggregate(&self, droplets: &[TrackedDroplet]) -> Distribution {
        let (weighted, excluded) = self.weigh(droplets);
        let total: f64 = weighted.iter().map(|w| w.weight).sum();
        if weighted.is_empty() || !(total.is_finite() && total > 0.0) {
            debug!("DistributionAggregator::aggregate empty (excluded={excluded})");
            return Distribution::Empty { excluded };
        }

        let diameters: Vec<f64> = weighted.iter().map(|w| w.diameter_um).collect();
        let mut running = 0.0;
        let cumulative_pct: Vec<f64> = weighted
            .iter()
            .map(|w| {
                running += w.weight;
                100.0 * running / total
            })
            .collect();

        let dv = |pct: f64| interp_clamped(pct, &cumulative_pct, &diameters).unwrap_or(0.0);
        let (dv10_um, dv50_um, dv90_um) = (dv(10.0), dv(50.0), dv(90.0));
        let span = if dv50_um > 0.0 {
            (dv90_um - dv10_um) / dv50_um
        } else {
            0.0
        };

        let summary = DistributionSummary {
            dv10_um,
            dv50_um,
            dv90_um,
            span,
            count: weighted.len(),
            excluded,
            raw_volume: weighted.iter().map(|w| w.raw).sum(),
            corrected_volume: total,
        };
        debug!(
            "DistributionAggregator::aggregate n={} Dv10={:.1} Dv50={:.1} Dv90={:.1} span={:.3}",
            summary.count, summary.dv10_um, summary.dv50_um, summary.dv90_um, summary.span
        );
        Distribution::Computed(summary)
    }

    /// Density histogram of weighted volume over `bins` equal-width diameter
    /// bins spanning the observed range. `None` for an empty population.
    pub fn volume_histogram(
        &self,
        droplets: &[TrackedDroplet],
        bins: usize,
    ) -> Option<VolumeHistogram> {
        let (weighted, _) = self.weigh(droplets);
        let bins = bins.max(1);
        let lo = weighted.first()?.diameter_um;
        let hi = weighted.last()?.diameter_um;
        let (lo, hi) = if hi > lo { (lo, hi) } else { (lo - 0.5, hi + 0.5) };
        let width = (hi - lo) / bins as f64;

        let mut mass = vec![0.0; bins];
        for w in &weighted {
            let idx = (((w.diameter_um - lo) / width) as usize).min(bins - 1);
            mass[idx] += w.weight;
        }
        let total: f64 = mass.iter().sum();
        if !(total.is_finite() && total > 0.0) {
            return None;
        }
        Some(VolumeHistogram {
            edges_um: (0..=bins).map(|i| lo + width * i as f64).collect(),
            density: mass.iter().map(|m| m / (total * width)).collect(),
        })
    }
}

#[derive(Debug, Default)]
struct Collected {
    tracked: Vec<TrackedDroplet>,
    rejected: Vec<RejectedDroplet>,
}

/// Append-only store of per-pair tracking output shared by frame workers.
///
/// Each append takes the lock once, so a pair's tracked and rejected lists
/// land together.
#[derive(Debug, Default)]
pub struct DropletAccumulator {
    inner: Mutex<Collected>,
}

impl DropletAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, tracked: Vec<TrackedDroplet>, rejected: Vec<RejectedDroplet>) {
        let mut guard = self.inner.lock();
        guard.tracked.extend(tracked);
        guard.rejected.extend(rejected);
    }

    pub fn tracked_len(&self) -> usize {
        self.inner.lock().tracked.len()
    }

    pub fn rejected_len(&self) -> usize {
        self.inner.lock().rejected.len()
    }

    /// Consume the accumulator, returning `(tracked, rejected)`.
    pub fn into_parts(self) -> (Vec<TrackedDroplet>, Vec<RejectedDroplet>) {
        let collected = self.inner.into_inner();
        (collected.tracked, collected.rejected)
    }
}
