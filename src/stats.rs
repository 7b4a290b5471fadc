//! Order statistics with named boundary semantics.
//!
//! Every helper states whether it reads ranks (nearest-rank, half-open index
//! windows) or interpolates. Callers pass already sorted slices so a frame is
//! sorted once and queried many times.

use std::cmp::Ordering;

/// Sort in place, largest first. NaNs sort last.
pub fn sort_descending(values: &mut [f32]) {
    values.sort_unstable_by(|a, b| match (a.is_nan(), b.is_nan()) {
        (false, false) => b.total_cmp(a),
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (true, true) => Ordering::Equal,
    });
}

/// Sort in place, smallest first.
pub fn sort_ascending(values: &mut [f32]) {
    values.sort_unstable_by(|a, b| a.total_cmp(b));
}

/// Mean over the half-open rank window `[center - half_width, center + half_width)`
/// clipped to the slice. `None` when the clipped window is empty.
pub fn rank_window_mean(sorted: &[f32], center: usize, half_width: usize) -> Option<f32> {
    let lo = center.saturating_sub(half_width);
    let hi = center.saturating_add(half_width).min(sorted.len());
    mean(sorted.get(lo..hi)?)
}

/// Mean of the values whose ascending rank lies in `[⌊lo·L⌋, ⌊hi·L⌋)`.
///
/// On images too small for the band to contain a pixel, falls back to the
/// nearest-rank value at `⌊lo·L⌋`.
pub fn percentile_band_mean(sorted_asc: &[f32], lo: f64, hi: f64) -> Option<f32> {
    let n = sorted_asc.len();
    if n == 0 {
        return None;
    }
    let a = ((lo.clamp(0.0, 1.0) * n as f64).floor() as usize).min(n - 1);
    let b = ((hi.clamp(0.0, 1.0) * n as f64).floor() as usize).min(n);
    if b > a {
        mean(&sorted_asc[a..b])
    } else {
        Some(sorted_asc[a])
    }
}

/// Mean of the `k` smallest values of an ascending slice.
pub fn lowest_mean(sorted_asc: &[f32], k: usize) -> Option<f32> {
    mean(&sorted_asc[..k.min(sorted_asc.len())])
}

/// Nearest-rank percentile (`q` in `[0, 1]`) of an ascending slice.
pub fn nearest_rank(sorted_asc: &[u8], q: f64) -> Option<u8> {
    let n = sorted_asc.len();
    if n == 0 {
        return None;
    }
    let idx = ((q.clamp(0.0, 1.0) * n as f64).floor() as usize).min(n - 1);
    Some(sorted_asc[idx])
}

fn mean(values: &[f32]) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    let sum: f64 = values.iter().map(|&v| v as f64).sum();
    Some((sum / values.len() as f64) as f32)
}

/// Piecewise-linear interpolation of `fp` over ascending knots `xp` at `x`.
///
/// Below the first knot returns `fp[0]`, above the last returns the last
/// value. Inside, the bracketing pair is the first knot `xp[j] >= x` and its
/// predecessor, so the result is the value at which the curve *first*
/// reaches `x`.
pub fn interp_clamped(x: f64, xp: &[f64], fp: &[f64]) -> Option<f64> {
    let n = xp.len().min(fp.len());
    if n == 0 {
        return None;
    }
    let j = xp[..n].partition_point(|&v| v < x);
    if j == 0 {
        return Some(fp[0]);
    }
    if j == n {
        return Some(fp[n - 1]);
    }
    let (x0, x1) = (xp[j - 1], xp[j]);
    let (f0, f1) = (fp[j - 1], fp[j]);
    let t = (x - x0) / (x1 - x0);
    Some(f0 + t * (f1 - f0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descending_sort_puts_largest_first() {
        let mut v = vec![0.2, 0.9, 0.1, 0.5];
        sort_descending(&mut v);
        assert_eq!(v, vec![0.9, 0.5, 0.2, 0.1]);
    }

    #[test]
    fn rank_window_is_half_open_and_clipped() {
        let v: Vec<f32> = (0..10).map(|i| i as f32).collect();
        // ranks 2..8
        assert_eq!(rank_window_mean(&v, 5, 3), Some(4.5));
        // ranks 0..3
        assert_eq!(rank_window_mean(&v, 0, 3), Some(1.0));
        // ranks 7..10
        assert_eq!(rank_window_mean(&v, 10, 3), Some(8.0));
        assert_eq!(rank_window_mean(&v, 20, 3), None);
    }

    #[test]
    fn percentile_band_reads_upper_middle() {
        let v: Vec<f32> = (0..100).map(|i| i as f32).collect();
        // ranks 80..90
        assert_eq!(percentile_band_mean(&v, 0.8, 0.9), Some(84.5));
        // too small for a band: nearest-rank fallback
        assert_eq!(percentile_band_mean(&[1.0, 2.0, 3.0], 0.8, 0.9), Some(3.0));
        assert_eq!(percentile_band_mean(&[], 0.8, 0.9), None);
    }

    #[test]
    fn lowest_mean_clips_to_length() {
        assert_eq!(lowest_mean(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 5), Some(3.0));
        assert_eq!(lowest_mean(&[2.0, 4.0], 5), Some(3.0));
        assert_eq!(lowest_mean(&[], 5), None);
    }

    #[test]
    fn nearest_rank_uses_floor_index() {
        let v = [10u8, 20, 30, 40, 50];
        assert_eq!(nearest_rank(&v, 0.8), Some(50));
        assert_eq!(nearest_rank(&v, 0.5), Some(30));
        assert_eq!(nearest_rank(&[], 0.5), None);
    }

    #[test]
    fn interp_is_linear_between_knots_and_clamped_outside() {
        let xp = [10.0, 40.0, 100.0];
        let fp = [1.0, 2.0, 3.0];
        assert_eq!(interp_clamped(5.0, &xp, &fp), Some(1.0));
        assert_eq!(interp_clamped(25.0, &xp, &fp), Some(1.5));
        assert_eq!(interp_clamped(40.0, &xp, &fp), Some(2.0));
        assert_eq!(interp_clamped(70.0, &xp, &fp), Some(2.5));
        assert_eq!(interp_clamped(150.0, &xp, &fp), Some(3.0));
        assert_eq!(interp_clamped(1.0, &[], &[]), None);
    }
}
