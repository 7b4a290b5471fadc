use droplet_sizing::types::Region;

pub const BACKGROUND: u8 = 204;
pub const DROPLET: u8 = 38;

/// Dark disk on the backlit background, `[row, col]` centre in pixels.
#[derive(Clone, Copy, Debug)]
pub struct SyntheticDroplet {
    pub centroid: [f64; 2],
    pub radius: f64,
    /// Width of the linear rim ramp in pixels; 0 draws a hard edge.
    pub blur: f64,
}

impl SyntheticDroplet {
    pub fn sharp(row: f64, col: f64, radius: f64) -> Self {
        Self {
            centroid: [row, col],
            radius,
            blur: 0.0,
        }
    }

    pub fn blurred(row: f64, col: f64, radius: f64, blur: f64) -> Self {
        Self {
            centroid: [row, col],
            radius,
            blur,
        }
    }

    /// Transmission in `[0, 1]` at pixel `(row, col)`: 0 inside, 1 outside.
    fn transmission(&self, row: usize, col: usize) -> f64 {
        let dr = row as f64 + 0.5 - self.centroid[0];
        let dc = col as f64 + 0.5 - self.centroid[1];
        let r = (dr * dr + dc * dc).sqrt();
        if self.blur <= 0.0 {
            if r <= self.radius {
                0.0
            } else {
                1.0
            }
        } else {
            ((r - self.radius) / self.blur + 0.5).clamp(0.0, 1.0)
        }
    }

    /// Region a segmentation stage would report for this droplet.
    pub fn region(&self, label: u32) -> Region {
        Region::disk(label, self.centroid, self.radius)
    }
}

/// Renders droplets over a uniform background.
pub fn droplet_frame_u8(width: usize, height: usize, droplets: &[SyntheticDroplet]) -> Vec<u8> {
    droplet_frame_lit(width, height, droplets, |_, _| BACKGROUND as f64)
}

/// Renders droplets over a background whose brightness is `light(row, col)`.
pub fn droplet_frame_lit(
    width: usize,
    height: usize,
    droplets: &[SyntheticDroplet],
    light: impl Fn(usize, usize) -> f64,
) -> Vec<u8> {
    assert!(width > 0 && height > 0, "image dimensions must be positive");
    let shadow = DROPLET as f64 / BACKGROUND as f64;
    let mut img = vec![0u8; width * height];
    for y in 0..height {
        for x in 0..width {
            let t = droplets
                .iter()
                .map(|d| d.transmission(y, x))
                .fold(1.0f64, f64::min);
            let level = light(y, x) * (shadow + (1.0 - shadow) * t);
            img[y * width + x] = level.round().clamp(0.0, 255.0) as u8;
        }
    }
    img
}
