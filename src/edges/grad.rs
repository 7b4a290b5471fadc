//! Sobel image gradients with border replication.
//!
//! - Convolves the 3×3 Sobel pair with clamped (replicated) borders.
//! - Divides both derivatives by the kernel weight 8, so a linear ramp of
//!   slope `s` intensity/pixel yields a magnitude of exactly `s`. Edge
//!   strength is therefore expressed in the same unit as the intensities,
//!   which keeps the focus score a pure ratio.
//!
//! Complexity: O(W·H); memory: three float buffers.
use crate::image::{ImageF32, ImageView, ImageViewMut};

type Kernel3 = [[f32; 3]; 3];

const SOBEL_KERNEL_X: Kernel3 = [[-1.0, 0.0, 1.0], [-2.0, 0.0, 2.0], [-1.0, 0.0, 1.0]];
const SOBEL_KERNEL_Y: Kernel3 = [[-1.0, -2.0, -1.0], [0.0, 0.0, 0.0], [1.0, 2.0, 1.0]];
const SOBEL_NORM: f32 = 1.0 / 8.0;

/// Per-pixel gradient buffers.
#[derive(Clone, Debug)]
pub struct Grad {
    /// Horizontal derivative (normalized Sobel X)
    pub gx: ImageF32,
    /// Vertical derivative (normalized Sobel Y)
    pub gy: ImageF32,
    /// Euclidean magnitude per pixel: `sqrt(gx^2 + gy^2)`
    pub mag: ImageF32,
}

/// Compute normalized Sobel gradients on a single-channel float image.
pub fn sobel_gradients(l: &ImageF32) -> Grad {
    let w = l.w;
    let h = l.h;
    let mut gx = ImageF32::new(w, h);
    let mut gy = ImageF32::new(w, h);
    let mut mag = ImageF32::new(w, h);

    if w == 0 || h == 0 {
        return Grad { gx, gy, mag };
    }

    for y in 0..h {
        let y_idx = [y.saturating_sub(1), y, (y + 1).min(h - 1)];
        let rows = [l.row(y_idx[0]), l.row(y_idx[1]), l.row(y_idx[2])];
        let out_gx = gx.row_mut(y);
        let out_gy = gy.row_mut(y);
        let out_mag = mag.row_mut(y);
        for x in 0..w {
            let x_idx = [x.saturating_sub(1), x, (x + 1).min(w - 1)];

            let mut sum_x = 0.0;
            let mut sum_y = 0.0;
            for (ky, yy_row) in rows.iter().enumerate() {
                let kx_row = &SOBEL_KERNEL_X[ky];
                let ky_row = &SOBEL_KERNEL_Y[ky];
                sum_x += yy_row[x_idx[0]] * kx_row[0]
                    + yy_row[x_idx[1]] * kx_row[1]
                    + yy_row[x_idx[2]] * kx_row[2];
                sum_y += yy_row[x_idx[0]] * ky_row[0]
                    + yy_row[x_idx[1]] * ky_row[1]
                    + yy_row[x_idx[2]] * ky_row[2];
            }

            let sx = sum_x * SOBEL_NORM;
            let sy = sum_y * SOBEL_NORM;
            out_gx[x] = sx;
            out_gy[x] = sy;
            out_mag[x] = (sx * sx + sy * sy).sqrt();
        }
    }

    Grad { gx, gy, mag }
}

/// Gradient magnitude only, flattened in row-major order.
pub fn gradient_magnitudes(l: &ImageF32) -> Vec<f32> {
    sobel_gradients(l).mag.to_vec()
}
