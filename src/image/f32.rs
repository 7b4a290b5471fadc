//! Owned single-channel f32 image in row-major layout (stride == width).
//!
//! Intensities are kept in `[0, 1]` when converted from 8-bit frames. All
//! focus and gradient computations run on this type.
use super::traits::{ImageView, ImageViewMut};
use super::u8::ImageU8;
use crate::types::BoundingBox;

#[derive(Clone, Debug)]
pub struct ImageF32 {
    /// Image width in pixels
    pub w: usize,
    /// Image height in pixels
    pub h: usize,
    /// Number of f32 elements between consecutive rows (equals `w`)
    pub stride: usize,
    /// Backing storage in row-major order
    pub data: Vec<f32>,
}

impl ImageF32 {
    /// Construct a zero-initialized buffer of size `w × h`.
    pub fn new(w: usize, h: usize) -> Self {
        Self {
            w,
            h,
            stride: w,
            data: vec![0.0; w * h],
        }
    }

    /// Convert an 8-bit view, scaling intensities to `[0, 1]`.
    pub fn from_u8(gray: &ImageU8<'_>) -> Self {
        let mut out = Self::new(gray.w, gray.h);
        for y in 0..gray.h {
            let src = gray.row(y);
            let dst = out.row_mut(y);
            for (d, &s) in dst.iter_mut().zip(src) {
                *d = s as f32 / 255.0;
            }
        }
        out
    }

    #[inline]
    /// Convert (x, y) to a linear index into `data`.
    pub fn idx(&self, x: usize, y: usize) -> usize {
        y * self.stride + x
    }
    #[inline]
    /// Get the pixel value at (x, y).
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.data[self.idx(x, y)]
    }
    #[inline]
    /// Set the pixel value at (x, y).
    pub fn set(&mut self, x: usize, y: usize, v: f32) {
        let i = self.idx(x, y);
        self.data[i] = v;
    }

    /// Copy the pixels inside `bbox` grown by `pad` pixels on every side,
    /// clipped to the image.
    pub fn crop(&self, bbox: &BoundingBox, pad: usize) -> ImageF32 {
        let r0 = bbox.min_row.saturating_sub(pad).min(self.h);
        let c0 = bbox.min_col.saturating_sub(pad).min(self.w);
        let r1 = (bbox.max_row + pad).min(self.h).max(r0);
        let c1 = (bbox.max_col + pad).min(self.w).max(c0);
        let mut out = ImageF32::new(c1 - c0, r1 - r0);
        for (dst_y, y) in (r0..r1).enumerate() {
            out.row_mut(dst_y).copy_from_slice(&self.row(y)[c0..c1]);
        }
        out
    }
}

impl ImageView for ImageF32 {
    type Pixel = f32;

    #[inline]
    fn width(&self) -> usize {
        self.w
    }
    #[inline]
    fn height(&self) -> usize {
        self.h
    }
    #[inline]
    fn stride(&self) -> usize {
        self.stride
    }
    #[inline]
    fn row(&self, y: usize) -> &[f32] {
        let start = y * self.stride;
        &self.data[start..start + self.w]
    }
    #[inline]
    fn as_slice(&self) -> Option<&[f32]> {
        (self.stride == self.w).then_some(&self.data[..self.w * self.h])
    }
}

impl ImageViewMut for ImageF32 {
    #[inline]
    fn row_mut(&mut self, y: usize) -> &mut [f32] {
        let start = y * self.stride;
        let end = start + self.w;
        &mut self.data[start..end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_u8_scales_to_unit_range() {
        let data = [0u8, 255, 51, 102];
        let view = ImageU8 {
            w: 2,
            h: 2,
            stride: 2,
            data: &data,
        };
        let img = ImageF32::from_u8(&view);
        assert_eq!(img.get(0, 0), 0.0);
        assert_eq!(img.get(1, 0), 1.0);
        assert!((img.get(0, 1) - 0.2).abs() < 1e-6);
    }

    #[test]
    fn crop_clips_padding_to_image() {
        let mut img = ImageF32::new(10, 8);
        for y in 0..8 {
            for x in 0..10 {
                img.set(x, y, (y * 10 + x) as f32);
            }
        }
        let bbox = BoundingBox {
            min_row: 1,
            min_col: 2,
            max_row: 3,
            max_col: 5,
        };
        let patch = img.crop(&bbox, 2);
        assert_eq!((patch.w, patch.h), (7, 5));
        assert_eq!(patch.get(0, 0), 0.0);
        assert_eq!(patch.get(6, 4), 46.0);
    }
}
