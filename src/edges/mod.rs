//! Edge measurements used by the focus estimator.
//!
//! Only gradient magnitude is needed downstream: the focus score ranks
//! magnitudes over a frame and reads the strength expected at a droplet's
//! perimeter.

pub mod grad;

pub use grad::{gradient_magnitudes, sobel_gradients, Grad};
