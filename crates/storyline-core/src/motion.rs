//! Inter-frame motion measurement.
//!
//! The motion proxy everywhere in this crate is the **mean absolute
//! difference** (MAD): the per-sample average of absolute pixel-channel
//! differences between two frames. Sampling walks every `stride`-th pixel in
//! each axis and sums over all three RGB channels; dividing by the number of
//! *channel samples* (not the frame pixel count) keeps the result on a 0-255
//! scale regardless of stride.
//!
//! A fixed 3x3 grid partitions each frame for region-level motion. The grid
//! is deliberately coarse: a proxy for "a subject occupies roughly the same
//! part of the frame" that needs no detection model.

use rayon::prelude::*;

use crate::frame::{PixelBuffer, SampledFrame};

/// Default pixel stride for MAD sampling (every 4th pixel in each axis).
pub const DEFAULT_STRIDE: usize = 4;

/// Difference reported for buffers whose dimensions disagree.
///
/// A mid-stream resolution change reads as a hard cut.
pub const MAX_DIFF: f64 = 255.0;

// ============================================================================
// Mean Absolute Difference
// ============================================================================

/// Compute the strided MAD between two full frames.
///
/// Returns a value in `[0, 255]`. Empty buffers difference to 0; mismatched
/// dimensions difference to [`MAX_DIFF`].
#[must_use]
pub fn mean_abs_diff(a: &PixelBuffer, b: &PixelBuffer, stride: usize) -> f64 {
	region_mean_abs_diff(a, b, 0, 0, a.width, a.height, stride)
}

/// Compute the strided MAD restricted to the pixel rectangle
/// `[x0, x1) x [y0, y1)`.
#[must_use]
pub fn region_mean_abs_diff(
	a: &PixelBuffer,
	b: &PixelBuffer,
	x0: u32,
	y0: u32,
	x1: u32,
	y1: u32,
	stride: usize,
) -> f64 {
	if a.width != b.width || a.height != b.height {
		return MAX_DIFF;
	}
	if a.is_empty() || x0 >= x1 || y0 >= y1 {
		return 0.0;
	}

	let stride = stride.max(1) as u32;
	let x1 = x1.min(a.width);
	let y1 = y1.min(a.height);

	let mut sum: u64 = 0;
	let mut samples: u64 = 0;

	let mut y = y0;
	while y < y1 {
		let mut x = x0;
		while x < x1 {
			let idx = a.offset(x, y);
			for c in 0..3 {
				let pa = i32::from(a.data[idx + c]);
				let pb = i32::from(b.data[idx + c]);
				sum += pa.abs_diff(pb) as u64;
			}
			samples += 3;
			x += stride;
		}
		y += stride;
	}

	if samples == 0 {
		return 0.0;
	}
	sum as f64 / samples as f64
}

// ============================================================================
// Motion Profile
// ============================================================================

/// Per-frame MAD series over an ordered frame sequence.
///
/// `profile[0]` is 0 (no predecessor); `profile[i]` is the MAD between frame
/// `i-1` and frame `i`. Pairs are independent, so the map runs in parallel;
/// output order and values are identical to the sequential computation.
#[must_use]
pub fn motion_profile(frames: &[SampledFrame], stride: usize) -> Vec<f64> {
	if frames.is_empty() {
		return Vec::new();
	}

	let mut profile = Vec::with_capacity(frames.len());
	profile.push(0.0);
	profile.par_extend(
		(1..frames.len())
			.into_par_iter()
			.map(|i| mean_abs_diff(&frames[i - 1].pixels, &frames[i].pixels, stride)),
	);
	profile
}

// ============================================================================
// Analysis Grid
// ============================================================================

/// Cells per axis of the analysis grid.
pub const GRID_DIM: usize = 3;

/// Total cell count (`GRID_DIM` squared). Cells are numbered row-major,
/// left-to-right, top-to-bottom; cell 4 is the center.
pub const CELL_COUNT: usize = GRID_DIM * GRID_DIM;

/// Index of the center cell.
pub const CENTER_CELL: usize = 4;

/// Pixel bounds `(x0, y0, x1, y1)` of a grid cell, half-open.
///
/// The right and bottom cells absorb the remainder when the dimensions do
/// not divide evenly.
#[must_use]
pub fn cell_pixel_bounds(cell: usize, width: u32, height: u32) -> (u32, u32, u32, u32) {
	let cell = cell.min(CELL_COUNT - 1);
	let col = (cell % GRID_DIM) as u32;
	let row = (cell / GRID_DIM) as u32;
	let dim = GRID_DIM as u32;

	let x0 = col * width / dim;
	let y0 = row * height / dim;
	let x1 = if col + 1 == dim { width } else { (col + 1) * width / dim };
	let y1 = if row + 1 == dim { height } else { (row + 1) * height / dim };
	(x0, y0, x1, y1)
}

/// Strided MAD between two frames within one grid cell.
#[must_use]
pub fn cell_mean_abs_diff(a: &PixelBuffer, b: &PixelBuffer, cell: usize, stride: usize) -> f64 {
	let (x0, y0, x1, y1) = cell_pixel_bounds(cell, a.width, a.height);
	region_mean_abs_diff(a, b, x0, y0, x1, y1, stride)
}

// ============================================================================
// Tests
// ============================================================================
