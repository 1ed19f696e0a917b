//! Frame and metadata types shared by every analysis stage.
//!
//! The ordered sequence of [`SampledFrame`]s is the single source of truth
//! for segmentation, tracking, and moment detection. Frames are created once
//! by the sampler and never mutated afterward; downstream stages only ever
//! borrow them.

use serde::{Deserialize, Serialize};

// ============================================================================
// Pixel Buffer
// ============================================================================

/// Bytes per pixel in an analysis buffer (packed RGB).
pub const CHANNELS: usize = 3;

/// A downscaled RGB8 raster at analysis resolution.
///
/// All motion math operates on this reduced buffer, never on the source
/// resolution. Data is tightly packed, row-major, 3 bytes per pixel; the
/// sampler guarantees `data.len() == width * height * 3`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelBuffer {
	/// Width in pixels
	pub width: u32,

	/// Height in pixels
	pub height: u32,

	/// Packed RGB bytes, row-major
	pub data: Vec<u8>,
}

impl PixelBuffer {
	/// Create a buffer from packed RGB bytes.
	///
	/// Returns `None` when the byte length does not match the dimensions.
	#[must_use]
	pub fn new(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
		if data.len() != width as usize * height as usize * CHANNELS {
			return None;
		}
		Some(Self {
			width,
			height,
			data,
		})
	}

	/// Create a buffer filled with a single color.
	#[must_use]
	pub fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Self {
		let pixels = width as usize * height as usize;
		let mut data = Vec::with_capacity(pixels * CHANNELS);
		for _ in 0..pixels {
			data.extend_from_slice(&rgb);
		}
		Self {
			width,
			height,
			data,
		}
	}

	/// Byte offset of the pixel at `(x, y)`.
	#[inline]
	#[must_use]
	pub const fn offset(&self, x: u32, y: u32) -> usize {
		(y as usize * self.width as usize + x as usize) * CHANNELS
	}

	/// RGB value at `(x, y)`, or black when out of bounds.
	#[inline]
	#[must_use]
	pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
		if x >= self.width || y >= self.height {
			return [0, 0, 0];
		}
		let idx = self.offset(x, y);
		[self.data[idx], self.data[idx + 1], self.data[idx + 2]]
	}

	/// Overwrite the RGB value at `(x, y)`. Out-of-bounds writes are ignored.
	pub fn put_pixel(&mut self, x: u32, y: u32, rgb: [u8; 3]) {
		if x >= self.width || y >= self.height {
			return;
		}
		let idx = self.offset(x, y);
		self.data[idx..idx + CHANNELS].copy_from_slice(&rgb);
	}

	/// Whether the buffer holds zero pixels.
	#[inline]
	#[must_use]
	pub const fn is_empty(&self) -> bool {
		self.width == 0 || self.height == 0
	}
}

// ============================================================================
// Sampled Frame
// ============================================================================

/// One decoded frame at a sampling instant.
///
/// `index` is 0-based and monotonic over emitted frames; `timestamp_seconds`
/// is monotonic non-decreasing. The thumbnail is an encoded display image
/// (JPEG) and is the only per-frame data retained in the pipeline result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampledFrame {
	/// Position in the sampled sequence (0-based)
	pub index: u32,

	/// Sampling instant in seconds from the start of the video
	pub timestamp_seconds: f64,

	/// Analysis-resolution pixel buffer
	pub pixels: PixelBuffer,

	/// Encoded display thumbnail
	pub thumbnail: Vec<u8>,
}

// ============================================================================
// Video Metadata
// ============================================================================

/// Immutable metadata derived once from the input file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoMetadata {
	/// Original file name
	pub file_name: String,

	/// Duration in seconds
	pub duration_seconds: f64,

	/// Source width in pixels
	pub width: u32,

	/// Source height in pixels
	pub height: u32,

	/// Native frame rate; assumed 30.0 when the container does not declare one
	pub frame_rate: f64,

	/// Total source frame count (estimated when not declared)
	pub frame_count: u64,

	/// File size in bytes
	pub file_size_bytes: u64,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
pub(crate) mod testutil {
	//! Synthetic frame builders shared by the analysis-stage tests.

	use super::{PixelBuffer, SampledFrame};
	use crate::motion::cell_pixel_bounds;

	/// A frame of a single solid color at the given 1 fps-style timestamp.
	pub fn solid_frame(index: u32, timestamp: f64, rgb: [u8; 3]) -> SampledFrame {
		SampledFrame {
			index,
			timestamp_seconds: timestamp,
			pixels: PixelBuffer::solid(48, 27, rgb),
			thumbnail: vec![index as u8],
		}
	}

	/// A solid frame with one grid cell overridden to a different color.
	pub fn frame_with_cell(
		index: u32,
		timestamp: f64,
		base: [u8; 3],
		cell: usize,
		cell_rgb: [u8; 3],
	) -> SampledFrame {
		let mut pixels = PixelBuffer::solid(48, 27, base);
		let (x0, y0, x1, y1) = cell_pixel_bounds(cell, pixels.width, pixels.height);
		for y in y0..y1 {
			for x in x0..x1 {
				pixels.put_pixel(x, y, cell_rgb);
			}
		}
		SampledFrame {
			index,
			timestamp_seconds: timestamp,
			pixels,
			thumbnail: vec![index as u8],
		}
	}

	/// A run of static frames sampled at 1 fps.
	pub fn static_sequence(count: u32, rgb: [u8; 3]) -> Vec<SampledFrame> {
		(0..count).map(|i| solid_frame(i, f64::from(i), rgb)).collect()
	}
}
