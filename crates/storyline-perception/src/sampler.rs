//! Pull-based frame sampling via the FFmpeg CLI.
//!
//! The sampler walks the strictly increasing instant set `{0, dt, 2dt, ...}`
//! bounded by the video duration, seeking FFmpeg to each instant and
//! decoding exactly one frame to a uuid-prefixed temp file. The file is read
//! back with the `image` crate, downscaled to the fixed analysis width, and
//! removed immediately; only the in-memory pixel buffer and an encoded
//! display thumbnail survive.
//!
//! The sequence is lazy and **not restartable**: each pull advances the
//! sampler, and a drained or failed sampler cannot be rewound. A shared
//! [`CancelToken`] is checked at every pull; the per-frame seek is the
//! pipeline's only suspension point.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use image::imageops::FilterType;
use serde::{Deserialize, Serialize};
use storyline_core::{PixelBuffer, SampledFrame};
use tokio::process::Command;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::error::{Result, StoryError};

// ============================================================================
// Cancellation
// ============================================================================

/// Shared cancellation flag checked between sampled frames.
///
/// Cancellation aborts at the next pull; partial results are discarded by
/// the pipeline driver, never returned.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
	/// Create a token in the not-cancelled state.
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Request cancellation.
	pub fn cancel(&self) {
		self.0.store(true, Ordering::Relaxed);
	}

	/// Whether cancellation has been requested.
	#[must_use]
	pub fn is_cancelled(&self) -> bool {
		self.0.load(Ordering::Relaxed)
	}
}

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for frame sampling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplerConfig {
	/// Analysis sampling rate in frames per second, independent of the
	/// source's native rate; must be > 0
	pub target_fps: f64,

	/// Fixed analysis width in pixels; height follows the aspect ratio
	pub analysis_width: u32,

	/// Display thumbnail width in pixels
	pub thumbnail_width: u32,

	/// JPEG quality for display thumbnails (1-100)
	pub thumbnail_quality: u8,

	/// FFmpeg `-q:v` quality for the intermediate frame grab (1-31, lower
	/// is better)
	pub grab_quality: u32,

	/// Extra attempts per sampling instant before the frame is skipped
	pub seek_retries: u32,

	/// Consecutive skipped instants that abort the run with a seek error
	pub max_consecutive_failures: u32,

	/// Directory for transient frame grabs
	pub work_dir: PathBuf,
}

impl Default for SamplerConfig {
	fn default() -> Self {
		Self {
			target_fps: 1.0,
			analysis_width: 160,
			thumbnail_width: 480,
			thumbnail_quality: 80,
			grab_quality: 2,
			seek_retries: 2,
			max_consecutive_failures: 5,
			work_dir: std::env::temp_dir().join("storyline-frames"),
		}
	}
}

// ============================================================================
// Frame Sampler
// ============================================================================

/// Lazy, ordered, finite, non-restartable frame sequence over `[0, duration)`.
#[derive(Debug)]
pub struct FrameSampler {
	video_path: PathBuf,
	config: SamplerConfig,
	duration_seconds: f64,
	interval: f64,
	prefix: Uuid,
	next_instant: u64,
	emitted: u32,
	consecutive_failures: u32,
	cancel: CancelToken,
}

impl FrameSampler {
	/// Create a sampler over a validated, probed video.
	///
	/// # Errors
	///
	/// [`StoryError::Decode`] when `target_fps` is not positive.
	pub fn new(
		video_path: impl AsRef<Path>,
		duration_seconds: f64,
		config: SamplerConfig,
		cancel: CancelToken,
	) -> Result<Self> {
		if config.target_fps <= 0.0 {
			return Err(StoryError::Decode {
				message: format!("target_fps must be positive, got {}", config.target_fps),
			});
		}
		let interval = 1.0 / config.target_fps;
		Ok(Self {
			video_path: video_path.as_ref().to_path_buf(),
			config,
			duration_seconds,
			interval,
			prefix: Uuid::new_v4(),
			next_instant: 0,
			emitted: 0,
			consecutive_failures: 0,
			cancel,
		})
	}

	/// Number of sampling instants the sequence will attempt.
	#[must_use]
	pub fn expected_frames(&self) -> u64 {
		if self.duration_seconds <= 0.0 {
			return 0;
		}
		(self.duration_seconds / self.interval).ceil() as u64
	}

	/// Pull the next frame, or `None` once the sequence is exhausted.
	///
	/// Instants that keep failing their seek are skipped; too many skipped
	/// instants in a row abort the run.
	///
	/// # Errors
	///
	/// [`StoryError::Cancelled`] when the token fired,
	/// [`StoryError::SeekFailed`] when the consecutive-failure budget is
	/// exhausted, and decoder/tool errors from the underlying extraction.
	pub async fn next_frame(&mut self) -> Result<Option<SampledFrame>> {
		loop {
			if self.cancel.is_cancelled() {
				return Err(StoryError::Cancelled);
			}

			let target_time = self.next_instant as f64 * self.interval;
			if target_time >= self.duration_seconds {
				return Ok(None);
			}

			match self.grab_instant(target_time).await {
				Ok(frame) => {
					self.next_instant += 1;
					self.emitted += 1;
					self.consecutive_failures = 0;
					return Ok(Some(frame));
				}
				Err(err @ (StoryError::FfmpegNotFound | StoryError::Cancelled)) => {
					return Err(err);
				}
				Err(err) => {
					warn!(?err, target_time, "Failed to sample frame, skipping");
					self.next_instant += 1;
					self.consecutive_failures += 1;
					if self.consecutive_failures > self.config.max_consecutive_failures {
						return Err(StoryError::SeekFailed {
							timestamp: target_time,
							attempts: self.config.seek_retries + 1,
						});
					}
				}
			}
		}
	}

	/// Seek, grab, decode, and downscale one sampling instant.
	#[instrument(skip_all, fields(timestamp = target_time))]
	async fn grab_instant(&self, target_time: f64) -> Result<SampledFrame> {
		tokio::fs::create_dir_all(&self.config.work_dir).await?;
		let grab_path = self
			.config
			.work_dir
			.join(format!("{}-{:06}.jpg", self.prefix, self.next_instant));

		let mut last_err = None;
		for attempt in 0..=self.config.seek_retries {
			match extract_frame_at(
				&self.video_path,
				target_time,
				&grab_path,
				self.config.grab_quality,
			)
			.await
			{
				Ok(()) => {
					last_err = None;
					break;
				}
				Err(err @ StoryError::FfmpegNotFound) => return Err(err),
				Err(err) => {
					debug!(?err, attempt, "Seek attempt failed");
					last_err = Some(err);
				}
			}
		}
		if let Some(err) = last_err {
			let _ = tokio::fs::remove_file(&grab_path).await;
			return Err(err);
		}

		let frame = self.decode_grab(&grab_path, target_time);
		let _ = tokio::fs::remove_file(&grab_path).await;
		frame
	}

	/// Decode a grabbed frame file into the analysis buffer + thumbnail.
	fn decode_grab(&self, grab_path: &Path, target_time: f64) -> Result<SampledFrame> {
		let source = image::open(grab_path)?;

		let analysis = downscale_to_width(&source, self.config.analysis_width);
		let rgb = analysis.to_rgb8();
		let (width, height) = (rgb.width(), rgb.height());
		let pixels =
			PixelBuffer::new(width, height, rgb.into_raw()).ok_or_else(|| StoryError::Decode {
				message: "analysis buffer dimensions disagree with pixel data".to_string(),
			})?;

		let thumb = downscale_to_width(&source, self.config.thumbnail_width);
		let mut thumbnail = Vec::new();
		let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(
			&mut thumbnail,
			self.config.thumbnail_quality,
		);
		thumb.write_with_encoder(encoder)?;

		Ok(SampledFrame {
			index: self.emitted,
			timestamp_seconds: target_time,
			pixels,
			thumbnail,
		})
	}
}

/// Downscale preserving aspect ratio; images already narrower pass through.
fn downscale_to_width(source: &image::DynamicImage, width: u32) -> image::DynamicImage {
	if source.width() <= width || source.width() == 0 {
		return source.clone();
	}
	let height = ((u64::from(source.height()) * u64::from(width)) / u64::from(source.width()))
		.max(1) as u32;
	source.resize_exact(width, height, FilterType::Triangle)
}

/// Extract a single frame at a timestamp to `output_path`.
async fn extract_frame_at(
	video_path: &Path,
	timestamp_seconds: f64,
	output_path: &Path,
	quality: u32,
) -> Result<()> {
	let output = Command::new("ffmpeg")
		.args(["-ss", &format!("{timestamp_seconds:.3}"), "-i"])
		.arg(video_path)
		.args([
			"-vframes",
			"1",
			"-q:v",
			&quality.to_string(),
			"-y", // Overwrite output
		])
		.arg(output_path)
		.output()
		.await
		.map_err(|_| StoryError::FfmpegNotFound)?;

	if !output.status.success() {
		let stderr = String::from_utf8_lossy(&output.stderr);
		return Err(StoryError::Decode {
			message: format!("frame grab at {timestamp_seconds:.3}s failed: {stderr}"),
		});
	}
	if !output_path.exists() {
		return Err(StoryError::Decode {
			message: format!("frame grab at {timestamp_seconds:.3}s produced no output"),
		});
	}
	Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_cancel_token_flags_once_set() {
		let token = CancelToken::new();
		assert!(!token.is_cancelled());
		token.cancel();
		assert!(token.is_cancelled());
		// Clones observe the same flag.
		assert!(token.clone().is_cancelled());
	}

	#[test]
	fn test_sampler_rejects_non_positive_rate() {
		let config = SamplerConfig {
			target_fps: 0.0,
			..SamplerConfig::default()
		};
		let result = FrameSampler::new("clip.mp4", 10.0, config, CancelToken::new());
		assert!(result.is_err());
	}

	#[test]
	fn test_expected_frames_covers_duration() {
		let sampler = FrameSampler::new(
			"clip.mp4",
			10.0,
			SamplerConfig::default(),
			CancelToken::new(),
		)
		.expect("sampler");
		assert_eq!(sampler.expected_frames(), 10);

		let config = SamplerConfig {
			target_fps: 2.0,
			..SamplerConfig::default()
		};
		let sampler =
			FrameSampler::new("clip.mp4", 4.2, config, CancelToken::new()).expect("sampler");
		// Instants 0.0..4.0 every 0.5 s: ceil(4.2 / 0.5) = 9.
		assert_eq!(sampler.expected_frames(), 9);
	}

	#[tokio::test]
	async fn test_zero_duration_sequence_is_empty() {
		let mut sampler = FrameSampler::new(
			"clip.mp4",
			0.0,
			SamplerConfig::default(),
			CancelToken::new(),
		)
		.expect("sampler");
		let frame = sampler.next_frame().await.expect("pull");
		assert!(frame.is_none());
	}

	#[tokio::test]
	async fn test_cancellation_wins_over_pulling() {
		let token = CancelToken::new();
		let mut sampler = FrameSampler::new(
			"clip.mp4",
			10.0,
			SamplerConfig::default(),
			token.clone(),
		)
		.expect("sampler");
		token.cancel();
		let err = sampler.next_frame().await.expect_err("cancelled");
		assert!(matches!(err, StoryError::Cancelled));
	}

	#[test]
	fn test_downscale_preserves_aspect_ratio() {
		let source = image::DynamicImage::new_rgb8(640, 360);
		let scaled = downscale_to_width(&source, 160);
		assert_eq!(scaled.width(), 160);
		assert_eq!(scaled.height(), 90);
	}

	#[test]
	fn test_downscale_passes_narrow_images_through() {
		let source = image::DynamicImage::new_rgb8(120, 80);
		let scaled = downscale_to_width(&source, 160);
		assert_eq!((scaled.width(), scaled.height()), (120, 80));
	}
}
