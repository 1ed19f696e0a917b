//! Error types for the analysis pipeline.

use std::path::PathBuf;

/// Errors that can abort a pipeline run.
///
/// Only validation and decoder-level failures exist: the analysis stages
/// (segmentation, tracking, moment detection) are pure functions that
/// degrade to empty-but-valid output instead of failing.
#[derive(Debug, thiserror::Error)]
pub enum StoryError {
	/// FFmpeg is not installed or not found in PATH.
	#[error("FFmpeg not found. Please install FFmpeg: https://ffmpeg.org/download.html")]
	FfmpegNotFound,

	/// FFprobe is not installed or not found in PATH.
	#[error("FFprobe not found. Please install FFmpeg: https://ffmpeg.org/download.html")]
	FfprobeNotFound,

	/// Video file not found.
	#[error("Video file not found: {0}")]
	VideoNotFound(PathBuf),

	/// Input file exceeds the configured size limit.
	#[error("File is {size_bytes} bytes; the limit is {max_bytes}")]
	FileTooLarge {
		/// Actual size in bytes
		size_bytes: u64,
		/// Configured maximum in bytes
		max_bytes: u64,
	},

	/// Input extension or MIME type is not in the allow-list.
	#[error("Unsupported video format: {detail}")]
	UnsupportedFormat {
		/// The offending extension or MIME type
		detail: String,
	},

	/// Invalid video file (corrupt or unsupported container/codec).
	#[error("Invalid or unsupported video: {0}")]
	InvalidVideo(PathBuf),

	/// Video has no video streams.
	#[error("Video has no video streams: {0}")]
	NoVideoStream(PathBuf),

	/// Decoder failed outright.
	#[error("Decode failed: {message}")]
	Decode {
		/// Error message from the decoder
		message: String,
	},

	/// Seeking to a sampling instant kept failing past the retry budget.
	#[error("Seek failed at {timestamp}s after {attempts} attempts")]
	SeekFailed {
		/// Target timestamp in seconds
		timestamp: f64,
		/// Attempts made before giving up
		attempts: u32,
	},

	/// Failed to read an extracted frame image.
	#[error("Failed to read frame image: {0}")]
	ImageRead(#[from] image::ImageError),

	/// I/O error.
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	/// FFprobe output could not be parsed.
	#[error("Failed to parse FFprobe output: {0}")]
	JsonParse(String),

	/// The run was cancelled between two sampled frames.
	#[error("Operation was cancelled")]
	Cancelled,

	/// The run exceeded a caller-enforced wall clock.
	#[error("Operation timed out after {seconds}s")]
	Timeout {
		/// Timeout duration in seconds
		seconds: u64,
	},
}

impl StoryError {
	/// Check if this error was raised before any decoding started
	/// (bad size or type; the user can fix it by re-uploading).
	#[must_use]
	pub const fn is_validation(&self) -> bool {
		matches!(
			self,
			Self::FileTooLarge { .. } | Self::UnsupportedFormat { .. }
		)
	}

	/// Check if this error is decoder-level (fatal for the current run).
	#[must_use]
	pub const fn is_decode(&self) -> bool {
		matches!(
			self,
			Self::InvalidVideo(_)
				| Self::NoVideoStream(_)
				| Self::Decode { .. }
				| Self::SeekFailed { .. }
		)
	}

	/// Check if this error is due to a missing dependency.
	#[must_use]
	pub const fn is_missing_dependency(&self) -> bool {
		matches!(self, Self::FfmpegNotFound | Self::FfprobeNotFound)
	}

	/// Check if the error is recoverable (retry with a different file, or
	/// simply try again).
	#[must_use]
	pub const fn is_recoverable(&self) -> bool {
		self.is_validation() || matches!(self, Self::Timeout { .. } | Self::Cancelled)
	}
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, StoryError>;
