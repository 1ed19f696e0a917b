//! Video metadata via FFprobe.
//!
//! FFprobe runs as an external process (the same trade the frame sampler
//! makes: no linked decoder libraries, consistent behavior across
//! platforms). Its JSON output is parsed into the immutable
//! [`VideoMetadata`] record created once at pipeline start.

use std::path::Path;
use std::process::Stdio;

use serde::Deserialize;
use storyline_core::VideoMetadata;
use tokio::process::Command;
use tracing::{debug, instrument};

use crate::error::{Result, StoryError};

/// Frame rate assumed when the container does not declare one.
const ASSUMED_FRAME_RATE: f64 = 30.0;

// ============================================================================
// FFprobe Output
// ============================================================================

/// Raw FFprobe stream data.
#[derive(Debug, Deserialize)]
struct FfprobeStream {
	codec_type: String,
	#[serde(default)]
	duration: Option<String>,
	#[serde(default)]
	r_frame_rate: Option<String>,
	#[serde(default)]
	nb_frames: Option<String>,
	#[serde(default)]
	width: Option<u32>,
	#[serde(default)]
	height: Option<u32>,
}

/// Raw FFprobe format data.
#[derive(Debug, Deserialize)]
struct FfprobeFormat {
	#[serde(default)]
	duration: Option<String>,
}

/// Raw FFprobe output.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
	streams: Vec<FfprobeStream>,
	#[serde(default)]
	format: Option<FfprobeFormat>,
}

// ============================================================================
// Probing
// ============================================================================

/// Check if FFprobe is available in PATH.
#[instrument]
pub async fn check_ffprobe() -> Result<()> {
	let output = Command::new("ffprobe")
		.arg("-version")
		.stdout(Stdio::null())
		.stderr(Stdio::null())
		.status()
		.await;

	match output {
		Ok(status) if status.success() => Ok(()),
		_ => Err(StoryError::FfprobeNotFound),
	}
}

/// Check if FFmpeg is available in PATH.
#[instrument]
pub async fn check_ffmpeg() -> Result<()> {
	let output = Command::new("ffmpeg")
		.arg("-version")
		.stdout(Stdio::null())
		.stderr(Stdio::null())
		.status()
		.await;

	match output {
		Ok(status) if status.success() => Ok(()),
		_ => Err(StoryError::FfmpegNotFound),
	}
}

/// Derive [`VideoMetadata`] for a video file.
///
/// # Errors
///
/// [`StoryError::FfprobeNotFound`] when the binary is missing,
/// [`StoryError::InvalidVideo`] when FFprobe rejects the file, and
/// [`StoryError::NoVideoStream`] when the container carries no video.
#[instrument(skip_all, fields(video = %video_path.as_ref().display()))]
pub async fn probe_metadata(video_path: impl AsRef<Path>) -> Result<VideoMetadata> {
	let video_path = video_path.as_ref();

	if !video_path.exists() {
		return Err(StoryError::VideoNotFound(video_path.to_path_buf()));
	}

	let output = Command::new("ffprobe")
		.args([
			"-v",
			"error",
			"-select_streams",
			"v:0",
			"-show_entries",
			"stream=duration,r_frame_rate,nb_frames,width,height,codec_type",
			"-show_entries",
			"format=duration",
			"-of",
			"json",
		])
		.arg(video_path)
		.output()
		.await
		.map_err(|_| StoryError::FfprobeNotFound)?;

	if !output.status.success() {
		return Err(StoryError::InvalidVideo(video_path.to_path_buf()));
	}

	let stdout = String::from_utf8_lossy(&output.stdout);
	let probe: FfprobeOutput = serde_json::from_str(&stdout)
		.map_err(|e| StoryError::JsonParse(e.to_string()))?;

	let video_stream = probe
		.streams
		.iter()
		.find(|s| s.codec_type == "video")
		.ok_or_else(|| StoryError::NoVideoStream(video_path.to_path_buf()))?;

	// Duration: try the stream first, then the container format.
	let duration_seconds = video_stream
		.duration
		.as_ref()
		.and_then(|d| d.parse::<f64>().ok())
		.or_else(|| {
			probe
				.format
				.as_ref()
				.and_then(|f| f.duration.as_ref())
				.and_then(|d| d.parse::<f64>().ok())
		})
		.unwrap_or(0.0);

	let frame_rate = video_stream
		.r_frame_rate
		.as_ref()
		.and_then(|r| parse_frame_rate(r))
		.unwrap_or(ASSUMED_FRAME_RATE);

	let frame_count = video_stream
		.nb_frames
		.as_ref()
		.and_then(|n| n.parse::<u64>().ok())
		.unwrap_or_else(|| (duration_seconds * frame_rate) as u64);

	let file_size_bytes = tokio::fs::metadata(video_path).await?.len();
	let file_name = video_path
		.file_name()
		.map(|n| n.to_string_lossy().to_string())
		.unwrap_or_default();

	let metadata = VideoMetadata {
		file_name,
		duration_seconds,
		width: video_stream.width.unwrap_or(0),
		height: video_stream.height.unwrap_or(0),
		frame_rate,
		frame_count,
		file_size_bytes,
	};
	debug!(?metadata, "Got video metadata");
	Ok(metadata)
}

/// Parse an FFprobe rate string, either `num/den` or a bare number.
fn parse_frame_rate(rate: &str) -> Option<f64> {
	let parts: Vec<&str> = rate.split('/').collect();
	if parts.len() == 2 {
		let num: f64 = parts[0].parse().ok()?;
		let den: f64 = parts[1].parse().ok()?;
		if den > 0.0 {
			Some(num / den)
		} else {
			None
		}
	} else {
		rate.parse().ok()
	}
}

// ============================================================================
// Tests
// ============================================================================
