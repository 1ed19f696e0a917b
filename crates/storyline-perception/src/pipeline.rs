//! The staged analysis pipeline.
//!
//! Control flow is strictly staged and one-directional:
//!
//! ```text
//! validate -> probe -> sample -> segment -> track -> detect -> result
//! ```
//!
//! Each stage fully consumes its input before the next begins, no stage
//! re-invokes an upstream stage, and the whole run produces one immutable
//! [`StoryAnalysis`]. A failed or cancelled run returns an error and
//! discards everything; there is no partial result.

use std::path::Path;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use storyline_core::moment::{detect_key_moments, KeyMoment, MomentConfig};
use storyline_core::motion::motion_profile;
use storyline_core::segment::{MotionSceneDetector, Scene, SceneDetector, SegmentConfig};
use storyline_core::track::{CharacterTracker, GridCharacterTracker, TrackedCharacter, TrackerConfig};
use storyline_core::{SampledFrame, VideoMetadata};
use tracing::{debug, instrument};

use crate::error::Result;
use crate::progress::{PipelineStage, ProgressSender};
use crate::sampler::{CancelToken, FrameSampler, SamplerConfig};
use crate::validate::{validate_source, ValidationConfig};

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for the full pipeline.
///
/// Every knob is a constructor constant: there is no config file or CLI
/// surface, and the defaults are the shipped calibration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
	/// Input precondition config
	pub validation: ValidationConfig,

	/// Frame sampling config
	pub sampler: SamplerConfig,

	/// Scene segmentation config
	pub segment: SegmentConfig,

	/// Character tracking config
	pub tracker: TrackerConfig,

	/// Key-moment detection config
	pub moments: MomentConfig,
}

// ============================================================================
// Result
// ============================================================================

/// Statistics from one pipeline run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessingStats {
	/// Frames sampled and analyzed
	pub frames_sampled: usize,

	/// Time spent sampling frames (ms)
	pub sampling_ms: u64,

	/// Time spent segmenting scenes, including the motion profile (ms)
	pub segmentation_ms: u64,

	/// Time spent tracking characters (ms)
	pub tracking_ms: u64,

	/// Time spent detecting key moments (ms)
	pub detection_ms: u64,
}

/// The immutable result of one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryAnalysis {
	/// Input metadata, derived once at pipeline start
	pub metadata: VideoMetadata,

	/// Ordered, contiguous, covering scene list
	pub scenes: Vec<Scene>,

	/// Characters merged across scenes
	pub characters: Vec<TrackedCharacter>,

	/// Ranked, capped key moments
	pub moments: Vec<KeyMoment>,

	/// Total wall-clock processing time (ms)
	pub processing_ms: u64,

	/// Per-stage statistics
	pub stats: ProcessingStats,
}

// ============================================================================
// Pipeline
// ============================================================================

/// Analyze a video with the shipped heuristic backends.
///
/// `declared_mime` is the MIME type the uploader claimed, when one was
/// declared; `progress` is an optional output-only notification stream; the
/// [`CancelToken`] aborts the run between sampled frames.
///
/// # Errors
///
/// Validation errors before any decoding; decode/seek errors during
/// sampling. The analysis stages themselves cannot fail.
#[instrument(skip_all, fields(video = %video_path.as_ref().display()))]
pub async fn analyze_video(
	video_path: impl AsRef<Path>,
	declared_mime: Option<&str>,
	config: &PipelineConfig,
	progress: Option<&ProgressSender>,
	cancel: &CancelToken,
) -> Result<StoryAnalysis> {
	let detector = MotionSceneDetector::new(config.segment.clone());
	let tracker = GridCharacterTracker::new(config.tracker.clone());
	analyze_video_with(
		video_path,
		declared_mime,
		config,
		&detector,
		&tracker,
		progress,
		cancel,
	)
	.await
}

/// Analyze a video with caller-supplied detection backends.
///
/// This is the seam for substituting a trained-model scene detector or
/// character tracker without touching orchestration.
///
/// # Errors
///
/// See [`analyze_video`].
pub async fn analyze_video_with(
	video_path: impl AsRef<Path>,
	declared_mime: Option<&str>,
	config: &PipelineConfig,
	detector: &dyn SceneDetector,
	tracker: &dyn CharacterTracker,
	progress: Option<&ProgressSender>,
	cancel: &CancelToken,
) -> Result<StoryAnalysis> {
	let video_path = video_path.as_ref();
	let started = Instant::now();

	match run_stages(
		video_path,
		declared_mime,
		config,
		detector,
		tracker,
		progress,
		cancel,
		started,
	)
	.await
	{
		Ok(analysis) => {
			if let Some(progress) = progress {
				progress.done(format!(
					"Analyzed {} scenes, {} characters, {} moments",
					analysis.scenes.len(),
					analysis.characters.len(),
					analysis.moments.len()
				));
			}
			Ok(analysis)
		}
		Err(err) => {
			if let Some(progress) = progress {
				progress.error(err.to_string());
			}
			Err(err)
		}
	}
}

/// Analyze a video under a caller-enforced wall clock.
///
/// The deadline fires at the next suspension point (a per-frame seek) and
/// the run is abandoned whole. No partial result survives.
///
/// # Errors
///
/// [`crate::error::StoryError::Timeout`] past the deadline, otherwise as
/// [`analyze_video`].
pub async fn analyze_video_with_deadline(
	video_path: impl AsRef<Path>,
	declared_mime: Option<&str>,
	config: &PipelineConfig,
	progress: Option<&ProgressSender>,
	cancel: &CancelToken,
	deadline_seconds: u64,
) -> Result<StoryAnalysis> {
	let deadline = std::time::Duration::from_secs(deadline_seconds);
	match tokio::time::timeout(
		deadline,
		analyze_video(video_path, declared_mime, config, progress, cancel),
	)
	.await
	{
		Ok(result) => result,
		Err(_) => {
			cancel.cancel();
			if let Some(progress) = progress {
				progress.error(format!("Timed out after {deadline_seconds}s"));
			}
			Err(crate::error::StoryError::Timeout {
				seconds: deadline_seconds,
			})
		}
	}
}

async fn run_stages(
	video_path: &Path,
	declared_mime: Option<&str>,
	config: &PipelineConfig,
	detector: &dyn SceneDetector,
	tracker: &dyn CharacterTracker,
	progress: Option<&ProgressSender>,
	cancel: &CancelToken,
	started: Instant,
) -> Result<StoryAnalysis> {
	let mut stats = ProcessingStats::default();

	// Preconditions run before any decoding.
	let _ = validate_source(video_path, declared_mime, &config.validation).await?;
	let metadata = crate::probe::probe_metadata(video_path).await?;

	// Stage 1: drain the sampler to exhaustion.
	let sampling_start = Instant::now();
	if let Some(progress) = progress {
		progress.stage_started(PipelineStage::SamplingFrames, "Sampling frames");
	}
	let frames = sample_all(video_path, &metadata, config, progress, cancel).await?;
	stats.sampling_ms = elapsed_ms(sampling_start);
	stats.frames_sampled = frames.len();

	// Stage 2: scenes. The whole-frame motion profile is computed once and
	// shared with moment detection.
	let segmentation_start = Instant::now();
	if let Some(progress) = progress {
		progress.stage_started(PipelineStage::SegmentingScenes, "Segmenting scenes");
	}
	let profile = motion_profile(&frames, config.segment.sample_stride);
	let scenes = detector.segment(&frames, &profile);
	stats.segmentation_ms = elapsed_ms(segmentation_start);

	// Stage 3: characters.
	let tracking_start = Instant::now();
	if let Some(progress) = progress {
		progress.stage_started(PipelineStage::TrackingCharacters, "Tracking characters");
	}
	let characters = tracker.track(&frames, &scenes, &profile);
	stats.tracking_ms = elapsed_ms(tracking_start);

	// Stage 4: key moments.
	let detection_start = Instant::now();
	if let Some(progress) = progress {
		progress.stage_started(PipelineStage::DetectingMoments, "Detecting key moments");
	}
	let moments = detect_key_moments(&frames, &scenes, &characters, &profile, &config.moments);
	stats.detection_ms = elapsed_ms(detection_start);

	debug!(
		frames = stats.frames_sampled,
		scenes = scenes.len(),
		characters = characters.len(),
		moments = moments.len(),
		"Analysis complete"
	);

	Ok(StoryAnalysis {
		metadata,
		scenes,
		characters,
		moments,
		processing_ms: elapsed_ms(started),
		stats,
	})
}

/// Drain the frame sampler, reporting intra-stage progress.
async fn sample_all(
	video_path: &Path,
	metadata: &VideoMetadata,
	config: &PipelineConfig,
	progress: Option<&ProgressSender>,
	cancel: &CancelToken,
) -> Result<Vec<SampledFrame>> {
	let mut sampler = FrameSampler::new(
		video_path,
		metadata.duration_seconds,
		config.sampler.clone(),
		cancel.clone(),
	)?;
	let expected = sampler.expected_frames().max(1);

	let mut frames = Vec::new();
	while let Some(frame) = sampler.next_frame().await? {
		frames.push(frame);
		if let Some(progress) = progress {
			let percent = (frames.len() as u64 * 100 / expected).min(100) as u8;
			progress.update(
				PipelineStage::SamplingFrames,
				percent,
				format!("Sampled {} of ~{} frames", frames.len(), expected),
			);
		}
	}
	Ok(frames)
}

fn elapsed_ms(since: Instant) -> u64 {
	u64::try_from(since.elapsed().as_millis()).unwrap_or(u64::MAX)
}

// ============================================================================
// Tests
// ============================================================================
