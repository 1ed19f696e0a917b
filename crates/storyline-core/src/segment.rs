//! Scene segmentation from inter-frame motion.
//!
//! A cut is declared where the motion profile crosses the cut threshold,
//! guarded by a minimum scene duration so flicker cannot shatter the
//! timeline into micro-scenes. The first frame is always a cut; scenes are
//! the intervals between consecutive cuts, and together they cover every
//! sampled frame exactly once.

use serde::{Deserialize, Serialize};

use crate::frame::SampledFrame;
use crate::motion::{motion_profile, DEFAULT_STRIDE};

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for scene segmentation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentConfig {
	/// MAD value (0-255) at or above which a frame starts a new scene
	pub cut_threshold: f64,

	/// Minimum seconds between cuts; the guard always wins over a raw
	/// threshold crossing
	pub min_scene_duration: f64,

	/// Mean interior MAD that maps to motion intensity 100
	pub intensity_ceiling: f64,

	/// Pixel stride for MAD sampling
	pub sample_stride: usize,
}

impl Default for SegmentConfig {
	fn default() -> Self {
		Self {
			cut_threshold: 30.0,
			min_scene_duration: 2.0,
			intensity_ceiling: 50.0,
			sample_stride: DEFAULT_STRIDE,
		}
	}
}

// ============================================================================
// Scene
// ============================================================================

/// A contiguous span of sampled frames between two detected cuts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scene {
	/// Sequential identifier: `scene_01`, `scene_02`, ...
	pub id: String,

	/// First frame index (inclusive)
	pub start_frame: u32,

	/// Last frame index (inclusive)
	pub end_frame: u32,

	/// Timestamp of the first frame in seconds
	pub start_time: f64,

	/// Timestamp of the last frame in seconds
	pub end_time: f64,

	/// Thumbnail of the temporal-midpoint frame
	pub thumbnail: Vec<u8>,

	/// Aggregate motion intensity, 0-100
	pub motion_intensity: f64,
}

impl Scene {
	/// Number of sampled frames in the scene.
	#[inline]
	#[must_use]
	pub const fn frame_count(&self) -> u32 {
		self.end_frame - self.start_frame + 1
	}

	/// Format the 1-based, zero-padded scene identifier.
	#[must_use]
	pub fn format_id(ordinal: usize) -> String {
		format!("scene_{ordinal:02}")
	}
}

// ============================================================================
// Detector Seam
// ============================================================================

/// Scene detection backend.
///
/// The shipped implementation is the deterministic [`MotionSceneDetector`];
/// the seam exists so a trained-model backend can replace it without
/// touching pipeline orchestration. `profile` is the precomputed whole-frame
/// motion profile (see [`motion_profile`]); heuristic backends consume it,
/// model-based backends may ignore it.
pub trait SceneDetector {
	/// Partition the frame sequence into contiguous, covering scenes.
	fn segment(&self, frames: &[SampledFrame], profile: &[f64]) -> Vec<Scene>;
}

// ============================================================================
// Motion Scene Detector
// ============================================================================

/// Threshold-based scene detector over the inter-frame MAD profile.
#[derive(Debug, Clone, Default)]
pub struct MotionSceneDetector {
	config: SegmentConfig,
}

impl MotionSceneDetector {
	/// Create a detector with the given configuration.
	#[must_use]
	pub const fn new(config: SegmentConfig) -> Self {
		Self { config }
	}

	/// Cut indices for the frame sequence. Frame 0 is always a cut.
	fn cut_points(&self, frames: &[SampledFrame], profile: &[f64]) -> Vec<usize> {
		let mut cuts = vec![0];
		let mut last_cut_time = frames[0].timestamp_seconds;

		for i in 1..frames.len() {
			let elapsed = frames[i].timestamp_seconds - last_cut_time;
			if profile[i] >= self.config.cut_threshold && elapsed >= self.config.min_scene_duration
			{
				cuts.push(i);
				last_cut_time = frames[i].timestamp_seconds;
			}
		}
		cuts
	}

	/// Mean of the profile values strictly inside the scene, rescaled to
	/// 0-100. The opening cut frame is excluded: its difference belongs to
	/// the transition, not the scene.
	fn intensity(&self, profile: &[f64], start: usize, end: usize) -> f64 {
		if end <= start {
			return 0.0;
		}
		let interior = &profile[start + 1..=end];
		let mean = interior.iter().sum::<f64>() / interior.len() as f64;
		(mean / self.config.intensity_ceiling * 100.0).clamp(0.0, 100.0)
	}
}

impl SceneDetector for MotionSceneDetector {
	fn segment(&self, frames: &[SampledFrame], profile: &[f64]) -> Vec<Scene> {
		// Fewer than two frames cannot form a scene.
		if frames.len() < 2 || profile.len() != frames.len() {
			return Vec::new();
		}

		let cuts = self.cut_points(frames, profile);
		let mut scenes = Vec::with_capacity(cuts.len());

		for (ordinal, window) in cuts.windows(2).enumerate() {
			scenes.push(self.build_scene(frames, profile, ordinal, window[0], window[1] - 1));
		}
		// Last scene extends to the final frame.
		if let Some(&last_cut) = cuts.last() {
			scenes.push(self.build_scene(
				frames,
				profile,
				cuts.len() - 1,
				last_cut,
				frames.len() - 1,
			));
		}
		scenes
	}
}

impl MotionSceneDetector {
	fn build_scene(
		&self,
		frames: &[SampledFrame],
		profile: &[f64],
		ordinal: usize,
		start: usize,
		end: usize,
	) -> Scene {
		let midpoint = start + (end - start) / 2;
		Scene {
			id: Scene::format_id(ordinal + 1),
			start_frame: frames[start].index,
			end_frame: frames[end].index,
			start_time: frames[start].timestamp_seconds,
			end_time: frames[end].timestamp_seconds,
			thumbnail: frames[midpoint].thumbnail.clone(),
			motion_intensity: self.intensity(profile, start, end),
		}
	}
}

/// Segment a frame sequence with the default motion detector.
///
/// Convenience wrapper that computes the motion profile itself.
#[must_use]
pub fn segment_scenes(frames: &[SampledFrame], config: &SegmentConfig) -> Vec<Scene> {
	let profile = motion_profile(frames, config.sample_stride);
	MotionSceneDetector::new(config.clone()).segment(frames, &profile)
}

// ============================================================================
// Tests
// ============================================================================
