//! Character tracking by region-based motion clustering.
//!
//! Each scene is scored on the fixed 3x3 analysis grid: per-cell motion is
//! accumulated across every consecutive frame pair inside the scene, the
//! dominant cell (or the top two in high-activity scenes) becomes a
//! provisional "seed", and seeds that share a dominant cell merge across
//! scenes into one persistent character.
//!
//! The same-cell merge is knowingly coarse: two different subjects that
//! occupy the same screen region in different scenes (always-centered
//! speakers, for instance) will merge into a single character. That is the
//! accepted trade for a deterministic, model-free tracker.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::frame::SampledFrame;
use crate::motion::{cell_mean_abs_diff, CELL_COUNT, CENTER_CELL, DEFAULT_STRIDE, GRID_DIM};
use crate::segment::Scene;

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for character tracking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
	/// Scene motion intensity above which two simultaneous subjects are
	/// assumed and two seeds are emitted
	pub high_activity_threshold: f64,

	/// Mean per-pair cell motion below which a candidate seed is discarded
	/// as noise
	pub seed_motion_floor: f64,

	/// Confidence assigned to the degraded center-cell seed of a scene too
	/// short to carry a motion signal
	pub fallback_confidence: f64,

	/// Pixel stride for per-cell MAD sampling
	pub sample_stride: usize,
}

impl Default for TrackerConfig {
	fn default() -> Self {
		Self {
			high_activity_threshold: 60.0,
			seed_motion_floor: 1.5,
			fallback_confidence: 30.0,
			sample_stride: DEFAULT_STRIDE,
		}
	}
}

// ============================================================================
// Tracked Character
// ============================================================================

/// Normalized screen region: a fractional rectangle with all fields in
/// `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionRect {
	/// Left edge
	pub x: f64,
	/// Top edge
	pub y: f64,
	/// Width
	pub w: f64,
	/// Height
	pub h: f64,
}

impl RegionRect {
	/// The fractional rectangle of a 3x3 grid cell.
	#[must_use]
	pub fn from_cell(cell: usize) -> Self {
		let cell = cell.min(CELL_COUNT - 1);
		let dim = GRID_DIM as f64;
		Self {
			x: (cell % GRID_DIM) as f64 / dim,
			y: (cell / GRID_DIM) as f64 / dim,
			w: 1.0 / dim,
			h: 1.0 / dim,
		}
	}
}

/// A persistent subject tracked across scenes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedCharacter {
	/// Sequential identifier: `character_01`, `character_02`, ...
	pub id: String,

	/// Human-facing label: `Character 1`, `Character 2`, ...
	pub label: String,

	/// Earliest start time among appearance scenes, seconds
	pub first_seen: f64,

	/// Latest end time among appearance scenes, seconds
	pub last_seen: f64,

	/// Ids of the scenes the character appears in, ascending
	pub scene_appearances: Vec<String>,

	/// Thumbnail of the representative (peak-motion) frame
	pub thumbnail: Vec<u8>,

	/// Dominant screen region
	pub dominant_region: RegionRect,

	/// Tracking confidence, 0-100
	pub confidence: f64,
}

// ============================================================================
// Seeds
// ============================================================================

/// A provisional per-scene character candidate before cross-scene merging.
#[derive(Debug, Clone)]
struct CharacterSeed {
	/// Dominant grid cell
	cell: usize,
	/// Index of the scene that produced the seed
	scene_index: usize,
	/// Tracking confidence derived from motion strength
	confidence: f64,
	/// Position of the scene's peak-motion frame in the frame sequence
	rep_frame: usize,
}

/// Fixed per-cell accumulator; the 3x3 grid has a known, small cardinality,
/// so an indexed array replaces any dynamic map.
#[derive(Debug, Clone, Copy, Default)]
struct CellAccumulator {
	total: f64,
}

// ============================================================================
// Tracker Seam
// ============================================================================

/// Character tracking backend.
///
/// The shipped implementation is the deterministic [`GridCharacterTracker`];
/// the seam exists so a detection-model backend can replace it without
/// touching pipeline orchestration. `profile` is the precomputed whole-frame
/// motion profile, used to locate each scene's peak frame.
pub trait CharacterTracker {
	/// Build persistent characters from per-scene motion.
	fn track(
		&self,
		frames: &[SampledFrame],
		scenes: &[Scene],
		profile: &[f64],
	) -> Vec<TrackedCharacter>;
}

// ============================================================================
// Grid Character Tracker
// ============================================================================

/// Grid-cell motion clustering tracker.
#[derive(Debug, Clone, Default)]
pub struct GridCharacterTracker {
	config: TrackerConfig,
}

impl GridCharacterTracker {
	/// Create a tracker with the given configuration.
	#[must_use]
	pub const fn new(config: TrackerConfig) -> Self {
		Self { config }
	}

	/// Seed confidence from mean per-pair cell motion, bounded to [0, 95].
	fn seed_confidence(mean_motion: f64) -> f64 {
		(40.0 + 1.2 * mean_motion).clamp(0.0, 95.0)
	}

	/// Emit the seeds for one scene.
	fn scene_seeds(
		&self,
		frames: &[SampledFrame],
		scene: &Scene,
		scene_index: usize,
		profile: &[f64],
	) -> SmallVec<[CharacterSeed; 2]> {
		let start = scene.start_frame as usize;
		let end = scene.end_frame as usize;
		let mut seeds = SmallVec::new();

		if end <= start {
			// No motion signal to rank on: degrade to a center-cell seed at
			// a conservative confidence floor.
			seeds.push(CharacterSeed {
				cell: CENTER_CELL,
				scene_index,
				confidence: self.config.fallback_confidence,
				rep_frame: start,
			});
			return seeds;
		}

		let mut cells = [CellAccumulator::default(); CELL_COUNT];
		let mut peak_frame = start + 1;
		let mut peak_motion = f64::MIN;

		for i in start + 1..=end {
			for (cell, acc) in cells.iter_mut().enumerate() {
				acc.total += cell_mean_abs_diff(
					&frames[i - 1].pixels,
					&frames[i].pixels,
					cell,
					self.config.sample_stride,
				);
			}
			if profile[i] > peak_motion {
				peak_motion = profile[i];
				peak_frame = i;
			}
		}

		let pair_count = (end - start) as f64;

		// Rank cells by accumulated motion, ties to the lower cell index.
		let mut ranked: [usize; CELL_COUNT] = std::array::from_fn(|i| i);
		ranked.sort_by(|&a, &b| {
			cells[b]
				.total
				.total_cmp(&cells[a].total)
				.then_with(|| a.cmp(&b))
		});

		let seed_count = if scene.motion_intensity > self.config.high_activity_threshold {
			2
		} else {
			1
		};

		for &cell in ranked.iter().take(seed_count) {
			let mean_motion = cells[cell].total / pair_count;
			if mean_motion < self.config.seed_motion_floor {
				continue;
			}
			seeds.push(CharacterSeed {
				cell,
				scene_index,
				confidence: Self::seed_confidence(mean_motion),
				rep_frame: peak_frame,
			});
		}
		seeds
	}
}

impl CharacterTracker for GridCharacterTracker {
	fn track(
		&self,
		frames: &[SampledFrame],
		scenes: &[Scene],
		profile: &[f64],
	) -> Vec<TrackedCharacter> {
		if frames.is_empty() || scenes.is_empty() || profile.len() != frames.len() {
			return Vec::new();
		}

		// Merge seeds that share a dominant cell: one builder slot per cell.
		struct Builder {
			scene_indices: Vec<usize>,
			best: CharacterSeed,
		}
		let mut slots: [Option<Builder>; CELL_COUNT] = Default::default();

		for (scene_index, scene) in scenes.iter().enumerate() {
			for seed in self.scene_seeds(frames, scene, scene_index, profile) {
				match &mut slots[seed.cell] {
					Some(builder) => {
						builder.scene_indices.push(seed.scene_index);
						if seed.confidence > builder.best.confidence {
							builder.best = seed;
						}
					}
					slot @ None => {
						*slot = Some(Builder {
							scene_indices: vec![seed.scene_index],
							best: seed,
						});
					}
				}
			}
		}

		// Finalize in representative-timestamp order; the cell index breaks
		// ties so the ordering is stable run to run.
		let mut builders: Vec<Builder> = slots.into_iter().flatten().collect();
		builders.sort_by(|a, b| {
			frames[a.best.rep_frame]
				.timestamp_seconds
				.total_cmp(&frames[b.best.rep_frame].timestamp_seconds)
				.then_with(|| a.best.cell.cmp(&b.best.cell))
		});

		builders
			.into_iter()
			.enumerate()
			.map(|(ordinal, builder)| {
				let first_seen = builder
					.scene_indices
					.iter()
					.map(|&i| scenes[i].start_time)
					.fold(f64::INFINITY, f64::min);
				let last_seen = builder
					.scene_indices
					.iter()
					.map(|&i| scenes[i].end_time)
					.fold(f64::NEG_INFINITY, f64::max);

				TrackedCharacter {
					id: format!("character_{:02}", ordinal + 1),
					label: format!("Character {}", ordinal + 1),
					first_seen,
					last_seen,
					scene_appearances: builder
						.scene_indices
						.iter()
						.map(|&i| scenes[i].id.clone())
						.collect(),
					thumbnail: frames[builder.best.rep_frame].thumbnail.clone(),
					dominant_region: RegionRect::from_cell(builder.best.cell),
					confidence: builder.best.confidence,
				}
			})
			.collect()
	}
}

/// Track characters with the default grid tracker.
#[must_use]
pub fn track_characters(
	frames: &[SampledFrame],
	scenes: &[Scene],
	profile: &[f64],
	config: &TrackerConfig,
) -> Vec<TrackedCharacter> {
	GridCharacterTracker::new(config.clone()).track(frames, scenes, profile)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
	use super::*;
	use crate::frame::testutil::{frame_with_cell, solid_frame, static_sequence};
	use crate::motion::motion_profile;
	use crate::segment::{segment_scenes, SegmentConfig};

	fn run(frames: &[SampledFrame]) -> (Vec<Scene>, Vec<TrackedCharacter>) {
		let seg = SegmentConfig::default();
		let profile = motion_profile(frames, seg.sample_stride);
		let scenes = segment_scenes(frames, &seg);
		let characters = track_characters(frames, &scenes, &profile, &TrackerConfig::default());
		(scenes, characters)
	}

	/// Scene 1 static; scene 2 flashes the top-left grid cell every frame.
	fn flashing_top_left_sequence() -> Vec<SampledFrame> {
		let mut frames: Vec<SampledFrame> =
			(0..5).map(|i| solid_frame(i, f64::from(i), [10, 10, 10])).collect();
		for i in 5..10u32 {
			let frame = if i % 2 == 0 {
				frame_with_cell(i, f64::from(i), [120, 120, 120], 0, [250, 250, 250])
			} else {
				solid_frame(i, f64::from(i), [120, 120, 120])
			};
			frames.push(frame);
		}
		frames
	}

	#[test]
	fn test_static_video_yields_no_characters() {
		let frames = static_sequence(10, [40, 40, 40]);
		let (_, characters) = run(&frames);
		assert!(characters.is_empty());
	}

	#[test]
	fn test_empty_input_yields_no_characters() {
		let (_, characters) = run(&[]);
		assert!(characters.is_empty());
	}

	#[test]
	fn test_flashing_region_becomes_one_character() {
		let (scenes, characters) = run(&flashing_top_left_sequence());
		assert_eq!(scenes.len(), 2);
		assert_eq!(characters.len(), 1);

		let character = &characters[0];
		assert_eq!(character.id, "character_01");
		assert_eq!(character.label, "Character 1");
		assert_eq!(character.scene_appearances, vec!["scene_02".to_string()]);

		// Top-left cell.
		let region = character.dominant_region;
		assert!(region.x.abs() < f64::EPSILON);
		assert!(region.y.abs() < f64::EPSILON);
		assert!((region.w - 1.0 / 3.0).abs() < 1e-12);
		assert!((region.h - 1.0 / 3.0).abs() < 1e-12);
	}

	#[test]
	fn test_first_and_last_seen_span_appearance_scenes() {
		let (scenes, characters) = run(&flashing_top_left_sequence());
		let character = &characters[0];
		let scene = &scenes[1];
		assert!((character.first_seen - scene.start_time).abs() < f64::EPSILON);
		assert!((character.last_seen - scene.end_time).abs() < f64::EPSILON);
		assert!(character.first_seen <= character.last_seen);
	}

	#[test]
	fn test_recurring_cell_merges_across_scenes() {
		// Motion in the same cell in scenes 1 and 2 (with a hard cut between
		// them) merges into one character seen across both.
		let mut frames = Vec::new();
		for i in 0..5u32 {
			let frame = if i % 2 == 0 {
				frame_with_cell(i, f64::from(i), [10, 10, 10], 8, [200, 200, 200])
			} else {
				solid_frame(i, f64::from(i), [10, 10, 10])
			};
			frames.push(frame);
		}
		for i in 5..10u32 {
			let frame = if i % 2 == 0 {
				frame_with_cell(i, f64::from(i), [230, 230, 230], 8, [40, 40, 40])
			} else {
				solid_frame(i, f64::from(i), [230, 230, 230])
			};
			frames.push(frame);
		}

		let (scenes, characters) = run(&frames);
		assert_eq!(scenes.len(), 2);
		assert_eq!(characters.len(), 1);
		assert_eq!(
			characters[0].scene_appearances,
			vec!["scene_01".to_string(), "scene_02".to_string()]
		);
		assert!((characters[0].first_seen - scenes[0].start_time).abs() < f64::EPSILON);
		assert!((characters[0].last_seen - scenes[1].end_time).abs() < f64::EPSILON);
	}

	#[test]
	fn test_distinct_cells_become_distinct_characters() {
		let mut frames = Vec::new();
		for i in 0..5u32 {
			let frame = if i % 2 == 0 {
				frame_with_cell(i, f64::from(i), [10, 10, 10], 0, [200, 200, 200])
			} else {
				solid_frame(i, f64::from(i), [10, 10, 10])
			};
			frames.push(frame);
		}
		for i in 5..10u32 {
			let frame = if i % 2 == 0 {
				frame_with_cell(i, f64::from(i), [230, 230, 230], 8, [40, 40, 40])
			} else {
				solid_frame(i, f64::from(i), [230, 230, 230])
			};
			frames.push(frame);
		}

		let (_, characters) = run(&frames);
		assert_eq!(characters.len(), 2);
		// Ids follow earliest representative timestamp.
		assert_eq!(characters[0].id, "character_01");
		assert_eq!(characters[1].id, "character_02");
		assert!(
			characters[0].first_seen <= characters[1].first_seen,
			"characters out of order"
		);
	}

	#[test]
	fn test_single_frame_scene_degrades_to_center_seed() {
		// One lone frame after a long static run, separated by a cut: the
		// second scene has a single frame and no motion signal.
		let mut frames: Vec<SampledFrame> =
			(0..5).map(|i| solid_frame(i, f64::from(i), [10, 10, 10])).collect();
		frames.push(solid_frame(5, 5.0, [250, 250, 250]));

		let seg = SegmentConfig::default();
		let profile = motion_profile(&frames, seg.sample_stride);
		let scenes = segment_scenes(&frames, &seg);
		assert_eq!(scenes.len(), 2);
		assert_eq!(scenes[1].frame_count(), 1);

		let characters =
			track_characters(&frames, &scenes, &profile, &TrackerConfig::default());
		assert_eq!(characters.len(), 1);
		assert_eq!(characters[0].dominant_region, RegionRect::from_cell(4));
		assert!((characters[0].confidence - 30.0).abs() < f64::EPSILON);
	}

	#[test]
	fn test_tracking_is_deterministic() {
		let frames = flashing_top_left_sequence();
		let (scenes, a) = run(&frames);
		let profile = motion_profile(&frames, SegmentConfig::default().sample_stride);
		let b = track_characters(&frames, &scenes, &profile, &TrackerConfig::default());
		assert_eq!(a.len(), b.len());
		for (x, y) in a.iter().zip(b.iter()) {
			assert_eq!(x.id, y.id);
			assert_eq!(x.scene_appearances, y.scene_appearances);
			assert!((x.confidence - y.confidence).abs() < f64::EPSILON);
		}
	}

	#[test]
	fn test_region_rect_cells() {
		let center = RegionRect::from_cell(4);
		assert!((center.x - 1.0 / 3.0).abs() < 1e-12);
		assert!((center.y - 1.0 / 3.0).abs() < 1e-12);
		let bottom_right = RegionRect::from_cell(8);
		assert!((bottom_right.x - 2.0 / 3.0).abs() < 1e-12);
		assert!((bottom_right.y - 2.0 / 3.0).abs() < 1e-12);
	}
}
