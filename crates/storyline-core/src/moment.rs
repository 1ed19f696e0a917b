//! Key-moment detection.
//!
//! Each scene is scanned for five narrative event shapes (entrances,
//! climaxes, focus holds, abrupt transformations, and exits), scored on a
//! 0-100 importance scale, ranked, and capped so downstream rendering cost
//! stays bounded.

use serde::{Deserialize, Serialize};

use crate::frame::SampledFrame;
use crate::segment::Scene;
use crate::track::TrackedCharacter;

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for key-moment detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MomentConfig {
	/// Minimum peak MAD for a climax to register
	pub min_drama_threshold: f64,

	/// MAD a later-scene frame must exceed to register a transformation;
	/// deliberately higher than any cut threshold
	pub abrupt_change_threshold: f64,

	/// Seconds after scene start before a transformation may register
	pub late_start_offset: f64,

	/// Maximum number of moments returned
	pub max_moments: usize,
}

impl Default for MomentConfig {
	fn default() -> Self {
		Self {
			min_drama_threshold: 25.0,
			abrupt_change_threshold: 45.0,
			late_start_offset: 1.5,
			max_moments: 30,
		}
	}
}

// ============================================================================
// Key Moment
// ============================================================================

/// The narrative shape of a key moment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MomentKind {
	/// A character is on screen as the scene opens
	Entrance,
	/// The motion peak of the scene
	Climax,
	/// The camera holds still late in the scene
	Focus,
	/// An abrupt visual change well after the scene opened
	Transformation,
	/// A character is on screen as the scene closes
	Exit,
}

impl MomentKind {
	/// Stable lowercase name.
	#[must_use]
	pub const fn as_str(&self) -> &'static str {
		match self {
			Self::Entrance => "entrance",
			Self::Climax => "climax",
			Self::Focus => "focus",
			Self::Transformation => "transformation",
			Self::Exit => "exit",
		}
	}
}

/// A scored narrative event at a single timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyMoment {
	/// Sequential identifier assigned after final ranking: `moment_01`, ...
	pub id: String,

	/// Owning scene
	pub scene_id: String,

	/// Primary character of the owning scene, when one exists
	pub character_id: Option<String>,

	/// Timestamp in seconds, inside the owning scene's range
	pub timestamp: f64,

	/// Narrative shape
	pub kind: MomentKind,

	/// Importance score, 0-100
	pub importance: f64,

	/// Thumbnail of the moment's frame
	pub thumbnail: Vec<u8>,

	/// Generated human-readable description
	pub description: String,
}

// ============================================================================
// Detection
// ============================================================================

/// Detect and rank key moments across all scenes.
///
/// Output is sorted by importance descending, ties broken by ascending
/// timestamp, and truncated to `config.max_moments`. Zero scenes or frames
/// yield an empty list.
#[must_use]
pub fn detect_key_moments(
	frames: &[SampledFrame],
	scenes: &[Scene],
	characters: &[TrackedCharacter],
	profile: &[f64],
	config: &MomentConfig,
) -> Vec<KeyMoment> {
	if frames.is_empty() || scenes.is_empty() || profile.len() != frames.len() {
		return Vec::new();
	}

	let mut moments = Vec::new();
	for scene in scenes {
		collect_scene_moments(frames, scene, characters, profile, config, &mut moments);
	}

	moments.sort_by(|a, b| {
		b.importance
			.total_cmp(&a.importance)
			.then_with(|| a.timestamp.total_cmp(&b.timestamp))
	});
	moments.truncate(config.max_moments);

	for (ordinal, moment) in moments.iter_mut().enumerate() {
		moment.id = format!("moment_{:02}", ordinal + 1);
	}
	moments
}

fn collect_scene_moments(
	frames: &[SampledFrame],
	scene: &Scene,
	characters: &[TrackedCharacter],
	profile: &[f64],
	config: &MomentConfig,
	out: &mut Vec<KeyMoment>,
) {
	let start = scene.start_frame as usize;
	let end = scene.end_frame as usize;
	let frame_count = end - start + 1;

	let in_scene: Vec<&TrackedCharacter> = characters
		.iter()
		.filter(|c| c.scene_appearances.iter().any(|id| id == &scene.id))
		.collect();
	let primary = in_scene.first().copied();
	let subject = primary.map_or("the scene's subject", |c| c.label.as_str());

	// Entrance: the scene opens with a character on screen.
	if let Some(character) = primary {
		out.push(moment(
			scene,
			Some(character),
			&frames[start],
			MomentKind::Entrance,
			(0.4f64.mul_add(scene.motion_intensity, 50.0)).min(100.0),
			format!("{} appears as {} opens", character.label, scene.id),
		));
	}

	// Climax: the scene's motion peak, when it carries real drama.
	if frame_count > 1 {
		let mut peak_index = start + 1;
		let mut peak = f64::MIN;
		for i in start + 1..=end {
			if profile[i] > peak {
				peak = profile[i];
				peak_index = i;
			}
		}
		if peak > config.min_drama_threshold {
			out.push(moment(
				scene,
				primary,
				&frames[peak_index],
				MomentKind::Climax,
				(55.0 + 40.0 * (peak / 80.0)).min(100.0),
				format!("Motion peaks around {subject}"),
			));
		}
	}

	// Focus: late in the scene the camera holds still relative to the
	// scene's own activity level.
	if frame_count >= 3 {
		let interior = &profile[start + 1..=end];
		let mean = interior.iter().sum::<f64>() / interior.len() as f64;

		let skip = frame_count / 3;
		let mut min_index = start + skip.max(1);
		let mut min_value = f64::MAX;
		for i in (start + skip.max(1))..=end {
			if profile[i] < min_value {
				min_value = profile[i];
				min_index = i;
			}
		}
		if min_value < mean * 0.5 {
			let count = in_scene.len() as f64;
			out.push(moment(
				scene,
				primary,
				&frames[min_index],
				MomentKind::Focus,
				8.0f64.mul_add(count, 60.0).min(100.0),
				format!("The camera holds on {subject}"),
			));
		}
	}

	// Transformation: the first abrupt change well after the scene opened.
	for i in start + 1..=end {
		if frames[i].timestamp_seconds - scene.start_time <= config.late_start_offset {
			continue;
		}
		if profile[i] > config.abrupt_change_threshold {
			out.push(moment(
				scene,
				primary,
				&frames[i],
				MomentKind::Transformation,
				0.3f64.mul_add(profile[i], 65.0).min(100.0),
				format!("Abrupt visual change inside {}", scene.id),
			));
			break;
		}
	}

	// Exit: the scene closes with a character still on screen.
	if frame_count > 1 {
		if let Some(character) = primary {
			out.push(moment(
				scene,
				Some(character),
				&frames[end],
				MomentKind::Exit,
				(0.4 * scene.motion_intensity).max(20.0),
				format!("{} leaves as {} closes", character.label, scene.id),
			));
		}
	}
}

fn moment(
	scene: &Scene,
	character: Option<&TrackedCharacter>,
	frame: &SampledFrame,
	kind: MomentKind,
	importance: f64,
	description: String,
) -> KeyMoment {
	KeyMoment {
		id: String::new(),
		scene_id: scene.id.clone(),
		character_id: character.map(|c| c.id.clone()),
		timestamp: frame.timestamp_seconds,
		kind,
		importance,
		thumbnail: frame.thumbnail.clone(),
		description,
	}
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
	use crate::track::{track_characters, TrackerConfig};

	fn analyze(frames: &[SampledFrame]) -> (Vec<Scene>, Vec<TrackedCharacter>, Vec<KeyMoment>) {
		let seg = SegmentConfig::default();
		let profile = motion_profile(frames, seg.sample_stride);
		let scenes = segment_scenes(frames, &seg);
		let characters = track_characters(frames, &scenes, &profile, &TrackerConfig::default());
		let moments = detect_key_moments(
			frames,
			&scenes,
			&characters,
			&profile,
			&MomentConfig::default(),
		);
		(scenes, characters, moments)
	}

	/// Hard cut at second 5, static otherwise.
	fn hard_cut_sequence() -> Vec<SampledFrame> {
		(0..10)
			.map(|i| {
				let rgb = if i < 5 { [10, 10, 10] } else { [240, 240, 240] };
				solid_frame(i, f64::from(i), rgb)
			})
			.collect()
	}

	/// Scene 2 flashes its top-left cell, producing one tracked character.
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
	fn test_empty_input_yields_no_moments() {
		let (_, _, moments) = analyze(&[]);
		assert!(moments.is_empty());
	}

	#[test]
	fn test_static_video_without_characters_yields_no_moments() {
		let (_, characters, moments) = analyze(&static_sequence(10, [80, 80, 80]));
		assert!(characters.is_empty());
		assert!(moments.is_empty());
	}

	#[test]
	fn test_static_cut_produces_no_climax() {
		// The only motion is the cut itself; it belongs to the transition,
		// not to either scene's interior, so no climax may register.
		let (_, _, moments) = analyze(&hard_cut_sequence());
		assert!(moments.iter().all(|m| m.kind != MomentKind::Climax));
	}

	#[test]
	fn test_flashing_scene_emits_entrance_and_exit() {
		let (_, characters, moments) = analyze(&flashing_top_left_sequence());
		assert_eq!(characters.len(), 1);

		let entrance = moments.iter().find(|m| m.kind == MomentKind::Entrance);
		let exit = moments.iter().find(|m| m.kind == MomentKind::Exit);
		let entrance = entrance.expect("entrance moment");
		let exit = exit.expect("exit moment");

		assert_eq!(entrance.scene_id, "scene_02");
		assert_eq!(entrance.character_id.as_deref(), Some("character_01"));
		assert!((entrance.timestamp - 5.0).abs() < f64::EPSILON);
		assert!((exit.timestamp - 9.0).abs() < f64::EPSILON);
	}

	#[test]
	fn test_moments_stay_inside_their_scene() {
		let (scenes, _, moments) = analyze(&flashing_top_left_sequence());
		for moment in &moments {
			let scene = scenes
				.iter()
				.find(|s| s.id == moment.scene_id)
				.expect("owning scene");
			assert!(moment.timestamp >= scene.start_time);
			assert!(moment.timestamp <= scene.end_time);
		}
	}

	#[test]
	fn test_ranking_is_importance_desc_then_timestamp_asc() {
		let (_, _, moments) = analyze(&flashing_top_left_sequence());
		for pair in moments.windows(2) {
			let (a, b) = (&pair[0], &pair[1]);
			assert!(
				a.importance > b.importance
					|| ((a.importance - b.importance).abs() < f64::EPSILON
						&& a.timestamp <= b.timestamp)
			);
		}
	}

	#[test]
	fn test_ids_are_assigned_after_ranking() {
		let (_, _, moments) = analyze(&flashing_top_left_sequence());
		for (i, moment) in moments.iter().enumerate() {
			assert_eq!(moment.id, format!("moment_{:02}", i + 1));
		}
	}

	#[test]
	fn test_climax_triggers_on_intra_scene_spike() {
		// A single violent frame inside an otherwise calm scene.
		let mut frames: Vec<SampledFrame> =
			(0..8).map(|i| solid_frame(i, f64::from(i), [100, 100, 100])).collect();
		frames[4] = solid_frame(4, 4.0, [129, 129, 129]);

		let (scenes, _, _) = analyze(&frames);
		assert_eq!(scenes.len(), 1, "spike below cut threshold must not split");

		let (_, _, moments) = analyze(&frames);
		let climax = moments
			.iter()
			.find(|m| m.kind == MomentKind::Climax)
			.expect("climax moment");
		assert!((climax.timestamp - 4.0).abs() < f64::EPSILON);
		// peak MAD 29: importance = 55 + 40 * 29/80
		assert!((climax.importance - (55.0 + 40.0 * 29.0 / 80.0)).abs() < 1e-9);
	}

	#[test]
	fn test_focus_triggers_when_camera_settles() {
		// Active early scene, dead-still tail.
		let mut frames = Vec::new();
		for i in 0..4u32 {
			let v = if i % 2 == 0 { 100 } else { 120 };
			frames.push(solid_frame(i, f64::from(i), [v, v, v]));
		}
		for i in 4..9u32 {
			frames.push(solid_frame(i, f64::from(i), [120, 120, 120]));
		}

		let (_, _, moments) = analyze(&frames);
		let focus = moments.iter().find(|m| m.kind == MomentKind::Focus);
		assert!(focus.is_some(), "settled tail should register a focus hold");
	}

	#[test]
	fn test_transformation_requires_late_abrupt_change() {
		// 0.25 s sampling. An early blip at 0.5 s is inside the 1.5 s
		// grace window and must not register; a sustained jump at 1.75 s
		// does: it is late enough for a transformation but still inside
		// the min-scene-duration guard, so the scene does not split.
		let mut frames: Vec<SampledFrame> = (0..12)
			.map(|i| solid_frame(i, f64::from(i) * 0.25, [60, 60, 60]))
			.collect();
		frames[2] = solid_frame(2, 0.5, [110, 110, 110]);
		for i in 7..12u32 {
			frames[i as usize] = solid_frame(i, f64::from(i) * 0.25, [110, 110, 110]);
		}

		let (scenes, _, moments) = analyze(&frames);
		assert_eq!(scenes.len(), 1);

		let transformations: Vec<_> = moments
			.iter()
			.filter(|m| m.kind == MomentKind::Transformation)
			.collect();
		assert_eq!(transformations.len(), 1, "at most one per scene");
		assert!((transformations[0].timestamp - 1.75).abs() < f64::EPSILON);
	}

	#[test]
	fn test_moment_cap_bounds_output() {
		let frames = flashing_top_left_sequence();
		let seg = SegmentConfig::default();
		let profile = motion_profile(&frames, seg.sample_stride);
		let scenes = segment_scenes(&frames, &seg);
		let characters = track_characters(&frames, &scenes, &profile, &TrackerConfig::default());

		let config = MomentConfig {
			max_moments: 1,
			..MomentConfig::default()
		};
		let moments = detect_key_moments(&frames, &scenes, &characters, &profile, &config);
		assert_eq!(moments.len(), 1);
		assert_eq!(moments[0].id, "moment_01");
	}

	#[test]
	fn test_detection_is_deterministic() {
		let (_, _, a) = analyze(&flashing_top_left_sequence());
		let (_, _, b) = analyze(&flashing_top_left_sequence());
		assert_eq!(a.len(), b.len());
		for (x, y) in a.iter().zip(b.iter()) {
			assert_eq!(x.id, y.id);
			assert_eq!(x.kind, y.kind);
			assert!((x.importance - y.importance).abs() < f64::EPSILON);
			assert!((x.timestamp - y.timestamp).abs() < f64::EPSILON);
		}
	}
}
