//! Scene Segmentation Example
//!
//! This example demonstrates the core analysis pipeline on a synthetic
//! frame sequence:
//! 1. Build frames for a video with two hard cuts and one moving region
//! 2. Segment the sequence into scenes
//! 3. Track characters and detect key moments
//!
//! Run with: `cargo run --example scene_segmentation`

use storyline_core::{
	detect_key_moments, motion_profile, segment_scenes, track_characters, MomentConfig,
	PixelBuffer, SampledFrame, SegmentConfig, TrackerConfig,
};

fn main() {
	println!("=== Scene Segmentation ===\n");

	// 18 seconds at 1 fps: dark scene, bright scene, dark scene. The middle
	// scene has a flashing block in the top-left region, which the tracker
	// will pick up as a character.
	let mut frames = Vec::new();
	for i in 0..18u32 {
		let base: [u8; 3] = match i {
			0..=5 => [20, 20, 20],
			6..=11 => [200, 200, 200],
			_ => [20, 20, 20],
		};
		let mut pixels = PixelBuffer::solid(160, 90, base);
		if (6..=11).contains(&i) && i % 2 == 0 {
			// Flash the top-left third of the frame.
			for y in 0..30 {
				for x in 0..53 {
					pixels.put_pixel(x, y, [255, 80, 80]);
				}
			}
		}
		frames.push(SampledFrame {
			index: i,
			timestamp_seconds: f64::from(i),
			pixels,
			thumbnail: Vec::new(),
		});
	}

	let seg = SegmentConfig::default();
	let profile = motion_profile(&frames, seg.sample_stride);
	let scenes = segment_scenes(&frames, &seg);
	let characters = track_characters(&frames, &scenes, &profile, &TrackerConfig::default());
	let moments =
		detect_key_moments(&frames, &scenes, &characters, &profile, &MomentConfig::default());

	println!("Scenes:");
	for scene in &scenes {
		println!(
			"  {} frames {:>2}-{:>2}  {:>4.1}s-{:>4.1}s  motion {:>5.1}",
			scene.id,
			scene.start_frame,
			scene.end_frame,
			scene.start_time,
			scene.end_time,
			scene.motion_intensity
		);
	}

	println!("\nCharacters:");
	for character in &characters {
		println!(
			"  {} ({})  seen {:.1}s-{:.1}s  region ({:.2},{:.2})  confidence {:.0}",
			character.id,
			character.label,
			character.first_seen,
			character.last_seen,
			character.dominant_region.x,
			character.dominant_region.y,
			character.confidence
		);
	}

	println!("\nKey moments:");
	for moment in &moments {
		println!(
			"  {}  {:<14}  {:>4.1}s  importance {:>5.1}  {}",
			moment.id,
			moment.kind.as_str(),
			moment.timestamp,
			moment.importance,
			moment.description
		);
	}
}
