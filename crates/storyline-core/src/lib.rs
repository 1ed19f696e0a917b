//! # Storyline Core
//!
//! Deterministic story analysis for video: scene segmentation, character
//! tracking, and key-moment detection over a sampled frame sequence.
//!
//! ## Why Heuristic Vision?
//!
//! Most video understanding stacks reach for a trained detector. This crate
//! deliberately does not: every judgment is a deterministic pixel-difference
//! heuristic, so byte-identical input always produces byte-identical output,
//! there are no model weights to ship, and every threshold is a constant an
//! implementer can reason about.
//!
//! - **Motion** is the strided mean absolute difference (MAD) between
//!   consecutive frames, on a 0-255 scale.
//! - **Scenes** are the spans between MAD threshold crossings, guarded by a
//!   minimum scene duration so flicker cannot shatter the timeline.
//! - **Characters** are recurring high-motion regions of a fixed 3x3 grid,
//!   merged across scenes by dominant cell.
//! - **Key moments** are five narrative shapes (entrance, climax, focus,
//!   transformation, exit) scored 0-100, ranked, and capped.
//!
//! The heuristics sit behind the [`segment::SceneDetector`] and
//! [`track::CharacterTracker`] seams so a trained backend can replace them
//! without touching orchestration.
//!
//! ## Pipeline Shape
//!
//! Analysis is strictly staged and one-directional:
//!
//! ```text
//! frames -> motion profile -> scenes -> characters -> key moments
//! ```
//!
//! Every stage is a pure function of its inputs and cannot fail: an input
//! with no cuts, no motion, or no frames degrades to empty-but-valid output,
//! never to an error.
//!
//! ## Example
//!
//! ```rust
//! use storyline_core::{
//! 	frame::{PixelBuffer, SampledFrame},
//! 	moment::{detect_key_moments, MomentConfig},
//! 	motion::motion_profile,
//! 	segment::{segment_scenes, SegmentConfig},
//! 	track::{track_characters, TrackerConfig},
//! };
//!
//! // Two seconds of black, then two seconds of white, sampled at 1 fps.
//! let frames: Vec<SampledFrame> = (0..8)
//! 	.map(|i| {
//! 		let level = if i < 4 { 0 } else { 255 };
//! 		SampledFrame {
//! 			index: i,
//! 			timestamp_seconds: f64::from(i),
//! 			pixels: PixelBuffer::solid(160, 90, [level, level, level]),
//! 			thumbnail: Vec::new(),
//! 		}
//! 	})
//! 	.collect();
//!
//! let seg = SegmentConfig::default();
//! let profile = motion_profile(&frames, seg.sample_stride);
//! let scenes = segment_scenes(&frames, &seg);
//! let characters = track_characters(&frames, &scenes, &profile, &TrackerConfig::default());
//! let moments = detect_key_moments(
//! 	&frames,
//! 	&scenes,
//! 	&characters,
//! 	&profile,
//! 	&MomentConfig::default(),
//! );
//!
//! assert_eq!(scenes.len(), 2);
//! assert_eq!(scenes[1].start_frame, 4);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::needless_return)]

pub mod frame;
pub mod moment;
pub mod motion;
pub mod segment;
pub mod track;

pub use frame::{PixelBuffer, SampledFrame, VideoMetadata, CHANNELS};
pub use moment::{detect_key_moments, KeyMoment, MomentConfig, MomentKind};
pub use motion::{
	cell_mean_abs_diff, cell_pixel_bounds, mean_abs_diff, motion_profile, region_mean_abs_diff,
	CELL_COUNT, CENTER_CELL, DEFAULT_STRIDE, GRID_DIM, MAX_DIFF,
};
pub use segment::{segment_scenes, MotionSceneDetector, Scene, SceneDetector, SegmentConfig};
pub use track::{
	track_characters, CharacterTracker, GridCharacterTracker, RegionRect, TrackedCharacter,
	TrackerConfig,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
