//! # Storyline Perception
//!
//! Video decoding and the staged story-analysis pipeline.
//!
//! This crate owns everything that touches the outside world: input
//! validation, FFprobe metadata, FFmpeg-CLI frame sampling, and progress
//! reporting. The numeric analysis itself (scene segmentation, character
//! tracking, key-moment detection) lives in `storyline-core` and is pure;
//! this crate drives it.
//!
//! FFmpeg runs as an external process rather than a linked library for:
//! - Simplicity and reliability
//! - No complex build dependencies
//! - Consistent behavior across platforms
//! - Support for all video formats FFmpeg supports
//!
//! ## Example
//!
//! ```rust,no_run
//! use storyline_perception::{
//! 	analyze_video, CancelToken, PipelineConfig, ProgressSender,
//! };
//!
//! # async fn run() -> storyline_perception::Result<()> {
//! let (progress, mut updates) = ProgressSender::channel();
//! let cancel = CancelToken::new();
//!
//! let handle = tokio::spawn(async move {
//! 	while let Some(update) = updates.recv().await {
//! 		println!("[{}] {}% {}", update.stage.as_str(), update.percent, update.message);
//! 	}
//! });
//!
//! let analysis = analyze_video(
//! 	"upload.mp4",
//! 	Some("video/mp4"),
//! 	&PipelineConfig::default(),
//! 	Some(&progress),
//! 	&cancel,
//! )
//! .await?;
//! drop(progress);
//! let _ = handle.await;
//!
//! println!(
//! 	"{} scenes, {} characters, {} moments in {} ms",
//! 	analysis.scenes.len(),
//! 	analysis.characters.len(),
//! 	analysis.moments.len(),
//! 	analysis.processing_ms
//! );
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::needless_return)]

pub mod error;
pub mod pipeline;
pub mod probe;
pub mod progress;
pub mod sampler;
pub mod validate;

pub use error::{Result, StoryError};
pub use pipeline::{
	analyze_video, analyze_video_with, analyze_video_with_deadline, PipelineConfig,
	ProcessingStats, StoryAnalysis,
};
pub use probe::{check_ffmpeg, check_ffprobe, probe_metadata};
pub use progress::{PipelineStage, ProgressSender, ProgressUpdate};
pub use sampler::{CancelToken, FrameSampler, SamplerConfig};
pub use validate::{validate_source, ValidationConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
