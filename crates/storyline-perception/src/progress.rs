//! Progress events for the staged pipeline.
//!
//! The progress stream is an output-only side channel: consumers observe
//! stage transitions and intra-stage percentages but hold no control
//! authority, and a dropped receiver never stalls the pipeline: sends are
//! fire-and-forget.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

// ============================================================================
// Stages
// ============================================================================

/// Discrete pipeline stage.
///
/// Stages advance monotonically through the processing order; `Error` is
/// terminal and may follow any stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PipelineStage {
	/// Decoding and downscaling sampled frames
	SamplingFrames,
	/// Partitioning frames into scenes
	SegmentingScenes,
	/// Merging motion seeds into characters
	TrackingCharacters,
	/// Scoring and ranking key moments
	DetectingMoments,
	/// The result object is assembled
	Done,
	/// The run aborted
	Error,
}

impl PipelineStage {
	/// Stable kebab-case name.
	#[must_use]
	pub const fn as_str(&self) -> &'static str {
		match self {
			Self::SamplingFrames => "sampling-frames",
			Self::SegmentingScenes => "segmenting-scenes",
			Self::TrackingCharacters => "tracking-characters",
			Self::DetectingMoments => "detecting-moments",
			Self::Done => "done",
			Self::Error => "error",
		}
	}
}

// ============================================================================
// Updates
// ============================================================================

/// A single progress notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdate {
	/// Current stage
	pub stage: PipelineStage,

	/// Intra-stage completion, 0-100
	pub percent: u8,

	/// Human-readable status line
	pub message: String,
}

/// Sending half of a progress stream.
#[derive(Debug, Clone)]
pub struct ProgressSender {
	tx: mpsc::UnboundedSender<ProgressUpdate>,
}

impl ProgressSender {
	/// Create a connected sender/receiver pair.
	#[must_use]
	pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressUpdate>) {
		let (tx, rx) = mpsc::unbounded_channel();
		(Self { tx }, rx)
	}

	/// Publish an update. A closed receiver is ignored.
	pub fn update(&self, stage: PipelineStage, percent: u8, message: impl Into<String>) {
		let update = ProgressUpdate {
			stage,
			percent: percent.min(100),
			message: message.into(),
		};
		debug!(stage = update.stage.as_str(), percent = update.percent, "Progress");
		let _ = self.tx.send(update);
	}

	/// Publish a stage transition at 0%.
	pub fn stage_started(&self, stage: PipelineStage, message: impl Into<String>) {
		self.update(stage, 0, message);
	}

	/// Publish the terminal done event.
	pub fn done(&self, message: impl Into<String>) {
		self.update(PipelineStage::Done, 100, message);
	}

	/// Publish the terminal error event.
	pub fn error(&self, message: impl Into<String>) {
		self.update(PipelineStage::Error, 100, message);
	}
}

// ============================================================================
// Tests
// ============================================================================
