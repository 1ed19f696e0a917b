//! Input preconditions.
//!
//! Size and format checks run before any decoding starts; a rejected file
//! never reaches FFmpeg. Rejections are always recoverable: the user fixes
//! them by uploading a different file.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::{Result, StoryError};

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for input validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
	/// Maximum accepted file size in bytes
	pub max_file_size_bytes: u64,

	/// Accepted file extensions, lowercase, without the dot
	pub allowed_extensions: Vec<String>,

	/// Accepted MIME types for when the caller declares one
	pub allowed_mime_types: Vec<String>,
}

impl Default for ValidationConfig {
	fn default() -> Self {
		Self {
			max_file_size_bytes: 500 * 1024 * 1024,
			allowed_extensions: ["mp4", "mov", "m4v", "webm", "mkv", "avi"]
				.iter()
				.map(ToString::to_string)
				.collect(),
			allowed_mime_types: [
				"video/mp4",
				"video/quicktime",
				"video/webm",
				"video/x-matroska",
				"video/x-msvideo",
			]
			.iter()
			.map(ToString::to_string)
			.collect(),
		}
	}
}

// ============================================================================
// Validation
// ============================================================================

/// Validate an input file against the configured preconditions.
///
/// Returns the file size in bytes on success.
///
/// # Errors
///
/// [`StoryError::VideoNotFound`] when the path does not exist,
/// [`StoryError::UnsupportedFormat`] for a disallowed extension or declared
/// MIME type, and [`StoryError::FileTooLarge`] past the size limit.
#[instrument(skip_all, fields(video = %video_path.as_ref().display()))]
pub async fn validate_source(
	video_path: impl AsRef<Path>,
	declared_mime: Option<&str>,
	config: &ValidationConfig,
) -> Result<u64> {
	let video_path = video_path.as_ref();

	if !video_path.exists() {
		return Err(StoryError::VideoNotFound(video_path.to_path_buf()));
	}

	let extension = video_path
		.extension()
		.map(|e| e.to_string_lossy().to_lowercase())
		.unwrap_or_default();
	if !config.allowed_extensions.iter().any(|e| e == &extension) {
		return Err(StoryError::UnsupportedFormat {
			detail: if extension.is_empty() {
				"missing file extension".to_string()
			} else {
				format!(".{extension}")
			},
		});
	}

	if let Some(mime) = declared_mime {
		let mime = mime.to_lowercase();
		if !config.allowed_mime_types.iter().any(|m| m == &mime) {
			return Err(StoryError::UnsupportedFormat { detail: mime });
		}
	}

	let size_bytes = tokio::fs::metadata(video_path).await?.len();
	if size_bytes > config.max_file_size_bytes {
		return Err(StoryError::FileTooLarge {
			size_bytes,
			max_bytes: config.max_file_size_bytes,
		});
	}

	debug!(size_bytes, %extension, "Input accepted");
	Ok(size_bytes)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
	use super::*;
	use std::path::PathBuf;

	/// A real temp file with the given extension and contents.
	async fn temp_file(extension: &str, bytes: &[u8]) -> PathBuf {
		let path = std::env::temp_dir().join(format!(
			"storyline-validate-{}.{extension}",
			uuid::Uuid::new_v4()
		));
		tokio::fs::write(&path, bytes).await.expect("write temp file");
		path
	}

	#[tokio::test]
	async fn test_accepts_allowed_extension() {
		let path = temp_file("mp4", b"stub").await;
		let size = validate_source(&path, None, &ValidationConfig::default()).await;
		assert_eq!(size.ok(), Some(4));
		let _ = tokio::fs::remove_file(&path).await;
	}

	#[tokio::test]
	async fn test_rejects_executable_extension() {
		let path = temp_file("exe", b"MZ").await;
		let err = validate_source(&path, None, &ValidationConfig::default())
			.await
			.expect_err("exe must be rejected");
		assert!(err.is_validation());
		let _ = tokio::fs::remove_file(&path).await;
	}

	#[tokio::test]
	async fn test_rejects_disallowed_mime() {
		let path = temp_file("mp4", b"stub").await;
		let err = validate_source(&path, Some("application/octet-stream"), &ValidationConfig::default())
			.await
			.expect_err("mime must be rejected");
		assert!(matches!(err, StoryError::UnsupportedFormat { .. }));
		let _ = tokio::fs::remove_file(&path).await;
	}

	#[tokio::test]
	async fn test_accepts_declared_mime_case_insensitively() {
		let path = temp_file("mp4", b"stub").await;
		let result = validate_source(&path, Some("Video/MP4"), &ValidationConfig::default()).await;
		assert!(result.is_ok());
		let _ = tokio::fs::remove_file(&path).await;
	}

	#[tokio::test]
	async fn test_rejects_oversized_file() {
		let path = temp_file("mp4", &[0u8; 64]).await;
		let config = ValidationConfig {
			max_file_size_bytes: 16,
			..ValidationConfig::default()
		};
		let err = validate_source(&path, None, &config)
			.await
			.expect_err("oversized file must be rejected");
		assert!(matches!(
			err,
			StoryError::FileTooLarge {
				size_bytes: 64,
				max_bytes: 16
			}
		));
		let _ = tokio::fs::remove_file(&path).await;
	}

	#[tokio::test]
	async fn test_missing_file_is_not_a_validation_error() {
		let err = validate_source("/nonexistent/clip.mp4", None, &ValidationConfig::default())
			.await
			.expect_err("missing file");
		assert!(matches!(err, StoryError::VideoNotFound(_)));
		assert!(!err.is_validation());
	}
}
