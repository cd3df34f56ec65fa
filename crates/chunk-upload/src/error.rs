use thiserror::Error;

#[derive(Debug, Error)]
pub enum UploadError {
	/// Network error or non-success response. Aborts the session.
	#[error("Chunk {index} upload failed: {reason}")]
	ChunkUploadFailed { index: u64, reason: String },

	#[error("Failed to read media: {0}")]
	Source(#[from] std::io::Error),

	#[error("Invalid chunk size: {0}")]
	InvalidChunkSize(u64),

	#[error("Chunk assembly failed: {0}")]
	Assembly(String),
}
