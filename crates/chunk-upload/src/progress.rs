use crate::UploadStatus;
use serde::Serialize;

/// Reported after every acknowledged chunk and once more when the session ends
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadProgress {
	pub session_id: String,
	pub chunks_sent: u64,
	pub total_chunks: u64,
	pub status: UploadStatus,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}

impl UploadProgress {
	/// Whole percent of chunks acknowledged. An empty upload is 100% done.
	pub fn percent(&self) -> u8 {
		if self.total_chunks == 0 {
			return 100;
		}
		let percent = (self.chunks_sent.min(self.total_chunks) * 100 + self.total_chunks / 2) / self.total_chunks;
		u8::try_from(percent).unwrap_or(100)
	}

	pub const fn is_terminal(&self) -> bool {
		matches!(self.status, UploadStatus::Complete | UploadStatus::Failed)
	}

	/// User-facing status line
	pub fn status_line(&self) -> String {
		match self.status {
			UploadStatus::Pending => "Preparing upload...".to_string(),
			UploadStatus::InProgress => format!("Uploading: {}% ({}/{})", self.percent(), self.chunks_sent, self.total_chunks),
			UploadStatus::Complete => "Upload complete! Processing video...".to_string(),
			UploadStatus::Failed => "Upload failed".to_string(),
		}
	}
}
