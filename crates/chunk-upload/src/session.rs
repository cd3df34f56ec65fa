use crate::{ChunkSink, ChunkSource, UploadError, UploadProgress};
use caption_events::Language;
use chrono::Utc;
use serde::Serialize;
use std::ops::Range;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// 5 MiB, the size both ends agree on out of band
pub const DEFAULT_CHUNK_SIZE: u64 = 5 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
	Pending,
	InProgress,
	Failed,
	Complete,
}

#[derive(Debug, Clone)]
pub struct UploadConfig {
	pub chunk_size: u64,
	/// Extra posts of the same chunk after a failure. 0 aborts on the first failure.
	pub chunk_retries: u32,
	pub retry_delay: Duration,
}

impl Default for UploadConfig {
	fn default() -> Self {
		Self {
			chunk_size: DEFAULT_CHUNK_SIZE,
			chunk_retries: 0,
			retry_delay: Duration::from_millis(500),
		}
	}
}

#[derive(Debug, Clone)]
pub struct UploadMetadata {
	pub filename: String,
	pub language: Language,
}

/// One posted piece of the file, addressed by `(session_id, index)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
	pub session_id: String,
	pub index: u64,
	pub total_chunks: u64,
	pub byte_range: Range<u64>,
	pub payload: Vec<u8>,
	pub filename: String,
	pub language: Language,
}

/// Sequential upload of one file. Chunks go out strictly in index order with one in
/// flight; `next_index` only advances on an acknowledged post.
#[derive(Debug)]
pub struct UploadSession<S> {
	session_id: String,
	filename: String,
	language: Language,
	chunk_size: u64,
	file_size: u64,
	total_chunks: u64,
	status: UploadStatus,
	next_index: u64,
	chunk_retries: u32,
	retry_delay: Duration,
	source: S,
}

/// `<unix millis>_<9 random hex chars>`, fresh for every upload attempt
fn generate_session_id() -> String {
	let random = uuid::Uuid::new_v4().simple().to_string();
	format!("{}_{}", Utc::now().timestamp_millis(), &random[..9])
}

impl<S: ChunkSource> UploadSession<S> {
	pub fn new(source: S, metadata: UploadMetadata, config: &UploadConfig) -> Result<Self, UploadError> {
		if config.chunk_size == 0 {
			return Err(UploadError::InvalidChunkSize(config.chunk_size));
		}

		let file_size = source.size();
		Ok(Self {
			session_id: generate_session_id(),
			filename: metadata.filename,
			language: metadata.language,
			chunk_size: config.chunk_size,
			file_size,
			total_chunks: file_size.div_ceil(config.chunk_size),
			status: UploadStatus::Pending,
			next_index: 0,
			chunk_retries: config.chunk_retries,
			retry_delay: config.retry_delay,
			source,
		})
	}

	/// Move to `in_progress`. An empty file has nothing to send and completes here.
	pub fn start(&mut self) {
		if self.status != UploadStatus::Pending {
			return;
		}

		self.status = if self.total_chunks == 0 { UploadStatus::Complete } else { UploadStatus::InProgress };
		info!(
			session_id = %self.session_id,
			filename = %self.filename,
			language = %self.language,
			file_size = self.file_size,
			total_chunks = self.total_chunks,
			"upload started"
		);
	}

	pub fn session_id(&self) -> &str {
		&self.session_id
	}

	pub fn filename(&self) -> &str {
		&self.filename
	}

	pub const fn language(&self) -> &Language {
		&self.language
	}

	pub const fn total_chunks(&self) -> u64 {
		self.total_chunks
	}

	pub const fn chunk_size(&self) -> u64 {
		self.chunk_size
	}

	pub const fn file_size(&self) -> u64 {
		self.file_size
	}

	pub const fn status(&self) -> UploadStatus {
		self.status
	}

	pub const fn next_index(&self) -> u64 {
		self.next_index
	}

	/// `[index * chunk_size, min((index + 1) * chunk_size, file_size))`
	pub fn byte_range(&self, index: u64) -> Option<Range<u64>> {
		if index >= self.total_chunks {
			return None;
		}
		let start = index * self.chunk_size;
		let end = start.saturating_add(self.chunk_size).min(self.file_size);
		Some(start..end)
	}

	pub fn progress(&self) -> UploadProgress {
		UploadProgress {
			session_id: self.session_id.clone(),
			chunks_sent: self.next_index,
			total_chunks: self.total_chunks,
			status: self.status,
			error: None,
		}
	}

	async fn read_chunk(&mut self, index: u64) -> Result<Chunk, UploadError> {
		let byte_range = self.byte_range(index).ok_or(UploadError::InvalidChunkSize(self.chunk_size))?;
		let payload = self.source.read_range(byte_range.clone()).await?;

		Ok(Chunk {
			session_id: self.session_id.clone(),
			index,
			total_chunks: self.total_chunks,
			byte_range,
			payload,
			filename: self.filename.clone(),
			language: self.language.clone(),
		})
	}

	/// Post chunk `next_index`. Any failure that outlives the retry budget marks the
	/// session failed; nothing is sent after that.
	pub async fn upload_next<K: ChunkSink + ?Sized>(&mut self, sink: &K) -> Result<UploadStatus, UploadError> {
		if self.status == UploadStatus::Pending {
			self.start();
		}
		if self.status != UploadStatus::InProgress {
			return Ok(self.status);
		}

		let index = self.next_index;
		let chunk = match self.read_chunk(index).await {
			Ok(chunk) => chunk,
			Err(e) => {
				self.status = UploadStatus::Failed;
				error!(session_id = %self.session_id, chunk_index = index, error = %e, "failed to read chunk");
				return Err(e);
			}
		};

		let mut attempt = 0;
		loop {
			match sink.post(&chunk).await {
				Ok(()) => break,
				Err(e) if attempt < self.chunk_retries => {
					attempt += 1;
					warn!(session_id = %self.session_id, chunk_index = index, attempt, error = %e, "chunk post failed, retrying");
					tokio::time::sleep(self.retry_delay).await;
				}
				Err(e) => {
					self.status = UploadStatus::Failed;
					error!(session_id = %self.session_id, chunk_index = index, error = %e, "chunk post failed, aborting upload");
					return Err(e);
				}
			}
		}

		self.next_index += 1;
		debug!(session_id = %self.session_id, chunk_index = index, total_chunks = self.total_chunks, bytes = chunk.payload.len(), "chunk acknowledged");

		if self.next_index == self.total_chunks {
			self.status = UploadStatus::Complete;
			info!(session_id = %self.session_id, total_chunks = self.total_chunks, "upload complete");
		}

		Ok(self.status)
	}

	/// Drive the session to the end, reporting progress after every acknowledged chunk and
	/// once at the end. `cancel` is checked between chunks only; an in-flight post always
	/// resolves. Returns the last report.
	pub async fn run<K: ChunkSink + ?Sized>(mut self, sink: &K, progress: &mpsc::Sender<UploadProgress>, cancel: &CancellationToken) -> UploadProgress {
		self.start();

		while self.status == UploadStatus::InProgress {
			if cancel.is_cancelled() {
				info!(session_id = %self.session_id, next_index = self.next_index, "upload superseded, stopping");
				return self.progress();
			}

			match self.upload_next(sink).await {
				Ok(UploadStatus::InProgress) => {
					let _ = progress.send(self.progress()).await;
				}
				Ok(_) => {}
				Err(e) => {
					let report = UploadProgress {
						error: Some(e.to_string()),
						..self.progress()
					};
					let _ = progress.send(report.clone()).await;
					return report;
				}
			}
		}

		let report = self.progress();
		let _ = progress.send(report.clone()).await;
		report
	}
}
