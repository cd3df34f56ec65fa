use crate::{Chunk, UploadError};
use reqwest::multipart::{Form, Part};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Where chunks are posted
#[async_trait::async_trait]
pub trait ChunkSink: Send + Sync {
	/// Deliver one chunk. `Ok` means the receiver acknowledged it.
	async fn post(&self, chunk: &Chunk) -> Result<(), UploadError>;
}

/// `POST {base}/upload` as a multipart form, one request per chunk
#[derive(Debug, Clone)]
pub struct HttpChunkSink {
	client: reqwest::Client,
	endpoint: String,
}

impl HttpChunkSink {
	pub fn new(base_url: &str) -> Self {
		Self::with_client(reqwest::Client::new(), base_url)
	}

	pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
		Self {
			client,
			endpoint: format!("{}/upload", base_url.trim_end_matches('/')),
		}
	}

	pub fn endpoint(&self) -> &str {
		&self.endpoint
	}

	fn form(chunk: &Chunk) -> Form {
		let part = Part::bytes(chunk.payload.clone()).file_name(chunk.filename.clone());

		Form::new()
			.part("file", part)
			.text("chunk_index", chunk.index.to_string())
			.text("total_chunks", chunk.total_chunks.to_string())
			.text("session_id", chunk.session_id.clone())
			.text("filename", chunk.filename.clone())
			.text("language", chunk.language.to_string())
	}
}

#[async_trait::async_trait]
impl ChunkSink for HttpChunkSink {
	async fn post(&self, chunk: &Chunk) -> Result<(), UploadError> {
		let failed = |reason: String| UploadError::ChunkUploadFailed { index: chunk.index, reason };

		let res = self
			.client
			.post(&self.endpoint)
			.header(reqwest::header::ACCEPT, "application/json")
			.multipart(Self::form(chunk))
			.send()
			.await
			.map_err(|e| failed(e.to_string()))?;

		let status = res.status();
		if !status.is_success() {
			let body = res.text().await.unwrap_or_default();
			return Err(failed(format!("HTTP {status}: {body}")));
		}

		Ok(())
	}
}

/// Keeps every acknowledged chunk in memory. Failures can be scripted per index.
#[derive(Debug, Default)]
pub struct RecordingSink {
	posted: Mutex<Vec<Chunk>>,
	failures: Mutex<HashMap<u64, u32>>,
	attempts: Mutex<u64>,
}

impl RecordingSink {
	pub fn new() -> Self {
		Self::default()
	}

	/// Reject the next `times` posts of chunk `index`
	pub fn fail_on(&self, index: u64, times: u32) {
		self.failures.lock().unwrap_or_else(PoisonError::into_inner).insert(index, times);
	}

	/// Reject every post of chunk `index`
	pub fn fail_always_on(&self, index: u64) {
		self.fail_on(index, u32::MAX);
	}

	pub fn posted(&self) -> Vec<Chunk> {
		self.posted.lock().unwrap_or_else(PoisonError::into_inner).clone()
	}

	/// Posts seen, rejected ones included
	pub fn attempts(&self) -> u64 {
		*self.attempts.lock().unwrap_or_else(PoisonError::into_inner)
	}
}

#[async_trait::async_trait]
impl ChunkSink for RecordingSink {
	async fn post(&self, chunk: &Chunk) -> Result<(), UploadError> {
		*self.attempts.lock().unwrap_or_else(PoisonError::into_inner) += 1;

		{
			let mut failures = self.failures.lock().unwrap_or_else(PoisonError::into_inner);
			if let Some(remaining) = failures.get_mut(&chunk.index) {
				if *remaining > 0 {
					if *remaining != u32::MAX {
						*remaining -= 1;
					}
					return Err(UploadError::ChunkUploadFailed {
						index: chunk.index,
						reason: "HTTP 500 Internal Server Error: scripted failure".to_string(),
					});
				}
			}
		}

		self.posted.lock().unwrap_or_else(PoisonError::into_inner).push(chunk.clone());
		Ok(())
	}
}
