use crate::{Chunk, UploadError};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub const ALLOWED_VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "mkv", "flv", "wmv", "webm", "m4v", "mpg", "mpeg", "3gp"];

#[derive(Debug, Clone)]
pub struct AssemblerConfig {
	pub upload_dir: PathBuf,
	pub temp_dir: PathBuf,
	/// Merged files larger than this are discarded
	pub max_file_size: u64,
}

impl Default for AssemblerConfig {
	fn default() -> Self {
		Self {
			upload_dir: PathBuf::from("./uploads"),
			temp_dir: PathBuf::from("./temp_chunks"),
			max_file_size: 5 * 1024 * 1024 * 1024,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assembly {
	/// Stored; `missing` chunk indices are still outstanding
	Partial { index: u64, missing: Vec<u64> },
	Complete { path: PathBuf, size: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UploadStats {
	pub uploaded_files: usize,
	pub active_uploads: usize,
}

/// Receiving end of the upload protocol. Chunks are stored by `(session_id, index)`, so a
/// re-sent chunk overwrites itself; the file is merged once every index is present. Chunks
/// arriving for a session that was already merged get the earlier result back.
#[derive(Debug)]
pub struct ChunkAssembler {
	config: AssemblerConfig,
	/// Merged sessions; the lock also serializes storing and merging
	completed: Mutex<HashMap<String, (PathBuf, u64)>>,
}

fn assembly_err(context: &str, path: &Path, e: &std::io::Error) -> UploadError {
	UploadError::Assembly(format!("{context} {}: {e}", path.display()))
}

/// Lowercased extension if it is an accepted video type
pub fn video_extension(filename: &str) -> Option<String> {
	let (_, ext) = filename.rsplit_once('.')?;
	let ext = ext.to_ascii_lowercase();
	ALLOWED_VIDEO_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

fn valid_session_id(session_id: &str) -> bool {
	!session_id.is_empty() && session_id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

impl ChunkAssembler {
	pub async fn new(config: AssemblerConfig) -> Result<Self, UploadError> {
		for dir in [&config.upload_dir, &config.temp_dir] {
			fs::create_dir_all(dir).await.map_err(|e| assembly_err("creating", dir, &e))?;
		}

		Ok(Self {
			config,
			completed: Mutex::new(HashMap::new()),
		})
	}

	pub const fn config(&self) -> &AssemblerConfig {
		&self.config
	}

	fn session_dir(&self, session_id: &str) -> PathBuf {
		self.config.temp_dir.join(session_id)
	}

	fn chunk_path(&self, session_id: &str, index: u64) -> PathBuf {
		self.session_dir(session_id).join(format!("chunk_{index:06}"))
	}

	pub async fn receive(&self, chunk: &Chunk) -> Result<Assembly, UploadError> {
		let Some(ext) = video_extension(&chunk.filename) else {
			return Err(UploadError::Assembly(format!("file type not allowed: {}", chunk.filename)));
		};
		if !valid_session_id(&chunk.session_id) {
			return Err(UploadError::Assembly(format!("invalid session id: {:?}", chunk.session_id)));
		}
		if chunk.index >= chunk.total_chunks {
			return Err(UploadError::Assembly(format!("chunk index {} out of range for {} chunks", chunk.index, chunk.total_chunks)));
		}

		let mut completed = self.completed.lock().await;
		if let Some((path, size)) = completed.get(&chunk.session_id) {
			debug!(session_id = %chunk.session_id, chunk_index = chunk.index, "chunk for merged session ignored");
			return Ok(Assembly::Complete { path: path.clone(), size: *size });
		}

		let dir = self.session_dir(&chunk.session_id);
		fs::create_dir_all(&dir).await.map_err(|e| assembly_err("creating", &dir, &e))?;

		let path = self.chunk_path(&chunk.session_id, chunk.index);
		fs::write(&path, &chunk.payload).await.map_err(|e| assembly_err("writing", &path, &e))?;
		debug!(
			session_id = %chunk.session_id,
			chunk_index = chunk.index,
			total_chunks = chunk.total_chunks,
			bytes = chunk.payload.len(),
			"chunk stored"
		);

		let missing = self.missing_chunks(&chunk.session_id, chunk.total_chunks).await;
		if !missing.is_empty() {
			return Ok(Assembly::Partial { index: chunk.index, missing });
		}

		let (path, size) = self.merge(&chunk.session_id, chunk.total_chunks, &ext).await?;
		completed.insert(chunk.session_id.clone(), (path.clone(), size));
		Ok(Assembly::Complete { path, size })
	}

	/// Indices in `[0, total_chunks)` not stored yet
	pub async fn missing_chunks(&self, session_id: &str, total_chunks: u64) -> Vec<u64> {
		let mut missing = Vec::new();
		for index in 0..total_chunks {
			if !fs::try_exists(self.chunk_path(session_id, index)).await.unwrap_or(false) {
				missing.push(index);
			}
		}
		missing
	}

	/// Concatenate every chunk into a fresh file under the upload dir. A failed merge leaves
	/// no output file behind.
	async fn merge(&self, session_id: &str, total_chunks: u64, ext: &str) -> Result<(PathBuf, u64), UploadError> {
		let unique = uuid::Uuid::new_v4().simple().to_string();
		let final_path = self.config.upload_dir.join(format!("video_{}.{ext}", &unique[..8]));
		info!(session_id, total_chunks, path = %final_path.display(), "merging chunks");

		let out = fs::File::create(&final_path).await.map_err(|e| assembly_err("creating", &final_path, &e))?;
		match self.write_chunks(out, session_id, total_chunks, &final_path).await {
			Ok(size) => {
				self.cleanup_session(session_id).await;
				info!(session_id, size, path = %final_path.display(), "merge complete");
				Ok((final_path, size))
			}
			Err(e) => {
				warn!(session_id, error = %e, "merge failed, discarding output");
				match fs::remove_file(&final_path).await {
					Ok(()) => {}
					Err(remove) if remove.kind() == std::io::ErrorKind::NotFound => {}
					Err(remove) => warn!(path = %final_path.display(), error = %remove, "failed to remove partial merge"),
				}
				Err(e)
			}
		}
	}

	async fn write_chunks(&self, mut out: fs::File, session_id: &str, total_chunks: u64, final_path: &Path) -> Result<u64, UploadError> {
		let mut size = 0u64;
		for index in 0..total_chunks {
			let chunk_path = self.chunk_path(session_id, index);
			let bytes = fs::read(&chunk_path).await.map_err(|e| assembly_err("reading", &chunk_path, &e))?;
			size += bytes.len() as u64;

			if size > self.config.max_file_size {
				self.cleanup_session(session_id).await;
				return Err(UploadError::Assembly(format!("file exceeds {} bytes", self.config.max_file_size)));
			}

			out.write_all(&bytes).await.map_err(|e| assembly_err("writing", final_path, &e))?;
		}
		out.flush().await.map_err(|e| assembly_err("flushing", final_path, &e))?;
		Ok(size)
	}

	/// Drop every stored chunk of a session
	pub async fn cleanup_session(&self, session_id: &str) {
		if !valid_session_id(session_id) {
			return;
		}

		let dir = self.session_dir(session_id);
		match fs::remove_dir_all(&dir).await {
			Ok(()) => debug!(session_id, "session chunks removed"),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
			Err(e) => warn!(session_id, error = %e, "failed to remove session chunks"),
		}
	}

	pub async fn stats(&self) -> UploadStats {
		UploadStats {
			uploaded_files: count_entries(&self.config.upload_dir).await,
			active_uploads: count_entries(&self.config.temp_dir).await,
		}
	}
}

/// Lets an upload session post straight into a local assembler
#[async_trait::async_trait]
impl crate::ChunkSink for ChunkAssembler {
	async fn post(&self, chunk: &Chunk) -> Result<(), UploadError> {
		self.receive(chunk).await.map(|_| ()).map_err(|e| UploadError::ChunkUploadFailed {
			index: chunk.index,
			reason: e.to_string(),
		})
	}
}

async fn count_entries(dir: &Path) -> usize {
	let Ok(mut entries) = fs::read_dir(dir).await else {
		return 0;
	};

	let mut count = 0;
	while let Ok(Some(_)) = entries.next_entry().await {
		count += 1;
	}
	count
}
