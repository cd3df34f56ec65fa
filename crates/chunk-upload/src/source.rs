use std::io::{self, SeekFrom};
use std::ops::Range;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

/// Random-access bytes of the media being uploaded
#[async_trait::async_trait]
pub trait ChunkSource: Send {
	/// Total size in bytes
	fn size(&self) -> u64;

	async fn read_range(&mut self, range: Range<u64>) -> io::Result<Vec<u8>>;
}

fn range_len(range: &Range<u64>) -> io::Result<usize> {
	usize::try_from(range.end.saturating_sub(range.start)).map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "chunk does not fit in memory"))
}

/// A media file on disk
#[derive(Debug)]
pub struct FileSource {
	path: PathBuf,
	file: File,
	size: u64,
}

impl FileSource {
	pub async fn open(path: impl AsRef<Path>) -> io::Result<Self> {
		let path = path.as_ref().to_path_buf();
		let file = File::open(&path).await?;
		let size = file.metadata().await?.len();
		Ok(Self { path, file, size })
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Final path component, the name reported to the backend
	pub fn file_name(&self) -> Option<String> {
		self.path.file_name().map(|name| name.to_string_lossy().into_owned())
	}
}

#[async_trait::async_trait]
impl ChunkSource for FileSource {
	fn size(&self) -> u64 {
		self.size
	}

	async fn read_range(&mut self, range: Range<u64>) -> io::Result<Vec<u8>> {
		let mut buf = vec![0; range_len(&range)?];
		self.file.seek(SeekFrom::Start(range.start)).await?;
		self.file.read_exact(&mut buf).await?;
		Ok(buf)
	}
}

/// Bytes already in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
	bytes: Vec<u8>,
}

impl From<Vec<u8>> for MemorySource {
	fn from(bytes: Vec<u8>) -> Self {
		Self { bytes }
	}
}

#[async_trait::async_trait]
impl ChunkSource for MemorySource {
	fn size(&self) -> u64 {
		self.bytes.len() as u64
	}

	async fn read_range(&mut self, range: Range<u64>) -> io::Result<Vec<u8>> {
		let start = usize::try_from(range.start).map_err(|_| io::Error::from(io::ErrorKind::InvalidInput))?;
		let end = start + range_len(&range)?;
		self.bytes.get(start..end).map(<[u8]>::to_vec).ok_or_else(|| io::Error::from(io::ErrorKind::UnexpectedEof))
	}
}
