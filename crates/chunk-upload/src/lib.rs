// chunk-upload
//
// Client side of the chunked upload protocol plus the reference receiver. A media file
// is cut into fixed-size chunks that share a session id; the backend addresses chunks by
// `(session_id, index)`, so re-sending one is harmless.

mod assembler;
mod error;
mod progress;
mod session;
mod sink;
mod source;

pub use assembler::{video_extension, Assembly, AssemblerConfig, ChunkAssembler, UploadStats, ALLOWED_VIDEO_EXTENSIONS};
pub use error::UploadError;
pub use progress::UploadProgress;
pub use session::{Chunk, UploadConfig, UploadMetadata, UploadSession, UploadStatus, DEFAULT_CHUNK_SIZE};
pub use sink::{ChunkSink, HttpChunkSink, RecordingSink};
pub use source::{ChunkSource, FileSource, MemorySource};
