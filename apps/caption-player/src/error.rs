use caption_events::UnsupportedLanguage;
use caption_socket::ConnectionError;
use chunk_upload::UploadError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
	#[error("not a recognised video URL: {0}")]
	InvalidVideoUrl(String),

	#[error(transparent)]
	UnsupportedLanguage(#[from] UnsupportedLanguage),

	#[error("connection error: {0}")]
	Connection(#[from] ConnectionError),

	#[error("upload error: {0}")]
	Upload(#[from] UploadError),

	#[error("media file error: {0}")]
	Io(#[from] std::io::Error),

	#[error("session orchestrator is not running")]
	Unavailable,
}
