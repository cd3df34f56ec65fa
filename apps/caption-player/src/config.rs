use caption_events::SupportedLanguages;
use caption_socket::{ConnectionConfig, RetryConfig};
use chunk_upload::{UploadConfig, DEFAULT_CHUNK_SIZE};
use clap::Parser;
use std::time::Duration;

#[derive(Parser, Debug, Clone)]
#[command(name = "caption-player")]
#[command(about = "Headless live-caption player", long_about = None)]
pub struct Config {
	/// Media to play: a local video file or a remote video URL
	#[arg(long, env = "CAPTION_MEDIA")]
	pub media: Option<String>,

	/// Backend base URL, chunks are posted to `{backend_url}/upload`
	#[arg(long, env = "CAPTION_BACKEND_URL", default_value = "http://localhost:8080")]
	pub backend_url: String,

	/// Event channel URL
	#[arg(long, env = "CAPTION_EVENTS_URL", default_value = "ws://localhost:8080/events")]
	pub events_url: String,

	/// Upload chunk size in bytes
	#[arg(long, env = "UPLOAD_CHUNK_SIZE", default_value_t = DEFAULT_CHUNK_SIZE)]
	pub chunk_size: u64,

	/// Re-posts of a failed chunk before the upload fails
	#[arg(long, env = "UPLOAD_CHUNK_RETRIES", default_value = "0")]
	pub chunk_retries: u32,

	#[arg(long, env = "MAX_RECONNECT_ATTEMPTS", default_value = "5")]
	pub max_reconnect_attempts: u32,

	#[arg(long, env = "RECONNECT_INITIAL_DELAY_MS", default_value = "1000")]
	pub reconnect_initial_delay_ms: u64,

	#[arg(long, env = "RECONNECT_MAX_DELAY_MS", default_value = "5000")]
	pub reconnect_max_delay_ms: u64,

	#[arg(long, env = "RECONNECT_MULTIPLIER", default_value = "2.0")]
	pub reconnect_multiplier: f64,

	/// Selectable caption languages
	#[arg(long, env = "CAPTION_LANGUAGES", value_delimiter = ',', default_value = "hi,bn,te,mr,ta,gu,kn,ml,pa,en")]
	pub languages: Vec<String>,

	/// Language selected at startup
	#[arg(long, env = "CAPTION_LANGUAGE", default_value = "hi")]
	pub language: String,

	/// Playback position sampling interval
	#[arg(long, env = "CLOCK_POLL_INTERVAL_MS", default_value = "250")]
	pub poll_interval_ms: u64,

	/// Log as JSON lines
	#[arg(long, env = "LOG_JSON")]
	pub log_json: bool,
}

impl Config {
	/// Validate configuration values
	pub fn validate(&self) -> Result<(), String> {
		if self.chunk_size == 0 {
			return Err("chunk_size must be greater than 0".to_string());
		}

		if self.poll_interval_ms == 0 {
			return Err("poll_interval_ms must be greater than 0".to_string());
		}

		self.retry_config().validate()?;

		let languages = self.supported_languages();
		if languages.is_empty() {
			return Err("at least one caption language is required".to_string());
		}
		languages.resolve(&self.language).map_err(|e| e.to_string())?;

		Ok(())
	}

	pub fn retry_config(&self) -> RetryConfig {
		RetryConfig {
			max_attempts: self.max_reconnect_attempts,
			initial_delay: Duration::from_millis(self.reconnect_initial_delay_ms),
			max_delay: Duration::from_millis(self.reconnect_max_delay_ms),
			backoff_multiplier: self.reconnect_multiplier,
		}
	}

	pub fn connection_config(&self) -> ConnectionConfig {
		ConnectionConfig {
			retry: self.retry_config(),
			..ConnectionConfig::default()
		}
	}

	pub fn upload_config(&self) -> UploadConfig {
		UploadConfig {
			chunk_size: self.chunk_size,
			chunk_retries: self.chunk_retries,
			..UploadConfig::default()
		}
	}

	pub fn supported_languages(&self) -> SupportedLanguages {
		SupportedLanguages::from_codes(&self.languages)
	}

	pub const fn poll_interval(&self) -> Duration {
		Duration::from_millis(self.poll_interval_ms)
	}
}
