pub mod format;
pub mod key;
pub mod stream;
pub mod timeline;

pub use caption_events::Caption;
pub use format::format_timestamp;
pub use key::CaptionKey;
pub use stream::CaptionStream;
pub use timeline::{CaptionTimeline, Insertion};

use std::sync::Arc;

/// Caption state at one playback position, for rendering
#[derive(Debug, Clone, serde::Serialize)]
pub struct CaptionSnapshot {
	/// Playback position in seconds
	pub current_time: f64,
	/// The caption on screen, if any
	pub active: Option<Caption>,
	/// Index of `active` within `captions`
	pub active_index: Option<usize>,
	/// Full ordered timeline (caption history)
	pub captions: Arc<[Caption]>,
	/// Stream version for change tracking
	pub version: u64,
}

impl CaptionSnapshot {
	pub fn empty() -> Self {
		Self {
			current_time: 0.0,
			active: None,
			active_index: None,
			captions: Arc::from(Vec::new()),
			version: 0,
		}
	}
}

impl Default for CaptionSnapshot {
	fn default() -> Self {
		Self::empty()
	}
}
