use crate::timeline::{CaptionTimeline, Insertion};
use crate::CaptionSnapshot;
use caption_events::Caption;
use std::sync::Arc;
use tracing::{debug, trace};

/// Live caption store fed by the event channel.
///
/// Captions arrive in wire order, which need not match `start_time` order; the
/// underlying timeline absorbs that. Re-delivered captions are no-ops.
#[derive(Debug, Default)]
pub struct CaptionStream {
	timeline: CaptionTimeline,
	/// bumped on every change that observers can see
	version: u64,
	duplicates: u64,
	shared: Option<Arc<[Caption]>>,
}

impl CaptionStream {
	pub fn new() -> Self {
		Self::default()
	}

	/// Add a caption. Returns the insertion result; the updated ordered timeline is
	/// available through [`CaptionStream::captions`].
	pub fn ingest(&mut self, caption: Caption) -> Insertion {
		let start = caption.start_time;
		let outcome = self.timeline.insert(caption);

		match outcome {
			Insertion::Inserted { index } => {
				self.version += 1;
				self.shared = None;
				trace!(start, index, len = self.timeline.len(), "caption ingested");
			}
			Insertion::Duplicate => {
				self.duplicates += 1;
				debug!(start, duplicates = self.duplicates, "duplicate caption ignored");
			}
		}

		outcome
	}

	/// The caption to show at playback position `time`, if any.
	pub fn active_at(&self, time: f64) -> Option<&Caption> {
		self.timeline.active_at(time)
	}

	/// Drop every caption, e.g. on new media or a language switch.
	pub fn reset(&mut self) {
		if !self.timeline.is_empty() {
			debug!(dropped = self.timeline.len(), "caption stream reset");
		}
		self.timeline.clear();
		self.duplicates = 0;
		self.version += 1;
		self.shared = None;
	}

	pub fn captions(&self) -> &[Caption] {
		self.timeline.as_slice()
	}

	pub fn timeline(&self) -> &CaptionTimeline {
		&self.timeline
	}

	pub fn len(&self) -> usize {
		self.timeline.len()
	}

	pub fn is_empty(&self) -> bool {
		self.timeline.is_empty()
	}

	pub const fn version(&self) -> u64 {
		self.version
	}

	pub const fn duplicates(&self) -> u64 {
		self.duplicates
	}

	/// Shared copy of the ordered timeline, rebuilt only after a change.
	pub fn shared_captions(&mut self) -> Arc<[Caption]> {
		if let Some(shared) = &self.shared {
			return Arc::clone(shared);
		}

		let shared: Arc<[Caption]> = self.timeline.as_slice().into();
		self.shared = Some(Arc::clone(&shared));
		shared
	}

	/// Everything the presentation layer needs at playback position `current_time`.
	pub fn snapshot(&mut self, current_time: f64) -> CaptionSnapshot {
		let active_index = self.timeline.active_index_at(current_time);

		CaptionSnapshot {
			current_time,
			active: active_index.map(|index| self.timeline.as_slice()[index].clone()),
			active_index,
			captions: self.shared_captions(),
			version: self.version,
		}
	}
}
