use crate::key::CaptionKey;
use caption_events::Caption;
use std::collections::HashSet;

/// Result of inserting into a [`CaptionTimeline`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insertion {
	Inserted { index: usize },
	Duplicate,
}

impl Insertion {
	pub const fn is_inserted(self) -> bool {
		matches!(self, Self::Inserted { .. })
	}
}

/// Captions ordered by `start_time`, ties kept in arrival order, with set semantics
/// on [`CaptionKey`].
///
/// The order invariant holds after every insertion, not only after a batch.
#[derive(Debug, Clone, Default)]
pub struct CaptionTimeline {
	captions: Vec<Caption>,
	keys: HashSet<CaptionKey>,
}

impl CaptionTimeline {
	pub fn new() -> Self {
		Self::default()
	}

	/// Insert in order. A caption whose key is already present is ignored.
	pub fn insert(&mut self, caption: Caption) -> Insertion {
		if !self.keys.insert(CaptionKey::from(&caption)) {
			return Insertion::Duplicate;
		}

		// after every caption with an equal or earlier start
		let index = self.captions.partition_point(|c| c.start_time <= caption.start_time);
		self.captions.insert(index, caption);

		Insertion::Inserted { index }
	}

	pub fn contains(&self, caption: &Caption) -> bool {
		self.keys.contains(&CaptionKey::from(caption))
	}

	/// First caption in timeline order with `start_time <= time <= effective_end`.
	pub fn active_at(&self, time: f64) -> Option<&Caption> {
		self.active_index_at(time).map(|index| &self.captions[index])
	}

	pub fn active_index_at(&self, time: f64) -> Option<usize> {
		// only captions that have already started can match
		let started = self.captions.partition_point(|c| c.start_time <= time);
		self.captions[..started].iter().position(|c| time <= c.effective_end())
	}

	pub fn as_slice(&self) -> &[Caption] {
		&self.captions
	}

	pub fn iter(&self) -> std::slice::Iter<'_, Caption> {
		self.captions.iter()
	}

	pub fn len(&self) -> usize {
		self.captions.len()
	}

	pub fn is_empty(&self) -> bool {
		self.captions.is_empty()
	}

	pub fn clear(&mut self) {
		self.captions.clear();
		self.keys.clear();
	}

	/// Check the ordering invariant. Cheap enough for tests and debug assertions.
	pub fn is_sorted(&self) -> bool {
		self.captions.windows(2).all(|pair| pair[0].start_time <= pair[1].start_time)
	}
}

impl<'a> IntoIterator for &'a CaptionTimeline {
	type Item = &'a Caption;
	type IntoIter = std::slice::Iter<'a, Caption>;

	fn into_iter(self) -> Self::IntoIter {
		self.iter()
	}
}
