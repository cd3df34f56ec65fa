use caption_events::Caption;

/// Identity of a caption for duplicate detection.
///
/// `(start_time, end_time)` when the caption carries an end, `(start_time, text)` otherwise.
/// Times are compared by bit pattern so the key can live in a hash set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CaptionKey {
	Span { start: u64, end: u64 },
	Text { start: u64, text: String },
}

fn time_bits(seconds: f64) -> u64 {
	// -0.0 and 0.0 are the same instant
	if seconds == 0.0 {
		0.0_f64.to_bits()
	} else {
		seconds.to_bits()
	}
}

impl From<&Caption> for CaptionKey {
	fn from(caption: &Caption) -> Self {
		let start = time_bits(caption.start_time);
		match caption.end_time {
			Some(end) => Self::Span { start, end: time_bits(end) },
			None => Self::Text {
				start,
				text: caption.text.clone(),
			},
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_key_ignores_text_when_end_present() {
		let a = CaptionKey::from(&Caption::new(2.0, Some(4.0), "hi"));
		let b = CaptionKey::from(&Caption::new(2.0, Some(4.0), "hello"));
		assert_eq!(a, b);
	}

	#[test]
	fn test_key_uses_text_when_end_absent() {
		let a = CaptionKey::from(&Caption::new(2.0, None, "hi"));
		let b = CaptionKey::from(&Caption::new(2.0, None, "hello"));
		assert_ne!(a, b);
	}

	#[test]
	fn test_key_kinds_never_collide() {
		let with_end = CaptionKey::from(&Caption::new(2.0, Some(5.0), "hi"));
		let without_end = CaptionKey::from(&Caption::new(2.0, None, "hi"));
		assert_ne!(with_end, without_end);
	}

	#[test]
	fn test_negative_zero_matches_zero() {
		let a = CaptionKey::from(&Caption::new(0.0, Some(1.0), "a"));
		let b = CaptionKey::from(&Caption::new(-0.0, Some(1.0), "a"));
		assert_eq!(a, b);
	}
}
