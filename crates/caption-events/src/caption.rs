use crate::DecodeError;
use serde::{Deserialize, Serialize};

/// Seconds a caption stays on screen when the backend omits `end_time`.
pub const DEFAULT_CAPTION_DURATION: f64 = 3.0;

/// A timed caption produced by the transcription backend. Immutable once received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Caption {
	pub start_time: f64,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub end_time: Option<f64>,
	#[serde(default)]
	pub text: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub confidence: Option<f32>,
}

impl Caption {
	pub fn new(start_time: f64, end_time: Option<f64>, text: impl Into<String>) -> Self {
		Self {
			start_time,
			end_time,
			text: text.into(),
			confidence: None,
		}
	}

	#[must_use]
	pub fn with_confidence(mut self, confidence: f32) -> Self {
		self.confidence = Some(confidence);
		self
	}

	/// `end_time` if present, otherwise `start_time + DEFAULT_CAPTION_DURATION`.
	pub fn effective_end(&self) -> f64 {
		self.end_time.unwrap_or(self.start_time + DEFAULT_CAPTION_DURATION)
	}

	/// Whether `time` falls inside `[start_time, effective_end]`, both ends inclusive.
	pub fn covers(&self, time: f64) -> bool {
		self.start_time <= time && time <= self.effective_end()
	}

	/// Check the timing and confidence invariants of the data model.
	pub fn validate(self) -> Result<Self, DecodeError> {
		if !self.start_time.is_finite() || self.start_time < 0.0 {
			return Err(DecodeError::InvalidTiming(format!("start_time {} must be a finite value >= 0", self.start_time)));
		}

		if let Some(end) = self.end_time {
			if !end.is_finite() || end < self.start_time {
				return Err(DecodeError::InvalidTiming(format!("end_time {} precedes start_time {}", end, self.start_time)));
			}
		}

		if let Some(confidence) = self.confidence {
			if !(0.0..=1.0).contains(&confidence) {
				return Err(DecodeError::ConfidenceOutOfRange(confidence));
			}
		}

		Ok(self)
	}
}

/// Caption as it appears on the wire, before the required fields are checked.
#[derive(Debug, Deserialize)]
pub(crate) struct RawCaption {
	start_time: Option<f64>,
	#[serde(default)]
	end_time: Option<f64>,
	#[serde(default)]
	text: Option<String>,
	#[serde(default)]
	confidence: Option<f32>,
}

impl TryFrom<RawCaption> for Caption {
	type Error = DecodeError;

	fn try_from(raw: RawCaption) -> Result<Self, Self::Error> {
		let start_time = raw.start_time.ok_or(DecodeError::MissingStartTime)?;

		Self {
			start_time,
			end_time: raw.end_time,
			text: raw.text.unwrap_or_default(),
			confidence: raw.confidence,
		}
		.validate()
	}
}
