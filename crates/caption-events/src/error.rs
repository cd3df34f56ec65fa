use thiserror::Error;

/// A frame that could not be turned into a typed event.
///
/// These are dropped at the boundary and logged; they never reach the caption timeline.
#[derive(Debug, Error)]
pub enum DecodeError {
	#[error("frame is not valid JSON: {0}")]
	Json(#[from] serde_json::Error),

	#[error("unknown event `{0}`")]
	UnknownEvent(String),

	#[error("event `{event}` is missing its payload")]
	MissingPayload { event: &'static str },

	#[error("event `{event}` has an invalid payload: {source}")]
	InvalidPayload {
		event: &'static str,
		#[source]
		source: serde_json::Error,
	},

	#[error("caption is missing start_time")]
	MissingStartTime,

	#[error("caption has invalid timing: {0}")]
	InvalidTiming(String),

	#[error("caption confidence {0} is outside [0, 1]")]
	ConfidenceOutOfRange(f32),
}
