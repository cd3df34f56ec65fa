use crate::caption::RawCaption;
use crate::{Caption, DecodeError, Language};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::str::FromStr;

/// Every event name that can appear on the channel, in either direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
	Caption,
	Status,
	TranscriptionComplete,
	ConnectionResponse,
	ProcessingStarted,
	ChunkReceived,
	Connect,
	Disconnect,
	ConnectError,
	ProcessRemoteVideo,
}

impl EventKind {
	/// Canonical wire name
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Caption => "caption",
			Self::Status => "status",
			Self::TranscriptionComplete => "transcription_complete",
			Self::ConnectionResponse => "connection_response",
			Self::ProcessingStarted => "processing_started",
			Self::ChunkReceived => "chunk_received",
			Self::Connect => "connect",
			Self::Disconnect => "disconnect",
			Self::ConnectError => "connect_error",
			Self::ProcessRemoteVideo => "process_remote_video",
		}
	}

	/// Whether the server sends this event to clients
	pub const fn is_server_event(self) -> bool {
		!matches!(self, Self::ProcessRemoteVideo)
	}
}

impl fmt::Display for EventKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.as_str())
	}
}

impl FromStr for EventKind {
	type Err = DecodeError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"caption" | "new_caption" => Ok(Self::Caption),
			"status" => Ok(Self::Status),
			"transcription_complete" => Ok(Self::TranscriptionComplete),
			"connection_response" => Ok(Self::ConnectionResponse),
			"processing_started" => Ok(Self::ProcessingStarted),
			"chunk_received" => Ok(Self::ChunkReceived),
			"connect" => Ok(Self::Connect),
			"disconnect" => Ok(Self::Disconnect),
			"connect_error" => Ok(Self::ConnectError),
			"process_remote_video" => Ok(Self::ProcessRemoteVideo),
			_ => Err(DecodeError::UnknownEvent(s.to_string())),
		}
	}
}

/// Connection lifecycle signals. The transport produces these itself; a backend that
/// mirrors them as frames gets them decoded here and dropped by the connection layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleSignal {
	Connect,
	Disconnect,
	ConnectError,
}

/// Server -> client events
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
	Caption(Caption),
	Status(String),
	TranscriptionComplete(Option<JsonValue>),
	ConnectionResponse(Option<JsonValue>),
	/// Advisory: the backend accepted a processing request
	ProcessingStarted(Option<JsonValue>),
	/// Advisory: the backend acknowledged a streamed chunk
	ChunkReceived(Option<JsonValue>),
	Lifecycle(LifecycleSignal),
}

/// Client -> server events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
	/// Ask the backend to fetch and transcribe a remote video that was not uploaded.
	/// Fire-and-forget: the only answer is the caption events that follow.
	ProcessRemoteVideo { video_id: String, language: Language },
}

#[derive(Debug, Serialize, Deserialize)]
struct Frame {
	event: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	data: Option<JsonValue>,
}

impl ServerEvent {
	pub const fn kind(&self) -> EventKind {
		match self {
			Self::Caption(_) => EventKind::Caption,
			Self::Status(_) => EventKind::Status,
			Self::TranscriptionComplete(_) => EventKind::TranscriptionComplete,
			Self::ConnectionResponse(_) => EventKind::ConnectionResponse,
			Self::ProcessingStarted(_) => EventKind::ProcessingStarted,
			Self::ChunkReceived(_) => EventKind::ChunkReceived,
			Self::Lifecycle(LifecycleSignal::Connect) => EventKind::Connect,
			Self::Lifecycle(LifecycleSignal::Disconnect) => EventKind::Disconnect,
			Self::Lifecycle(LifecycleSignal::ConnectError) => EventKind::ConnectError,
		}
	}

	/// Decode one text frame received from the backend.
	pub fn decode(text: &str) -> Result<Self, DecodeError> {
		let frame: Frame = serde_json::from_str(text)?;
		let kind: EventKind = frame.event.parse()?;
		let event = kind.as_str();

		match kind {
			EventKind::Caption => {
				let data = frame.data.ok_or(DecodeError::MissingPayload { event })?;
				let raw: RawCaption = serde_json::from_value(data).map_err(|source| DecodeError::InvalidPayload { event, source })?;
				Ok(Self::Caption(Caption::try_from(raw)?))
			}
			EventKind::Status => match frame.data {
				Some(JsonValue::String(status)) => Ok(Self::Status(status)),
				Some(JsonValue::Null) | None => Err(DecodeError::MissingPayload { event }),
				Some(other) => Ok(Self::Status(other.to_string())),
			},
			EventKind::TranscriptionComplete => Ok(Self::TranscriptionComplete(frame.data)),
			EventKind::ConnectionResponse => Ok(Self::ConnectionResponse(frame.data)),
			EventKind::ProcessingStarted => Ok(Self::ProcessingStarted(frame.data)),
			EventKind::ChunkReceived => Ok(Self::ChunkReceived(frame.data)),
			EventKind::Connect => Ok(Self::Lifecycle(LifecycleSignal::Connect)),
			EventKind::Disconnect => Ok(Self::Lifecycle(LifecycleSignal::Disconnect)),
			EventKind::ConnectError => Ok(Self::Lifecycle(LifecycleSignal::ConnectError)),
			EventKind::ProcessRemoteVideo => Err(DecodeError::UnknownEvent(frame.event)),
		}
	}

	/// Encode as a text frame, the way the backend emits it.
	pub fn encode(&self) -> Result<String, serde_json::Error> {
		let data = match self {
			Self::Caption(caption) => Some(serde_json::to_value(caption)?),
			Self::Status(status) => Some(JsonValue::String(status.clone())),
			Self::TranscriptionComplete(data) | Self::ConnectionResponse(data) | Self::ProcessingStarted(data) | Self::ChunkReceived(data) => data.clone(),
			Self::Lifecycle(_) => None,
		};

		serde_json::to_string(&Frame {
			event: self.kind().as_str().to_string(),
			data,
		})
	}
}

impl From<Caption> for ServerEvent {
	fn from(caption: Caption) -> Self {
		Self::Caption(caption)
	}
}

impl ClientEvent {
	pub fn process_remote_video(video_id: impl Into<String>, language: Language) -> Self {
		Self::ProcessRemoteVideo {
			video_id: video_id.into(),
			language,
		}
	}

	pub const fn kind(&self) -> EventKind {
		match self {
			Self::ProcessRemoteVideo { .. } => EventKind::ProcessRemoteVideo,
		}
	}

	pub fn encode(&self) -> Result<String, serde_json::Error> {
		serde_json::to_string(self)
	}

	pub fn decode(text: &str) -> Result<Self, DecodeError> {
		Ok(serde_json::from_str(text)?)
	}
}
