use thiserror::Error;

/// Failures of a single transport (handshake, read or write)
#[derive(Debug, Error)]
pub enum TransportError {
	#[error("WebSocket error: {0}")]
	WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

	#[error("Connection refused: {0}")]
	Refused(String),

	#[error("Channel closed")]
	Closed,
}

#[derive(Debug, Error)]
pub enum ConnectionError {
	/// `send` while the channel is not open. The event is dropped, never queued.
	#[error("Not connected")]
	NotConnected,

	#[error("Reconnect attempts exhausted after {attempts} tries")]
	ReconnectExhausted { attempts: u32 },

	#[error("Transport error: {0}")]
	Transport(#[from] TransportError),

	#[error("Failed to encode event: {0}")]
	Encode(#[from] serde_json::Error),

	#[error("Connection actor unavailable")]
	ActorUnavailable,
}
