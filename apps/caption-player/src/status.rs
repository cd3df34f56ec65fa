use caption_socket::{ConnectionState, StateChange};

/// User-facing line for a connection state change
pub fn connectivity_status(change: &StateChange, max_attempts: u32) -> String {
	match change.to {
		ConnectionState::Connecting => "Connecting to server...".to_string(),
		ConnectionState::Open => "Connected to server".to_string(),
		ConnectionState::Reconnecting { attempt } => format!("Reconnecting (attempt {attempt}/{max_attempts})"),
		ConnectionState::Closed if change.is_exhausted() => "Connection lost: reconnect attempts exhausted".to_string(),
		ConnectionState::Closed => "Disconnected from server".to_string(),
	}
}
