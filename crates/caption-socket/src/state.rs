use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
	Connecting,
	Open,
	Closed,
	/// `attempt` is the reconnect attempt being waited on or performed, starting at 1
	Reconnecting { attempt: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateTransition {
	ConnectRequested,
	HandshakeSucceeded,
	HandshakeFailed,
	UnexpectedClose,
	DisconnectRequested,
}

/// Emitted to subscribers on every transition that changes the state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateChange {
	pub from: ConnectionState,
	pub to: ConnectionState,
	pub trigger: StateTransition,
}

impl ConnectionState {
	/// Pure transition function. Pairs that have no meaning in the current state leave it
	/// unchanged.
	pub const fn transition(self, trigger: StateTransition, max_attempts: u32) -> Self {
		use ConnectionState::*;
		use StateTransition::*;

		match (self, trigger) {
			(_, DisconnectRequested) => Closed,
			(Closed, ConnectRequested) => Connecting,
			(Connecting | Reconnecting { .. }, HandshakeSucceeded) => Open,
			(Connecting, HandshakeFailed) | (Open, UnexpectedClose) => Self::after_failure(0, max_attempts),
			(Reconnecting { attempt }, HandshakeFailed) => Self::after_failure(attempt, max_attempts),
			(state, _) => state,
		}
	}

	const fn after_failure(failed_attempt: u32, max_attempts: u32) -> Self {
		if failed_attempt < max_attempts {
			Self::Reconnecting { attempt: failed_attempt + 1 }
		} else {
			Self::Closed
		}
	}

	pub const fn is_open(self) -> bool {
		matches!(self, Self::Open)
	}

	pub const fn is_closed(self) -> bool {
		matches!(self, Self::Closed)
	}

	/// Whether the actor is working towards an open channel on its own
	pub const fn is_pending(self) -> bool {
		matches!(self, Self::Connecting | Self::Reconnecting { .. })
	}

	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Connecting => "connecting",
			Self::Open => "open",
			Self::Closed => "closed",
			Self::Reconnecting { .. } => "reconnecting",
		}
	}
}

impl fmt::Display for ConnectionState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Reconnecting { attempt } => write!(f, "reconnecting({attempt})"),
			other => f.write_str(other.as_str()),
		}
	}
}

impl StateChange {
	/// The channel gave up after its last automatic attempt
	pub const fn is_exhausted(&self) -> bool {
		self.to.is_closed() && matches!(self.trigger, StateTransition::HandshakeFailed | StateTransition::UnexpectedClose)
	}
}
