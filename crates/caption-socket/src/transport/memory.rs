use super::{Channel, Connector};
use crate::TransportError;
use caption_events::ServerEvent;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;

/// In-process transport for tests: a scripted connector whose accepted channels are
/// driven from the test through [`MemoryPeer`].
#[derive(Debug, Clone)]
pub struct MemoryConnector {
	inner: Arc<Mutex<Script>>,
	peers: mpsc::UnboundedSender<MemoryPeer>,
}

#[derive(Debug)]
struct Script {
	outcomes: VecDeque<bool>,
	accept_by_default: bool,
	attempts: usize,
}

/// Receives the server side of every accepted connection
#[derive(Debug)]
pub struct MemoryAcceptor {
	peers: mpsc::UnboundedReceiver<MemoryPeer>,
}

/// Server side of one in-memory channel. Dropping it (or calling [`MemoryPeer::close`])
/// looks like an unexpected close to the client.
#[derive(Debug)]
pub struct MemoryPeer {
	to_client: mpsc::UnboundedSender<String>,
	from_client: mpsc::UnboundedReceiver<String>,
}

struct MemoryChannel {
	incoming: mpsc::UnboundedReceiver<String>,
	outgoing: Option<mpsc::UnboundedSender<String>>,
}

impl MemoryConnector {
	/// Accepts every handshake unless told otherwise
	pub fn new() -> (Self, MemoryAcceptor) {
		let (peers, rx) = mpsc::unbounded_channel();
		let connector = Self {
			inner: Arc::new(Mutex::new(Script {
				outcomes: VecDeque::new(),
				accept_by_default: true,
				attempts: 0,
			})),
			peers,
		};
		(connector, MemoryAcceptor { peers: rx })
	}

	fn script(&self) -> std::sync::MutexGuard<'_, Script> {
		self.inner.lock().unwrap_or_else(PoisonError::into_inner)
	}

	/// Queue `count` refused handshakes ahead of the default behaviour
	pub fn refuse_next(&self, count: usize) {
		self.script().outcomes.extend(std::iter::repeat(false).take(count));
	}

	pub fn accept_next(&self) {
		self.script().outcomes.push_back(true);
	}

	pub fn refuse_all(&self) {
		let mut script = self.script();
		script.outcomes.clear();
		script.accept_by_default = false;
	}

	pub fn accept_all(&self) {
		let mut script = self.script();
		script.outcomes.clear();
		script.accept_by_default = true;
	}

	/// Handshakes attempted so far, refused ones included
	pub fn attempts(&self) -> usize {
		self.script().attempts
	}
}

#[async_trait::async_trait]
impl Connector for MemoryConnector {
	async fn connect(&self) -> Result<Box<dyn Channel>, TransportError> {
		let accept = {
			let mut script = self.script();
			script.attempts += 1;
			let default = script.accept_by_default;
			script.outcomes.pop_front().unwrap_or(default)
		};

		if !accept {
			return Err(TransportError::Refused("scripted refusal".to_string()));
		}

		let (to_client, incoming) = mpsc::unbounded_channel();
		let (outgoing, from_client) = mpsc::unbounded_channel();
		self.peers.send(MemoryPeer { to_client, from_client }).map_err(|_| TransportError::Refused("acceptor dropped".to_string()))?;

		Ok(Box::new(MemoryChannel {
			incoming,
			outgoing: Some(outgoing),
		}))
	}
}

impl MemoryAcceptor {
	pub async fn accept(&mut self) -> Option<MemoryPeer> {
		self.peers.recv().await
	}
}

impl MemoryPeer {
	pub fn push_text(&self, text: impl Into<String>) -> Result<(), TransportError> {
		self.to_client.send(text.into()).map_err(|_| TransportError::Closed)
	}

	pub fn push_event(&self, event: &ServerEvent) -> Result<(), TransportError> {
		let text = event.encode().map_err(|e| TransportError::Refused(e.to_string()))?;
		self.push_text(text)
	}

	/// Next frame the client sent. `None` once the client closed the channel.
	pub async fn recv(&mut self) -> Option<String> {
		self.from_client.recv().await
	}

	pub fn close(self) {
		drop(self);
	}
}

#[async_trait::async_trait]
impl Channel for MemoryChannel {
	async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
		let outgoing = self.outgoing.as_ref().ok_or(TransportError::Closed)?;
		outgoing.send(text).map_err(|_| TransportError::Closed)
	}

	async fn recv_text(&mut self) -> Option<Result<String, TransportError>> {
		self.incoming.recv().await.map(Ok)
	}

	async fn close(&mut self) -> Result<(), TransportError> {
		self.outgoing = None;
		self.incoming.close();
		Ok(())
	}
}
