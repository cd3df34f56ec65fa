mod memory;
mod websocket;

pub use memory::{MemoryAcceptor, MemoryConnector, MemoryPeer};
pub use websocket::WsConnector;

use crate::TransportError;

/// An established, bidirectional text channel
#[async_trait::async_trait]
pub trait Channel: Send {
	async fn send_text(&mut self, text: String) -> Result<(), TransportError>;

	/// Next text frame. `None` once the remote end has gone away.
	async fn recv_text(&mut self) -> Option<Result<String, TransportError>>;

	async fn close(&mut self) -> Result<(), TransportError>;
}

/// Performs the handshake that yields a [`Channel`]. Called once per (re)connect attempt.
#[async_trait::async_trait]
pub trait Connector: Send + Sync + 'static {
	async fn connect(&self) -> Result<Box<dyn Channel>, TransportError>;
}
