use super::{Channel, Connector};
use crate::TransportError;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message as TungsteniteMessage, MaybeTlsStream, WebSocketStream};

/// Connects to the backend's event endpoint over WebSocket
#[derive(Debug, Clone)]
pub struct WsConnector {
	url: String,
}

impl WsConnector {
	pub fn new(url: impl Into<String>) -> Self {
		Self { url: url.into() }
	}

	pub fn url(&self) -> &str {
		&self.url
	}
}

#[async_trait::async_trait]
impl Connector for WsConnector {
	async fn connect(&self) -> Result<Box<dyn Channel>, TransportError> {
		let (stream, response) = connect_async(self.url.as_str()).await?;
		tracing::debug!(url = %self.url, status = %response.status(), "websocket handshake complete");
		Ok(Box::new(WsChannel { stream }))
	}
}

struct WsChannel {
	stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait::async_trait]
impl Channel for WsChannel {
	async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
		self.stream.send(TungsteniteMessage::Text(text.into())).await?;
		Ok(())
	}

	async fn recv_text(&mut self) -> Option<Result<String, TransportError>> {
		loop {
			match self.stream.next().await? {
				Ok(TungsteniteMessage::Text(text)) => return Some(Ok(text.to_string())),
				Ok(TungsteniteMessage::Close(frame)) => {
					tracing::info!(?frame, "WebSocket close frame received");
					return None;
				}
				Ok(TungsteniteMessage::Binary(bytes)) => {
					tracing::debug!(len = bytes.len(), "ignoring binary frame");
				}
				// tungstenite answers pings itself on the next read
				Ok(_) => {}
				Err(e) => return Some(Err(e.into())),
			}
		}
	}

	async fn close(&mut self) -> Result<(), TransportError> {
		match self.stream.close(None).await {
			Ok(()) | Err(tokio_tungstenite::tungstenite::Error::ConnectionClosed | tokio_tungstenite::tungstenite::Error::AlreadyClosed) => Ok(()),
			Err(e) => Err(e.into()),
		}
	}
}
