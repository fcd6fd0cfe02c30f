//! WebSocket transport (`direct-stream`).
//!
//! Each [`Frame`] travels as one JSON text message. Text messages that do not
//! parse as a frame are logged and skipped; ping/pong and binary messages are
//! ignored.

use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use skytravel_protocol::Frame;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use url::Url;

use super::{Connector, TransportParts, TransportReceiver, TransportSender};
use crate::error::{Error, Result};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Dials WebSocket endpoints.
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
	connect_timeout: Duration,
}

impl Default for WebSocketConnector {
	fn default() -> Self {
		Self {
			connect_timeout: DEFAULT_CONNECT_TIMEOUT,
		}
	}
}

impl WebSocketConnector {
	pub fn new() -> Self {
		Self::default()
	}

	/// Bounds the TCP + handshake phase of each attempt.
	pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
		self.connect_timeout = timeout;
		self
	}
}

impl Connector for WebSocketConnector {
	fn connect<'a>(&'a self, endpoint: &'a Url) -> BoxFuture<'a, Result<TransportParts>> {
		Box::pin(async move {
			tracing::debug!(url = %endpoint, "Opening WebSocket");

			let (stream, _response) = tokio::time::timeout(self.connect_timeout, connect_async(endpoint.as_str()))
				.await
				.map_err(|_| Error::Timeout(format!("WebSocket handshake with {endpoint} timed out")))?
				.map_err(|e| Error::ConnectionFailed {
					url: endpoint.to_string(),
					reason: e.to_string(),
				})?;

			let (sink, stream) = stream.split();
			Ok(TransportParts {
				sender: Box::new(WebSocketSender { sink }),
				receiver: Box::new(WebSocketReceiver { stream }),
			})
		})
	}
}

/// Writes frames as text messages.
pub struct WebSocketSender {
	sink: SplitSink<WsStream, Message>,
}

impl TransportSender for WebSocketSender {
	fn send(&mut self, frame: Frame) -> BoxFuture<'_, Result<()>> {
		Box::pin(async move {
			let text = serde_json::to_string(&frame)?;
			self.sink
				.send(Message::Text(text))
				.await
				.map_err(|e| Error::TransportError(e.to_string()))
		})
	}

	fn close(&mut self) -> BoxFuture<'_, ()> {
		Box::pin(async move {
			if let Err(e) = self.sink.close().await {
				tracing::debug!(error = %e, "WebSocket close failed");
			}
		})
	}
}

/// Reads frames from text messages.
pub struct WebSocketReceiver {
	stream: SplitStream<WsStream>,
}

impl TransportReceiver for WebSocketReceiver {
	fn recv(&mut self) -> BoxFuture<'_, Option<Result<Frame>>> {
		Box::pin(async move {
			loop {
				match self.stream.next().await? {
					Ok(Message::Text(text)) => match serde_json::from_str::<Frame>(&text) {
						Ok(frame) => return Some(Ok(frame)),
						Err(e) => {
							tracing::warn!(error = %e, "Skipping malformed frame");
						}
					},
					Ok(Message::Close(close)) => {
						tracing::debug!(?close, "WebSocket closed by peer");
						return None;
					}
					Ok(_) => {}
					Err(e) => return Some(Err(Error::TransportError(e.to_string()))),
				}
			}
		})
	}
}
