//! Frame transports.
//!
//! A [`Connector`] dials an endpoint and hands back [`TransportParts`]: a
//! sender half owned by the writer side of the connection loop and a
//! receiver half that yields inbound frames in arrival order.
//!
//! - [`websocket`] - `direct-stream` over `tokio-tungstenite`
//! - [`memory`] - in-process pipes with a scriptable server side

use futures_util::future::BoxFuture;
use skytravel_protocol::Frame;
use url::Url;

use crate::error::Result;

pub mod memory;
pub mod websocket;

#[cfg(test)]
mod tests;

/// Outbound half of an established channel.
pub trait TransportSender: Send {
	/// Writes one frame.
	fn send(&mut self, frame: Frame) -> BoxFuture<'_, Result<()>>;

	/// Closes the channel gracefully. Errors are ignored.
	fn close(&mut self) -> BoxFuture<'_, ()>;
}

/// Inbound half of an established channel.
pub trait TransportReceiver: Send {
	/// Waits for the next frame.
	///
	/// Returns `None` once the peer has closed the channel; an `Err` means the
	/// channel broke and no more frames will follow.
	fn recv(&mut self) -> BoxFuture<'_, Option<Result<Frame>>>;
}

/// Both halves of a freshly established channel.
pub struct TransportParts {
	pub sender: Box<dyn TransportSender>,
	pub receiver: Box<dyn TransportReceiver>,
}

/// Dials one transport flavour.
pub trait Connector: Send + Sync {
	fn connect<'a>(&'a self, endpoint: &'a Url) -> BoxFuture<'a, Result<TransportParts>>;
}
