//! In-process transport with a scriptable server side.
//!
//! [`MemoryConnector::new`] returns the connector plus a [`MemoryServer`].
//! Every successful connect hands a fresh [`MemoryPeer`] to the server, which
//! can then read what the client sent, push frames back, break the channel or
//! simply drop the peer to simulate a disconnect.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use futures_util::FutureExt;
use futures_util::future::{self, BoxFuture};
use serde_json::Value;
use skytravel_protocol::Frame;
use tokio::sync::mpsc;
use url::Url;

use super::{Connector, TransportParts, TransportReceiver, TransportSender};
use crate::error::{Error, Result};

#[derive(Debug, Default)]
struct Gate {
	refusals: AtomicU32,
	attempts: AtomicUsize,
}

/// Client-side connector for in-memory channels.
pub struct MemoryConnector {
	gate: Arc<Gate>,
	peers: mpsc::UnboundedSender<MemoryPeer>,
}

/// Server side: accepts peers and controls connect outcomes.
pub struct MemoryServer {
	gate: Arc<Gate>,
	peers: mpsc::UnboundedReceiver<MemoryPeer>,
}

impl MemoryConnector {
	pub fn new() -> (Self, MemoryServer) {
		let gate = Arc::new(Gate::default());
		let (tx, rx) = mpsc::unbounded_channel();
		(
			Self {
				gate: Arc::clone(&gate),
				peers: tx,
			},
			MemoryServer { gate, peers: rx },
		)
	}
}

impl Connector for MemoryConnector {
	fn connect<'a>(&'a self, endpoint: &'a Url) -> BoxFuture<'a, Result<TransportParts>> {
		self.gate.attempts.fetch_add(1, Ordering::SeqCst);

		let refused = self
			.gate
			.refusals
			.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
			.is_ok();
		if refused {
			return future::ready(Err(Error::ConnectionFailed {
				url: endpoint.to_string(),
				reason: "connection refused".to_string(),
			}))
			.boxed();
		}

		let (client_tx, server_rx) = mpsc::unbounded_channel();
		let (server_tx, client_rx) = mpsc::unbounded_channel();
		let peer = MemoryPeer {
			incoming: server_rx,
			outgoing: server_tx,
		};

		let result = match self.peers.send(peer) {
			Ok(()) => Ok(TransportParts {
				sender: Box::new(MemorySender { tx: Some(client_tx) }),
				receiver: Box::new(MemoryReceiver { rx: client_rx }),
			}),
			Err(_) => Err(Error::ConnectionFailed {
				url: endpoint.to_string(),
				reason: "memory server is gone".to_string(),
			}),
		};
		future::ready(result).boxed()
	}
}

impl MemoryServer {
	/// Waits for the next client connection.
	pub async fn accept(&mut self) -> Option<MemoryPeer> {
		self.peers.recv().await
	}

	/// Makes the next `count` connect attempts fail.
	pub fn refuse_next(&self, count: u32) {
		self.gate.refusals.store(count, Ordering::SeqCst);
	}

	/// Connect attempts seen so far, refused ones included.
	pub fn attempts(&self) -> usize {
		self.gate.attempts.load(Ordering::SeqCst)
	}
}

/// Server end of one in-memory channel.
///
/// Dropping it closes the channel from the client's point of view.
pub struct MemoryPeer {
	incoming: mpsc::UnboundedReceiver<Frame>,
	outgoing: mpsc::UnboundedSender<Result<Frame>>,
}

impl MemoryPeer {
	/// Next frame sent by the client, or `None` once the client closed.
	pub async fn recv(&mut self) -> Option<Frame> {
		self.incoming.recv().await
	}

	/// Pushes a frame to the client. Returns false if the client is gone.
	pub fn send(&self, frame: Frame) -> bool {
		self.outgoing.send(Ok(frame)).is_ok()
	}

	/// Shorthand for [`send`](Self::send) with a fresh frame.
	pub fn push(&self, event: &str, data: Value) -> bool {
		self.send(Frame::new(event, data))
	}

	/// Breaks the channel with a transport error.
	pub fn fail(self, reason: impl Into<String>) {
		let _ = self.outgoing.send(Err(Error::TransportError(reason.into())));
	}
}

struct MemorySender {
	tx: Option<mpsc::UnboundedSender<Frame>>,
}

impl TransportSender for MemorySender {
	fn send(&mut self, frame: Frame) -> BoxFuture<'_, Result<()>> {
		let result = match &self.tx {
			Some(tx) => tx.send(frame).map_err(|_| Error::ChannelClosed),
			None => Err(Error::ChannelClosed),
		};
		future::ready(result).boxed()
	}

	fn close(&mut self) -> BoxFuture<'_, ()> {
		self.tx = None;
		future::ready(()).boxed()
	}
}

struct MemoryReceiver {
	rx: mpsc::UnboundedReceiver<Result<Frame>>,
}

impl TransportReceiver for MemoryReceiver {
	fn recv(&mut self) -> BoxFuture<'_, Option<Result<Frame>>> {
		self.rx.recv().boxed()
	}
}
