//! Connection manager for the search channel.
//!
//! A [`ConnectionManager`] owns at most one live channel. `open` spawns a
//! driver task that:
//!
//! 1. Resolves the endpoint and walks the configured transports in order
//! 2. Moves the state to `Connected` once one of them dials through
//! 3. Forwards outbound frames and dispatches inbound frames to handlers,
//!    strictly in arrival order
//! 4. On loss, retries with a fixed delay until the attempt budget runs out,
//!    then settles in `Disconnected`
//!
//! Failures that another attempt cannot fix (a malformed endpoint, no usable
//! transport) pass through `Error` and settle in `Disconnected` right away.
//! [`ConnectionHandle::last_error`] keeps the reason.
//!
//! Frames emitted while the channel is not `Connected` are dropped with a
//! warning. Nothing is queued for a later connection.
//!
//! Consumers hold a cloneable [`ConnectionHandle`]; only the manager itself
//! can open or close the channel, and dropping it closes the channel.

use std::collections::HashMap;
use std::ops::Deref;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use serde_json::Value;
use skytravel_protocol::{CONNECTION_ACK, Frame, ServerEvent};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use url::Url;

use crate::config::{ConnectionConfig, TransportKind};
use crate::error::{Error, Result};
use crate::handlers::{self, HandlerMap, Subscription};
use crate::transport::websocket::WebSocketConnector;
use crate::transport::{Connector, TransportParts};

mod state;
#[cfg(test)]
mod tests;

pub use state::ConnectionState;

struct Inner {
	connectors: Mutex<HashMap<TransportKind, Arc<dyn Connector>>>,
	state_tx: watch::Sender<ConnectionState>,
	state_handlers: HandlerMap<ConnectionState>,
	event_handlers: Mutex<HashMap<String, HandlerMap<Frame>>>,
	/// Writer queue of the current driver, `None` while closed.
	outbound: Mutex<Option<mpsc::UnboundedSender<Frame>>>,
	/// Bumped on every open/close so a superseded driver stops publishing.
	generation: AtomicU64,
	last_error: Mutex<Option<String>>,
	server_sid: Mutex<Option<String>>,
}

impl Inner {
	fn set_state(&self, next: ConnectionState) {
		let changed = self.state_tx.send_if_modified(|current| {
			if *current == next {
				false
			} else {
				*current = next.clone();
				true
			}
		});

		if changed {
			tracing::debug!(state = %next, "Connection state changed");
			handlers::dispatch(&self.state_handlers, &next);
		}
	}

	fn dispatch(&self, frame: &Frame) {
		tracing::debug!(event = %frame.event, session = ?frame.session, "Received frame");

		if frame.event == CONNECTION_ACK {
			self.record_ack(frame);
		}

		let handlers = self.event_handlers.lock().get(&frame.event).cloned();
		let called = handlers.map(|map| handlers::dispatch(&map, frame)).unwrap_or(0);
		if called == 0 {
			tracing::debug!(event = %frame.event, "No handlers for event (ignored)");
		}
	}

	fn record_ack(&self, frame: &Frame) {
		match ServerEvent::from_frame(frame) {
			Ok(Some(ServerEvent::ConnectionAck(ack))) => {
				tracing::info!(sid = ?ack.sid, message = ?ack.message, "Server acknowledged connection");
				*self.server_sid.lock() = ack.sid;
			}
			Ok(_) => {}
			Err(e) => tracing::debug!(error = %e, "Unrecognized connection-ack payload"),
		}
	}

	fn record_error(&self, message: &str) {
		*self.last_error.lock() = Some(message.to_string());
	}
}

/// Cloneable access to a managed connection: state, subscriptions, emission.
#[derive(Clone)]
pub struct ConnectionHandle {
	inner: Arc<Inner>,
}

impl ConnectionHandle {
	/// Current state snapshot. Never blocks on I/O.
	pub fn state(&self) -> ConnectionState {
		self.inner.state_tx.borrow().clone()
	}

	/// Receiver that observes every state change.
	pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
		self.inner.state_tx.subscribe()
	}

	/// Calls `handler` on every state change, on the task causing it.
	pub fn on_state_change<F>(&self, handler: F) -> Subscription
	where
		F: Fn(&ConnectionState) + Send + Sync + 'static,
	{
		handlers::register(&self.inner.state_handlers, handler)
	}

	/// Calls `handler` for every future inbound frame named `event`.
	///
	/// Several handlers may share a name; they run in registration order.
	/// The handler is removed when the returned [`Subscription`] is dropped.
	pub fn subscribe<F>(&self, event: &str, handler: F) -> Subscription
	where
		F: Fn(&Frame) + Send + Sync + 'static,
	{
		let map = {
			let mut maps = self.inner.event_handlers.lock();
			Arc::clone(maps.entry(event.to_string()).or_insert_with(handlers::new_handler_map))
		};
		handlers::register(&map, handler)
	}

	/// Removes every handler registered for `event`. Returns how many there were.
	pub fn unsubscribe(&self, event: &str) -> usize {
		let removed = self.inner.event_handlers.lock().remove(event);
		removed.map(|map| map.lock().len()).unwrap_or(0)
	}

	/// Number of handlers currently registered for `event`.
	pub fn handler_count(&self, event: &str) -> usize {
		self.inner
			.event_handlers
			.lock()
			.get(event)
			.map(|map| map.lock().len())
			.unwrap_or(0)
	}

	/// Sends one event. See [`send`](Self::send).
	pub fn emit(&self, event: &str, payload: Value) -> bool {
		self.send(Frame::new(event, payload))
	}

	/// Queues `frame` for the live channel.
	///
	/// Returns false, after logging, when the channel is not connected; the
	/// frame is dropped rather than held for a later connection.
	pub fn send(&self, frame: Frame) -> bool {
		let state = self.state();
		if !state.is_connected() {
			tracing::warn!(event = %frame.event, %state, "Dropping frame: channel not connected");
			return false;
		}

		let outbound = self.inner.outbound.lock();
		match outbound.as_ref().map(|tx| tx.send(frame)) {
			Some(Ok(())) => true,
			_ => {
				tracing::warn!("Dropping frame: writer is gone");
				false
			}
		}
	}

	/// Message of the most recent connect or transport failure.
	///
	/// Cleared by the next successful connection.
	pub fn last_error(&self) -> Option<String> {
		self.inner.last_error.lock().clone()
	}

	/// Connection id announced by the server in its `connection-ack`.
	pub fn server_sid(&self) -> Option<String> {
		self.inner.server_sid.lock().clone()
	}
}

/// Owner of the channel lifecycle.
///
/// Dereferences to [`ConnectionHandle`] for everything except `open`/`close`.
pub struct ConnectionManager {
	handle: ConnectionHandle,
	driver: Mutex<Option<JoinHandle<()>>>,
}

impl Default for ConnectionManager {
	fn default() -> Self {
		Self::new()
	}
}

impl ConnectionManager {
	/// Creates a closed manager with the WebSocket connector registered for
	/// `direct-stream`.
	pub fn new() -> Self {
		Self::without_connectors().with_connector(TransportKind::DirectStream, WebSocketConnector::new())
	}

	/// Creates a closed manager with no connectors at all.
	pub fn without_connectors() -> Self {
		let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
		let inner = Inner {
			connectors: Mutex::new(HashMap::new()),
			state_tx,
			state_handlers: handlers::new_handler_map(),
			event_handlers: Mutex::new(HashMap::new()),
			outbound: Mutex::new(None),
			generation: AtomicU64::new(0),
			last_error: Mutex::new(None),
			server_sid: Mutex::new(None),
		};
		Self {
			handle: ConnectionHandle { inner: Arc::new(inner) },
			driver: Mutex::new(None),
		}
	}

	/// Registers (or replaces) the connector used for `kind`.
	pub fn with_connector(self, kind: TransportKind, connector: impl Connector + 'static) -> Self {
		self.handle.inner.connectors.lock().insert(kind, Arc::new(connector));
		self
	}

	pub fn handle(&self) -> ConnectionHandle {
		self.handle.clone()
	}

	/// Starts connecting to the configured endpoint.
	///
	/// Returns immediately; progress shows up as state transitions. An already
	/// open channel is torn down first.
	///
	/// # Panics
	///
	/// Panics when called outside a Tokio runtime.
	pub fn open(&self, config: ConnectionConfig) {
		let mut driver = self.driver.lock();
		if let Some(task) = driver.take() {
			task.abort();
		}

		let inner = &self.handle.inner;
		let generation = inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
		let (tx, rx) = mpsc::unbounded_channel();
		*inner.outbound.lock() = Some(tx);
		inner.set_state(ConnectionState::Connecting);

		tracing::info!(url = %config.url, "Opening connection");
		let task = Driver {
			inner: Arc::clone(inner),
			generation,
			config,
		};
		*driver = Some(tokio::spawn(task.run(rx)));
	}

	/// Terminates the channel and stops any retry loop. Idempotent.
	pub fn close(&self) {
		let task = self.driver.lock().take();
		let inner = &self.handle.inner;
		inner.generation.fetch_add(1, Ordering::SeqCst);
		inner.outbound.lock().take();

		if let Some(task) = task {
			task.abort();
			tracing::info!("Connection closed");
		}
		inner.set_state(ConnectionState::Disconnected);
	}
}

impl Deref for ConnectionManager {
	type Target = ConnectionHandle;

	fn deref(&self) -> &ConnectionHandle {
		&self.handle
	}
}

impl Drop for ConnectionManager {
	fn drop(&mut self) {
		self.close();
	}
}

enum PumpExit {
	/// The manager dropped the writer queue.
	Closed,
	/// The channel went away, with the transport's reason if it had one.
	Lost(Option<String>),
}

/// One `open` call's connect/reconnect loop.
struct Driver {
	inner: Arc<Inner>,
	generation: u64,
	config: ConnectionConfig,
}

impl Driver {
	fn is_current(&self) -> bool {
		self.inner.generation.load(Ordering::SeqCst) == self.generation
	}

	fn set_state(&self, state: ConnectionState) {
		if self.is_current() {
			self.inner.set_state(state);
		}
	}

	fn fail(&self, message: String) {
		if self.is_current() {
			self.inner.record_error(&message);
			self.inner.set_state(ConnectionState::Error(message));
		}
	}

	async fn run(self, mut outbound_rx: mpsc::UnboundedReceiver<Frame>) {
		let endpoint = match self.config.endpoint() {
			Ok(url) => url,
			Err(e) => {
				tracing::error!(error = %e, "Cannot open connection");
				self.fail(e.to_string());
				self.set_state(ConnectionState::Disconnected);
				return;
			}
		};

		let mut retries: u32 = 0;
		loop {
			self.set_state(ConnectionState::Connecting);

			match self.dial(&endpoint).await {
				Ok(parts) => {
					retries = 0;
					*self.inner.last_error.lock() = None;
					*self.inner.server_sid.lock() = None;
					// Frames emitted before this connection existed are not replayed.
					while outbound_rx.try_recv().is_ok() {}

					tracing::info!(url = %endpoint, "Connected");
					self.set_state(ConnectionState::Connected);

					match self.pump(parts, &mut outbound_rx).await {
						PumpExit::Closed => return,
						PumpExit::Lost(None) => {
							tracing::info!("Connection closed by server");
							self.set_state(ConnectionState::Disconnected);
						}
						PumpExit::Lost(Some(reason)) => {
							tracing::warn!(%reason, "Connection lost");
							self.fail(reason);
						}
					}
				}
				Err(e) => {
					tracing::warn!(attempt = retries + 1, error = %e, "Connect attempt failed");
					let retryable = e.is_retryable();
					self.fail(e.to_string());
					if !retryable {
						self.set_state(ConnectionState::Disconnected);
						return;
					}
				}
			}

			if !self.config.auto_reconnect {
				self.set_state(ConnectionState::Disconnected);
				return;
			}
			if retries >= self.config.max_reconnect_attempts {
				tracing::warn!(retries, "Reconnect budget exhausted; giving up until reopened");
				self.set_state(ConnectionState::Disconnected);
				return;
			}

			retries += 1;
			tracing::debug!(retry = retries, delay_ms = self.config.reconnect_delay_ms, "Scheduling reconnect");
			tokio::time::sleep(self.config.reconnect_delay()).await;
		}
	}

	/// Tries each configured transport in order and keeps the first that connects.
	async fn dial(&self, endpoint: &Url) -> Result<TransportParts> {
		let mut last_error = None;

		for kind in &self.config.transports {
			let connector = self.inner.connectors.lock().get(kind).cloned();
			let Some(connector) = connector else {
				tracing::warn!(transport = %kind, "No connector for transport, skipping");
				continue;
			};

			match connector.connect(endpoint).await {
				Ok(parts) => {
					tracing::debug!(transport = %kind, "Transport connected");
					return Ok(parts);
				}
				Err(e) => {
					tracing::debug!(transport = %kind, error = %e, "Transport failed");
					last_error = Some(e);
				}
			}
		}

		Err(last_error.unwrap_or_else(|| {
			let names: Vec<String> = self.config.transports.iter().map(ToString::to_string).collect();
			Error::NoTransport(names.join(", "))
		}))
	}

	async fn pump(&self, parts: TransportParts, outbound_rx: &mut mpsc::UnboundedReceiver<Frame>) -> PumpExit {
		let TransportParts {
			mut sender,
			mut receiver,
		} = parts;

		loop {
			tokio::select! {
				outbound = outbound_rx.recv() => {
					let Some(frame) = outbound else {
						sender.close().await;
						return PumpExit::Closed;
					};
					tracing::debug!(event = %frame.event, session = ?frame.session, "Sending frame");
					if let Err(e) = sender.send(frame).await {
						return PumpExit::Lost(Some(e.to_string()));
					}
				}
				inbound = receiver.recv() => match inbound {
					Some(Ok(frame)) => {
						if self.is_current() {
							self.inner.dispatch(&frame);
						}
					}
					Some(Err(e)) => return PumpExit::Lost(Some(e.to_string())),
					None => return PumpExit::Lost(None),
				},
			}
		}
	}
}
