use std::fmt;

use serde::Serialize;

/// Health of the managed channel.
///
/// Only the [`ConnectionManager`](super::ConnectionManager) moves between
/// these; consumers read snapshots or watch for changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "lowercase")]
pub enum ConnectionState {
	Connecting,
	Connected,
	/// Not connected and not trying. Also the state before the first `open`.
	Disconnected,
	/// The last attempt or the live channel failed. A retry may follow.
	Error(String),
}

impl ConnectionState {
	pub fn is_connected(&self) -> bool {
		matches!(self, ConnectionState::Connected)
	}
}

impl fmt::Display for ConnectionState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ConnectionState::Connecting => write!(f, "connecting"),
			ConnectionState::Connected => write!(f, "connected"),
			ConnectionState::Disconnected => write!(f, "disconnected"),
			ConnectionState::Error(message) => write!(f, "error: {message}"),
		}
	}
}
