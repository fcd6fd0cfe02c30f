//! Error types for the connection runtime.

use thiserror::Error;

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while connecting or moving frames.
///
/// None of these escape as a process fault: the manager folds them into
/// [`ConnectionState`](crate::ConnectionState) transitions.
#[derive(Debug, Error)]
pub enum Error {
	/// The configured endpoint cannot be turned into a channel URL.
	#[error("Invalid endpoint '{url}': {reason}")]
	InvalidEndpoint { url: String, reason: String },

	/// None of the configured transports has a connector.
	#[error("No connector available for transports: {0}")]
	NoTransport(String),

	/// A connect attempt was refused or failed mid-handshake.
	#[error("Failed to connect to {url}: {reason}")]
	ConnectionFailed { url: String, reason: String },

	/// Transport-level error on an established channel.
	#[error("Transport error: {0}")]
	TransportError(String),

	/// Channel closed unexpectedly.
	#[error("Channel closed unexpectedly")]
	ChannelClosed,

	/// JSON serialization/deserialization error.
	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),

	/// Timeout waiting for operation.
	#[error("Timeout: {0}")]
	Timeout(String),
}

impl Error {
	/// Returns true for errors worth another connect attempt.
	pub fn is_retryable(&self) -> bool {
		matches!(
			self,
			Error::ConnectionFailed { .. } | Error::TransportError(_) | Error::ChannelClosed | Error::Timeout(_)
		)
	}
}
